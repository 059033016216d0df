//! Route handlers. Store calls run on the blocking pool.

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::NaiveDate;
use depot_storage::{tree_from_pairs, BinConfig, StorageError, StorageResult, Store};
use depot_types::{IndexDefinition, Stamp};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

type Params = Query<BTreeMap<String, String>>;

async fn run<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Store) -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| ApiError::Internal(format!("storage task failed: {e}")))?
        .map_err(ApiError::from)
}

fn json_body(body: &Bytes) -> ApiResult<Value> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("invalid JSON body: {e}")))
}

/// A query flag is set when present with a non-empty value.
fn flag(params: &BTreeMap<String, String>, name: &str) -> bool {
    params.get(name).is_some_and(|v| !v.is_empty())
}

fn stamp_param(params: &BTreeMap<String, String>) -> ApiResult<Option<Stamp>> {
    match params.get("dttm").map(String::as_str) {
        None | Some("") => Ok(None),
        Some(s) => Stamp::parse(s)
            .map(Some)
            .map_err(|e| ApiError::bad_request(e.to_string())),
    }
}

/// Retention cutoff from `dt=YYYY-MM-DD` or `days=N`.
pub(crate) fn cutoff(params: &BTreeMap<String, String>) -> ApiResult<Stamp> {
    if let Some(dt) = params.get("dt") {
        let date = NaiveDate::parse_from_str(dt.trim(), "%Y-%m-%d")
            .map_err(|e| ApiError::bad_request(format!("invalid date {dt:?}: {e}")))?;
        return Ok(Stamp::start_of_day(date));
    }
    if let Some(days) = params.get("days") {
        let days: u32 = days
            .trim()
            .parse()
            .map_err(|_| ApiError::bad_request(format!("invalid number of days: {days:?}")))?;
        return Ok(Stamp::days_ago(days));
    }
    Err(ApiError::bad_request("Date parameter missing"))
}

fn listing<T: serde::Serialize>(count: usize, items: T) -> Json<Value> {
    Json(json!({"count": count, "items": items}))
}

// ── Service ─────────────────────────────────────────────────────

pub(crate) async fn ping(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
) -> ApiResult<Json<Value>> {
    let db = run(&state, Store::version).await?;
    Ok(Json(json!({
        "app": "depot",
        "version": env!("CARGO_PKG_VERSION"),
        "db": db,
        "user": user.map(|Extension(AuthUser(name))| name),
    })))
}

pub(crate) async fn list_bins(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let bins = run(&state, Store::list_bins).await?;
    Ok(listing(bins.len(), bins))
}

pub(crate) async fn summary_all(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let summary = run(&state, |s| s.summary(None)).await?;
    Ok(Json(serde_json::to_value(summary).map_err(StorageError::from)?))
}

pub(crate) async fn cleanup_all(
    State(state): State<AppState>,
    Query(params): Params,
) -> ApiResult<Json<Value>> {
    let cutoff = cutoff(&params)?;
    let count = run(&state, move |s| s.cleanup(None, cutoff)).await?;
    info!(%cutoff, count, "cleanup");
    Ok(Json(json!({"count": count})))
}

// ── Bins ────────────────────────────────────────────────────────

pub(crate) async fn list_items(
    State(state): State<AppState>,
    Path(bin): Path<String>,
    Query(params): Params,
) -> ApiResult<Json<Value>> {
    let full = flag(&params, "full");
    let with_index = flag(&params, "index");

    let (count, items, index) = run(&state, move |s| {
        let (count, items) = if full {
            let items = s.list_items(&bin)?;
            (items.len(), serde_json::to_value(items)?)
        } else {
            let ids = s.list_ids(&bin)?;
            (ids.len(), serde_json::to_value(ids)?)
        };
        let index = if with_index { Some(s.definition(&bin)?) } else { None };
        Ok((count, items, index))
    })
    .await?;

    let mut body = Map::new();
    body.insert("count".into(), json!(count));
    body.insert("items".into(), items);
    if let Some(def) = index.filter(|d| !d.is_empty()) {
        body.insert("_index".into(), def.to_json());
    }
    Ok(Json(Value::Object(body)))
}

pub(crate) async fn create_item(
    State(state): State<AppState>,
    Path(bin): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let content = json_body(&body)?;
    let (id, content) = run(&state, move |s| {
        let id = s.create(&bin, &content)?;
        let content = s.get(&bin, &id)?;
        Ok((id, content))
    })
    .await?;
    Ok((StatusCode::CREATED, Json(json!({"id": id, "content": content}))))
}

pub(crate) async fn delete_bin(
    State(state): State<AppState>,
    Path(bin): Path<String>,
) -> ApiResult<StatusCode> {
    let name = bin.clone();
    let removed = run(&state, move |s| s.delete_bin(&bin)).await?;
    info!(bin = %name, versions = removed, "deleted bin");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn summary_bin(
    State(state): State<AppState>,
    Path(bin): Path<String>,
) -> ApiResult<Json<Value>> {
    let summary = run(&state, move |s| s.summary(Some(&bin))).await?;
    Ok(Json(serde_json::to_value(summary).map_err(StorageError::from)?))
}

pub(crate) async fn cleanup_bin(
    State(state): State<AppState>,
    Path(bin): Path<String>,
    Query(params): Params,
) -> ApiResult<Json<Value>> {
    let cutoff = cutoff(&params)?;
    let count = run(&state, move |s| s.cleanup(Some(&bin), cutoff)).await?;
    Ok(Json(json!({"count": count})))
}

pub(crate) async fn get_config(
    State(state): State<AppState>,
    Path(bin): Path<String>,
) -> ApiResult<Json<BinConfig>> {
    Ok(Json(run(&state, move |s| s.bin_config(&bin)).await?))
}

pub(crate) async fn put_config(
    State(state): State<AppState>,
    Path(bin): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<BinConfig>)> {
    let cfg: BinConfig = serde_json::from_value(json_body(&body)?)
        .map_err(|e| ApiError::bad_request(format!("invalid bin config: {e}")))?;
    let cfg = run(&state, move |s| {
        s.set_bin_config(&bin, cfg)?;
        s.bin_config(&bin)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(cfg)))
}

pub(crate) async fn get_index(
    State(state): State<AppState>,
    Path(bin): Path<String>,
) -> ApiResult<Json<Value>> {
    let def = run(&state, move |s| s.definition(&bin)).await?;
    Ok(Json(def.to_json()))
}

pub(crate) async fn put_index(
    State(state): State<AppState>,
    Path(bin): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let def = IndexDefinition::from_json(&json_body(&body)?).map_err(StorageError::from)?;
    let name = bin.clone();
    let (indexed, def) = run(&state, move |s| {
        let indexed = s.set_definition(&bin, &def)?;
        Ok((indexed, s.definition(&bin)?))
    })
    .await?;
    info!(bin = %name, keys = def.len(), documents = indexed, "index replaced");
    Ok((StatusCode::CREATED, Json(def.to_json())))
}

pub(crate) async fn index_values(
    State(state): State<AppState>,
    Path(bin): Path<String>,
    Query(params): Params,
) -> ApiResult<Json<Vec<Value>>> {
    let key = params
        .get("key")
        .filter(|k| !k.is_empty())
        .cloned()
        .ok_or_else(|| ApiError::bad_request("Key parameter missing"))?;
    Ok(Json(run(&state, move |s| s.index_values(&bin, &key)).await?))
}

async fn search(state: &AppState, bin: String, tree: Value) -> ApiResult<Json<Value>> {
    let hits = run(state, move |s| s.search(&bin, &tree)).await?;
    Ok(listing(hits.len(), hits))
}

pub(crate) async fn search_query(
    State(state): State<AppState>,
    Path(bin): Path<String>,
    Query(params): Params,
) -> ApiResult<Json<Value>> {
    search(&state, bin, tree_from_pairs(params)).await
}

pub(crate) async fn search_body(
    State(state): State<AppState>,
    Path(bin): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let tree = json_body(&body)?;
    search(&state, bin, tree).await
}

// ── Documents ───────────────────────────────────────────────────

pub(crate) async fn get_item(
    State(state): State<AppState>,
    Path((bin, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    Ok(Json(run(&state, move |s| s.get(&bin, &id)).await?))
}

pub(crate) async fn put_item(
    State(state): State<AppState>,
    Path((bin, id)): Path<(String, String)>,
    Query(params): Params,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let stamp = stamp_param(&params)?;
    let content = json_body(&body)?;
    let (id, current) = run(&state, move |s| {
        let id = s.put(&bin, &id, &content, stamp)?;
        // An older stamp can leave a newer tombstone current.
        let current = match s.get(&bin, &id) {
            Ok(current) => Some(current),
            Err(StorageError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        Ok((id, current))
    })
    .await?;
    let current = current.ok_or_else(|| ApiError::Internal(format!("Storing {id} failed")))?;
    Ok((StatusCode::CREATED, Json(json!({"id": id, "content": current}))))
}

pub(crate) async fn patch_item(
    State(state): State<AppState>,
    Path((bin, id)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let patch = json_body(&body)?;
    Ok(Json(run(&state, move |s| s.patch(&bin, &id, &patch)).await?))
}

pub(crate) async fn delete_item(
    State(state): State<AppState>,
    Path((bin, id)): Path<(String, String)>,
    Query(params): Params,
) -> ApiResult<StatusCode> {
    let stamp = stamp_param(&params)?;
    run(&state, move |s| s.soft_delete(&bin, &id, stamp)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn history(
    State(state): State<AppState>,
    Path((bin, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let records = run(&state, move |s| s.history(&bin, &id)).await?;
    Ok(Json(serde_json::to_value(records).map_err(StorageError::from)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn cutoff_from_date() {
        let stamp = cutoff(&params(&[("dt", "2024-03-01")])).unwrap();
        assert_eq!(stamp, Stamp::parse("2024-03-01T00:00:00Z").unwrap());
    }

    #[test]
    fn cutoff_date_wins_over_days() {
        let stamp = cutoff(&params(&[("dt", "2024-03-01"), ("days", "5")])).unwrap();
        assert_eq!(stamp, Stamp::parse("2024-03-01").unwrap());
    }

    #[test]
    fn cutoff_from_days_is_in_the_past() {
        let stamp = cutoff(&params(&[("days", "2")])).unwrap();
        assert!(stamp.is_before(&Stamp::now()));
    }

    #[test]
    fn cutoff_requires_a_parameter() {
        assert!(matches!(cutoff(&params(&[])), Err(ApiError::BadRequest(_))));
        assert!(matches!(cutoff(&params(&[("days", "soon")])), Err(ApiError::BadRequest(_))));
        assert!(matches!(cutoff(&params(&[("dt", "yesterday")])), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn flags_need_a_value() {
        let p = params(&[("full", "1"), ("index", "")]);
        assert!(flag(&p, "full"));
        assert!(!flag(&p, "index"));
        assert!(!flag(&p, "other"));
    }
}

use depot_types::{
    IndexDefinition, IndexKey, IndexValue, Operand, Operator, SummaryEntry, SyncSummary, Stamp,
    VersionRecord, VersionStatus,
};
use pretty_assertions::assert_eq;
use serde_json::json;

// ── Operator ──────────────────────────────────────────────────────

#[test]
fn operator_names_roundtrip() {
    for op in Operator::ALL {
        assert_eq!(op.as_str().parse::<Operator>().unwrap(), op);
        assert_eq!(serde_json::to_value(op).unwrap(), json!(op.as_str()));
    }
}

#[test]
fn unknown_operator_rejected() {
    assert!("between".parse::<Operator>().is_err());
}

fn stored(v: serde_json::Value) -> IndexValue {
    IndexValue::encode(Some(&v))
}

#[test]
fn comparison_operators_use_numeric_order() {
    let ten = stored(json!(10));
    let nine = Operand::for_operator(Operator::Gt, &json!(9));
    assert!(Operator::Gt.matches(&ten, &nine));
    assert!(Operator::Gte.matches(&ten, &Operand::for_operator(Operator::Gte, &json!(10))));
    assert!(!Operator::Lt.matches(&ten, &Operand::for_operator(Operator::Lt, &json!(10))));
    assert!(Operator::Lte.matches(&ten, &Operand::for_operator(Operator::Lte, &json!(10.0))));
}

#[test]
fn eq_and_in_list_compare_encoded_values() {
    let a = stored(json!("a"));
    assert!(Operator::Eq.matches(&a, &Operand::for_operator(Operator::Eq, &json!("a"))));
    assert!(Operator::InList.matches(&a, &Operand::for_operator(Operator::InList, &json!("a"))));
    let five = Operand::for_operator(Operator::Eq, &json!("5"));
    assert!(!Operator::Eq.matches(&stored(json!(5)), &five));
}

#[test]
fn pattern_operators_match_dequoted_values() {
    let name = stored(json!("Janssen"));
    assert!(Operator::Glob.matches(&name, &Operand::for_operator(Operator::Glob, &json!("Jan*"))));
    assert!(!Operator::Glob.matches(&name, &Operand::for_operator(Operator::Glob, &json!("jan*"))));
    assert!(Operator::Like.matches(&name, &Operand::for_operator(Operator::Like, &json!("jan%"))));
    let number = Operand::for_operator(Operator::Glob, &json!(123));
    assert!(Operator::Glob.matches(&stored(json!(123)), &number));
}

// ── IndexDefinition wire format ──────────────────────────────────

#[test]
fn definition_accepts_short_and_long_forms() {
    let def = IndexDefinition::from_json(&json!({
        "title": "/title",
        "tags": {"path": "/tags", "type": "in_list"},
        "year": {"path": "/year"}
    }))
    .unwrap();

    assert_eq!(def.len(), 3);
    assert_eq!(def.get("title"), Some(&IndexKey::new("title", "/title", Operator::Eq)));
    assert_eq!(def.get("tags").unwrap().operator, Operator::InList);
    assert_eq!(def.get("year").unwrap().operator, Operator::Eq);
}

#[test]
fn definition_keeps_declared_key_order() {
    let text = r#"{"zname": "/name", "age": {"path": "/age", "type": "gt"}}"#;
    let wire: serde_json::Value = serde_json::from_str(text).unwrap();
    let def = IndexDefinition::from_json(&wire).unwrap();
    let names: Vec<&str> = def.iter().map(|k| k.name.as_str()).collect();
    assert_eq!(names, vec!["zname", "age"]);
    assert_eq!(
        serde_json::to_string(&def).unwrap(),
        r#"{"zname":{"path":"/name","type":"eq"},"age":{"path":"/age","type":"gt"}}"#
    );
}

#[test]
fn definition_renders_long_form() {
    let def = IndexDefinition::new()
        .with_key("name", "/name", Operator::Like)
        .with_key("age", "/age", Operator::Gt);
    assert_eq!(
        def.to_json(),
        json!({
            "name": {"path": "/name", "type": "like"},
            "age": {"path": "/age", "type": "gt"}
        })
    );
    let back: IndexDefinition = serde_json::from_value(def.to_json()).unwrap();
    assert_eq!(back.len(), 2);
    assert_eq!(back.get("age"), def.get("age"));
}

#[test]
fn definition_rejects_bad_input() {
    assert!(IndexDefinition::from_json(&json!(["/a"])).is_err());
    assert!(IndexDefinition::from_json(&json!({"a": 1})).is_err());
    assert!(IndexDefinition::from_json(&json!({"a": {"type": "eq"}})).is_err());
    assert!(IndexDefinition::from_json(&json!({"a": {"path": "/a", "type": "near"}})).is_err());
    assert!(IndexDefinition::from_json(&json!({"a": "no-slash"})).is_err());
    assert!(IndexDefinition::from_json(&json!({"and": "/a"})).is_err());
}

#[test]
fn push_replaces_same_name() {
    let def = IndexDefinition::new()
        .with_key("k", "/a", Operator::Eq)
        .with_key("k", "/b", Operator::Lt);
    assert_eq!(def.len(), 1);
    assert_eq!(def.get("k").unwrap().path, "/b");
}

// ── Summary and history records ──────────────────────────────────

#[test]
fn summary_wire_format() {
    let mut summary = SyncSummary::new();
    summary.insert("notes", "1", SummaryEntry { stamp: Stamp::from_unix_secs(100), active: true });
    summary.insert("notes", "2", SummaryEntry { stamp: Stamp::from_unix_secs(200), active: false });

    assert_eq!(
        serde_json::to_value(&summary).unwrap(),
        json!({"notes": {
            "1": {"dttm": "1970-01-01T00:01:40.000000Z", "active": true},
            "2": {"dttm": "1970-01-01T00:03:20.000000Z", "active": false}
        }})
    );
    assert_eq!(summary.document_count(), 2);
    assert!(summary.contains_bin("notes"));
    assert!(!summary.entry("notes", "2").unwrap().active);
}

#[test]
fn summary_parses_peer_output() {
    let summary: SyncSummary = serde_json::from_value(json!({
        "x": {"1": {"dttm": "2022-12-16 10:00:00+00:00", "active": true}}
    }))
    .unwrap();
    assert_eq!(summary.bins().collect::<Vec<_>>(), vec!["x"]);
    assert_eq!(
        summary.entry("x", "1").unwrap().stamp,
        Stamp::parse("2022-12-16T10:00:00Z").unwrap()
    );
}

#[test]
fn version_record_uses_dttm_field() {
    let rec = VersionRecord {
        stamp: Stamp::from_unix_secs(0),
        active: false,
        content: serde_json::Value::Null,
    };
    let v = serde_json::to_value(&rec).unwrap();
    assert_eq!(v["dttm"], json!("1970-01-01T00:00:00.000000Z"));
    assert_eq!(v["content"], serde_json::Value::Null);
}

#[test]
fn version_status_codes() {
    assert_eq!(VersionStatus::Active.code(), "A");
    assert_eq!(VersionStatus::from_code("I"), VersionStatus::Inactive);
    assert!(VersionStatus::from_code("A").is_active());
}

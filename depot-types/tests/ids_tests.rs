use depot_types::{validate_name, DocId, Error};
use std::collections::HashSet;
use std::str::FromStr;

// ── DocId ─────────────────────────────────────────────────────────

#[test]
fn generated_ids_are_unique() {
    let ids: HashSet<DocId> = (0..100).map(|_| DocId::generate()).collect();
    assert_eq!(ids.len(), 100);
}

#[test]
fn generated_id_is_a_uuid() {
    let id = DocId::generate();
    assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
}

#[test]
fn parse_keeps_caller_id() {
    let id = DocId::parse("recipe-42").unwrap();
    assert_eq!(id.as_str(), "recipe-42");
    assert_eq!(id.to_string(), "recipe-42");
    assert_eq!(&*id, "recipe-42");
}

#[test]
fn from_str_matches_parse() {
    assert_eq!(DocId::from_str("x").unwrap(), DocId::parse("x").unwrap());
}

#[test]
fn or_generate_uses_given_id() {
    assert_eq!(DocId::or_generate(Some("abc")).unwrap().as_str(), "abc");
}

#[test]
fn or_generate_fills_blank_id() {
    let a = DocId::or_generate(None).unwrap();
    let b = DocId::or_generate(Some("")).unwrap();
    assert!(!a.is_empty());
    assert!(!b.is_empty());
    assert_ne!(a, b);
}

#[test]
fn serde_is_transparent() {
    let id = DocId::parse("doc1").unwrap();
    assert_eq!(serde_json::to_string(&id).unwrap(), r#""doc1""#);
    let back: DocId = serde_json::from_str(r#""doc1""#).unwrap();
    assert_eq!(back, id);
}

// ── Name validation ───────────────────────────────────────────────

#[test]
fn reserved_names_rejected() {
    for bad in ["", "_sync", "_index", "a/b"] {
        assert!(
            matches!(validate_name("bin", bad), Err(Error::InvalidName { kind: "bin", .. })),
            "{bad:?} should be rejected"
        );
        assert!(DocId::parse(bad).is_err());
    }
}

#[test]
fn ordinary_names_accepted() {
    for ok in ["notes", "pw-mgr", "a_b", "2024"] {
        assert!(validate_name("bin", ok).is_ok());
    }
}

use depot_storage::{tree_from_pairs, Store, StorageError};
use depot_types::{IndexDefinition, Operator};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn library() -> Store {
    let store = Store::open_in_memory().unwrap();
    let def = IndexDefinition::new()
        .with_key("author", "/author", Operator::Eq)
        .with_key("year", "/year", Operator::Gt)
        .with_key("before", "/year", Operator::Lt)
        .with_key("pages", "/pages", Operator::Lte)
        .with_key("min_pages", "/pages", Operator::Gte)
        .with_key("genre", "/genres", Operator::InList)
        .with_key("title", "/title", Operator::Glob)
        .with_key("title_like", "/title", Operator::Like);
    store.set_definition("books", &def).unwrap();

    let books = [
        (
            "dune",
            json!({"title": "Dune", "author": "Herbert", "year": 1965, "pages": 412,
                   "genres": ["scifi"]}),
        ),
        (
            "emma",
            json!({"title": "Emma", "author": "Austen", "year": 1815, "pages": 474,
                   "genres": ["romance", "classic"]}),
        ),
        (
            "pp",
            json!({"title": "Pride and Prejudice", "author": "Austen", "year": 1813, "pages": 279,
                   "genres": ["romance"]}),
        ),
        (
            "neu",
            json!({"title": "Neuromancer", "author": "Gibson", "year": 1984, "pages": 271,
                   "genres": ["scifi", "cyberpunk"]}),
        ),
    ];
    for (id, doc) in books {
        store.put("books", id, &doc, None).unwrap();
    }
    store
}

fn ids(store: &Store, tree: Value) -> Vec<String> {
    store.search("books", &tree).unwrap().into_keys().collect()
}

#[test]
fn eq_matches_exact_value() {
    assert_eq!(ids(&library(), json!({"author": "Austen"})), vec!["emma", "pp"]);
}

#[test]
fn comparisons_read_stored_op_request() {
    let store = library();
    assert_eq!(ids(&store, json!({"year": 1900})), vec!["dune", "neu"]);
    assert_eq!(ids(&store, json!({"before": 1815})), vec!["pp"]);
    assert_eq!(ids(&store, json!({"pages": 279})), vec!["neu", "pp"]);
    assert_eq!(ids(&store, json!({"min_pages": 412})), vec!["dune", "emma"]);
}

#[test]
fn numeric_comparison_is_numeric_not_lexical() {
    let store = Store::open_in_memory().unwrap();
    store
        .set_definition("n", &IndexDefinition::new().with_key("v", "/v", Operator::Gt))
        .unwrap();
    store.put("n", "nine", &json!({"v": 9}), None).unwrap();
    store.put("n", "ten", &json!({"v": 10}), None).unwrap();
    store.put("n", "float", &json!({"v": 9.5}), None).unwrap();
    let hits: Vec<String> = store.search("n", &json!({"v": 9})).unwrap().into_keys().collect();
    assert_eq!(hits, vec!["float", "ten"]);
}

#[test]
fn in_list_tests_membership() {
    let store = library();
    assert_eq!(ids(&store, json!({"genre": "romance"})), vec!["emma", "pp"]);
    assert_eq!(ids(&store, json!({"genre": "cyberpunk"})), vec!["neu"]);
}

#[test]
fn glob_and_like_match_dequoted_values() {
    let store = library();
    assert_eq!(ids(&store, json!({"title": "*man*"})), vec!["neu"]);
    assert_eq!(ids(&store, json!({"title": "?mma"})), vec!["emma"]);
    assert_eq!(ids(&store, json!({"title": "[DE]*"})), vec!["dune", "emma"]);
    assert!(ids(&store, json!({"title": "dune"})).is_empty());
    assert_eq!(ids(&store, json!({"title_like": "dune"})), vec!["dune"]);
    assert_eq!(ids(&store, json!({"title_like": "%and%"})), vec!["pp"]);
}

#[test]
fn and_intersects_and_or_unites() {
    let store = library();
    assert_eq!(ids(&store, json!({"and": {"author": "Austen", "year": 1814}})), vec!["emma"]);
    assert_eq!(ids(&store, json!({"author": "Austen", "year": 1814})), vec!["emma"]);
    assert_eq!(
        ids(&store, json!({"or": {"author": "Gibson", "genre": "classic"}})),
        vec!["emma", "neu"]
    );
    assert_eq!(
        ids(
            &store,
            json!({"or": {"author": "Herbert", "and": {"genre": "romance", "pages": 300}}})
        ),
        vec!["dune", "pp"]
    );
}

#[test]
fn search_returns_current_content() {
    let store = library();
    let messiah = json!({"title": "Dune Messiah", "author": "Herbert", "year": 1969});
    store.put("books", "dune", &messiah, None).unwrap();
    let hits = store.search("books", &json!({"author": "Herbert"})).unwrap();
    assert_eq!(hits["dune"]["title"], json!("Dune Messiah"));
}

#[test]
fn deleted_documents_never_match() {
    let store = library();
    store.soft_delete("books", "emma", None).unwrap();
    assert_eq!(ids(&store, json!({"author": "Austen"})), vec!["pp"]);
}

#[test]
fn undeclared_key_is_an_error() {
    let err = library().search("books", &json!({"isbn": "x"})).unwrap_err();
    assert!(matches!(err, StorageError::InvalidSearchKey(ref key) if key == "isbn"));
}

#[test]
fn empty_search_is_an_error() {
    assert!(matches!(
        library().search("books", &json!({})),
        Err(StorageError::EmptySearch)
    ));
}

#[test]
fn empty_connective_does_not_match_everything() {
    let store = library();
    for tree in [json!({"and": {}}), json!({"or": {}}), json!({"author": "Austen", "and": {}})] {
        assert!(matches!(store.search("books", &tree), Err(StorageError::EmptySearch)), "{tree}");
    }
}

#[test]
fn query_string_pairs_compare_as_strings() {
    let store = library();
    let hits: Vec<String> = store
        .search("books", &tree_from_pairs([("author", "Gibson")]))
        .unwrap()
        .into_keys()
        .collect();
    assert_eq!(hits, vec!["neu"]);
}

use sidenote_core::{
    AnnotationError, AnnotationKind, AnnotationPatch, NewAnnotation, SessionKey, StoreSnapshot,
    ValidationRule, MAX_CHILDREN,
};
use sidenote_storage::{AnnotationStore, FileSlots, MemorySlots, SlotStore, StoreError};

fn memory_store(key: &str) -> AnnotationStore<MemorySlots> {
    AnnotationStore::new(MemorySlots::new(), Some(SessionKey::from(key)))
}

fn rejection(err: StoreError) -> AnnotationError {
    match err {
        StoreError::Annotation(err) => err,
        StoreError::Storage(err) => panic!("unexpected storage error: {err}"),
    }
}

#[test]
fn first_root_and_child_limit() {
    let mut store = memory_store("claude-abc123");

    let root = store
        .create(NewAnnotation::root("Check the API limits", AnnotationKind::Todo))
        .expect("create root");
    assert_eq!(root.id, 1);
    assert_eq!(root.parent_id, None);
    assert_eq!(root.kind, AnnotationKind::Todo);
    assert!(!root.completed);
    assert!(!root.from_source);

    store
        .create(NewAnnotation::child(1, "sub-item", AnnotationKind::Finding))
        .expect("first child");
    for n in 0..MAX_CHILDREN - 1 {
        store
            .create(NewAnnotation::child(1, format!("child {n}"), AnnotationKind::Finding))
            .expect("child under limit");
    }
    let before = store.load().expect("load");

    let err = store
        .create(NewAnnotation::child(1, "one too many", AnnotationKind::Finding))
        .expect_err("21st child");
    assert_eq!(
        rejection(err),
        AnnotationError::ChildLimitReached { parent_id: 1 }
    );
    assert_eq!(store.load().expect("reload"), before);
}

#[test]
fn parent_rules_are_enforced() {
    let mut store = memory_store("chatgpt-c1");
    store
        .create(NewAnnotation::root("root", AnnotationKind::Finding))
        .expect("root");
    store
        .create(NewAnnotation::child(1, "child", AnnotationKind::Finding))
        .expect("child");

    let err = store
        .create(NewAnnotation::child(9, "lost", AnnotationKind::Todo))
        .expect_err("missing parent");
    assert_eq!(rejection(err), AnnotationError::ParentNotFound(9));

    let err = store
        .create(NewAnnotation::child(2, "grandchild", AnnotationKind::Todo))
        .expect_err("nested parent");
    assert_eq!(rejection(err), AnnotationError::NestedParent(2));
    assert_eq!(store.load().expect("load").len(), 2);
}

#[test]
fn ids_are_never_reused_and_children_are_promoted() {
    let mut store = memory_store("gemini-xyz");
    store
        .create(NewAnnotation::root("parent", AnnotationKind::Finding))
        .expect("parent");
    store
        .create(NewAnnotation::child(1, "kid a", AnnotationKind::Todo))
        .expect("kid a");
    store
        .create(NewAnnotation::child(1, "kid b", AnnotationKind::Question))
        .expect("kid b");

    assert!(store.remove(1).expect("remove parent"));
    assert!(!store.remove(1).expect("remove twice"));

    let snapshot = store.load().expect("load");
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.items.iter().all(|item| item.parent_id.is_none()));
    assert_eq!(snapshot.next_id, 4);

    let next = store
        .create(NewAnnotation::root("after removal", AnnotationKind::Todo))
        .expect("create after remove");
    assert_eq!(next.id, 4);
}

#[test]
fn replace_all_of_load_is_byte_identical() {
    let mut store = memory_store("claude-roundtrip");
    store
        .create(NewAnnotation::root("one", AnnotationKind::Todo))
        .expect("one");
    store
        .create(NewAnnotation::child(1, "two", AnnotationKind::Finding))
        .expect("two");
    store
        .update(2, &AnnotationPatch::completed(true))
        .expect("complete");

    let before = store.slots().raw("claude-roundtrip").map(str::to_string);
    let snapshot = store.load().expect("load");
    store.replace_all(&snapshot).expect("replace");
    let after = store.slots().raw("claude-roundtrip").map(str::to_string);
    assert_eq!(before, after);
}

#[test]
fn legacy_slot_is_migrated_on_load() {
    let legacy = r#"{"items":[
        {"id":1,"parentId":null,"content":"old","type":"todo","completed":false,"createdAt":"2024-01-01T00:00:00.000Z"},
        {"id":2,"parentId":null,"content":"captured","type":"finding","completed":false,"fromChat":true,"createdAt":"2024-01-01T00:00:00.000Z"}
    ],"nextId":3}"#;
    let key = SessionKey::from("claude-legacy");
    let mut slots = MemorySlots::new();
    slots.put(&key, legacy).expect("seed");
    let mut store = AnnotationStore::new(slots, Some(key));

    let snapshot = store.load().expect("load legacy");
    assert!(!snapshot.items[0].from_source);
    assert!(snapshot.items[1].from_source);

    store.replace_all(&snapshot).expect("persist migrated");
    let persisted = store
        .slots()
        .raw("claude-legacy")
        .expect("slot")
        .to_string();
    assert!(!persisted.contains("fromChat"));
    assert_eq!(store.load().expect("reload"), snapshot);
}

#[test]
fn rejected_import_leaves_store_unchanged() {
    let mut store = memory_store("claude-import");
    store
        .create(NewAnnotation::root("keep me", AnnotationKind::Finding))
        .expect("seed");
    let before = store.slots().raw("claude-import").map(str::to_string);

    let err = store.import_json("{ this is not json").expect_err("parse");
    assert!(matches!(
        rejection(err),
        AnnotationError::ImportParseFailure(_)
    ));

    let duplicate = r#"{"items":[
        {"id":1,"content":"a","type":"todo","fromSource":false},
        {"id":1,"content":"b","type":"todo","fromSource":false}
    ],"nextId":2}"#;
    let err = store.import_json(duplicate).expect_err("duplicate ids");
    match rejection(err) {
        AnnotationError::ImportRejected { rule, .. } => {
            assert_eq!(rule, ValidationRule::DuplicateId)
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(
        store.slots().raw("claude-import").map(str::to_string),
        before
    );
}

#[test]
fn import_replaces_and_reports() {
    let mut store = memory_store("claude-import-ok");
    store
        .create(NewAnnotation::root("old", AnnotationKind::Finding))
        .expect("seed");

    let payload = r#"{"items":[
        {"id":4,"parentId":null,"content":"imported","type":"question","completed":true,"createdAt":"2024-05-01T10:00:00.000Z"},
        {"id":7,"parentId":4,"content":"child","type":"todo","fromSource":true}
    ],"nextId":8}"#;
    let report = store.import_json(payload).expect("import");
    assert_eq!(report.records, 2);
    assert_eq!(report.backfilled, 1);

    let snapshot = store.load().expect("load");
    assert_eq!(snapshot.next_id, 8);
    assert_eq!(snapshot.get(7).and_then(|item| item.parent_id), Some(4));
    assert!(snapshot.get(1).is_none());

    let exported = store.export_json().expect("export");
    let (reparsed, _) = sidenote_core::parse_snapshot(&exported).expect("reparse");
    assert_eq!(reparsed, snapshot);
}

#[test]
fn sessions_are_isolated_and_switchable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = AnnotationStore::new(
        FileSlots::new(dir.path()),
        Some(SessionKey::from("claude-one")),
    );
    store
        .create(NewAnnotation::root("first session", AnnotationKind::Todo))
        .expect("create in one");

    store.set_key(Some(SessionKey::from("chatgpt-project-p-9/two")));
    assert_eq!(store.load().expect("load two"), StoreSnapshot::new());
    store
        .create(NewAnnotation::root("second session", AnnotationKind::Todo))
        .expect("create in two");

    store.set_key(Some(SessionKey::from("claude-one")));
    let snapshot = store.load().expect("load one");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.items[0].content, "first session");

    let reopened = AnnotationStore::new(
        FileSlots::new(dir.path()),
        Some(SessionKey::from("chatgpt-project-p-9/two")),
    );
    assert_eq!(
        reopened.load().expect("reopen").items[0].content,
        "second session"
    );
}

#[test]
fn maximal_next_id_import_fails_create_cleanly() {
    let mut store = memory_store("claude-maxid");
    let report = store
        .import_json(r#"{"items":[],"nextId":18446744073709551615}"#)
        .expect("import accepted");
    assert_eq!(report.records, 0);
    let before = store.slots().raw("claude-maxid").map(str::to_string);

    let err = store
        .create(NewAnnotation::root("a", AnnotationKind::Todo))
        .expect_err("id space exhausted");
    assert_eq!(rejection(err), AnnotationError::IdSpaceExhausted);
    assert_eq!(store.slots().raw("claude-maxid").map(str::to_string), before);
}

#[test]
fn import_accepts_kind_as_field_name() {
    let mut store = memory_store("claude-kind-alias");
    let payload = r#"{"items":[
        {"id":1,"parentId":null,"content":"aliased","kind":"todo","completed":false,"fromSource":false}
    ],"nextId":2}"#;
    store.import_json(payload).expect("import with kind");

    let snapshot = store.load().expect("load");
    assert_eq!(snapshot.items[0].kind, AnnotationKind::Todo);
    let persisted = store.slots().raw("claude-kind-alias").expect("slot");
    assert!(persisted.contains(r#""type":"todo""#));
}

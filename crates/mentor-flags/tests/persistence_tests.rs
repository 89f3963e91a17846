//! Flags persisted through the file backend

use mentor_flags::{names, ConsentRecord, FileBackend, FlagStore, Role};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

fn open(path: &Path) -> FlagStore {
    FlagStore::new(Arc::new(FileBackend::open(path).unwrap()))
}

#[test]
fn flags_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flags.json");

    {
        let store = open(&path);
        store.set(names::THEME, "dark");
        store.set(names::SIDEBAR_COLLAPSED, &true);
        store.set_role(Role::Mentee);
        store.record_consent(
            names::MENTOR_LEGAL_CONSENTS,
            "mentor_agreement",
            ConsentRecord::accepted("v1.0"),
        );
    }

    let store = open(&path);
    assert_eq!(store.get(names::THEME, String::new()), "dark");
    assert!(store.get(names::SIDEBAR_COLLAPSED, false));
    assert_eq!(store.role(), Role::Mentee);
    assert!(store.has_accepted(names::MENTOR_LEGAL_CONSENTS, "mentor_agreement", "v1.0"));
    assert!(store.get(names::MENTOR_AGREEMENT_ACCEPTED, false));
}

#[test]
fn removal_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flags.json");

    let store = open(&path);
    store.set(names::DEMO_MODE, &true);
    store.set(names::ONBOARDING_COMPLETE, &true);
    store.remove(names::DEMO_MODE);
    drop(store);

    let store = open(&path);
    assert_eq!(store.keys(), vec![names::ONBOARDING_COMPLETE.to_string()]);
}

#[test]
fn file_is_a_json_object_of_encoded_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flags.json");
    open(&path).set(names::THEME, "dark");

    let raw: BTreeMap<String, String> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw.get(names::THEME).map(String::as_str), Some("\"dark\""));
}

#[test]
fn hand_edited_value_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flags.json");
    std::fs::write(&path, r#"{ "sidebar_collapsed": "not json" }"#).unwrap();

    let store = open(&path);
    assert!(store.has(names::SIDEBAR_COLLAPSED));
    assert!(!store.get(names::SIDEBAR_COLLAPSED, false));
}

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 @._-]{0,24}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn set_then_get_is_deep_equal(name in "[a-z_]{1,16}", value in json_value()) {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir.path().join("flags.json"));
        prop_assert!(store.set(&name, &value));
        prop_assert_eq!(store.get(&name, Value::Null), value.clone());

        let reopened = open(&dir.path().join("flags.json"));
        prop_assert_eq!(reopened.try_get::<Value>(&name), Some(value));
    }
}

//! Exercises the optional `json` surface end to end: build a list, save it,
//! round-trip through `serde_json::Value`, and reload.

#![cfg(feature = "json")]

use idlist::{from_json, to_json, Identifier, IdentifierList};

#[test]
fn save_to_json_and_back_reconstructs_the_list() {
    let a = Identifier::new("alice", 0).unwrap();
    let list = IdentifierList::empty().insert_after(None, &a, 10).unwrap();
    let list = list.delete(&Identifier::new("alice", 3).unwrap());

    let records = list.save();
    let value = to_json(&records);
    assert!(value.is_array());

    let parsed = from_json(&value).unwrap();
    assert_eq!(parsed, records);

    let reloaded = IdentifierList::load(&parsed).unwrap();
    assert_eq!(
        reloaded.values_with_deleted().collect::<Vec<_>>(),
        list.values_with_deleted().collect::<Vec<_>>()
    );
}

#[test]
fn from_json_surfaces_malformed_entries() {
    let value = serde_json::json!([
        {"bunchId": "a", "startCounter": 0, "count": "not a number", "isDeleted": false}
    ]);
    assert!(from_json(&value).is_err());
}

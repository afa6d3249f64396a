use super::*;
use serde_json::json;

fn operator() -> UserProfile {
    UserProfile {
        id: Some(1),
        email: Some("a@b.com".into()),
        role: Some("X".into()),
        ..UserProfile::default()
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn authed_store() -> (SessionStore, MemoryPersistence) {
    let storage = MemoryPersistence::new();
    let mut store = SessionStore::new(storage.clone());
    store.set_auth("t", "r", operator());
    (store, storage)
}

// =============================================================================
// Defaults
// =============================================================================

#[test]
fn new_store_is_empty_and_uninitialized() {
    let store = SessionStore::new(MemoryPersistence::new());
    assert_eq!(store.snapshot(), &Session::default());
    assert!(!store.snapshot().initialized);
}

#[test]
fn new_store_does_not_write() {
    let storage = MemoryPersistence::new();
    let _store = SessionStore::new(storage.clone());
    assert!(storage.raw().is_none());
}

// =============================================================================
// set_auth / clear
// =============================================================================

#[test]
fn set_auth_establishes_session() {
    let (store, _) = authed_store();
    let s = store.snapshot();
    assert_eq!(s.token.as_deref(), Some("t"));
    assert_eq!(s.refresh.as_deref(), Some("r"));
    assert_eq!(s.user.as_ref().and_then(|u| u.email.as_deref()), Some("a@b.com"));
    assert!(s.is_authenticated);
    assert!(s.initialized);
    assert!(s.is_consistent());
}

#[test]
fn clear_after_set_auth_drops_credentials() {
    let (mut store, _) = authed_store();
    store.clear();
    let s = store.snapshot();
    assert!(!s.is_authenticated);
    assert!(s.token.is_none());
    assert!(s.refresh.is_none());
    assert!(s.user.is_none());
}

#[test]
fn clear_keeps_initialized() {
    let (mut store, _) = authed_store();
    store.clear();
    assert!(store.snapshot().initialized);
}

#[test]
fn clear_auth_and_logout_match_clear() {
    let (mut a, _) = authed_store();
    let (mut b, _) = authed_store();
    let (mut c, _) = authed_store();
    a.clear();
    b.clear_auth();
    c.logout();
    assert_eq!(a.snapshot(), b.snapshot());
    assert_eq!(a.snapshot(), c.snapshot());
}

#[test]
fn repeated_login_logout_cycles_end_logged_out() {
    let (mut store, _) = authed_store();
    for i in 0..5 {
        store.set_auth(format!("t{i}"), format!("r{i}"), operator());
        store.clear_auth();
        assert!(!store.snapshot().is_authenticated);
        assert!(store.token().is_none());
        assert!(store.snapshot().user.is_none());
    }
}

// =============================================================================
// Piecemeal mutations
// =============================================================================

#[test]
fn update_token_leaves_user_and_auth_flag() {
    let (mut store, _) = authed_store();
    store.update_token("t2");
    assert_eq!(store.token(), Some("t2"));
    assert_eq!(store.refresh_token(), Some("r"));
    assert!(store.snapshot().is_authenticated);
    assert_eq!(store.snapshot().user, Some(operator()));
}

#[test]
fn set_user_replaces_wholesale() {
    let (mut store, _) = authed_store();
    let replacement = UserProfile { email: Some("z@y.com".into()), ..UserProfile::default() };
    store.set_user(replacement.clone());
    assert_eq!(store.snapshot().user, Some(replacement));
}

#[test]
fn set_initialized_toggles_flag() {
    let mut store = SessionStore::new(MemoryPersistence::new());
    store.set_initialized(true);
    assert!(store.snapshot().initialized);
    store.set_initialized(false);
    assert!(!store.snapshot().initialized);
}

// =============================================================================
// update_user_profile
// =============================================================================

#[test]
fn update_profile_without_user_creates_it() {
    let mut store = SessionStore::new(MemoryPersistence::new());
    store.update_user_profile(&object(json!({ "x": 1 })));
    let user = serde_json::to_value(store.snapshot().user.as_ref().unwrap()).unwrap();
    assert_eq!(user, json!({ "x": 1 }));
}

#[test]
fn update_profile_shallow_merges() {
    let mut store = SessionStore::new(MemoryPersistence::new());
    store.update_user_profile(&object(json!({ "a": 1 })));
    store.update_user_profile(&object(json!({ "x": 1 })));
    let user = serde_json::to_value(store.snapshot().user.as_ref().unwrap()).unwrap();
    assert_eq!(user, json!({ "a": 1, "x": 1 }));
}

#[test]
fn update_profile_overwrites_known_fields() {
    let (mut store, _) = authed_store();
    store.update_user_profile(&object(json!({ "first_name": "Ana", "phone": "555" })));
    let user = store.snapshot().user.clone().unwrap();
    assert_eq!(user.first_name.as_deref(), Some("Ana"));
    assert_eq!(user.phone.as_deref(), Some("555"));
    assert_eq!(user.email.as_deref(), Some("a@b.com"));
    assert_eq!(user.id, Some(1));
}

#[test]
fn update_profile_null_clears_field() {
    let (mut store, _) = authed_store();
    store.update_user_profile(&object(json!({ "role": null })));
    assert!(store.snapshot().user.as_ref().unwrap().role.is_none());
}

#[test]
fn update_profile_mistyped_known_field_keeps_base_value() {
    let (mut store, _) = authed_store();
    store.update_user_profile(&object(json!({ "id": "not-a-number", "phone": "555" })));
    let user = store.snapshot().user.clone().unwrap();
    assert_eq!(user.id, Some(1));
    assert!(user.extra.get("id").is_none());
    assert_eq!(user.phone.as_deref(), Some("555"));
    assert_eq!(user.email.as_deref(), Some("a@b.com"));
}

#[test]
fn update_profile_mistyped_field_still_restores_from_storage() {
    let (mut store, storage) = authed_store();
    store.update_user_profile(&object(json!({ "id": "7", "is_verified": "yes", "nickname": "ana" })));

    let restored = SessionStore::restore(MemoryPersistence::with_raw(storage.raw().unwrap()));
    assert_eq!(restored.snapshot(), store.snapshot());
    assert!(restored.snapshot().is_authenticated);
    assert_eq!(restored.token(), Some("t"));
    let user = restored.snapshot().user.clone().unwrap();
    assert_eq!(user.id, Some(1));
    assert_eq!(user.extra.get("nickname"), Some(&json!("ana")));
}

#[test]
fn update_profile_mistyped_field_without_base_is_dropped() {
    let mut store = SessionStore::new(MemoryPersistence::new());
    store.update_user_profile(&object(json!({ "id": "7", "x": 1 })));
    let user = serde_json::to_value(store.snapshot().user.as_ref().unwrap()).unwrap();
    assert_eq!(user, json!({ "x": 1 }));
}

// =============================================================================
// restore_session
// =============================================================================

#[test]
fn restore_session_requires_token_and_user() {
    let cases = [
        (None, None, false),
        (Some("t"), None, false),
        (None, Some(operator()), false),
        (Some("t"), Some(operator()), true),
    ];
    for (token, user, expected) in cases {
        let mut store = SessionStore::new(MemoryPersistence::new());
        if let Some(token) = token {
            store.update_token(token);
        }
        if let Some(user) = user.clone() {
            store.set_user(user);
        }
        assert_eq!(store.restore_session(), expected, "token={token:?} user={}", user.is_some());
    }
}

#[test]
fn restore_session_false_after_clear() {
    let (mut store, _) = authed_store();
    assert!(store.restore_session());
    store.clear();
    assert!(!store.restore_session());
}

// =============================================================================
// Write-through persistence
// =============================================================================

#[test]
fn every_mutation_writes_current_snapshot() {
    let (mut store, storage) = authed_store();
    assert_eq!(decode_snapshot(&storage.raw().unwrap()).as_ref(), Some(store.snapshot()));

    store.update_token("t2");
    assert_eq!(decode_snapshot(&storage.raw().unwrap()).as_ref(), Some(store.snapshot()));

    store.update_user_profile(&object(json!({ "phone": "1" })));
    assert_eq!(decode_snapshot(&storage.raw().unwrap()).as_ref(), Some(store.snapshot()));

    store.clear();
    assert_eq!(decode_snapshot(&storage.raw().unwrap()).as_ref(), Some(store.snapshot()));
}

#[test]
fn persisted_round_trip_into_fresh_store() {
    let (original, storage) = authed_store();
    let restored = SessionStore::restore(MemoryPersistence::with_raw(storage.raw().unwrap()));
    assert_eq!(restored.snapshot(), original.snapshot());
}

#[test]
fn persisted_shape_uses_envelope_and_field_names() {
    let (_, storage) = authed_store();
    let raw: Value = serde_json::from_str(&storage.raw().unwrap()).unwrap();
    assert_eq!(raw["version"], json!(STORAGE_VERSION));
    let state = &raw["state"];
    assert_eq!(state["token"], "t");
    assert_eq!(state["refresh"], "r");
    assert_eq!(state["isAuthenticated"], true);
    assert_eq!(state["initialized"], true);
    assert_eq!(state["user"], json!({ "id": 1, "email": "a@b.com", "role": "X" }));
}

// =============================================================================
// restore
// =============================================================================

#[test]
fn restore_from_empty_storage_marks_initialized() {
    let storage = MemoryPersistence::new();
    let store = SessionStore::restore(storage.clone());
    assert!(store.snapshot().initialized);
    assert!(!store.snapshot().is_authenticated);
    assert!(storage.raw().is_some());
}

#[test]
fn restore_from_garbage_is_empty_session() {
    let store = SessionStore::restore(MemoryPersistence::with_raw("{not json"));
    assert!(!store.restore_session());
    assert!(store.snapshot().initialized);
}

#[test]
fn restore_rejects_other_versions() {
    let raw = json!({ "state": { "token": "t", "user": { "id": 1 }, "isAuthenticated": true }, "version": 7 });
    let store = SessionStore::restore(MemoryPersistence::with_raw(raw.to_string()));
    assert!(store.token().is_none());
}

#[test]
fn restore_rejects_authenticated_without_token() {
    let raw = json!({ "state": { "user": { "id": 1 }, "isAuthenticated": true }, "version": 0 });
    let store = SessionStore::restore(MemoryPersistence::with_raw(raw.to_string()));
    assert!(!store.snapshot().is_authenticated);
    assert!(store.snapshot().user.is_none());
}

#[test]
fn restore_fills_missing_fields_with_defaults() {
    let raw = json!({ "state": { "token": "t" } });
    let store = SessionStore::restore(MemoryPersistence::with_raw(raw.to_string()));
    assert_eq!(store.token(), Some("t"));
    assert!(store.refresh_token().is_none());
    assert!(!store.snapshot().is_authenticated);
}

// =============================================================================
// Failing adapter
// =============================================================================

struct BrokenStorage;

impl SessionPersistence for BrokenStorage {
    fn load(&self) -> Result<Option<String>, PersistError> {
        Err(std::io::Error::other("disk gone").into())
    }

    fn save(&self, _raw: &str) -> Result<(), PersistError> {
        Err(std::io::Error::other("disk gone").into())
    }
}

#[test]
fn broken_storage_never_surfaces_errors() {
    let mut store = SessionStore::restore(BrokenStorage);
    assert!(store.snapshot().initialized);
    store.set_auth("t", "r", operator());
    assert!(store.restore_session());
    store.clear();
    assert!(!store.restore_session());
}

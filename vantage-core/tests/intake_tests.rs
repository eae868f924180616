// Tests for scope-filtered name intake

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use vantage_core::error::DispatchError;
use vantage_core::{
    AssetPayload, AssetStore, Discovery, Dispatcher, DomainScope, Fqdn, Intake, LogDispatcher,
    MemoryStore, RecordWriter, Resolver, Scope,
};

#[derive(Default)]
struct CollectingDispatcher {
    events: Mutex<Vec<Discovery>>,
}

impl CollectingDispatcher {
    fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.name.to_string())
            .collect()
    }
}

impl Dispatcher for CollectingDispatcher {
    fn dispatch(&self, event: Discovery) -> Result<(), DispatchError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

struct FailingDispatcher;

impl Dispatcher for FailingDispatcher {
    fn dispatch(&self, _event: Discovery) -> Result<(), DispatchError> {
        Err(DispatchError("queue closed".to_string()))
    }
}

struct DenyAll;

impl Scope for DenyAll {
    fn is_in_scope(&self, _name: &str) -> bool {
        false
    }
}

fn is_recorded(store: &MemoryStore, name: &str) -> bool {
    !store
        .find_by_content(
            &AssetPayload::Fqdn(Fqdn::new(name).unwrap()),
            DateTime::<Utc>::MIN_UTC,
        )
        .unwrap()
        .is_empty()
}

// ============================================================================
// Submission Tests
// ============================================================================

#[test]
fn test_submit_in_scope_names() {
    let store = MemoryStore::new();
    let scope = DomainScope::new(["example.com"]);
    let dispatcher = CollectingDispatcher::default();
    let intake = Intake::new(&store, &scope, &dispatcher, "sitedossier");

    let recorded = intake.submit_names([
        "www.example.com",
        " API.Example.com ",
        "www.example.org",
        "",
        "www.example.com",
    ]);

    assert_eq!(recorded.len(), 2);
    assert_eq!(dispatcher.names(), vec!["www.example.com", "api.example.com"]);
    assert!(is_recorded(&store, "api.example.com"));
    assert!(!is_recorded(&store, "www.example.org"));

    let events = dispatcher.events.lock().unwrap();
    assert!(events.iter().all(|e| e.source == "sitedossier"));
    assert_eq!(events[0].asset.id, recorded[0].id);
}

#[test]
fn test_submit_nothing_in_scope() {
    let store = MemoryStore::new();
    let dispatcher = CollectingDispatcher::default();
    let intake = Intake::new(&store, &DenyAll, &dispatcher, "wayback");

    let recorded = intake.submit_names(["www.example.com"]);

    assert!(recorded.is_empty());
    assert!(dispatcher.names().is_empty());
    assert_eq!(store.asset_count().unwrap(), 0);
}

#[test]
fn test_dispatch_failure_still_records() {
    let store = MemoryStore::new();
    let scope = DomainScope::new(["example.com"]);
    let intake = Intake::new(&store, &scope, &FailingDispatcher, "wayback");

    let recorded = intake.submit_names(["a.example.com", "b.example.com"]);

    assert_eq!(recorded.len(), 2);
    assert!(is_recorded(&store, "a.example.com"));
    assert!(is_recorded(&store, "b.example.com"));
}

#[test]
fn test_resubmission_is_idempotent() {
    let store = MemoryStore::new();
    let scope = DomainScope::new(["example.com"]);
    let intake = Intake::new(&store, &scope, &LogDispatcher, "wayback");

    let first = intake.submit_names(["www.example.com"]);
    let second = intake.submit_names(["www.example.com"]);

    assert_eq!(first[0].id, second[0].id);
    assert_eq!(store.asset_count().unwrap(), 1);
}

#[test]
fn test_submit_root_dot_names_share_one_asset() {
    let store = MemoryStore::new();
    let scope = DomainScope::new(["example.com."]);
    let dispatcher = CollectingDispatcher::default();
    let intake = Intake::new(&store, &scope, &dispatcher, "sitedossier");

    let recorded = intake.submit_names(["www.example.com.", "www.example.com"]);

    assert_eq!(recorded.len(), 1);
    assert_eq!(dispatcher.names(), vec!["www.example.com"]);
    assert_eq!(store.asset_count().unwrap(), 1);

    RecordWriter::new(&store)
        .upsert_a("www.example.com.", "192.0.2.1")
        .unwrap();
    let pairs = Resolver::new(&store)
        .resolve_addresses(["www.example.com"], DateTime::<Utc>::MIN_UTC)
        .unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].fqdn.as_str(), "www.example.com");
    assert_eq!(store.asset_count().unwrap(), 2);
}

#[test]
fn test_empty_scope_accepts_nothing() {
    let scope = DomainScope::default();
    assert!(scope.is_empty());
    assert!(!scope.is_in_scope("example.com"));
}

// Tests for the SQLite-backed asset store

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;
use vantage_core::{
    AddressFamily, AssetId, AssetPayload, AssetStore, Fqdn, GraphError, ManualClock,
    MemoryStore, RecordWriter, RelationType, Resolver, SqliteStore, StoreError,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn create_test_db() -> (TempDir, ManualClock, SqliteStore) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let clock = ManualClock::new(t0());
    let store = SqliteStore::open_with_clock(&db_path, Arc::new(clock.clone())).unwrap();
    (temp_dir, clock, store)
}

fn name(value: &str) -> AssetPayload {
    AssetPayload::Fqdn(Fqdn::new(value).unwrap())
}

// ============================================================================
// Database Creation Tests
// ============================================================================

#[test]
fn test_database_creation() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let store = SqliteStore::open(&db_path);
    assert!(store.is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_database_exists_and_remove() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    assert!(!SqliteStore::exists(&db_path));
    drop(SqliteStore::open(&db_path).unwrap());
    assert!(SqliteStore::exists(&db_path));

    SqliteStore::remove(&db_path).unwrap();
    assert!(!SqliteStore::exists(&db_path));
}

#[test]
fn test_remove_missing_database_fails() {
    let temp_dir = TempDir::new().unwrap();
    let result = SqliteStore::remove(&temp_dir.path().join("missing.db"));
    assert!(matches!(result, Err(StoreError::Io(_))));
}

#[test]
fn test_reopen_preserves_graph() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    {
        let store = SqliteStore::open(&db_path).unwrap();
        let writer = RecordWriter::new(&store);
        writer.upsert_cname("www.example.com", "edge.example.net").unwrap();
        writer.upsert_a("edge.example.net", "192.0.2.44").unwrap();
    }

    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.asset_count().unwrap(), 3);
    assert_eq!(store.relation_count().unwrap(), 2);

    let pairs = Resolver::new(&store)
        .resolve_addresses(["www.example.com"], DateTime::<Utc>::MIN_UTC)
        .unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].addr.to_string(), "192.0.2.44");
}

// ============================================================================
// Asset Tests
// ============================================================================

#[test]
fn test_create_and_find_by_content() {
    let (_temp_dir, _clock, store) = create_test_db();
    let created = store.create(None, name("www.example.com")).unwrap();

    let found = store.find_by_content(&name("www.example.com"), t0()).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, created.id);
    assert_eq!(found[0].created_at, t0());

    assert!(
        store
            .find_by_content(&name("other.example.com"), t0())
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_find_by_id_respects_cutoff() {
    let (_temp_dir, _clock, store) = create_test_db();
    let created = store.create(None, name("www.example.com")).unwrap();

    assert_eq!(store.find_by_id(created.id, t0()).unwrap(), created);
    assert!(matches!(
        store.find_by_id(created.id, t0() + Duration::seconds(1)),
        Err(StoreError::AssetNotFound(_))
    ));
    assert!(matches!(
        store.find_by_id(AssetId(9999), t0()),
        Err(StoreError::AssetNotFound(AssetId(9999)))
    ));
}

#[test]
fn test_recreate_refreshes_last_seen() {
    let (_temp_dir, clock, store) = create_test_db();
    let first = store.create(None, name("www.example.com")).unwrap();

    clock.advance(Duration::minutes(10));
    let second = store.create(None, name("WWW.example.com")).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.created_at, t0());
    assert_eq!(second.last_seen, t0() + Duration::minutes(10));
    assert_eq!(store.asset_count().unwrap(), 1);
}

#[test]
fn test_address_family_round_trip() {
    let (_temp_dir, _clock, store) = create_test_db();
    let writer = RecordWriter::new(&store);
    let v4 = writer.upsert_address("93.184.216.34").unwrap();
    let v6 = writer
        .upsert_address("2606:2800:220:1:248:1893:25c8:1946")
        .unwrap();

    let v4 = store.find_by_id(v4.id, t0()).unwrap();
    let v6 = store.find_by_id(v6.id, t0()).unwrap();
    assert_eq!(
        v4.payload.as_ip_address().unwrap().family,
        AddressFamily::IPv4
    );
    assert_eq!(
        v6.payload.as_ip_address().unwrap().family,
        AddressFamily::IPv6
    );
}

#[test]
fn test_create_with_unknown_parent_fails() {
    let (_temp_dir, _clock, store) = create_test_db();
    let ghost = store.create(None, name("ghost.example.com")).unwrap();
    let ghost = vantage_core::Asset {
        id: AssetId(ghost.id.0 + 100),
        ..ghost
    };

    let result = store.create(
        Some((&ghost, RelationType::CnameRecord)),
        name("target.example.com"),
    );
    assert!(matches!(result, Err(StoreError::AssetNotFound(_))));
    assert_eq!(store.asset_count().unwrap(), 1);
}

// ============================================================================
// Relation Tests
// ============================================================================

#[test]
fn test_upsert_a_twice_single_edge() {
    let (_temp_dir, clock, store) = create_test_db();
    let writer = RecordWriter::new(&store);

    let first = writer.upsert_a("a.example.com", "93.184.216.34").unwrap();
    clock.advance(Duration::seconds(5));
    let second = writer.upsert_a("a.example.com", "93.184.216.34").unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(store.asset_count().unwrap(), 2);
    assert_eq!(store.relation_count().unwrap(), 1);

    let owner = store
        .find_by_content(&name("a.example.com"), t0())
        .unwrap()
        .remove(0);
    let rels = store
        .outgoing_relations(&owner, t0(), &[RelationType::ARecord, RelationType::AaaaRecord])
        .unwrap();
    assert_eq!(rels.len(), 1);
    assert_eq!(rels[0].relation_type, RelationType::ARecord);
    assert_eq!(rels[0].created_at, t0());
    assert_eq!(rels[0].last_seen, t0() + Duration::seconds(5));
}

#[test]
fn test_outgoing_relations_filters_and_orders() {
    let (_temp_dir, clock, store) = create_test_db();
    let writer = RecordWriter::new(&store);

    writer.upsert_cname("www.example.com", "late.example.net").unwrap();
    clock.set(t0() - Duration::minutes(1));
    writer.upsert_cname("www.example.com", "early.example.net").unwrap();
    clock.set(t0() + Duration::minutes(1));
    writer.upsert_a("www.example.com", "192.0.2.1").unwrap();

    let owner = store
        .find_by_content(&name("www.example.com"), DateTime::<Utc>::MIN_UTC)
        .unwrap()
        .remove(0);

    let aliases = store
        .outgoing_relations(&owner, DateTime::<Utc>::MIN_UTC, &[RelationType::CnameRecord])
        .unwrap();
    assert_eq!(aliases.len(), 2);
    assert!(aliases[0].created_at < aliases[1].created_at);
    let first_target = store.find_by_id(aliases[0].to, DateTime::<Utc>::MIN_UTC).unwrap();
    assert_eq!(first_target.payload.content(), "early.example.net");

    let recent = store
        .outgoing_relations(&owner, t0(), &[RelationType::CnameRecord, RelationType::ARecord])
        .unwrap();
    assert_eq!(recent.len(), 2);
    assert!(
        recent
            .iter()
            .all(|r| r.relation_type != RelationType::CnameRecord || r.last_seen >= t0())
    );
}

// ============================================================================
// End-to-End Resolution Tests
// ============================================================================

#[test]
fn test_resolution_on_sqlite() {
    let (_temp_dir, clock, store) = create_test_db();
    let writer = RecordWriter::new(&store);
    writer
        .upsert_srv("_https._tcp.example.com", "www.example.com")
        .unwrap();
    writer.upsert_cname("www.example.com", "edge.example.net").unwrap();
    writer.upsert_a("edge.example.net", "192.0.2.1").unwrap();
    writer.upsert_aaaa("edge.example.net", "2001:db8::1").unwrap();

    let pairs = Resolver::new(&store)
        .resolve_addresses(["_https._tcp.example.com", "www.example.com"], t0())
        .unwrap();
    assert_eq!(pairs.len(), 4);

    clock.advance(Duration::hours(1));
    writer.upsert_a("edge.example.net", "192.0.2.2").unwrap();

    // Only the freshly observed edge is new; the query names were not re-observed
    let result = Resolver::new(&store).resolve_addresses(
        ["www.example.com"],
        t0() + Duration::minutes(30),
    );
    assert!(matches!(result, Err(GraphError::NoNames)));

    let pairs = Resolver::new(&store)
        .resolve_addresses(["edge.example.net"], t0() + Duration::minutes(30))
        .unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].addr.to_string(), "192.0.2.2");
}

#[test]
fn test_long_chain_on_sqlite() {
    let (_temp_dir, _clock, store) = create_test_db();
    let writer = RecordWriter::new(&store);
    for i in 0..15 {
        writer
            .upsert_cname(&format!("h{}.example.com", i), &format!("h{}.example.com", i + 1))
            .unwrap();
    }
    writer.upsert_a("h15.example.com", "192.0.2.15").unwrap();

    let result = Resolver::new(&store).resolve_addresses(["h0.example.com"], t0());
    assert!(matches!(result, Err(GraphError::NoPairs)));
}

// ============================================================================
// Backend Agreement Tests
// ============================================================================

#[test]
fn test_sub_microsecond_cutoff_matches_memory_store() {
    let created = t0() + Duration::nanoseconds(500);
    let clock = ManualClock::new(created);
    let temp_dir = TempDir::new().unwrap();
    let sqlite = SqliteStore::open_with_clock(
        &temp_dir.path().join("test.db"),
        Arc::new(clock.clone()),
    )
    .unwrap();
    let memory = MemoryStore::with_clock(Arc::new(clock));

    let stores: [(&str, &dyn AssetStore); 2] = [("sqlite", &sqlite), ("memory", &memory)];
    for (backend, store) in stores {
        RecordWriter::new(store)
            .upsert_a("www.example.com", "192.0.2.1")
            .unwrap();
        let resolver = Resolver::new(store);

        // Same instant as the write, and within the same microsecond
        for since in [created, t0(), t0() + Duration::nanoseconds(999)] {
            let pairs = resolver.resolve_addresses(["www.example.com"], since);
            assert_eq!(pairs.map(|p| p.len()).ok(), Some(1), "{} at {}", backend, since);
        }

        let later = t0() + Duration::microseconds(1);
        let result = resolver.resolve_addresses(["www.example.com"], later);
        assert!(
            matches!(result, Err(GraphError::NoNames)),
            "{} at {}",
            backend,
            later
        );
    }
}

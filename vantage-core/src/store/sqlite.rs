use crate::clock::{Clock, SystemClock};
use crate::error::{StoreError, StoreResult};
use crate::model::{
    AddressFamily, Asset, AssetId, AssetPayload, Fqdn, IpAddress, Relation, RelationId,
    RelationType,
};
use crate::store::{AssetStore, relation_order};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Asset store persisted in a SQLite database file
pub struct SqliteStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

type AssetRow = (i64, String, String, Option<String>, i64, i64);
type RelationRow = (i64, String, i64, i64, i64, i64);

const ASSET_COLUMNS: &str = "id, asset_type, content, address_family, created_at, last_seen";

/// Timestamps, stored and compared, at microsecond precision
fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn from_micros(micros: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {}", micros)))
}

fn asset_from_row(row: AssetRow) -> StoreResult<Asset> {
    let (id, asset_type, content, family, created_at, last_seen) = row;

    let payload = match asset_type.as_str() {
        "fqdn" => AssetPayload::Fqdn(
            Fqdn::new(&content).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        ),
        "ip_address" => {
            let address: IpAddr = content
                .parse()
                .map_err(|_| StoreError::Corrupt(format!("bad address {:?}", content)))?;
            let ip = IpAddress::from(address);
            if family.as_deref().and_then(AddressFamily::from_str) != Some(ip.family) {
                return Err(StoreError::Corrupt(format!(
                    "address {} stored with family {:?}",
                    content, family
                )));
            }
            AssetPayload::IpAddress(ip)
        }
        other => return Err(StoreError::Corrupt(format!("unknown asset type {:?}", other))),
    };

    Ok(Asset {
        id: AssetId(id),
        payload,
        created_at: from_micros(created_at)?,
        last_seen: from_micros(last_seen)?,
    })
}

fn relation_from_row(row: RelationRow) -> StoreResult<Relation> {
    let (id, relation_type, from, to, created_at, last_seen) = row;
    Ok(Relation {
        id: RelationId(id),
        relation_type: RelationType::from_str(&relation_type).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown relation type {:?}", relation_type))
        })?,
        from: AssetId(from),
        to: AssetId(to),
        created_at: from_micros(created_at)?,
        last_seen: from_micros(last_seen)?,
    })
}

fn select_asset_by_content(conn: &Connection, payload: &AssetPayload) -> StoreResult<Option<Asset>> {
    let row: Option<AssetRow> = conn
        .query_row(
            &format!(
                "SELECT {} FROM assets WHERE asset_type = ?1 AND content = ?2",
                ASSET_COLUMNS
            ),
            params![payload.kind(), payload.content()],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )
        .optional()?;
    row.map(asset_from_row).transpose()
}

fn select_asset_by_id(conn: &Connection, id: AssetId) -> StoreResult<Option<Asset>> {
    let row: Option<AssetRow> = conn
        .query_row(
            &format!("SELECT {} FROM assets WHERE id = ?1", ASSET_COLUMNS),
            params![id.0],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )
        .optional()?;
    row.map(asset_from_row).transpose()
}

impl SqliteStore {
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn remove(path: &Path) -> StoreResult<()> {
        fs::remove_file(path)?;
        Ok(())
    }

    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    pub fn open_with_clock(path: &Path, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        info!("Opened asset database at {}", path.display());
        Self::from_connection(conn, clock)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open_in_memory_with_clock(Arc::new(SystemClock))
    }

    pub fn open_in_memory_with_clock(clock: Arc<dyn Clock>) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::from_connection(conn, clock)
    }

    fn from_connection(conn: Connection, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        let store = SqliteStore {
            conn: Mutex::new(conn),
            clock,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.lock()?.execute_batch(
            "
-- Graph nodes: one row per distinct name or address
CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    asset_type TEXT NOT NULL CHECK(asset_type IN ('fqdn', 'ip_address')),
    content TEXT NOT NULL,        -- normalized name or canonical address
    address_family TEXT CHECK(address_family IN ('IPv4', 'IPv6')),
    created_at INTEGER NOT NULL,  -- unix micros
    last_seen INTEGER NOT NULL,   -- unix micros

    UNIQUE(asset_type, content)
);

CREATE INDEX IF NOT EXISTS idx_assets_last_seen ON assets(last_seen);

-- Graph edges: DNS records linking assets
CREATE TABLE IF NOT EXISTS relations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    relation_type TEXT NOT NULL CHECK(relation_type IN (
        'cname_record',
        'srv_record',
        'a_record',
        'aaaa_record',
        'ns_record',
        'mx_record',
        'ptr_record'
    )),
    from_asset_id INTEGER NOT NULL,
    to_asset_id INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    last_seen INTEGER NOT NULL,

    FOREIGN KEY(from_asset_id) REFERENCES assets(id) ON DELETE CASCADE,
    FOREIGN KEY(to_asset_id) REFERENCES assets(id) ON DELETE CASCADE,
    UNIQUE(from_asset_id, to_asset_id, relation_type)
);

CREATE INDEX IF NOT EXISTS idx_relations_from ON relations(from_asset_id, relation_type);
CREATE INDEX IF NOT EXISTS idx_relations_to ON relations(to_asset_id);
            ",
        )?;
        Ok(())
    }

    pub fn asset_count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM assets", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn relation_count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM relations", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl AssetStore for SqliteStore {
    fn find_by_content(
        &self,
        payload: &AssetPayload,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<Asset>> {
        let since = to_micros(since);
        let conn = self.lock()?;
        Ok(select_asset_by_content(&conn, payload)?
            .filter(|asset| to_micros(asset.last_seen) >= since)
            .into_iter()
            .collect())
    }

    fn find_by_id(&self, id: AssetId, since: DateTime<Utc>) -> StoreResult<Asset> {
        let since = to_micros(since);
        let conn = self.lock()?;
        select_asset_by_id(&conn, id)?
            .filter(|asset| to_micros(asset.last_seen) >= since)
            .ok_or(StoreError::AssetNotFound(id))
    }

    fn outgoing_relations(
        &self,
        asset: &Asset,
        since: DateTime<Utc>,
        types: &[RelationType],
    ) -> StoreResult<Vec<Relation>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, relation_type, from_asset_id, to_asset_id, created_at, last_seen
             FROM relations
             WHERE from_asset_id = ?1 AND last_seen >= ?2
             ORDER BY created_at, to_asset_id, id",
        )?;

        let rows = stmt
            .query_map(params![asset.id.0, to_micros(since)], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<RelationRow>>>()?;

        let mut rels = Vec::with_capacity(rows.len());
        for row in rows {
            let rel = relation_from_row(row)?;
            if types.contains(&rel.relation_type) {
                rels.push(rel);
            }
        }
        rels.sort_by(relation_order);
        Ok(rels)
    }

    fn create(
        &self,
        parent: Option<(&Asset, RelationType)>,
        payload: AssetPayload,
    ) -> StoreResult<Asset> {
        let now = to_micros(self.clock.now());
        let family = payload.as_ip_address().map(|ip| ip.family.as_str());

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if let Some((parent, _)) = parent
            && select_asset_by_id(&tx, parent.id)?.is_none()
        {
            return Err(StoreError::AssetNotFound(parent.id));
        }

        tx.execute(
            "INSERT INTO assets (asset_type, content, address_family, created_at, last_seen)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(asset_type, content) DO UPDATE SET last_seen = excluded.last_seen",
            params![payload.kind(), payload.content(), family, now],
        )?;

        let asset = select_asset_by_content(&tx, &payload)?.ok_or_else(|| {
            StoreError::Other(format!("asset {} vanished after insert", payload.content()))
        })?;

        if let Some((parent, relation_type)) = parent {
            tx.execute(
                "INSERT INTO relations (relation_type, from_asset_id, to_asset_id, created_at, last_seen)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(from_asset_id, to_asset_id, relation_type) DO UPDATE SET last_seen = excluded.last_seen",
                params![relation_type.as_str(), parent.id.0, asset.id.0, now],
            )?;
        }

        tx.commit()?;
        debug!("Upserted {} {} as asset {}", payload.kind(), payload.content(), asset.id);
        Ok(asset)
    }
}

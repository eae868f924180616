pub mod addr;
pub mod alias;
pub mod clock;
pub mod error;
pub mod intake;
pub mod model;
pub mod resolve;
pub mod store;
pub mod upsert;
pub mod walk;

pub use alias::AliasChainResolver;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{GraphError, Result, StoreError};
pub use intake::{Discovery, Dispatcher, DomainScope, Intake, LogDispatcher, Scope};
pub use model::{
    AddressFamily, Asset, AssetId, AssetPayload, Fqdn, IpAddress, NameAddrPair, Relation,
    RelationId, RelationType,
};
pub use resolve::{Resolver, ResolverOptions};
pub use store::{AssetStore, memory::MemoryStore, sqlite::SqliteStore};
pub use upsert::RecordWriter;
pub use walk::{BoundedWalk, DEFAULT_MAX_HOPS, WalkOutcome};

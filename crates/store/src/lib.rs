//! # EMPI Store (`store`)
//!
//! Relational data model and pluggable key-value persistence for the
//! identity-resolution engine: every table in [`entities`], derived-key
//! computation in [`keys`], the generic `query_records` path in
//! [`query`], and the single monotonic [`IdMinter`].
//!
//! ## Backend
//!
//! Persistence is behind a [`StoreBackend`] trait (`put`/`get`/`delete`/
//! `scan`/`batch_put`), analogous to the index crate this engine grew
//! out of. The shipped default is [`MemoryBackend`], a `RwLock`-guarded
//! `BTreeMap`; an embedded Redb backend is available behind the
//! `backend-redb` feature as an extension point but is not required by
//! any tested property of this engine.
//!
//! ## Example
//!
//! ```
//! use store::{BackendConfig, Store};
//!
//! let store = Store::new(BackendConfig::in_memory()).unwrap();
//! let etl_id = store.minter().mint("demo-user", "v1").unwrap();
//! assert!(etl_id > 0);
//! ```

mod backend;
mod entities;
mod error;
mod keys;
mod minter;
mod query;
mod store;

pub use backend::{BackendConfig, MemoryBackend, StoreBackend};
#[cfg(feature = "backend-redb")]
pub use backend::redb::RedbBackend;
pub use entities::*;
pub use error::StoreError;
pub use keys::{
    composite_key, composite_name, composite_name_day_postal_code, compute_uq_hash,
    RawDemographicFields, HASH_KEYS,
};
pub use minter::IdMinter;
pub use query::{Entity, TABLE_NAMES};
pub use store::Store;

//! Rule store
//!
//! The single piece of shared mutable state in ruleforge. It holds the
//! static catalogue, synthesized rules with their review state, and the
//! knowledge entries rules point at.
//!
//! ## Consistency
//!
//! The store keeps its state behind `RwLock<Arc<StoreState>>`. Every
//! mutation builds a private copy, validates it, and swaps the `Arc` in one
//! step, so a reader either sees the state before a mutation or after it.
//! Readers get an `Arc` to an immutable state and are never affected by
//! later mutations.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ruleforge_store::{RuleStore, JsonFileBackend};
//!
//! let store = RuleStore::new();
//! store.load_static(rules, entries)?;
//! store.upsert_dynamic(rule)?;
//! store.set_review_status(&id, ReviewStatus::Approved)?;
//! store.persist(&JsonFileBackend::new(".ruleforge/state.json"))?;
//! ```

pub mod error;
pub mod state;
pub mod store;
pub mod backend;
pub mod persist;

pub use error::StoreError;
pub use state::{CompiledRule, StoreState};
pub use store::{RuleStore, UpsertOutcome};
pub use backend::{BackendError, JsonFileBackend, MemoryBackend, StoreBackend};
pub use persist::{PersistedState, StoreDocument, FORMAT_VERSION};

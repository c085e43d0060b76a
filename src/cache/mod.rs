//! Derived-state aggregation and cache-consistency layer.
//!
//! The one shared mutable resource in this subsystem is the
//! [`store::QueryCache`]; everything else is either a pure computation
//! over it ([`aggregate`]) or a coordinator that writes through it
//! ([`mutation`]).

pub mod aggregate;
pub mod invalidation;
pub mod key;
pub mod mutation;
pub mod store;

pub use aggregate::Aggregator;
pub use invalidation::MutationKind;
pub use key::{KeyPattern, ResourceKey};
pub use mutation::MutationCoordinator;
pub use store::{CacheEntry, EntryStatus, QueryCache, Subscription};

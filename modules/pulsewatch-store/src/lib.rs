//! Persistence layer: the [`TrendStore`] trait, the Postgres
//! implementation, and an in-memory store for tests.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryTrendStore;
pub use postgres::PgTrendStore;
pub use store::{Baselines, PipelineRunRecord, TrendFilters, TrendSnapshot, TrendStore};

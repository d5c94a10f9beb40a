//! Storage adapters for sales.
//!
//! - [`InMemorySaleRepository`] for tests, benchmarks and embedded use
//! - [`PostgresSaleRepository`] backed by `sqlx`, with [`StoreConfig`] for
//!   environment-driven connection settings

pub mod config;
pub mod memory;
pub mod postgres;

pub use config::StoreConfig;
pub use memory::InMemorySaleRepository;
pub use postgres::PostgresSaleRepository;

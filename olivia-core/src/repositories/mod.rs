// src/repositories/mod.rs

pub mod memory;
pub mod postgres;

pub use memory::catalog::{CatalogSeed, InMemoryCatalog};
pub use postgres::catalog::PostgresCatalogRepository;
pub use postgres::enrollment::PostgresEnrollmentRepository;

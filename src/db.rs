pub mod schema_store;
pub use schema_store::SchemaStore;
pub mod schema_repo;
pub use schema_repo::PgSchemaStore;
pub mod memory_store;
pub use memory_store::InMemorySchemaStore;

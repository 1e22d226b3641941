// src/db/schema_store.rs

use async_trait::async_trait;

use crate::{
    common::error::AppError,
    models::schema::{SchemaDocument, SchemaSeed},
};

/// Persistência dos documentos de schema: um por (tenant, tipo de registro).
///
/// `save` é um compare-and-swap sobre `revision`: grava `fields` e
/// `required_fields` numa única escrita e só se ninguém salvou antes.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Leitura pura, sem efeito colateral.
    async fn find_one(
        &self,
        tenant_id: &str,
        record_type: &str,
    ) -> Result<Option<SchemaDocument>, AppError>;

    /// Insere o documento na revisão 1. `Conflict` se a chave já existir.
    async fn create_default(
        &self,
        tenant_id: &str,
        record_type: &str,
        seed: SchemaSeed,
    ) -> Result<SchemaDocument, AppError>;

    /// Devolve o documento salvo, já com `revision + 1`.
    /// `SchemaNotFound` se sumiu, `ConcurrentModification` se a revisão andou.
    async fn save(&self, document: &SchemaDocument) -> Result<SchemaDocument, AppError>;

    async fn list_for_tenant(&self, tenant_id: &str) -> Result<Vec<SchemaDocument>, AppError>;
}

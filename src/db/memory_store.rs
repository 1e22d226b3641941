// src/db/memory_store.rs

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::schema_store::SchemaStore,
    models::schema::{SchemaDocument, SchemaSeed},
};

type DocumentKey = (String, String);

/// Store em memória. Usado quando não há DATABASE_URL e nos testes.
/// O lock de escrita cobre o compare-and-swap inteiro.
#[derive(Clone, Default)]
pub struct InMemorySchemaStore {
    documents: Arc<RwLock<HashMap<DocumentKey, SchemaDocument>>>,
}

impl InMemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(tenant_id: &str, record_type: &str) -> DocumentKey {
    (tenant_id.to_string(), record_type.to_string())
}

#[async_trait]
impl SchemaStore for InMemorySchemaStore {
    async fn find_one(
        &self,
        tenant_id: &str,
        record_type: &str,
    ) -> Result<Option<SchemaDocument>, AppError> {
        let documents = self.documents.read().await;
        Ok(documents.get(&key(tenant_id, record_type)).cloned())
    }

    async fn create_default(
        &self,
        tenant_id: &str,
        record_type: &str,
        seed: SchemaSeed,
    ) -> Result<SchemaDocument, AppError> {
        let mut documents = self.documents.write().await;
        let doc_key = key(tenant_id, record_type);

        if documents.contains_key(&doc_key) {
            return Err(AppError::Conflict(format!(
                "já existe um schema '{}' para o tenant '{}'",
                record_type, tenant_id
            )));
        }

        let now = Utc::now();
        let document = SchemaDocument {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            record_type: record_type.to_string(),
            title: seed.title,
            origin: seed.origin,
            fields: seed.fields,
            required_fields: seed.required_fields,
            revision: 1,
            created_at: now,
            updated_at: now,
        };
        documents.insert(doc_key, document.clone());

        Ok(document)
    }

    async fn save(&self, document: &SchemaDocument) -> Result<SchemaDocument, AppError> {
        let mut documents = self.documents.write().await;

        let current = documents
            .get_mut(&key(&document.tenant_id, &document.record_type))
            .filter(|current| current.id == document.id)
            .ok_or_else(|| AppError::SchemaNotFound {
                tenant_id: document.tenant_id.clone(),
                record_type: document.record_type.clone(),
            })?;

        if current.revision != document.revision {
            return Err(AppError::ConcurrentModification {
                tenant_id: document.tenant_id.clone(),
                record_type: document.record_type.clone(),
            });
        }

        current.fields = document.fields.clone();
        current.required_fields = document.required_fields.clone();
        current.revision += 1;
        current.updated_at = Utc::now();

        Ok(current.clone())
    }

    async fn list_for_tenant(&self, tenant_id: &str) -> Result<Vec<SchemaDocument>, AppError> {
        let documents = self.documents.read().await;
        let mut found: Vec<SchemaDocument> = documents
            .values()
            .filter(|doc| doc.tenant_id == tenant_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.record_type.cmp(&b.record_type));
        Ok(found)
    }
}

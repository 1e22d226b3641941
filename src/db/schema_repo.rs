// src/db/schema_repo.rs

use std::{collections::BTreeMap, future::Future, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::schema_store::SchemaStore,
    models::schema::{FieldDefinition, SchemaDocument, SchemaOrigin, SchemaSeed},
};

// Erros transitórios (conexão caiu, pool esgotado) só são repetidos em leituras:
// um INSERT/UPDATE pode ter sido aplicado mesmo com a resposta perdida.
const READ_RETRIES: u32 = 1;
const WRITE_RETRIES: u32 = 0;
const BASE_BACKOFF: Duration = Duration::from_millis(100);

const DOCUMENT_COLUMNS: &str = "id, tenant_id, record_type, title, origin, fields, \
                                required_fields, revision, created_at, updated_at";

// A linha como ela vem do Postgres
#[derive(Debug, FromRow)]
struct SchemaDocumentRow {
    id: Uuid,
    tenant_id: String,
    record_type: String,
    title: String,
    origin: String,
    fields: Json<BTreeMap<String, FieldDefinition>>,
    required_fields: Vec<String>,
    revision: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SchemaDocumentRow> for SchemaDocument {
    type Error = AppError;

    fn try_from(row: SchemaDocumentRow) -> Result<Self, Self::Error> {
        let origin = SchemaOrigin::parse(&row.origin).ok_or_else(|| {
            AppError::InternalServerError(anyhow::anyhow!(
                "origem desconhecida '{}' no documento {}",
                row.origin,
                row.id
            ))
        })?;

        Ok(SchemaDocument {
            id: row.id,
            tenant_id: row.tenant_id,
            record_type: row.record_type,
            title: row.title,
            origin,
            fields: row.fields.0,
            required_fields: row.required_fields,
            revision: row.revision,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn is_transient(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

// Executa a operação, repetindo até `retries` vezes com backoff exponencial se o erro for transitório
async fn with_retry<T, F, Fut>(operation: &str, retries: u32, mut run: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt: u32 = 0;
    loop {
        match run().await {
            Ok(value) => return Ok(value),
            Err(e) if is_transient(&e) => {
                if attempt >= retries {
                    return Err(AppError::StorageUnavailable(format!("{}: {}", operation, e)));
                }
                let delay = BASE_BACKOFF * 2u32.pow(attempt);
                tracing::warn!(
                    "⚠️ Falha transitória em {} ({}). Nova tentativa em {:?}",
                    operation,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

// O repositório de schemas, responsável por todas as interações com a tabela 'schema_documents'
#[derive(Clone)]
pub struct PgSchemaStore {
    pool: PgPool,
}

impl PgSchemaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaStore for PgSchemaStore {
    async fn find_one(
        &self,
        tenant_id: &str,
        record_type: &str,
    ) -> Result<Option<SchemaDocument>, AppError> {
        let pool = &self.pool;
        let sql = format!(
            "SELECT {} FROM schema_documents WHERE tenant_id = $1 AND record_type = $2",
            DOCUMENT_COLUMNS
        );

        let row = with_retry("find_one", READ_RETRIES, || {
            sqlx::query_as::<_, SchemaDocumentRow>(&sql)
                .bind(tenant_id)
                .bind(record_type)
                .fetch_optional(pool)
        })
        .await?;

        row.map(SchemaDocument::try_from).transpose()
    }

    async fn create_default(
        &self,
        tenant_id: &str,
        record_type: &str,
        seed: SchemaSeed,
    ) -> Result<SchemaDocument, AppError> {
        let pool = &self.pool;
        let id = Uuid::new_v4();
        let sql = format!(
            "INSERT INTO schema_documents (id, tenant_id, record_type, title, origin, fields, required_fields, revision) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 1) \
             RETURNING {}",
            DOCUMENT_COLUMNS
        );

        let row = with_retry("create_default", WRITE_RETRIES, || {
            sqlx::query_as::<_, SchemaDocumentRow>(&sql)
                .bind(id)
                .bind(tenant_id)
                .bind(record_type)
                .bind(&seed.title)
                .bind(seed.origin.as_str())
                .bind(Json(&seed.fields))
                .bind(seed.required_fields.clone())
                .fetch_one(pool)
        })
        .await
        .map_err(|e| {
            // Converte erro de violação de chave única em um erro mais amigável
            if let AppError::DatabaseError(sqlx::Error::Database(db_err)) = &e {
                if db_err.is_unique_violation() {
                    return AppError::Conflict(format!(
                        "já existe um schema '{}' para o tenant '{}'",
                        record_type, tenant_id
                    ));
                }
            }
            e
        })?;

        SchemaDocument::try_from(row)
    }

    async fn save(&self, document: &SchemaDocument) -> Result<SchemaDocument, AppError> {
        let pool = &self.pool;
        // Uma única instrução: fields e required_fields nunca ficam dessincronizados
        let sql = format!(
            "UPDATE schema_documents \
             SET fields = $1, required_fields = $2, revision = revision + 1, updated_at = NOW() \
             WHERE id = $3 AND revision = $4 \
             RETURNING {}",
            DOCUMENT_COLUMNS
        );

        let updated = with_retry("save", WRITE_RETRIES, || {
            sqlx::query_as::<_, SchemaDocumentRow>(&sql)
                .bind(Json(&document.fields))
                .bind(document.required_fields.clone())
                .bind(document.id)
                .bind(document.revision)
                .fetch_optional(pool)
        })
        .await?;

        if let Some(row) = updated {
            return SchemaDocument::try_from(row);
        }

        // Nada foi atualizado: ou o documento sumiu, ou alguém salvou antes
        let still_exists = with_retry("save/check", READ_RETRIES, || {
            sqlx::query_scalar::<_, i64>("SELECT revision FROM schema_documents WHERE id = $1")
                .bind(document.id)
                .fetch_optional(pool)
        })
        .await?;

        match still_exists {
            Some(_) => Err(AppError::ConcurrentModification {
                tenant_id: document.tenant_id.clone(),
                record_type: document.record_type.clone(),
            }),
            None => Err(AppError::SchemaNotFound {
                tenant_id: document.tenant_id.clone(),
                record_type: document.record_type.clone(),
            }),
        }
    }

    async fn list_for_tenant(&self, tenant_id: &str) -> Result<Vec<SchemaDocument>, AppError> {
        let pool = &self.pool;
        let sql = format!(
            "SELECT {} FROM schema_documents WHERE tenant_id = $1 ORDER BY record_type ASC",
            DOCUMENT_COLUMNS
        );

        let rows = with_retry("list_for_tenant", READ_RETRIES, || {
            sqlx::query_as::<_, SchemaDocumentRow>(&sql)
                .bind(tenant_id)
                .fetch_all(pool)
        })
        .await?;

        rows.into_iter().map(SchemaDocument::try_from).collect()
    }
}

// src/config.rs

pub mod templates;

use std::{collections::HashMap, env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    config::templates::TemplateCatalog,
    db::{InMemorySchemaStore, PgSchemaStore, SchemaStore},
    services::{
        schema_registry::SchemaRegistry,
        webhook_service::{EventDispatcher, WebhookDispatcher, WebhookRoutes},
    },
};

const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 5;
const WEBHOOK_URL_PREFIX: &str = "WEBHOOK_URL_";

/// Tudo o que vem do ambiente (.env ou variáveis de verdade).
#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub database_url: Option<String>,
    pub templates_path: Option<String>,
    pub webhook_routes: WebhookRoutes,
    pub webhook_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let webhook_timeout = match env::var("WEBHOOK_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("WEBHOOK_TIMEOUT_SECS inválido: '{}'", raw))?,
            Err(_) => DEFAULT_WEBHOOK_TIMEOUT_SECS,
        };

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| DEFAULT_SERVER_ADDR.to_string()),
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            templates_path: env::var("SCHEMA_TEMPLATES_PATH").ok().filter(|v| !v.is_empty()),
            webhook_routes: webhook_routes_from(env::vars()),
            webhook_timeout: Duration::from_secs(webhook_timeout),
        })
    }
}

// WEBHOOK_URL_CONTACTS=https://... vira a rota do tipo "contacts"
fn webhook_routes_from(vars: impl Iterator<Item = (String, String)>) -> WebhookRoutes {
    let mut by_record_type = HashMap::new();
    let mut fallback_url = None;

    for (key, value) in vars {
        if value.is_empty() {
            continue;
        }
        if key == "WEBHOOK_CUSTOM_URL" {
            fallback_url = Some(value);
        } else if let Some(record_type) = key.strip_prefix(WEBHOOK_URL_PREFIX) {
            by_record_type.insert(record_type.to_lowercase(), value);
        }
    }

    WebhookRoutes {
        by_record_type,
        fallback_url,
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub schema_registry: SchemaRegistry,
    pub dispatcher: Arc<dyn EventDispatcher>,
    // Só existe quando o store é o Postgres
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let templates = match &settings.templates_path {
            Some(path) => {
                let catalog = TemplateCatalog::load(path)?;
                tracing::info!("✅ Templates carregados de {}", path);
                catalog
            }
            None => TemplateCatalog::builtin(),
        };

        let (store, db_pool): (Arc<dyn SchemaStore>, Option<PgPool>) = match &settings.database_url {
            Some(database_url) => {
                // Conecta ao banco de dados, usando '?' para propagar erros
                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
                (Arc::new(PgSchemaStore::new(pool.clone())), Some(pool))
            }
            None => {
                tracing::warn!("⚠️ DATABASE_URL não definida: usando store em memória (dados somem ao reiniciar)");
                (Arc::new(InMemorySchemaStore::new()), None)
            }
        };

        // --- Monta o gráfico de dependências ---
        let schema_registry = SchemaRegistry::new(store, templates);
        let dispatcher = WebhookDispatcher::new(settings.webhook_routes.clone(), settings.webhook_timeout)?;

        Ok(Self {
            schema_registry,
            dispatcher: Arc::new(dispatcher),
            db_pool,
        })
    }

    /// Estado montado à mão (testes, ferramentas).
    pub fn from_parts(schema_registry: SchemaRegistry, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        Self {
            schema_registry,
            dispatcher,
            db_pool: None,
        }
    }
}

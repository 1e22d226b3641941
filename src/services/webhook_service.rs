// src/services/webhook_service.rs

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::Client;

use crate::{common::error::AppError, models::forms::RecordEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered { url: String },
    // Nenhuma URL configurada para esse tipo
    Skipped,
}

/// Encaminha eventos de registro para fora. Falhar aqui nunca desfaz nada:
/// quem chama transforma o erro em aviso.
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    async fn send_event(&self, event: &RecordEvent) -> Result<DispatchOutcome, AppError>;
}

/// Tabela de roteamento: URL por tipo de registro e uma URL para o resto
/// (objetos customizados e tipos padrão sem URL própria).
#[derive(Debug, Clone, Default)]
pub struct WebhookRoutes {
    pub by_record_type: HashMap<String, String>,
    pub fallback_url: Option<String>,
}

impl WebhookRoutes {
    pub fn resolve(&self, event: &RecordEvent) -> Option<&str> {
        if event.instance_key.is_none() {
            if let Some(url) = self.by_record_type.get(&event.record_type) {
                return Some(url);
            }
        }
        self.fallback_url.as_deref()
    }
}

#[derive(Clone)]
pub struct WebhookDispatcher {
    client: Client,
    routes: WebhookRoutes,
}

impl WebhookDispatcher {
    pub fn new(routes: WebhookRoutes, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, routes })
    }
}

#[async_trait]
impl EventDispatcher for WebhookDispatcher {
    async fn send_event(&self, event: &RecordEvent) -> Result<DispatchOutcome, AppError> {
        let Some(url) = self.routes.resolve(event) else {
            tracing::debug!(
                "Nenhum webhook configurado para '{}', evento ignorado",
                event.record_type
            );
            return Ok(DispatchOutcome::Skipped);
        };

        let response = self
            .client
            .post(url)
            .json(event)
            .send()
            .await
            .map_err(|e| AppError::WebhookDelivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::WebhookDelivery(format!("{} respondeu {}", url, status)));
        }

        tracing::info!("📨 Evento '{}' entregue em {}", event.record_type, url);
        Ok(DispatchOutcome::Delivered { url: url.to_string() })
    }
}

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::net::TcpListener;

use crm_schema::{
    app,
    common::error::AppError,
    config::templates::TemplateCatalog,
    db::InMemorySchemaStore,
    models::forms::RecordEvent,
    services::{
        schema_registry::SchemaRegistry,
        webhook_service::{DispatchOutcome, EventDispatcher},
    },
    AppState,
};

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Sobe o app inteiro numa porta livre, com store em memória e templates padrão.
pub async fn spawn_app(dispatcher: Arc<dyn EventDispatcher>) -> TestServer {
    let registry = SchemaRegistry::new(Arc::new(InMemorySchemaStore::new()), TemplateCatalog::builtin());
    let state = AppState::from_parts(registry, dispatcher);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.expect("server");
    });

    TestServer {
        base_url: format!("http://{}", addr),
        client: reqwest::Client::new(),
    }
}

/// Guarda os eventos recebidos; opcionalmente falha em todos.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub events: Mutex<Vec<RecordEvent>>,
    pub fail: bool,
}

impl RecordingDispatcher {
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<RecordEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventDispatcher for RecordingDispatcher {
    async fn send_event(&self, event: &RecordEvent) -> Result<DispatchOutcome, AppError> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(AppError::WebhookDelivery("endpoint fora do ar".into()));
        }
        Ok(DispatchOutcome::Delivered {
            url: "memory://".into(),
        })
    }
}

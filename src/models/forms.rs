// src/models/forms.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

// --- DIRETÓRIO DE FORMULÁRIOS ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    Default,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormDefinition {
    #[schema(example = "contacts")]
    pub form_id: String,

    #[schema(example = "Contacts")]
    pub form_title: String,

    #[serde(rename = "type")]
    pub kind: FormKind,
}

// --- EVENTOS (O que vai para o webhook) ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,

    pub record_type: String,
    pub tenant_id: String,

    #[schema(value_type = Object)]
    pub record: Map<String, Value>,

    // Só vai preenchido para objetos customizados
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_key: Option<String>,
}

// Resposta de uma submissão aceita
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    #[schema(value_type = Object)]
    pub record: Map<String, Value>,

    // Falhas não-fatais (ex.: webhook fora do ar)
    pub warnings: Vec<String>,
}

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use validator::ValidationErrorsKind;

use crate::{middleware::i18n::Locale, services::form_validator::SubmissionErrors};

// Nosso tipo de erro de domínio. O `Display` (thiserror) vai em português para os logs;
// a mensagem para o cliente sai de `message(lang)`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Schema de '{record_type}' não encontrado para o tenant '{tenant_id}'")]
    SchemaNotFound { tenant_id: String, record_type: String },

    #[error("Campo '{0}' não encontrado")]
    FieldNotFound(String),

    #[error("Tipo de registro desconhecido: '{0}'")]
    UnknownRecordType(String),

    #[error("O campo '{0}' já existe")]
    DuplicateField(String),

    #[error("Conflito: {0}")]
    Conflict(String),

    #[error("O schema de '{record_type}' (tenant '{tenant_id}') foi alterado por outra requisição")]
    ConcurrentModification { tenant_id: String, record_type: String },

    #[error("Campo inválido: {0}")]
    InvalidField(String),

    #[error("Submissão inválida")]
    SubmissionInvalid(#[from] SubmissionErrors),

    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Payload malformado: {0}")]
    Transport(String),

    #[error("Armazenamento indisponível: {0}")]
    StorageUnavailable(String),

    #[error("Falha ao entregar webhook: {0}")]
    WebhookDelivery(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Transport(rejection.body_text())
    }
}

impl AppError {
    /// Código estável, legível por máquina.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::SchemaNotFound { .. } => "schema_not_found",
            AppError::FieldNotFound(_) => "field_not_found",
            AppError::UnknownRecordType(_) => "unknown_record_type",
            AppError::DuplicateField(_) => "duplicate_field",
            AppError::Conflict(_) => "conflict",
            AppError::ConcurrentModification { .. } => "concurrent_modification",
            AppError::InvalidField(_) => "invalid_field",
            AppError::SubmissionInvalid(_) => "validation_error",
            AppError::ValidationError(_) => "validation_error",
            AppError::Transport(_) => "transport_error",
            AppError::StorageUnavailable(_) => "storage_unavailable",
            AppError::WebhookDelivery(_) => "webhook_delivery_failed",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::SchemaNotFound { .. }
            | AppError::FieldNotFound(_)
            | AppError::UnknownRecordType(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateField(_)
            | AppError::Conflict(_)
            | AppError::ConcurrentModification { .. } => StatusCode::CONFLICT,
            AppError::InvalidField(_)
            | AppError::SubmissionInvalid(_)
            | AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Transport(_) => StatusCode::BAD_REQUEST,
            AppError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::WebhookDelivery(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Mensagem para humanos, no idioma pedido ("pt" ou inglês como padrão).
    pub fn message(&self, lang: &str) -> String {
        if lang == "pt" {
            return match self {
                AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                    "Ocorreu um erro inesperado.".to_string()
                }
                AppError::ValidationError(_) | AppError::SubmissionInvalid(_) => {
                    "Um ou mais campos são inválidos.".to_string()
                }
                other => other.to_string(),
            };
        }

        match self {
            AppError::SchemaNotFound { tenant_id, record_type } => format!(
                "No '{}' schema exists yet for tenant '{}'.",
                record_type, tenant_id
            ),
            AppError::FieldNotFound(name) => format!("Field '{}' does not exist.", name),
            AppError::UnknownRecordType(rt) => format!("Unknown record type '{}'.", rt),
            AppError::DuplicateField(name) => format!("Field '{}' already exists.", name),
            AppError::Conflict(msg) => format!("Conflict: {}", msg),
            AppError::ConcurrentModification { record_type, .. } => format!(
                "The '{}' schema was modified concurrently; retry with a fresh read.",
                record_type
            ),
            AppError::InvalidField(msg) => format!("Invalid field: {}", msg),
            AppError::SubmissionInvalid(_) | AppError::ValidationError(_) => {
                "One or more fields are invalid.".to_string()
            }
            AppError::Transport(msg) => format!("Malformed payload: {}", msg),
            AppError::StorageUnavailable(_) => {
                "Storage is temporarily unavailable.".to_string()
            }
            AppError::WebhookDelivery(msg) => format!("Webhook delivery failed: {}", msg),
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                "An unexpected error occurred.".to_string()
            }
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::SubmissionInvalid(errors) => Some(errors.to_details()),
            AppError::ValidationError(errors) => Some(validation_details(errors)),
            _ => None,
        }
    }

    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("🔥 Erro Interno do Servidor: {} ({:?})", self, self);
        }

        ApiError {
            status,
            error: self.code().to_string(),
            message: self.message(&locale.0),
            details: self.details(),
        }
    }
}

// Achata os erros do validator num objeto; payloads aninhados viram objetos aninhados.
fn validation_details(errors: &validator::ValidationErrors) -> Value {
    let mut details = serde_json::Map::new();
    for (field, kind) in errors.errors() {
        let value = match kind {
            ValidationErrorsKind::Field(field_errors) => json!(
                field_errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect::<Vec<String>>()
            ),
            ValidationErrorsKind::Struct(inner) => validation_details(inner),
            ValidationErrorsKind::List(items) => Value::Object(
                items
                    .iter()
                    .map(|(index, inner)| (index.to_string(), validation_details(inner)))
                    .collect(),
            ),
        };
        details.insert(field.to_string(), value);
    }
    Value::Object(details)
}

// O erro já pronto para a fronteira HTTP
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        err.to_api_error(&Locale::default())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

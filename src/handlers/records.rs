// src/handlers/records.rs

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::forms::{EventType, RecordEvent, SubmissionReceipt},
    services::{form_validator, schema_codec},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitRecordPayload {
    #[serde(default)]
    #[schema(value_type = Object, example = json!({"id": "c-1", "name": "Bob", "email": "bob@acme.io"}))]
    pub values: Map<String, Value>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteRecordPayload {
    // O registro como o cliente o conhecia; vai intacto no evento
    #[schema(value_type = Object, example = json!({"id": "c-1"}))]
    pub record: Map<String, Value>,
}

// Defaults para o que o cliente não mandou, depois validação no servidor
async fn prepare_record(
    app_state: &AppState,
    locale: &Locale,
    record_type: &str,
    tenant_id: &str,
    mut values: Map<String, Value>,
) -> Result<Map<String, Value>, ApiError> {
    let document = app_state
        .schema_registry
        .get_or_seed(tenant_id, record_type)
        .await
        .map_err(|app_err| app_err.to_api_error(locale))?;
    let schema = schema_codec::encode(&document);

    form_validator::apply_defaults(&schema, &mut values);
    form_validator::validate_submission(&schema, &values)
        .map_err(|errors| AppError::from(errors).to_api_error(locale))?;

    Ok(values)
}

// Monta o evento e manda para o webhook: falha vira aviso, nunca erro
async fn forward(
    app_state: &AppState,
    locale: &Locale,
    event_type: EventType,
    record_type: String,
    tenant_id: String,
    record: Map<String, Value>,
) -> SubmissionReceipt {
    let is_custom = app_state.schema_registry.is_custom_record_type(&record_type);
    let event = RecordEvent {
        event_type,
        instance_key: is_custom.then(|| record_type.clone()),
        record_type,
        tenant_id,
        record,
    };

    let mut warnings = Vec::new();
    if let Err(e) = app_state.dispatcher.send_event(&event).await {
        tracing::warn!(
            "⚠️ Webhook de '{}' falhou para o tenant '{}': {}",
            event.record_type,
            event.tenant_id,
            e
        );
        warnings.push(e.message(&locale.0));
    }

    SubmissionReceipt {
        record: event.record,
        warnings,
    }
}

// POST /api/records/{recordType}/{tenantId}
#[utoipa::path(
    post,
    path = "/api/records/{recordType}/{tenantId}",
    tag = "Records",
    request_body = SubmitRecordPayload,
    responses(
        (status = 200, description = "Submissão aceita e encaminhada (falhas de webhook vêm em warnings)", body = SubmissionReceipt),
        (status = 404, description = "Tipo de registro desconhecido"),
        (status = 422, description = "Campos obrigatórios ausentes ou opção inválida")
    ),
    params(
        ("recordType" = String, Path, description = "Tipo de registro"),
        ("tenantId" = String, Path, description = "ID do tenant")
    )
)]
pub async fn submit_record(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((record_type, tenant_id)): Path<(String, String)>,
    payload: Result<Json<SubmitRecordPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|e| AppError::from(e).to_api_error(&locale))?;

    let record = prepare_record(&app_state, &locale, &record_type, &tenant_id, payload.values).await?;
    let receipt = forward(&app_state, &locale, EventType::Created, record_type, tenant_id, record).await;

    Ok((StatusCode::OK, Json(receipt)))
}

// PUT /api/records/{recordType}/{tenantId}
#[utoipa::path(
    put,
    path = "/api/records/{recordType}/{tenantId}",
    tag = "Records",
    request_body = SubmitRecordPayload,
    responses(
        (status = 200, description = "Edição aceita e encaminhada como 'updated'", body = SubmissionReceipt),
        (status = 404, description = "Tipo de registro desconhecido"),
        (status = 422, description = "Campos obrigatórios ausentes ou opção inválida")
    ),
    params(
        ("recordType" = String, Path, description = "Tipo de registro"),
        ("tenantId" = String, Path, description = "ID do tenant")
    )
)]
pub async fn update_record(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((record_type, tenant_id)): Path<(String, String)>,
    payload: Result<Json<SubmitRecordPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|e| AppError::from(e).to_api_error(&locale))?;

    let record = prepare_record(&app_state, &locale, &record_type, &tenant_id, payload.values).await?;
    let receipt = forward(&app_state, &locale, EventType::Updated, record_type, tenant_id, record).await;

    Ok((StatusCode::OK, Json(receipt)))
}

// DELETE /api/records/{recordType}/{tenantId}
#[utoipa::path(
    delete,
    path = "/api/records/{recordType}/{tenantId}",
    tag = "Records",
    request_body = DeleteRecordPayload,
    responses(
        (status = 200, description = "Exclusão encaminhada como 'deleted' (sem validação)", body = SubmissionReceipt),
        (status = 404, description = "Tipo de registro desconhecido")
    ),
    params(
        ("recordType" = String, Path, description = "Tipo de registro"),
        ("tenantId" = String, Path, description = "ID do tenant")
    )
)]
pub async fn delete_record(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((record_type, tenant_id)): Path<(String, String)>,
    payload: Result<Json<DeleteRecordPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|e| AppError::from(e).to_api_error(&locale))?;

    // Só confirma que o tipo existe para o tenant; o registro vai como veio
    app_state
        .schema_registry
        .get_or_seed(&tenant_id, &record_type)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let receipt = forward(&app_state, &locale, EventType::Deleted, record_type, tenant_id, payload.record).await;

    Ok((StatusCode::OK, Json(receipt)))
}

// src/handlers/schema.rs

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::{
        schema::FieldSpec,
        wire::{DefaultsEnvelope, SchemaEnvelope},
    },
    services::{form_validator, schema_codec},
};

fn default_field_type() -> String {
    "text".to_string()
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewFieldPayload {
    #[validate(length(min = 1, max = 64, message = "required"))]
    #[schema(example = "birthday")]
    pub name: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Birthday")]
    pub title: String,

    // text, email, phone, currency, date, number, select
    #[serde(rename = "type", default = "default_field_type")]
    #[schema(example = "date")]
    pub field_type: String,

    #[serde(default)]
    #[schema(example = false)]
    pub required: bool,

    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddFieldPayload {
    #[validate(nested)]
    pub field: NewFieldPayload,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFieldPayload {
    #[schema(example = "birthday")]
    pub field_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOptionsPayload {
    #[schema(example = json!(["Gold", "Silver"]))]
    pub options: Vec<String>,

    // Ausente mantém o default atual; "" limpa
    #[serde(default)]
    #[schema(example = "Gold")]
    pub default: Option<String>,
}

fn envelope(document: &crate::models::schema::SchemaDocument) -> Json<SchemaEnvelope> {
    Json(SchemaEnvelope {
        schema: schema_codec::encode(document),
    })
}

// GET /api/schema/{recordType}/{tenantId}
#[utoipa::path(
    get,
    path = "/api/schema/{recordType}/{tenantId}",
    tag = "Schema",
    responses(
        (status = 200, description = "Schema do tipo de registro (semeado no primeiro acesso)", body = SchemaEnvelope),
        (status = 404, description = "Tipo de registro desconhecido")
    ),
    params(
        ("recordType" = String, Path, description = "contacts, leads, deals, companies ou um formulário customizado"),
        ("tenantId" = String, Path, description = "ID do tenant")
    )
)]
pub async fn get_schema(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((record_type, tenant_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let document = app_state
        .schema_registry
        .get_or_seed(&tenant_id, &record_type)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, envelope(&document)))
}

// POST /api/schema/{recordType}/{tenantId}
#[utoipa::path(
    post,
    path = "/api/schema/{recordType}/{tenantId}",
    tag = "Schema",
    request_body = AddFieldPayload,
    responses(
        (status = 200, description = "Schema atualizado", body = SchemaEnvelope),
        (status = 404, description = "Schema ainda não semeado"),
        (status = 409, description = "Campo já existe"),
        (status = 422, description = "Dados inválidos")
    ),
    params(
        ("recordType" = String, Path, description = "Tipo de registro"),
        ("tenantId" = String, Path, description = "ID do tenant")
    )
)]
pub async fn add_field(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((record_type, tenant_id)): Path<(String, String)>,
    payload: Result<Json<AddFieldPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|e| AppError::from(e).to_api_error(&locale))?;

    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let field = payload.field;
    let spec = FieldSpec {
        name: field.name,
        title: field.title,
        field_type: field.field_type,
        required: field.required,
        default_value: field.default,
    };

    let document = app_state
        .schema_registry
        .add_field(&tenant_id, &record_type, spec)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, envelope(&document)))
}

// DELETE /api/schema/{recordType}/{tenantId}
#[utoipa::path(
    delete,
    path = "/api/schema/{recordType}/{tenantId}",
    tag = "Schema",
    request_body = RemoveFieldPayload,
    responses(
        (status = 200, description = "Schema atualizado (remover campo inexistente é no-op)", body = SchemaEnvelope),
        (status = 404, description = "Schema ainda não semeado")
    ),
    params(
        ("recordType" = String, Path, description = "Tipo de registro"),
        ("tenantId" = String, Path, description = "ID do tenant")
    )
)]
pub async fn remove_field(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((record_type, tenant_id)): Path<(String, String)>,
    payload: Result<Json<RemoveFieldPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|e| AppError::from(e).to_api_error(&locale))?;

    let document = app_state
        .schema_registry
        .remove_field(&tenant_id, &record_type, &payload.field_name)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, envelope(&document)))
}

// PUT /api/schema/{recordType}/{tenantId}/fields/{fieldName}/options
#[utoipa::path(
    put,
    path = "/api/schema/{recordType}/{tenantId}/fields/{fieldName}/options",
    tag = "Schema",
    request_body = UpdateOptionsPayload,
    responses(
        (status = 200, description = "Opções do select atualizadas", body = SchemaEnvelope),
        (status = 404, description = "Schema ou campo não encontrado"),
        (status = 422, description = "Campo não é select ou opções inválidas")
    ),
    params(
        ("recordType" = String, Path, description = "Tipo de registro"),
        ("tenantId" = String, Path, description = "ID do tenant"),
        ("fieldName" = String, Path, description = "Nome do campo select")
    )
)]
pub async fn update_field_options(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((record_type, tenant_id, field_name)): Path<(String, String, String)>,
    payload: Result<Json<UpdateOptionsPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|e| AppError::from(e).to_api_error(&locale))?;

    let document = app_state
        .schema_registry
        .set_field_options(&tenant_id, &record_type, &field_name, payload.options, payload.default)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, envelope(&document)))
}

// GET /api/schema/{recordType}/{tenantId}/defaults
#[utoipa::path(
    get,
    path = "/api/schema/{recordType}/{tenantId}/defaults",
    tag = "Schema",
    responses(
        (status = 200, description = "Valores iniciais de um formulário em branco", body = DefaultsEnvelope)
    ),
    params(
        ("recordType" = String, Path, description = "Tipo de registro"),
        ("tenantId" = String, Path, description = "ID do tenant")
    )
)]
pub async fn get_defaults(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((record_type, tenant_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let document = app_state
        .schema_registry
        .get_or_seed(&tenant_id, &record_type)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let schema = schema_codec::encode(&document);
    let defaults = form_validator::compute_defaults(&schema);

    Ok((StatusCode::OK, Json(DefaultsEnvelope { defaults })))
}

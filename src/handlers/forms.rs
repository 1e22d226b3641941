// src/handlers/forms.rs

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::forms::FormDefinition,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "tickets")]
    pub form_id: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Support Tickets")]
    pub form_title: String,
}

// GET /api/forms/{tenantId}
#[utoipa::path(
    get,
    path = "/api/forms/{tenantId}",
    tag = "Forms",
    responses(
        (status = 200, description = "Formulários padrão e customizados do tenant", body = Vec<FormDefinition>)
    ),
    params(
        ("tenantId" = String, Path, description = "ID do tenant")
    )
)]
pub async fn list_forms(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(tenant_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let forms = app_state
        .schema_registry
        .list_forms(&tenant_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(forms)))
}

// POST /api/forms/{tenantId}
#[utoipa::path(
    post,
    path = "/api/forms/{tenantId}",
    tag = "Forms",
    request_body = CreateFormPayload,
    responses(
        (status = 201, description = "Formulário customizado criado", body = FormDefinition),
        (status = 409, description = "Já existe um formulário com esse id")
    ),
    params(
        ("tenantId" = String, Path, description = "ID do tenant")
    )
)]
pub async fn create_form(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(tenant_id): Path<String>,
    payload: Result<Json<CreateFormPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|e| AppError::from(e).to_api_error(&locale))?;

    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let form = app_state
        .schema_registry
        .register_custom_form(&tenant_id, &payload.form_id, &payload.form_title)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(json!({ "form": form }))))
}

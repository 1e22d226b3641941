// src/routes.rs

use axum::{
    routing::{get, post, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers};

/// Monta o router completo da aplicação.
pub fn app(app_state: AppState) -> Router {
    let schema_routes = Router::new()
        .route(
            "/{recordType}/{tenantId}",
            get(handlers::schema::get_schema)
                .post(handlers::schema::add_field)
                .delete(handlers::schema::remove_field),
        )
        .route(
            "/{recordType}/{tenantId}/defaults",
            get(handlers::schema::get_defaults),
        )
        .route(
            "/{recordType}/{tenantId}/fields/{fieldName}/options",
            put(handlers::schema::update_field_options),
        );

    let form_routes = Router::new().route(
        "/{tenantId}",
        get(handlers::forms::list_forms).post(handlers::forms::create_form),
    );

    let record_routes = Router::new().route(
        "/{recordType}/{tenantId}",
        post(handlers::records::submit_record)
            .put(handlers::records::update_record)
            .delete(handlers::records::delete_record),
    );

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/schema", schema_routes)
        .nest("/api/forms", form_routes)
        .nest("/api/records", record_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}

// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Schema ---
        handlers::schema::get_schema,
        handlers::schema::add_field,
        handlers::schema::remove_field,
        handlers::schema::update_field_options,
        handlers::schema::get_defaults,

        // --- Forms ---
        handlers::forms::list_forms,
        handlers::forms::create_form,

        // --- Records ---
        handlers::records::submit_record,
        handlers::records::update_record,
        handlers::records::delete_record,
    ),
    components(
        schemas(
            // --- Schema ---
            models::wire::WireSchema,
            models::wire::WireProperty,
            models::wire::SchemaEnvelope,
            models::wire::DefaultsEnvelope,
            handlers::schema::AddFieldPayload,
            handlers::schema::NewFieldPayload,
            handlers::schema::RemoveFieldPayload,
            handlers::schema::UpdateOptionsPayload,

            // --- Forms ---
            models::forms::FormDefinition,
            models::forms::FormKind,
            handlers::forms::CreateFormPayload,

            // --- Records ---
            models::forms::EventType,
            models::forms::RecordEvent,
            models::forms::SubmissionReceipt,
            handlers::records::SubmitRecordPayload,
            handlers::records::DeleteRecordPayload,
        )
    ),
    tags(
        (name = "Schema", description = "Registro dinâmico de schemas por tenant"),
        (name = "Forms", description = "Diretório de formulários"),
        (name = "Records", description = "Submissão de registros e webhooks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| *p == "/api/schema/{recordType}/{tenantId}"));
        assert!(paths.iter().any(|p| *p == "/api/records/{recordType}/{tenantId}"));
        assert!(paths.iter().any(|p| *p == "/api/forms/{tenantId}"));
    }
}

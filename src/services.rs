pub mod form_validator;
pub mod schema_codec;
pub mod schema_registry;
pub mod webhook_service;

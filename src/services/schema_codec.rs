// src/services/schema_codec.rs

//! Conversão entre o mapa interno de campos e o formato de transporte
//! `{ "type": "object", "properties": ..., "required": ... }`.
//!
//! A limpeza de chaves vazias (`enum`, `format`, `default`) acontece só aqui,
//! em `normalize_property`. Limitação conhecida: um default igual a string
//! vazia não tem representação no fio e some no encode.

use std::collections::BTreeMap;

use crate::{
    common::error::AppError,
    models::{
        schema::{FieldDefinition, FieldFormat, FieldType, SchemaDocument},
        wire::{WireProperty, WireSchema},
    },
};

const OBJECT_TYPE: &str = "object";

/// Resultado do decode: campos e obrigatórios já coerentes entre si.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSchema {
    pub fields: BTreeMap<String, FieldDefinition>,
    pub required: Vec<String>,
}

pub fn encode(document: &SchemaDocument) -> WireSchema {
    encode_parts(&document.fields, &document.required_fields)
}

pub fn encode_parts(fields: &BTreeMap<String, FieldDefinition>, required: &[String]) -> WireSchema {
    WireSchema {
        schema_type: OBJECT_TYPE.to_string(),
        properties: fields
            .iter()
            .map(|(name, field)| (name.clone(), normalize_property(field)))
            .collect(),
        required: required.to_vec(),
    }
}

// O único lugar que decide quais chaves vão para o fio
fn normalize_property(field: &FieldDefinition) -> WireProperty {
    let property_type = match field.field_type {
        FieldType::Number => "number",
        FieldType::String | FieldType::Select => "string",
    };

    WireProperty {
        property_type: property_type.to_string(),
        title: field.title.clone(),
        format: field.format.map(|f| f.as_str().to_string()),
        options: field.options.clone().filter(|opts| !opts.is_empty()),
        default: field.default_value.clone().filter(|d| !d.is_empty()),
    }
}

pub fn decode(wire: &WireSchema) -> Result<DecodedSchema, AppError> {
    if wire.schema_type != OBJECT_TYPE {
        return Err(AppError::Transport(format!(
            "schema deve ser do tipo 'object', recebido '{}'",
            wire.schema_type
        )));
    }

    let mut fields = BTreeMap::new();
    for (name, property) in &wire.properties {
        if name.is_empty() {
            return Err(AppError::Transport("propriedade com nome vazio".to_string()));
        }
        fields.insert(name.clone(), decode_property(name, property)?);
    }

    let mut required: Vec<String> = Vec::with_capacity(wire.required.len());
    for name in &wire.required {
        if !fields.contains_key(name) {
            return Err(AppError::Transport(format!(
                "campo obrigatório '{}' não está em properties",
                name
            )));
        }
        if !required.contains(name) {
            required.push(name.clone());
        }
    }

    Ok(DecodedSchema { fields, required })
}

fn decode_property(name: &str, property: &WireProperty) -> Result<FieldDefinition, AppError> {
    if property.title.trim().is_empty() {
        return Err(AppError::Transport(format!("propriedade '{}' sem título", name)));
    }

    let format = match property.format.as_deref() {
        None => None,
        Some(raw) => Some(FieldFormat::parse(raw).ok_or_else(|| {
            AppError::Transport(format!("format desconhecido '{}' em '{}'", raw, name))
        })?),
    };

    let options = property.options.clone().filter(|opts| !opts.is_empty());

    let field_type = match (property.property_type.as_str(), &options) {
        ("string", Some(_)) => {
            if format.is_some() {
                return Err(AppError::Transport(format!(
                    "propriedade '{}' não pode ter 'format' e 'enum' ao mesmo tempo",
                    name
                )));
            }
            FieldType::Select
        }
        ("string", None) => FieldType::String,
        ("number", None) => FieldType::Number,
        ("number", Some(_)) => {
            return Err(AppError::Transport(format!(
                "propriedade numérica '{}' não aceita 'enum' (use type 'string')",
                name
            )));
        }
        (other, _) => {
            return Err(AppError::Transport(format!(
                "tipo '{}' não suportado em '{}'",
                other, name
            )));
        }
    };

    Ok(FieldDefinition {
        field_type,
        title: property.title.clone(),
        format,
        options,
        default_value: property.default.clone().filter(|d| !d.is_empty()),
    })
}

// src/models/schema.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

// Tamanho máximo aceito para tenant ids e tipos de registro vindos da URL
const MAX_KEY_LEN: usize = 128;

// --- ENUMS ---

// Tipo interno do campo. No fio, `String` e `Select` viram "string" e `Number` vira "number".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Select,
}

// Dica semântica do campo. Nunca coexiste com `FieldType::Select`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    Email,
    Phone,
    Uri,
    Currency,
    Date,
}

impl FieldFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldFormat::Email => "email",
            FieldFormat::Phone => "phone",
            FieldFormat::Uri => "uri",
            FieldFormat::Currency => "currency",
            FieldFormat::Date => "date",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "email" => Some(FieldFormat::Email),
            "phone" => Some(FieldFormat::Phone),
            "uri" => Some(FieldFormat::Uri),
            "currency" => Some(FieldFormat::Currency),
            "date" => Some(FieldFormat::Date),
            _ => None,
        }
    }
}

// Origem do documento: semeado a partir de um template ou criado como formulário customizado
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SchemaOrigin {
    Template,
    Custom,
}

impl SchemaOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaOrigin::Template => "template",
            SchemaOrigin::Custom => "custom",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "template" => Some(SchemaOrigin::Template),
            "custom" => Some(SchemaOrigin::Custom),
            _ => None,
        }
    }
}

// --- DEFINIÇÃO DE CAMPO (O Molde) ---

/// Uma propriedade do schema, na forma interna (é assim que vai para o JSONB).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub field_type: FieldType,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FieldFormat>,

    // Presente se e somente se o campo for Select
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl FieldDefinition {
    pub fn text(title: &str) -> Self {
        Self {
            field_type: FieldType::String,
            title: title.to_string(),
            format: None,
            options: None,
            default_value: None,
        }
    }

    pub fn formatted(title: &str, format: FieldFormat) -> Self {
        Self {
            format: Some(format),
            ..Self::text(title)
        }
    }

    pub fn select(title: &str, options: &[&str], default_value: Option<&str>) -> Self {
        Self {
            field_type: FieldType::Select,
            title: title.to_string(),
            format: None,
            options: Some(options.iter().map(|o| o.to_string()).collect()),
            default_value: default_value.map(str::to_string),
        }
    }

    pub fn is_select(&self) -> bool {
        self.field_type == FieldType::Select
    }

    /// Checa a coerência tipo/format/options de um único campo.
    pub fn check(&self, name: &str) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err(format!("campo '{}' sem título", name));
        }
        match (self.is_select(), self.options.is_some()) {
            (true, false) => return Err(format!("campo select '{}' sem lista de opções", name)),
            (false, true) => return Err(format!("campo '{}' tem opções mas não é select", name)),
            _ => {}
        }
        if self.is_select() && self.format.is_some() {
            return Err(format!("campo select '{}' não pode ter format", name));
        }
        Ok(())
    }
}

// --- PEDIDO DE NOVO CAMPO ---

/// O que o chamador manda para `add_field`. O `field_type` é o tipo "de formulário"
/// (text, email, phone, currency, date, number, select).
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub title: String,
    pub field_type: String,
    pub required: bool,
    pub default_value: Option<String>,
}

impl FieldSpec {
    /// Tabela fixa: tipo de formulário -> (tipo interno, format).
    pub fn resolve_type(&self) -> Option<(FieldType, Option<FieldFormat>)> {
        let resolved = match self.field_type.as_str() {
            "text" | "string" => (FieldType::String, None),
            "email" => (FieldType::String, Some(FieldFormat::Email)),
            "phone" => (FieldType::String, Some(FieldFormat::Phone)),
            "currency" => (FieldType::String, Some(FieldFormat::Currency)),
            "date" => (FieldType::String, Some(FieldFormat::Date)),
            "number" => (FieldType::Number, None),
            "select" => (FieldType::Select, None),
            _ => return None,
        };
        Some(resolved)
    }
}

// --- DOCUMENTO (A unidade de armazenamento) ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDocument {
    pub id: Uuid,
    pub tenant_id: String,
    pub record_type: String,
    pub title: String,
    pub origin: SchemaOrigin,
    pub fields: BTreeMap<String, FieldDefinition>,
    pub required_fields: Vec<String>,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SchemaDocument {
    pub fn is_field_required(&self, name: &str) -> bool {
        self.required_fields.iter().any(|r| r == name)
    }

    /// Marca o campo como obrigatório sem nunca duplicar a entrada.
    pub fn mark_required(&mut self, name: &str) {
        if !self.is_field_required(name) {
            self.required_fields.push(name.to_string());
        }
    }

    /// Remove da lista de obrigatórios qualquer nome que não seja mais uma chave de `fields`.
    pub fn prune_dangling_required(&mut self) {
        let fields = &self.fields;
        self.required_fields.retain(|name| fields.contains_key(name));
    }

    /// Invariantes estruturais checadas antes de todo `save`.
    pub fn check_integrity(&self) -> Result<(), AppError> {
        for (name, field) in &self.fields {
            field
                .check(name)
                .map_err(|msg| AppError::InternalServerError(anyhow::anyhow!(msg)))?;
        }

        let mut seen = std::collections::HashSet::new();
        for name in &self.required_fields {
            if !self.fields.contains_key(name) {
                return Err(AppError::InternalServerError(anyhow::anyhow!(
                    "campo obrigatório '{}' não existe em {}/{}",
                    name,
                    self.tenant_id,
                    self.record_type
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(AppError::InternalServerError(anyhow::anyhow!(
                    "campo obrigatório '{}' duplicado",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Conteúdo de um documento ainda não persistido (semente).
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaSeed {
    pub title: String,
    pub origin: SchemaOrigin,
    pub fields: BTreeMap<String, FieldDefinition>,
    pub required_fields: Vec<String>,
}

// Valida identificadores que chegam pela URL (tenant e tipo de registro)
pub fn check_key(kind: &str, value: &str) -> Result<(), AppError> {
    let valid = !value.is_empty()
        && value.len() <= MAX_KEY_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(AppError::Transport(format!("{} inválido: '{}'", kind, value)))
    }
}

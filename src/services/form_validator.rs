// src/services/form_validator.rs

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::wire::WireSchema;

// --- MOTOR DE VALIDAÇÃO ---
// Trabalha só em cima do schema normalizado (o mesmo que o frontend recebe),
// sem tocar no armazenamento.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldViolation {
    MissingRequiredField(String),
    InvalidChoice { field: String, value: String },
}

impl FieldViolation {
    pub fn field(&self) -> &str {
        match self {
            FieldViolation::MissingRequiredField(field) => field,
            FieldViolation::InvalidChoice { field, .. } => field,
        }
    }

    // Usamos CÓDIGO, não frase
    pub fn code(&self) -> &'static str {
        match self {
            FieldViolation::MissingRequiredField(_) => "required",
            FieldViolation::InvalidChoice { .. } => "invalid_choice",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} campo(s) inválido(s)", .0.len())]
pub struct SubmissionErrors(pub Vec<FieldViolation>);

impl SubmissionErrors {
    pub fn violations(&self) -> &[FieldViolation] {
        &self.0
    }

    /// Mapa `campo -> código`, do jeito que vai no `details` da resposta.
    pub fn to_details(&self) -> Value {
        let details: Map<String, Value> = self
            .0
            .iter()
            .map(|v| (v.field().to_string(), Value::String(v.code().to_string())))
            .collect();
        Value::Object(details)
    }
}

pub type ValidationResult = Result<(), SubmissionErrors>;

/// Valores default de cada campo que tem `default`, para inicializar um formulário em branco.
pub fn compute_defaults(schema: &WireSchema) -> Map<String, Value> {
    schema
        .properties
        .iter()
        .filter_map(|(name, property)| {
            property
                .default
                .as_ref()
                .map(|d| (name.clone(), Value::String(d.clone())))
        })
        .collect()
}

pub fn is_field_required(schema: &WireSchema, field_name: &str) -> bool {
    schema.required.iter().any(|r| r == field_name)
}

/// Preenche com o default as chaves que o cliente não mandou.
pub fn apply_defaults(schema: &WireSchema, values: &mut Map<String, Value>) {
    for (name, default) in compute_defaults(schema) {
        values.entry(name).or_insert(default);
    }
}

// Ausente, null ou string vazia contam como "não preenchido"
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

pub fn validate_submission(schema: &WireSchema, values: &Map<String, Value>) -> ValidationResult {
    let mut violations = Vec::new();

    // A. OBRIGATORIEDADE
    for name in &schema.required {
        if is_blank(values.get(name)) {
            violations.push(FieldViolation::MissingRequiredField(name.clone()));
        }
    }

    // B. ESCOLHAS (só para campos com enum não vazio)
    for (name, property) in &schema.properties {
        let Some(options) = property.options.as_ref().filter(|o| !o.is_empty()) else {
            continue;
        };
        let value = values.get(name);
        if is_blank(value) {
            continue;
        }

        let accepted = match value {
            Some(Value::String(s)) => options.iter().any(|o| o == s),
            _ => false,
        };
        if !accepted {
            let shown = match value {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            violations.push(FieldViolation::InvalidChoice {
                field: name.clone(),
                value: shown,
            });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(SubmissionErrors(violations))
    }
}

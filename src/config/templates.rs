// src/config/templates.rs

use std::collections::BTreeMap;

use anyhow::Context;
use serde::Deserialize;

use crate::{
    models::{
        schema::{check_key, FieldDefinition, FieldFormat, SchemaOrigin, SchemaSeed},
        wire::WireSchema,
    },
    services::schema_codec,
};

/// Template de fábrica de um tipo de registro. Só serve de semente:
/// depois de semeado, o documento do tenant é a única fonte da verdade.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaTemplate {
    pub title: String,
    pub fields: BTreeMap<String, FieldDefinition>,
    pub required: Vec<String>,
}

impl SchemaTemplate {
    pub fn to_seed(&self) -> SchemaSeed {
        SchemaSeed {
            title: self.title.clone(),
            origin: SchemaOrigin::Template,
            fields: self.fields.clone(),
            required_fields: self.required.clone(),
        }
    }
}

// Entrada do arquivo de templates: { "contacts": { "title": "...", "schema": { ... } } }
#[derive(Debug, Deserialize)]
struct TemplateEntry {
    title: String,
    schema: WireSchema,
}

/// Catálogo imutável de templates, injetado no SchemaRegistry.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, SchemaTemplate>,
}

impl TemplateCatalog {
    pub fn new(templates: BTreeMap<String, SchemaTemplate>) -> Self {
        Self { templates }
    }

    pub fn get(&self, record_type: &str) -> Option<&SchemaTemplate> {
        self.templates.get(record_type)
    }

    pub fn contains(&self, record_type: &str) -> bool {
        self.templates.contains_key(record_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SchemaTemplate)> {
        self.templates.iter()
    }

    /// Carrega o catálogo de um arquivo JSON no formato de transporte.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("ler arquivo de templates: {}", path))?;
        Self::from_json(&raw).with_context(|| format!("interpretar templates de {}", path))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let entries: BTreeMap<String, TemplateEntry> = serde_json::from_str(raw)?;

        let mut templates = BTreeMap::new();
        for (record_type, entry) in entries {
            check_key("recordType", &record_type).map_err(|e| anyhow::anyhow!(e.to_string()))?;
            let decoded = schema_codec::decode(&entry.schema)
                .map_err(|e| anyhow::anyhow!("template '{}': {}", record_type, e))?;

            templates.insert(
                record_type,
                SchemaTemplate {
                    title: entry.title,
                    fields: decoded.fields,
                    required: decoded.required,
                },
            );
        }

        Ok(Self { templates })
    }

    /// Os quatro templates padrão: contacts, leads, deals e companies.
    pub fn builtin() -> Self {
        let mut templates = BTreeMap::new();

        templates.insert(
            "contacts".to_string(),
            template(
                "Contacts",
                vec![
                    ("id", FieldDefinition::text("ID")),
                    ("name", FieldDefinition::text("Name")),
                    ("email", FieldDefinition::formatted("Email", FieldFormat::Email)),
                    ("phone", FieldDefinition::formatted("Phone Number", FieldFormat::Phone)),
                    (
                        "status",
                        FieldDefinition::select(
                            "Status",
                            &["Active", "Inactive", "Pending"],
                            Some("Active"),
                        ),
                    ),
                ],
                &["id", "name", "email"],
            ),
        );

        templates.insert(
            "leads".to_string(),
            template(
                "Leads",
                vec![
                    ("id", FieldDefinition::text("ID")),
                    ("firstName", FieldDefinition::text("First Name")),
                    ("lastName", FieldDefinition::text("Last Name")),
                    ("email", FieldDefinition::formatted("Email", FieldFormat::Email)),
                    (
                        "status",
                        FieldDefinition::select(
                            "Status",
                            &["New", "Contacted", "Qualified", "Unqualified"],
                            Some("New"),
                        ),
                    ),
                ],
                &["id", "firstName", "lastName", "email"],
            ),
        );

        templates.insert(
            "deals".to_string(),
            template(
                "Deals",
                vec![
                    ("id", FieldDefinition::text("ID")),
                    ("name", FieldDefinition::text("Deal Name")),
                    ("amount", FieldDefinition::formatted("Amount", FieldFormat::Currency)),
                    (
                        "stage",
                        FieldDefinition::select(
                            "Stage",
                            &[
                                "Prospecting",
                                "Qualification",
                                "Proposal",
                                "Negotiation",
                                "Closed Won",
                                "Closed Lost",
                            ],
                            Some("Prospecting"),
                        ),
                    ),
                    ("closeDate", FieldDefinition::formatted("Close Date", FieldFormat::Date)),
                ],
                &["id", "name", "amount"],
            ),
        );

        templates.insert(
            "companies".to_string(),
            template(
                "Companies",
                vec![
                    ("id", FieldDefinition::text("ID")),
                    ("name", FieldDefinition::text("Company Name")),
                    ("website", FieldDefinition::formatted("Website", FieldFormat::Uri)),
                    (
                        "industry",
                        FieldDefinition::select(
                            "Industry",
                            &["Technology", "Healthcare", "Finance", "Manufacturing", "Retail", "Other"],
                            None,
                        ),
                    ),
                    (
                        "size",
                        FieldDefinition::select(
                            "Company Size",
                            &["1-10", "11-50", "51-200", "201-500", "501-1000", "1000+"],
                            None,
                        ),
                    ),
                ],
                &["id", "name"],
            ),
        );

        Self { templates }
    }
}

fn template(title: &str, fields: Vec<(&str, FieldDefinition)>, required: &[&str]) -> SchemaTemplate {
    SchemaTemplate {
        title: title.to_string(),
        fields: fields
            .into_iter()
            .map(|(name, field)| (name.to_string(), field))
            .collect(),
        required: required.iter().map(|r| r.to_string()).collect(),
    }
}

// src/models/wire.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

// O formato "JSON-Schema-like" que trafega entre backend e frontend.
// Quem monta isso é sempre o SchemaCodec: nenhum handler mexe nessas chaves na mão.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct WireProperty {
    #[serde(rename = "type")]
    #[schema(example = "string")]
    pub property_type: String,

    #[schema(example = "Birthday")]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "date")]
    pub format: Option<String>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct WireSchema {
    #[serde(rename = "type")]
    #[schema(example = "object")]
    pub schema_type: String,

    pub properties: BTreeMap<String, WireProperty>,

    #[serde(default)]
    pub required: Vec<String>,
}

impl WireSchema {
    pub fn property(&self, name: &str) -> Option<&WireProperty> {
        self.properties.get(name)
    }
}

// Envelope de resposta: { "schema": { ... } }
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SchemaEnvelope {
    pub schema: WireSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DefaultsEnvelope {
    #[schema(value_type = Object, example = json!({"status": "Active"}))]
    pub defaults: Map<String, Value>,
}

// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

// Idiomas para os quais temos mensagens de erro
const SUPPORTED_LANGUAGES: [&str; 2] = ["en", "pt"];
const DEFAULT_LANGUAGE: &str = "en";

// Nosso extrator de idioma
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANGUAGE.to_string())
    }
}

impl Locale {
    /// Escolhe o primeiro idioma suportado do cabeçalho Accept-Language.
    pub fn from_header(raw: &str) -> Self {
        accept_language::parse(raw)
            .iter()
            // "pt-BR" -> "pt"
            .map(|tag| tag.split('-').next().unwrap_or(tag.as_str()).to_lowercase())
            .find(|lang| SUPPORTED_LANGUAGES.contains(&lang.as_str()))
            .map(Locale)
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(Locale::from_header)
            .unwrap_or_default();

        Ok(locale)
    }
}

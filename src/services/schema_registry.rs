// src/services/schema_registry.rs

use std::{collections::BTreeMap, collections::HashSet, sync::Arc};

use crate::{
    common::error::AppError,
    config::templates::TemplateCatalog,
    db::SchemaStore,
    models::{
        forms::{FormDefinition, FormKind},
        schema::{check_key, FieldDefinition, FieldSpec, FieldType, SchemaDocument, SchemaOrigin, SchemaSeed},
    },
};

// Quantas vezes uma mutação relê o documento depois de perder um compare-and-swap
const MAX_SAVE_ATTEMPTS: u32 = 3;

/// O único componente que aplica regras de negócio a um SchemaDocument.
#[derive(Clone)]
pub struct SchemaRegistry {
    store: Arc<dyn SchemaStore>,
    templates: Arc<TemplateCatalog>,
}

impl SchemaRegistry {
    pub fn new(store: Arc<dyn SchemaStore>, templates: TemplateCatalog) -> Self {
        Self {
            store,
            templates: Arc::new(templates),
        }
    }

    pub fn templates(&self) -> &TemplateCatalog {
        &self.templates
    }

    /// Tipos sem template são objetos customizados (usado no roteamento dos webhooks).
    pub fn is_custom_record_type(&self, record_type: &str) -> bool {
        !self.templates.contains(record_type)
    }

    // =========================================================================
    //  1. LEITURA (COM SEMEADURA PREGUIÇOSA)
    // =========================================================================

    pub async fn get_or_seed(
        &self,
        tenant_id: &str,
        record_type: &str,
    ) -> Result<SchemaDocument, AppError> {
        check_key("tenantId", tenant_id)?;
        check_key("recordType", record_type)?;

        if let Some(document) = self.store.find_one(tenant_id, record_type).await? {
            return Ok(document);
        }

        let template = self
            .templates
            .get(record_type)
            .ok_or_else(|| AppError::UnknownRecordType(record_type.to_string()))?;

        match self
            .store
            .create_default(tenant_id, record_type, template.to_seed())
            .await
        {
            Ok(document) => {
                tracing::info!(
                    "🌱 Schema '{}' semeado para o tenant '{}'",
                    record_type,
                    tenant_id
                );
                Ok(document)
            }
            // Outra requisição semeou primeiro: devolvemos o vencedor
            Err(AppError::Conflict(_)) => self
                .store
                .find_one(tenant_id, record_type)
                .await?
                .ok_or_else(|| AppError::SchemaNotFound {
                    tenant_id: tenant_id.to_string(),
                    record_type: record_type.to_string(),
                }),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    //  2. MUTAÇÕES DE CAMPO
    // =========================================================================

    /// Adiciona um campo. Nunca semeia: o documento já tem que existir.
    pub async fn add_field(
        &self,
        tenant_id: &str,
        record_type: &str,
        spec: FieldSpec,
    ) -> Result<SchemaDocument, AppError> {
        if spec.name.trim().is_empty() {
            return Err(AppError::InvalidField("o nome do campo é obrigatório".to_string()));
        }
        if spec.title.trim().is_empty() {
            return Err(AppError::InvalidField(format!(
                "o campo '{}' precisa de um título",
                spec.name
            )));
        }

        let (field_type, format) = spec.resolve_type().ok_or_else(|| {
            AppError::InvalidField(format!("tipo de campo desconhecido '{}'", spec.field_type))
        })?;

        // Select nasce sem opções, então um default ainda não teria onde se apoiar
        if field_type == FieldType::Select && spec.default_value.as_deref().is_some_and(|d| !d.is_empty()) {
            return Err(AppError::InvalidField(format!(
                "o default do select '{}' deve ser definido junto com as opções",
                spec.name
            )));
        }

        let field = FieldDefinition {
            field_type,
            title: spec.title.clone(),
            format,
            // Select nasce sem opções; elas chegam depois por set_field_options
            options: (field_type == FieldType::Select).then(Vec::new),
            default_value: spec.default_value.clone().filter(|d| !d.is_empty()),
        };
        let name = spec.name.clone();
        let required = spec.required;

        let saved = self
            .mutate(tenant_id, record_type, |document| {
                if document.fields.contains_key(&name) {
                    return Err(AppError::DuplicateField(name.clone()));
                }
                document.fields.insert(name.clone(), field.clone());
                if required {
                    document.mark_required(&name);
                }
                Ok(true)
            })
            .await?;

        tracing::info!(
            "✅ Campo '{}' adicionado ao schema '{}' do tenant '{}'",
            spec.name,
            record_type,
            tenant_id
        );
        Ok(saved)
    }

    /// Remove um campo. Remover um campo que não existe é um no-op com sucesso.
    pub async fn remove_field(
        &self,
        tenant_id: &str,
        record_type: &str,
        field_name: &str,
    ) -> Result<SchemaDocument, AppError> {
        let saved = self
            .mutate(tenant_id, record_type, |document| {
                let before = document.required_fields.len();
                let removed = document.fields.remove(field_name).is_some();
                document.required_fields.retain(|name| name != field_name);
                document.prune_dangling_required();
                Ok(removed || document.required_fields.len() != before)
            })
            .await?;

        tracing::info!(
            "🗑️ Campo '{}' removido do schema '{}' do tenant '{}'",
            field_name,
            record_type,
            tenant_id
        );
        Ok(saved)
    }

    /// Troca a lista de opções de um campo select.
    ///
    /// `default`: `None` mantém o atual, `Some("")` limpa, `Some(v)` troca por `v`.
    /// O default resultante tem que estar entre as novas opções.
    pub async fn set_field_options(
        &self,
        tenant_id: &str,
        record_type: &str,
        field_name: &str,
        options: Vec<String>,
        default: Option<String>,
    ) -> Result<SchemaDocument, AppError> {
        let mut seen = HashSet::new();
        for option in &options {
            if option.trim().is_empty() {
                return Err(AppError::InvalidField("opções não podem ser vazias".to_string()));
            }
            if !seen.insert(option.as_str()) {
                return Err(AppError::InvalidField(format!("opção '{}' repetida", option)));
            }
        }

        self.mutate(tenant_id, record_type, |document| {
            let field = document
                .fields
                .get_mut(field_name)
                .ok_or_else(|| AppError::FieldNotFound(field_name.to_string()))?;

            if !field.is_select() {
                return Err(AppError::InvalidField(format!(
                    "o campo '{}' não é do tipo select",
                    field_name
                )));
            }
            let next_default = match &default {
                Some(replacement) if replacement.is_empty() => None,
                Some(replacement) => Some(replacement.clone()),
                None => field.default_value.clone(),
            };
            if let Some(value) = &next_default {
                if !options.contains(value) {
                    return Err(AppError::InvalidField(format!(
                        "o default '{}' precisa estar entre as opções",
                        value
                    )));
                }
            }

            let changed = field.options.as_ref() != Some(&options) || field.default_value != next_default;
            field.options = Some(options.clone());
            field.default_value = next_default;
            Ok(changed)
        })
        .await
    }

    // =========================================================================
    //  3. DIRETÓRIO DE FORMULÁRIOS
    // =========================================================================

    /// Cria o schema de um objeto customizado, só com o campo `id`.
    pub async fn register_custom_form(
        &self,
        tenant_id: &str,
        form_id: &str,
        form_title: &str,
    ) -> Result<FormDefinition, AppError> {
        check_key("tenantId", tenant_id)?;
        check_key("formId", form_id)?;
        if form_title.trim().is_empty() {
            return Err(AppError::InvalidField("o título do formulário é obrigatório".to_string()));
        }
        if self.templates.contains(form_id) {
            return Err(AppError::Conflict(format!("'{}' é um formulário padrão", form_id)));
        }

        let seed = SchemaSeed {
            title: form_title.to_string(),
            origin: SchemaOrigin::Custom,
            fields: BTreeMap::from([("id".to_string(), FieldDefinition::text("ID"))]),
            required_fields: vec!["id".to_string()],
        };
        let document = self.store.create_default(tenant_id, form_id, seed).await?;

        tracing::info!(
            "✅ Formulário customizado '{}' criado para o tenant '{}'",
            form_id,
            tenant_id
        );
        Ok(FormDefinition {
            form_id: document.record_type,
            form_title: document.title,
            kind: FormKind::Custom,
        })
    }

    /// Formulários padrão (templates) seguidos dos customizados do tenant.
    pub async fn list_forms(&self, tenant_id: &str) -> Result<Vec<FormDefinition>, AppError> {
        check_key("tenantId", tenant_id)?;

        let mut forms: Vec<FormDefinition> = self
            .templates
            .iter()
            .map(|(record_type, template)| FormDefinition {
                form_id: record_type.clone(),
                form_title: template.title.clone(),
                kind: FormKind::Default,
            })
            .collect();

        let custom = self.store.list_for_tenant(tenant_id).await?;
        forms.extend(
            custom
                .into_iter()
                .filter(|doc| doc.origin == SchemaOrigin::Custom)
                .map(|doc| FormDefinition {
                    form_id: doc.record_type,
                    form_title: doc.title,
                    kind: FormKind::Custom,
                }),
        );

        Ok(forms)
    }

    // Lê, aplica, checa invariantes e grava com compare-and-swap.
    // `apply` devolve `false` quando não mudou nada (e aí não há escrita).
    async fn mutate<F>(
        &self,
        tenant_id: &str,
        record_type: &str,
        mut apply: F,
    ) -> Result<SchemaDocument, AppError>
    where
        F: FnMut(&mut SchemaDocument) -> Result<bool, AppError> + Send,
    {
        check_key("tenantId", tenant_id)?;
        check_key("recordType", record_type)?;

        let mut attempt = 1;
        loop {
            let mut document = self
                .store
                .find_one(tenant_id, record_type)
                .await?
                .ok_or_else(|| AppError::SchemaNotFound {
                    tenant_id: tenant_id.to_string(),
                    record_type: record_type.to_string(),
                })?;

            if !apply(&mut document)? {
                return Ok(document);
            }
            document.check_integrity()?;

            match self.store.save(&document).await {
                Ok(saved) => return Ok(saved),
                Err(AppError::ConcurrentModification { .. }) if attempt < MAX_SAVE_ATTEMPTS => {
                    tracing::warn!(
                        "⚠️ Conflito de revisão em '{}' (tenant '{}'), tentativa {}/{}",
                        record_type,
                        tenant_id,
                        attempt,
                        MAX_SAVE_ATTEMPTS
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemorySchemaStore;
    use crate::models::schema::FieldFormat;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new(Arc::new(InMemorySchemaStore::new()), TemplateCatalog::builtin())
    }

    fn spec(name: &str, field_type: &str, required: bool) -> FieldSpec {
        FieldSpec {
            name: name.into(),
            title: name.to_uppercase(),
            field_type: field_type.into(),
            required,
            default_value: None,
        }
    }

    fn assert_referential(doc: &SchemaDocument) {
        for name in &doc.required_fields {
            assert!(doc.fields.contains_key(name), "'{}' obrigatório sem campo", name);
        }
    }

    #[tokio::test]
    async fn seeding_is_idempotent_and_matches_template() {
        let registry = registry();
        for record_type in ["contacts", "leads", "deals", "companies"] {
            let first = registry.get_or_seed("T1", record_type).await.unwrap();
            let template = registry.templates().get(record_type).unwrap();
            let keys: Vec<&String> = first.fields.keys().collect();
            let expected: Vec<&String> = template.fields.keys().collect();
            assert_eq!(keys, expected);
            assert_eq!(first.required_fields, template.required);

            let second = registry.get_or_seed("T1", record_type).await.unwrap();
            assert_eq!(first, second);
        }
    }

    #[tokio::test]
    async fn unknown_record_type_is_not_seeded() {
        let result = registry().get_or_seed("T1", "invoices").await;
        assert!(matches!(result, Err(AppError::UnknownRecordType(rt)) if rt == "invoices"));
    }

    #[tokio::test]
    async fn add_field_requires_existing_document() {
        let result = registry().add_field("T1", "contacts", spec("birthday", "date", false)).await;
        assert!(matches!(result, Err(AppError::SchemaNotFound { .. })));
    }

    #[tokio::test]
    async fn add_field_derives_format_and_select_options() {
        let registry = registry();
        registry.get_or_seed("T1", "contacts").await.unwrap();

        let doc = registry
            .add_field("T1", "contacts", spec("birthday", "date", false))
            .await
            .unwrap();
        let birthday = &doc.fields["birthday"];
        assert_eq!(birthday.field_type, FieldType::String);
        assert_eq!(birthday.format, Some(FieldFormat::Date));
        assert_eq!(birthday.options, None);
        assert_eq!(doc.required_fields, vec!["id", "name", "email"]);

        let doc = registry
            .add_field("T1", "contacts", spec("tier", "select", false))
            .await
            .unwrap();
        assert_eq!(doc.fields["tier"].options, Some(vec![]));
        assert_eq!(doc.fields["tier"].format, None);
    }

    #[tokio::test]
    async fn required_twice_never_duplicates() {
        let registry = registry();
        registry.get_or_seed("T1", "leads").await.unwrap();

        registry
            .add_field("T1", "leads", spec("source", "text", true))
            .await
            .unwrap();
        let again = registry.add_field("T1", "leads", spec("source", "text", true)).await;
        assert!(matches!(again, Err(AppError::DuplicateField(n)) if n == "source"));

        let doc = registry.get_or_seed("T1", "leads").await.unwrap();
        let count = doc.required_fields.iter().filter(|n| *n == "source").count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn invalid_specs_are_rejected() {
        let registry = registry();
        registry.get_or_seed("T1", "contacts").await.unwrap();

        let empty = registry.add_field("T1", "contacts", spec("", "text", false)).await;
        assert!(matches!(empty, Err(AppError::InvalidField(_))));

        let unknown = registry.add_field("T1", "contacts", spec("x", "hologram", false)).await;
        assert!(matches!(unknown, Err(AppError::InvalidField(_))));

        let clobber = registry.add_field("T1", "contacts", spec("email", "text", false)).await;
        assert!(matches!(clobber, Err(AppError::DuplicateField(_))));
    }

    #[tokio::test]
    async fn remove_field_cleans_required_list() {
        let registry = registry();
        registry.get_or_seed("T1", "contacts").await.unwrap();

        let doc = registry.remove_field("T1", "contacts", "email").await.unwrap();
        assert!(!doc.fields.contains_key("email"));
        assert_eq!(doc.required_fields, vec!["id", "name"]);
        assert_referential(&doc);
    }

    #[tokio::test]
    async fn removing_absent_field_is_a_noop() {
        let registry = registry();
        let seeded = registry.get_or_seed("T1", "deals").await.unwrap();
        let doc = registry.remove_field("T1", "deals", "ghost").await.unwrap();
        assert_eq!(doc, seeded);
    }

    #[tokio::test]
    async fn remove_requires_existing_document() {
        let result = registry().remove_field("T9", "deals", "name").await;
        assert!(matches!(result, Err(AppError::SchemaNotFound { .. })));
    }

    #[tokio::test]
    async fn required_names_always_point_at_fields() {
        let registry = registry();
        registry.get_or_seed("T1", "companies").await.unwrap();

        let names = ["alpha", "beta", "name", "id", "website"];
        for step in 0..40usize {
            let name = names[(step * 7 + 3) % names.len()];
            let doc = if step % 3 == 0 {
                registry.remove_field("T1", "companies", name).await.unwrap()
            } else {
                match registry
                    .add_field("T1", "companies", spec(name, "text", step % 2 == 0))
                    .await
                {
                    Ok(doc) => doc,
                    Err(AppError::DuplicateField(_)) => {
                        registry.get_or_seed("T1", "companies").await.unwrap()
                    }
                    Err(e) => panic!("erro inesperado: {e}"),
                }
            };
            assert_referential(&doc);
        }
    }

    #[tokio::test]
    async fn select_options_can_be_edited() {
        let registry = registry();
        registry.get_or_seed("T1", "contacts").await.unwrap();
        registry
            .add_field("T1", "contacts", spec("tier", "select", false))
            .await
            .unwrap();

        let doc = registry
            .set_field_options("T1", "contacts", "tier", vec!["Gold".into(), "Silver".into()], None)
            .await
            .unwrap();
        assert_eq!(doc.fields["tier"].options, Some(vec!["Gold".into(), "Silver".into()]));

        let not_select = registry
            .set_field_options("T1", "contacts", "name", vec!["x".into()], None)
            .await;
        assert!(matches!(not_select, Err(AppError::InvalidField(_))));

        let missing = registry
            .set_field_options("T1", "contacts", "ghost", vec!["x".into()], None)
            .await;
        assert!(matches!(missing, Err(AppError::FieldNotFound(_))));

        // O default "Active" tem que continuar entre as opções
        let drops_default = registry
            .set_field_options("T1", "contacts", "status", vec!["Inactive".into()], None)
            .await;
        assert!(matches!(drops_default, Err(AppError::InvalidField(_))));
    }

    #[tokio::test]
    async fn select_default_moves_with_its_options() {
        let registry = registry();
        registry.get_or_seed("T1", "contacts").await.unwrap();

        let mut with_default = spec("tier", "select", false);
        with_default.default_value = Some("Gold".into());
        let early = registry.add_field("T1", "contacts", with_default).await;
        assert!(matches!(early, Err(AppError::InvalidField(_))));

        registry
            .add_field("T1", "contacts", spec("tier", "select", false))
            .await
            .unwrap();
        let doc = registry
            .set_field_options("T1", "contacts", "tier", vec!["Gold".into()], Some("Gold".into()))
            .await
            .unwrap();
        assert_eq!(doc.fields["tier"].default_value.as_deref(), Some("Gold"));

        // Trocar opções e default juntos
        let doc = registry
            .set_field_options("T1", "contacts", "tier", vec!["Silver".into()], Some("Silver".into()))
            .await
            .unwrap();
        assert_eq!(doc.fields["tier"].options, Some(vec!["Silver".into()]));
        assert_eq!(doc.fields["tier"].default_value.as_deref(), Some("Silver"));

        // Default vazio limpa
        let doc = registry
            .set_field_options("T1", "contacts", "status", vec!["Inactive".into()], Some(String::new()))
            .await
            .unwrap();
        assert_eq!(doc.fields["status"].default_value, None);

        let outside = registry
            .set_field_options("T1", "contacts", "tier", vec!["Silver".into()], Some("Gold".into()))
            .await;
        assert!(matches!(outside, Err(AppError::InvalidField(_))));
    }

    #[tokio::test]
    async fn custom_forms_are_listed_after_defaults() {
        let registry = registry();
        let form = registry
            .register_custom_form("T1", "tickets", "Support Tickets")
            .await
            .unwrap();
        assert_eq!(form.kind, FormKind::Custom);

        // Agora o tipo customizado existe e pode ser lido sem template
        let doc = registry.get_or_seed("T1", "tickets").await.unwrap();
        assert_eq!(doc.required_fields, vec!["id"]);

        let forms = registry.list_forms("T1").await.unwrap();
        assert_eq!(forms.len(), 5);
        assert_eq!(forms.last().unwrap().form_id, "tickets");

        // Outro tenant não enxerga
        assert!(registry.get_or_seed("T2", "tickets").await.is_err());

        let dup = registry.register_custom_form("T1", "tickets", "Again").await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
        let shadow = registry.register_custom_form("T1", "contacts", "Mine").await;
        assert!(matches!(shadow, Err(AppError::Conflict(_))));
    }

    // Store que perde os primeiros `failures` compare-and-swaps
    struct RacyStore {
        inner: InMemorySchemaStore,
        failures: AtomicU32,
    }

    #[async_trait]
    impl SchemaStore for RacyStore {
        async fn find_one(&self, t: &str, r: &str) -> Result<Option<SchemaDocument>, AppError> {
            self.inner.find_one(t, r).await
        }

        async fn create_default(
            &self,
            t: &str,
            r: &str,
            seed: SchemaSeed,
        ) -> Result<SchemaDocument, AppError> {
            self.inner.create_default(t, r, seed).await
        }

        async fn save(&self, document: &SchemaDocument) -> Result<SchemaDocument, AppError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(AppError::ConcurrentModification {
                    tenant_id: document.tenant_id.clone(),
                    record_type: document.record_type.clone(),
                });
            }
            self.inner.save(document).await
        }

        async fn list_for_tenant(&self, t: &str) -> Result<Vec<SchemaDocument>, AppError> {
            self.inner.list_for_tenant(t).await
        }
    }

    fn racy_registry(failures: u32) -> SchemaRegistry {
        let store = RacyStore {
            inner: InMemorySchemaStore::new(),
            failures: AtomicU32::new(failures),
        };
        SchemaRegistry::new(Arc::new(store), TemplateCatalog::builtin())
    }

    #[tokio::test]
    async fn lost_race_is_retried_with_fresh_read() {
        let registry = racy_registry(2);
        registry.get_or_seed("T1", "contacts").await.unwrap();
        let doc = registry
            .add_field("T1", "contacts", spec("nickname", "text", false))
            .await
            .unwrap();
        assert!(doc.fields.contains_key("nickname"));
        assert_eq!(doc.revision, 2);
    }

    #[tokio::test]
    async fn persistent_race_surfaces_concurrent_modification() {
        let registry = racy_registry(MAX_SAVE_ATTEMPTS);
        registry.get_or_seed("T1", "contacts").await.unwrap();
        let result = registry
            .add_field("T1", "contacts", spec("nickname", "text", false))
            .await;
        assert!(matches!(result, Err(AppError::ConcurrentModification { .. })));

        let doc = registry.get_or_seed("T1", "contacts").await.unwrap();
        assert!(!doc.fields.contains_key("nickname"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_never_lose_acknowledged_fields() {
        let registry = registry();
        registry.get_or_seed("T1", "contacts").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let name = format!("extra{}", i);
                let result = registry
                    .add_field("T1", "contacts", spec(&name, "text", i % 2 == 0))
                    .await;
                (name, result)
            }));
        }

        let mut acknowledged = Vec::new();
        for handle in handles {
            let (name, result) = handle.await.unwrap();
            match result {
                Ok(_) => acknowledged.push(name),
                Err(AppError::ConcurrentModification { .. }) => {}
                Err(e) => panic!("erro inesperado: {e}"),
            }
        }

        let doc = registry.get_or_seed("T1", "contacts").await.unwrap();
        for name in &acknowledged {
            assert!(doc.fields.contains_key(name), "campo '{}' perdido", name);
        }
        assert_eq!(doc.revision, 1 + acknowledged.len() as i64);
        assert_referential(&doc);
    }
}

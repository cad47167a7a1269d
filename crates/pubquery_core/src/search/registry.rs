//! Named search provider registry.
//!
//! # Responsibility
//! - Register providers under validated, unique names.
//! - Resolve the default or an explicitly named provider.
//! - Hold each provider's discovered searchable-field set.
//!
//! # Invariants
//! - A provider's field set is computed at most once per registration and is
//!   published whole; it is the only shared mutable state in the query core.
//! - Resolution never falls back silently from an explicit name to the default.

use crate::config::SearchSettings;
use crate::search::provider::SearchProvider;
use log::{debug, info};
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Provider registration/resolution errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRegistryError {
    InvalidProviderName(String),
    DuplicateProviderName(String),
    ProviderNotFound(String),
    NoDefaultProvider,
}

impl Display for SearchRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidProviderName(value) => write!(f, "search provider name is invalid: {value}"),
            Self::DuplicateProviderName(value) => {
                write!(f, "search provider already registered: {value}")
            }
            Self::ProviderNotFound(value) => write!(f, "search provider not found: {value}"),
            Self::NoDefaultProvider => write!(f, "no default search provider is registered"),
        }
    }
}

impl Error for SearchRegistryError {}

pub type RegistryResult<T> = Result<T, SearchRegistryError>;

/// One registered provider with its lazily discovered field set.
pub struct RegisteredProvider {
    provider: Arc<dyn SearchProvider>,
    search_fields: OnceCell<Arc<[String]>>,
    fallback_fields: Arc<[String]>,
}

impl RegisteredProvider {
    pub fn provider(&self) -> &Arc<dyn SearchProvider> {
        &self.provider
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    /// Returns the provider's searchable fields, discovering them on first use.
    ///
    /// Falls back to the configured field list when the provider reports none.
    pub fn search_fields(&self) -> Arc<[String]> {
        self.search_fields
            .get_or_init(|| {
                let discovered = self.provider.searchable_fields();
                let fields: Arc<[String]> = if discovered.is_empty() {
                    self.fallback_fields.clone()
                } else {
                    discovered.into()
                };
                debug!(
                    "event=search_fields_discovered module=search status=ok provider={} fields={}",
                    self.provider.name(),
                    fields.len()
                );
                fields
            })
            .clone()
    }
}

/// Registry of search providers by name.
pub struct SearchProviderRegistry {
    providers: BTreeMap<String, Arc<RegisteredProvider>>,
    default_provider_name: Option<String>,
    first_registered: Option<String>,
    fallback_fields: Arc<[String]>,
}

impl SearchProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: BTreeMap::new(),
            default_provider_name: None,
            first_registered: None,
            fallback_fields: Arc::from(Vec::<String>::new()),
        }
    }

    /// Creates an empty registry using configured default name and fallback
    /// fields.
    pub fn with_settings(settings: &SearchSettings) -> Self {
        Self {
            default_provider_name: settings
                .default_provider
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            fallback_fields: settings.fallback_search_fields.clone().into(),
            ..Self::new()
        }
    }

    /// Registers one provider under its own name.
    pub fn register(
        &mut self,
        provider: Arc<dyn SearchProvider>,
    ) -> RegistryResult<()> {
        let name = provider.name().trim().to_string();
        if !is_valid_provider_name(&name) {
            return Err(SearchRegistryError::InvalidProviderName(name));
        }
        if self.providers.contains_key(name.as_str()) {
            return Err(SearchRegistryError::DuplicateProviderName(name));
        }

        let entry = RegisteredProvider {
            provider,
            search_fields: OnceCell::new(),
            fallback_fields: self.fallback_fields.clone(),
        };
        info!(
            "event=search_provider_register module=search status=ok provider={} bounded_top_n={}",
            name,
            entry.provider.supports_bounded_top_n()
        );
        if self.first_registered.is_none() {
            self.first_registered = Some(name.clone());
        }
        self.providers.insert(name, Arc::new(entry));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Returns sorted provider names.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// Selects the default provider.
    pub fn set_default(&mut self, name: &str) -> RegistryResult<()> {
        let normalized = name.trim();
        if !self.providers.contains_key(normalized) {
            return Err(SearchRegistryError::ProviderNotFound(normalized.to_string()));
        }
        self.default_provider_name = Some(normalized.to_string());
        Ok(())
    }

    /// Configured default name, or the first registered provider.
    pub fn default_provider_name(&self) -> Option<&str> {
        self.default_provider_name
            .as_deref()
            .or(self.first_registered.as_deref())
    }

    /// Returns one provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<RegisteredProvider>> {
        self.providers.get(name.trim()).cloned()
    }

    /// Resolves `name`, or the default provider when `name` is absent/blank.
    pub fn resolve(&self, name: Option<&str>) -> RegistryResult<Arc<RegisteredProvider>> {
        match name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => self
                .get(name)
                .ok_or_else(|| SearchRegistryError::ProviderNotFound(name.to_string())),
            None => {
                let default = self
                    .default_provider_name()
                    .ok_or(SearchRegistryError::NoDefaultProvider)?;
                self.get(default)
                    .ok_or_else(|| SearchRegistryError::ProviderNotFound(default.to_string()))
            }
        }
    }
}

impl Default for SearchProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_provider_name(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::{SearchProviderRegistry, SearchRegistryError};
    use crate::config::SearchSettings;
    use crate::search::criteria::SearchCriteria;
    use crate::search::provider::{SearchHits, SearchProvider};
    use crate::search::SearchResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct MockProvider {
        name: String,
        fields: Vec<String>,
        field_calls: AtomicUsize,
    }

    impl MockProvider {
        fn new(name: &str, fields: &[&str]) -> Self {
            Self {
                name: name.to_string(),
                fields: fields.iter().map(|field| field.to_string()).collect(),
                field_calls: AtomicUsize::new(0),
            }
        }
    }

    impl SearchProvider for MockProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn searchable_fields(&self) -> Vec<String> {
            self.field_calls.fetch_add(1, Ordering::SeqCst);
            self.fields.clone()
        }

        fn supports_bounded_top_n(&self) -> bool {
            true
        }

        fn search(
            &self,
            _criteria: &SearchCriteria,
            _max_results: Option<usize>,
        ) -> SearchResult<SearchHits> {
            Ok(SearchHits::empty())
        }
    }

    #[test]
    fn first_registered_provider_is_default() {
        let mut registry = SearchProviderRegistry::new();
        registry
            .register(Arc::new(MockProvider::new("internal", &["nodeName"])))
            .expect("provider should register");
        registry
            .register(Arc::new(MockProvider::new("external", &["nodeName"])))
            .expect("provider should register");

        assert_eq!(registry.default_provider_name(), Some("internal"));
        assert_eq!(registry.resolve(None).unwrap().name(), "internal");
        assert_eq!(registry.resolve(Some("   ")).unwrap().name(), "internal");
        assert_eq!(registry.resolve(Some(" external ")).unwrap().name(), "external");
    }

    #[test]
    fn rejects_invalid_or_duplicate_names() {
        let mut registry = SearchProviderRegistry::new();
        let invalid = registry.register(Arc::new(MockProvider::new("Internal Index", &[])));
        assert!(matches!(
            invalid,
            Err(SearchRegistryError::InvalidProviderName(_))
        ));

        registry
            .register(Arc::new(MockProvider::new("internal", &[])))
            .expect("first provider should register");
        let duplicate = registry.register(Arc::new(MockProvider::new("internal", &[])));
        assert!(matches!(
            duplicate,
            Err(SearchRegistryError::DuplicateProviderName(_))
        ));
    }

    #[test]
    fn explicit_unknown_name_does_not_fall_back() {
        let mut registry = SearchProviderRegistry::new();
        registry
            .register(Arc::new(MockProvider::new("internal", &[])))
            .unwrap();
        let err = registry.resolve(Some("missing")).err().unwrap();
        assert_eq!(err, SearchRegistryError::ProviderNotFound("missing".to_string()));
    }

    #[test]
    fn empty_registry_has_no_default() {
        let registry = SearchProviderRegistry::new();
        assert_eq!(
            registry.resolve(None).err(),
            Some(SearchRegistryError::NoDefaultProvider)
        );
    }

    #[test]
    fn configured_default_wins_over_registration_order() {
        let settings = SearchSettings {
            default_provider: Some("external".to_string()),
            ..SearchSettings::default()
        };
        let mut registry = SearchProviderRegistry::with_settings(&settings);
        registry
            .register(Arc::new(MockProvider::new("internal", &[])))
            .unwrap();
        registry
            .register(Arc::new(MockProvider::new("external", &[])))
            .unwrap();
        assert_eq!(registry.resolve(None).unwrap().name(), "external");

        registry.set_default("internal").unwrap();
        assert_eq!(registry.resolve(None).unwrap().name(), "internal");
    }

    #[test]
    fn search_fields_are_discovered_once() {
        let provider = Arc::new(MockProvider::new("internal", &["nodeName", "bodyText"]));
        let mut registry = SearchProviderRegistry::new();
        registry.register(provider.clone()).unwrap();

        let entry = registry.resolve(None).unwrap();
        assert_eq!(&*entry.search_fields(), ["nodeName", "bodyText"]);
        assert_eq!(&*entry.search_fields(), ["nodeName", "bodyText"]);
        assert_eq!(provider.field_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn search_fields_fall_back_to_configuration() {
        let settings = SearchSettings {
            fallback_search_fields: vec!["title".to_string()],
            ..SearchSettings::default()
        };
        let mut registry = SearchProviderRegistry::with_settings(&settings);
        registry
            .register(Arc::new(MockProvider::new("internal", &[])))
            .unwrap();
        assert_eq!(&*registry.resolve(None).unwrap().search_fields(), ["title"]);
    }
}

//! Provider router: turns the `[providers]` config tables into live clients.
//!
//! Every configured backend speaks the OpenAI wire format, so routing is a
//! matter of resolving a base URL and an API key per provider name.

use std::collections::BTreeMap;
use std::sync::Arc;

use docuroute_config::AppConfig;
use docuroute_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;

/// Connection details for one named provider after config resolution.
/// Not `Debug`: it carries the API key.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub base_url: String,
    pub api_key: String,
}

impl Endpoint {
    /// Resolve `name` against the config.
    ///
    /// The provider's own table wins; otherwise the top-level `api_key` and
    /// the well-known URL for that name are used.
    pub fn resolve(config: &AppConfig, name: &str) -> Self {
        let table = config.providers.get(name);
        let api_key = table
            .and_then(|p| p.api_key.clone())
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();
        let base_url = table
            .and_then(|p| p.api_url.clone())
            .unwrap_or_else(|| well_known_url(name));
        Self {
            name: name.to_string(),
            base_url,
            api_key,
        }
    }

    fn connect(&self) -> Arc<dyn Provider> {
        Arc::new(OpenAiCompatProvider::new(
            &self.name,
            &self.base_url,
            &self.api_key,
        ))
    }
}

/// Named providers plus the one used when nothing else is asked for.
pub struct ProviderRouter {
    providers: BTreeMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: BTreeMap::new(),
            default_provider: default_provider.into(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// The provider named by `default_provider`, if registered.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.get(&self.default_provider)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Registered provider names in sorted order.
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}

/// Build a router holding every configured provider plus the default one,
/// which is registered even when it has no table of its own.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    let names = config
        .providers
        .keys()
        .map(String::as_str)
        .chain(std::iter::once(config.default_provider.as_str()));
    for name in names {
        if router.get(name).is_none() {
            router.register(name, Endpoint::resolve(config, name).connect());
        }
    }

    tracing::debug!(providers = ?router.list(), default = %config.default_provider, "Providers configured");
    router
}

fn well_known_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        other => format!("https://{other}.api.example.com/v1"),
    }
}

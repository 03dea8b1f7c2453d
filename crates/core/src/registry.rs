//! Provider registry: the ordered list of cover sources.
//!
//! Order is priority. The default order puts the fastest, most available
//! source first and the slowest last; see [`ProviderRegistry::from_config`].
//! A registry is immutable once handed to a [`Resolver`](crate::resolve::Resolver).

use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, CustomProviderConfig, ProbeConfig, ResolveConfig};
use crate::error::ConfigError;
use crate::provider::direct::DirectProvider;
use crate::provider::search::{
    SearchProvider, GOOGLE_BOOKS_API_BASE_URL, KAKAO_BASE_URL, NAVER_BASE_URL,
};
use crate::provider::{CoverProvider, ProviderSpec};

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn CoverProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry with no providers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider at the lowest priority.
    pub fn register(&mut self, provider: Arc<dyn CoverProvider>) {
        self.providers.push(provider);
    }

    pub fn with_provider(mut self, provider: Arc<dyn CoverProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Providers in priority order.
    pub fn providers(&self) -> &[Arc<dyn CoverProvider>] {
        &self.providers
    }

    pub fn get(&self, name: &str) -> Option<&dyn CoverProvider> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    pub fn specs(&self) -> Vec<ProviderSpec> {
        self.providers.iter().map(|p| ProviderSpec::of(p.as_ref())).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Build the default registry from configuration, reading custom
    /// provider credentials from the process environment.
    pub fn from_config(cfg: &AppConfig, client: reqwest::Client) -> Result<Self, ConfigError> {
        Self::from_config_with_env(cfg, client, |key| std::env::var(key).ok())
    }

    /// Default order:
    /// 1. `google-books-direct` (URL pattern, no credential)
    /// 2. `kakao` (search API, needs an API key)
    /// 3. `naver` (search API, needs client id and secret)
    /// 4. `google-books-api` (keyless metadata API)
    /// 5. `aladin` (URL pattern, last resort)
    ///
    /// followed by any `[[custom_providers]]` in declaration order.
    pub fn from_config_with_env(
        cfg: &AppConfig,
        client: reqwest::Client,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let r = &cfg.resolve;
        let ms = Duration::from_millis;
        let on = |name: &str| !r.is_disabled(name);
        let creds = &cfg.credentials;
        let ep = &cfg.endpoints;

        let google_direct = DirectProvider::google_books(ms(r.direct_timeout_ms))
            .with_enabled(on("google-books-direct"));

        let kakao = SearchProvider::kakao(
            client.clone(),
            ep.kakao.as_deref().unwrap_or(KAKAO_BASE_URL),
            creds.kakao_api_key.as_deref(),
        )?
        .with_timeouts(ms(r.search_timeout_ms), ms(r.search_candidate_timeout_ms))
        .with_enabled(on("kakao"));

        let naver = SearchProvider::naver(
            client.clone(),
            ep.naver.as_deref().unwrap_or(NAVER_BASE_URL),
            creds.naver_client_id.as_deref(),
            creds.naver_client_secret.as_deref(),
        )?
        .with_timeouts(ms(r.search_timeout_ms), ms(r.search_candidate_timeout_ms))
        .with_enabled(on("naver"));

        let google_api = SearchProvider::google_books_api(
            client.clone(),
            ep.google_books_api.as_deref().unwrap_or(GOOGLE_BOOKS_API_BASE_URL),
        )?
        .with_timeouts(ms(r.metadata_timeout_ms), ms(r.metadata_candidate_timeout_ms))
        .with_enabled(on("google-books-api"));

        let aladin = DirectProvider::aladin(ms(r.direct_timeout_ms)).with_enabled(on("aladin"));

        let mut registry = Self::new()
            .with_provider(Arc::new(google_direct))
            .with_provider(Arc::new(kakao))
            .with_provider(Arc::new(naver))
            .with_provider(Arc::new(google_api))
            .with_provider(Arc::new(aladin));

        for custom in &cfg.custom_providers {
            let provider = custom_provider(custom, client.clone(), r, &env)?
                .with_enabled(on(&custom.name));
            registry.register(Arc::new(provider));
        }

        Ok(registry)
    }
}

fn custom_provider(
    custom: &CustomProviderConfig,
    client: reqwest::Client,
    r: &ResolveConfig,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<SearchProvider, ConfigError> {
    let credential = custom
        .credential_env
        .as_deref()
        .map(|var| env(var).filter(|v| !v.is_empty()));

    let mut provider = SearchProvider::new(&custom.name, client, &custom.url, &custom.image_path)?
        .with_timeouts(
            Duration::from_millis(custom.timeout_ms.unwrap_or(r.search_timeout_ms)),
            Duration::from_millis(custom.candidate_timeout_ms.unwrap_or(r.search_candidate_timeout_ms)),
        );

    let secret = match credential {
        // Declared but missing: skip without building headers.
        Some(None) => return Ok(provider.with_enabled(false)),
        Some(Some(secret)) => secret,
        None => String::new(),
    };
    for (name, value) in &custom.headers {
        provider = provider.with_header(name, value.replace("{credential}", &secret));
    }
    Ok(provider)
}

/// HTTP client shared by the providers and the probe of one registry.
pub fn build_client(probe: &ProbeConfig) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .user_agent(probe.user_agent.as_str())
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(r: &ProviderRegistry) -> Vec<String> {
        r.specs().into_iter().map(|s| s.name).collect()
    }

    fn enabled(r: &ProviderRegistry) -> Vec<bool> {
        r.specs().into_iter().map(|s| s.enabled).collect()
    }

    #[test]
    fn default_order_and_credential_gating() {
        let r = ProviderRegistry::from_config_with_env(&AppConfig::default(), reqwest::Client::new(), |_| None)
            .unwrap();
        assert_eq!(
            names(&r),
            vec!["google-books-direct", "kakao", "naver", "google-books-api", "aladin"]
        );
        assert_eq!(enabled(&r), vec![true, false, false, true, true]);
    }

    #[test]
    fn credentials_enable_search_providers() {
        let mut cfg = AppConfig::default();
        cfg.credentials.kakao_api_key = Some("k".into());
        cfg.credentials.naver_client_id = Some("id".into());
        cfg.credentials.naver_client_secret = Some("secret".into());
        let r = ProviderRegistry::from_config_with_env(&cfg, reqwest::Client::new(), |_| None).unwrap();
        assert_eq!(enabled(&r), vec![true, true, true, true, true]);
    }

    #[test]
    fn disabled_list_and_timeouts_apply() {
        let mut cfg = AppConfig::default();
        cfg.resolve.disabled = vec!["aladin".into(), "google-books-direct".into()];
        cfg.resolve.metadata_candidate_timeout_ms = 1234;
        let r = ProviderRegistry::from_config_with_env(&cfg, reqwest::Client::new(), |_| None).unwrap();
        assert_eq!(enabled(&r), vec![false, false, false, true, false]);
        assert_eq!(
            r.get("google-books-api").unwrap().candidate_timeout(),
            Duration::from_millis(1234)
        );
    }

    #[test]
    fn custom_providers_follow_builtins() {
        let mut cfg = AppConfig::default();
        cfg.custom_providers.push(CustomProviderConfig {
            name: "covers-api".into(),
            url: "https://covers.example/search?isbn={isbn}".into(),
            image_path: "$.results[0].imageUrl".into(),
            headers: [("Authorization".to_string(), "Bearer {credential}".to_string())].into(),
            credential_env: Some("COVERS_TOKEN".into()),
            timeout_ms: None,
            candidate_timeout_ms: Some(1500),
        });
        cfg.custom_providers.push(CustomProviderConfig {
            name: "open-covers".into(),
            url: "https://open.example/{isbn}.json".into(),
            image_path: "$.cover".into(),
            headers: Default::default(),
            credential_env: None,
            timeout_ms: None,
            candidate_timeout_ms: None,
        });

        let r = ProviderRegistry::from_config_with_env(&cfg, reqwest::Client::new(), |_| None).unwrap();
        assert_eq!(names(&r)[5..], ["covers-api", "open-covers"]);
        assert_eq!(enabled(&r)[5..], [false, true]);

        let r = ProviderRegistry::from_config_with_env(&cfg, reqwest::Client::new(), |k| {
            (k == "COVERS_TOKEN").then(|| "t0k".to_string())
        })
        .unwrap();
        assert!(r.get("covers-api").unwrap().is_enabled());
        assert_eq!(
            r.get("covers-api").unwrap().candidate_timeout(),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn bad_custom_json_path_fails_construction() {
        let mut cfg = AppConfig::default();
        cfg.custom_providers.push(CustomProviderConfig {
            name: "broken".into(),
            url: "https://x/{isbn}".into(),
            image_path: "results[".into(),
            headers: Default::default(),
            credential_env: None,
            timeout_ms: None,
            candidate_timeout_ms: None,
        });
        let err = ProviderRegistry::from_config_with_env(&cfg, reqwest::Client::new(), |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJsonPath { .. }));
    }
}

//! Provider orchestration with ordered failover
//!
//! The active provider is tried first. When it fails and fallback is
//! enabled, the remaining providers are tried in the configured fallback
//! order; the first success wins and nothing after it is called. Every
//! failure along the way is logged and returned as a warning on the result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::Serialize;

use crate::cache::ContextCache;
use crate::command::transform::CommandResult;
use crate::core::config::{GalaxyConfig, ProvidersConfig};
use crate::llm::client::HttpProvider;
use crate::llm::context::{DetailLevel, SceneProjector};
use crate::llm::parser::parse_response;
use crate::llm::provider::{ChunkSink, CommandRequest, Provider, ProviderError};
use crate::llm::settings::SettingsStore;
use crate::scene::snapshot::SceneSnapshot;

/// Per-provider status, gathered without calling any backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderHealth {
    pub id: String,
    pub available: bool,
    pub streaming: bool,
    pub active: bool,
}

#[derive(Debug, Default)]
pub struct OrchestratorStats {
    executions: AtomicU64,
    successes: AtomicU64,
    provider_failures: AtomicU64,
    exhaustions: AtomicU64,
}

impl OrchestratorStats {
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    pub fn provider_failures(&self) -> u64 {
        self.provider_failures.load(Ordering::Relaxed)
    }

    pub fn exhaustions(&self) -> u64 {
        self.exhaustions.load(Ordering::Relaxed)
    }
}

/// Routes commands to registered providers
pub struct ProviderOrchestrator {
    providers: AHashMap<String, Arc<dyn Provider>>,
    fallback_order: Vec<String>,
    fallback_enabled: bool,
    active: RwLock<Option<String>>,
    projector: SceneProjector,
    context_level: DetailLevel,
    cache: Arc<ContextCache>,
    settings: Arc<dyn SettingsStore>,
    stats: OrchestratorStats,
}

impl ProviderOrchestrator {
    /// Empty orchestrator; providers are added with `register`
    ///
    /// The active provider comes from the settings store when it has one,
    /// otherwise from the configuration.
    pub fn new(
        config: &GalaxyConfig,
        cache: Arc<ContextCache>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        let active = match settings.load_active() {
            Ok(Some(id)) => Some(id),
            Ok(None) => config.providers.active.clone(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not load saved provider, using config");
                config.providers.active.clone()
            }
        };

        Self {
            providers: AHashMap::new(),
            fallback_order: config.providers.fallback_order.clone(),
            fallback_enabled: config.providers.fallback_enabled,
            active: RwLock::new(active),
            projector: SceneProjector::new(&config.projection),
            context_level: config.projection.default_level,
            cache,
            settings,
            stats: OrchestratorStats::default(),
        }
    }

    /// Orchestrator with one HTTP provider per configured endpoint
    pub fn with_http_providers(
        config: &GalaxyConfig,
        cache: Arc<ContextCache>,
        settings: Arc<dyn SettingsStore>,
    ) -> Result<Self, ProviderError> {
        let mut orchestrator = Self::new(config, cache, settings);
        orchestrator.register_endpoints(&config.providers)?;
        Ok(orchestrator)
    }

    fn register_endpoints(&mut self, providers: &ProvidersConfig) -> Result<(), ProviderError> {
        for endpoint in &providers.endpoints {
            self.register(Arc::new(HttpProvider::from_endpoint(endpoint)?));
        }
        Ok(())
    }

    /// Add or replace a provider under its id
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let id = provider.id().to_string();
        if self.providers.insert(id.clone(), provider).is_some() {
            tracing::debug!(provider = %id, "Replaced provider registration");
        }
    }

    pub fn provider(&self, id: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.get(id)
    }

    pub fn active(&self) -> Option<String> {
        self.active.read().clone()
    }

    /// Switch the active provider and persist the choice
    pub fn set_active(&self, id: &str) -> Result<(), ProviderError> {
        if !self.providers.contains_key(id) {
            return Err(ProviderError::configuration(format!("unknown provider '{}'", id)));
        }

        self.settings.save_active(id).map_err(|e| {
            ProviderError::configuration(format!("failed to save active provider: {}", e))
                .with_provider(id)
                .with_source(e)
        })?;

        let previous = self.active.write().replace(id.to_string());
        tracing::info!(provider = id, previous = ?previous, "Active provider changed");
        Ok(())
    }

    /// Registered ids: fallback order first, then any others sorted
    pub fn provider_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .fallback_order
            .iter()
            .filter(|id| self.providers.contains_key(id.as_str()))
            .cloned()
            .collect();

        let mut rest: Vec<String> = self
            .providers
            .keys()
            .filter(|id| !ids.contains(id))
            .cloned()
            .collect();
        rest.sort();
        ids.extend(rest);
        ids
    }

    /// First provider that would be tried and is available
    pub fn first_available(&self) -> Option<String> {
        let active = self.active();
        active
            .iter()
            .chain(self.fallback_order.iter())
            .find(|id| self.providers.get(id.as_str()).map_or(false, |p| p.is_available()))
            .cloned()
    }

    pub fn health_check(&self) -> Vec<ProviderHealth> {
        let active = self.active();
        self.provider_ids()
            .into_iter()
            .filter_map(|id| {
                let provider = self.providers.get(&id)?;
                Some(ProviderHealth {
                    available: provider.is_available(),
                    streaming: provider.supports_streaming(),
                    active: active.as_deref() == Some(id.as_str()),
                    id,
                })
            })
            .collect()
    }

    pub fn stats(&self) -> &OrchestratorStats {
        &self.stats
    }

    fn request(&self, command: &str, snapshot: &SceneSnapshot) -> CommandRequest {
        let context = self
            .projector
            .project_cached(&self.cache, snapshot, self.context_level);
        CommandRequest::new(command, context)
    }

    /// Providers in attempt order: active first, then the fallback order
    ///
    /// The active provider is not repeated. Ids without a registration are
    /// skipped.
    fn attempt_order(&self) -> Vec<Arc<dyn Provider>> {
        let active = self.active();
        let mut order: Vec<Arc<dyn Provider>> = Vec::new();

        if let Some(provider) = active.as_deref().and_then(|id| self.providers.get(id)) {
            order.push(Arc::clone(provider));
        }
        if !self.fallback_enabled {
            return order;
        }

        for id in &self.fallback_order {
            if active.as_deref() == Some(id.as_str()) {
                continue;
            }
            if let Some(provider) = self.providers.get(id) {
                order.push(Arc::clone(provider));
            }
        }
        order
    }

    fn finish(&self, mut result: CommandResult, warnings: Vec<String>, snapshot: &SceneSnapshot) -> CommandResult {
        result.validate(snapshot);
        let mut all = warnings;
        all.append(&mut result.warnings);
        result.warnings = all;
        self.stats.successes.fetch_add(1, Ordering::Relaxed);
        result
    }

    fn record_failure(&self, id: &str, error: &ProviderError, warnings: &mut Vec<String>) {
        self.stats.provider_failures.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(provider = id, kind = %error.kind, detail = %error.detail, "Provider failed");
        warnings.push(format!("{}: {}", id, error.kind.user_message()));
    }

    fn exhausted(&self, last_error: Option<ProviderError>) -> ProviderError {
        self.stats.exhaustions.fetch_add(1, Ordering::Relaxed);
        tracing::error!("All providers unavailable");
        let error = ProviderError::unavailable("all providers unavailable");
        match last_error {
            Some(last) => error.with_source(last),
            None => error,
        }
    }

    /// Run a command, failing over across providers
    ///
    /// With fallback disabled the active provider's error is returned as is.
    pub async fn execute(
        &self,
        command: &str,
        snapshot: &SceneSnapshot,
    ) -> Result<CommandResult, ProviderError> {
        self.stats.executions.fetch_add(1, Ordering::Relaxed);
        let request = self.request(command, snapshot);
        self.execute_request(&request, snapshot, Vec::new()).await
    }

    async fn execute_request(
        &self,
        request: &CommandRequest,
        snapshot: &SceneSnapshot,
        mut warnings: Vec<String>,
    ) -> Result<CommandResult, ProviderError> {
        let order = self.attempt_order();
        if order.is_empty() && !self.fallback_enabled {
            return Err(ProviderError::configuration("no active provider"));
        }

        let mut last_error = None;
        for provider in order {
            let id = provider.id().to_string();
            if !provider.is_available() {
                tracing::debug!(provider = %id, "Skipping unavailable provider");
                if !self.fallback_enabled {
                    return Err(ProviderError::unavailable("active provider is not available")
                        .with_provider(id));
                }
                continue;
            }

            let outcome = match provider.execute(request).await {
                Ok(raw) => parse_response(&raw, &id),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(result) => {
                    tracing::info!(provider = %id, request_id = %request.id, "Command executed");
                    return Ok(self.finish(result, warnings, snapshot));
                }
                Err(e) if !self.fallback_enabled => return Err(e.with_provider(id)),
                Err(e) => {
                    self.record_failure(&id, &e, &mut warnings);
                    last_error = Some(e);
                }
            }
        }

        Err(self.exhausted(last_error))
    }

    /// Streaming variant of `execute`
    ///
    /// Only streaming-capable providers are tried. If none succeeds the call
    /// degrades to `execute` and the complete reply is passed to `on_chunk`
    /// once.
    ///
    /// Chunks already forwarded by a streaming provider that later failed are
    /// not retracted. The degraded reply is complete on its own, so callers
    /// that accumulate chunks should restart their buffer when
    /// `CommandResult::raw_response` differs from what they collected.
    pub async fn execute_streaming<F>(
        &self,
        command: &str,
        snapshot: &SceneSnapshot,
        on_chunk: F,
    ) -> Result<CommandResult, ProviderError>
    where
        F: Fn(&str) + Send + Sync,
    {
        self.stats.executions.fetch_add(1, Ordering::Relaxed);
        let request = self.request(command, snapshot);
        let sink: ChunkSink<'_> = &on_chunk;
        let mut warnings = Vec::new();

        for provider in self.attempt_order() {
            if !(provider.is_available() && provider.supports_streaming()) {
                continue;
            }
            let id = provider.id().to_string();

            let outcome = match provider.execute_streaming(&request, sink).await {
                Ok(raw) => parse_response(&raw, &id),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(result) => {
                    tracing::info!(provider = %id, request_id = %request.id, "Streamed command executed");
                    return Ok(self.finish(result, warnings, snapshot));
                }
                Err(e) if !self.fallback_enabled => return Err(e.with_provider(id)),
                Err(e) => self.record_failure(&id, &e, &mut warnings),
            }
        }

        tracing::debug!("No streaming provider succeeded, falling back to execute");
        let result = self.execute_request(&request, snapshot, warnings).await?;
        on_chunk(&result.raw_response);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CacheConfig;
    use crate::llm::provider::ErrorKind;
    use crate::llm::settings::MemorySettingsStore;
    use crate::scene::record::ObjectRecord;
    use async_trait::async_trait;
    use glam::Vec3;
    use std::sync::atomic::AtomicUsize;

    const REPLY: &str = r#"{"transformations": [{"target": {"object": 1}, "kind": "delete"}], "feedback": "deleted"}"#;

    struct FakeProvider {
        id: String,
        available: bool,
        streaming: bool,
        reply: Result<String, ErrorKind>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn ok(id: &str) -> Arc<Self> {
            Self::build(id, true, Ok(REPLY.to_string()))
        }

        fn failing(id: &str, kind: ErrorKind) -> Arc<Self> {
            Self::build(id, true, Err(kind))
        }

        fn build(id: &str, available: bool, reply: Result<String, ErrorKind>) -> Arc<Self> {
            Arc::new(Self {
                id: id.into(),
                available,
                streaming: false,
                reply,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for FakeProvider {
        fn id(&self) -> &str {
            &self.id
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn supports_streaming(&self) -> bool {
            self.streaming
        }

        async fn execute(&self, _request: &CommandRequest) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .map_err(|kind| ProviderError::new(kind, "scripted failure"))
        }
    }

    fn snapshot() -> SceneSnapshot {
        SceneSnapshot::new(
            "TestGalaxy",
            None,
            vec![ObjectRecord::simple(1, "Goomba1", "enemy", Vec3::ZERO).unwrap()],
        )
        .unwrap()
    }

    fn orchestrator(order: &[&str], active: Option<&str>, fallback: bool) -> ProviderOrchestrator {
        let mut config = GalaxyConfig::default();
        config.providers.fallback_order = order.iter().map(|s| s.to_string()).collect();
        config.providers.active = active.map(String::from);
        config.providers.fallback_enabled = fallback;
        ProviderOrchestrator::new(
            &config,
            Arc::new(ContextCache::new(CacheConfig::default())),
            Arc::new(MemorySettingsStore::new()),
        )
    }

    #[tokio::test]
    async fn test_failover_two_fail_one_succeeds() {
        let a = FakeProvider::failing("a", ErrorKind::Network);
        let b = FakeProvider::failing("b", ErrorKind::RateLimit);
        let c = FakeProvider::ok("c");

        let mut orch = orchestrator(&["a", "b", "c"], Some("a"), true);
        orch.register(a.clone());
        orch.register(b.clone());
        orch.register(c.clone());

        let result = orch.execute("delete goomba1", &snapshot()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.provider.as_deref(), Some("c"));
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].starts_with("a:"));
        assert!(result.warnings[1].starts_with("b:"));
        assert_eq!((a.calls(), b.calls(), c.calls()), (1, 1, 1));
        assert_eq!(orch.stats().provider_failures(), 2);
        assert_eq!(orch.stats().successes(), 1);
    }

    #[tokio::test]
    async fn test_first_success_stops_the_sweep() {
        let a = FakeProvider::ok("a");
        let b = FakeProvider::ok("b");
        let mut orch = orchestrator(&["a", "b"], None, true);
        orch.register(a.clone());
        orch.register(b.clone());

        orch.execute("delete goomba1", &snapshot()).await.unwrap();
        assert_eq!((a.calls(), b.calls()), (1, 0));
    }

    #[tokio::test]
    async fn test_active_is_not_retried_in_fallback() {
        let a = FakeProvider::failing("a", ErrorKind::Timeout);
        let b = FakeProvider::failing("b", ErrorKind::Timeout);
        let mut orch = orchestrator(&["a", "b"], Some("b"), true);
        orch.register(a.clone());
        orch.register(b.clone());

        let err = orch.execute("x", &snapshot()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
        assert_eq!(err.detail, "all providers unavailable");
        assert_eq!((a.calls(), b.calls()), (1, 1));
        assert_eq!(orch.stats().exhaustions(), 1);
    }

    #[tokio::test]
    async fn test_fallback_disabled_propagates_first_error() {
        let a = FakeProvider::failing("a", ErrorKind::Authentication);
        let b = FakeProvider::ok("b");
        let mut orch = orchestrator(&["a", "b"], Some("a"), false);
        orch.register(a.clone());
        orch.register(b.clone());

        let err = orch.execute("x", &snapshot()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(err.provider.as_deref(), Some("a"));
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_providers_are_skipped() {
        let a = FakeProvider::build("a", false, Ok(REPLY.to_string()));
        let b = FakeProvider::ok("b");
        let mut orch = orchestrator(&["a", "b"], Some("a"), true);
        orch.register(a.clone());
        orch.register(b.clone());

        let result = orch.execute("x", &snapshot()).await.unwrap();
        assert_eq!(result.provider.as_deref(), Some("b"));
        assert_eq!(a.calls(), 0);
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_reply_fails_over() {
        let a = FakeProvider::build("a", true, Ok("no json here".into()));
        let b = FakeProvider::ok("b");
        let mut orch = orchestrator(&["a", "b"], None, true);
        orch.register(a.clone());
        orch.register(b.clone());

        let result = orch.execute("x", &snapshot()).await.unwrap();
        assert_eq!(result.provider.as_deref(), Some("b"));
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_streaming_degrades_to_execute() {
        let a = FakeProvider::ok("a");
        let mut orch = orchestrator(&["a"], None, true);
        orch.register(a.clone());

        let chunks = parking_lot::Mutex::new(Vec::new());
        let result = orch
            .execute_streaming("x", &snapshot(), |chunk| chunks.lock().push(chunk.to_string()))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(chunks.lock().as_slice(), &[REPLY.to_string()]);
        assert_eq!(a.calls(), 1);
    }

    #[test]
    fn test_set_active_persists_and_rejects_unknown() {
        let settings = Arc::new(MemorySettingsStore::new());
        let mut orch = ProviderOrchestrator::new(
            &GalaxyConfig::default(),
            Arc::new(ContextCache::default()),
            settings.clone(),
        );
        orch.register(FakeProvider::ok("openai"));

        orch.set_active("openai").unwrap();
        assert_eq!(orch.active().as_deref(), Some("openai"));
        assert_eq!(settings.save_count(), 1);

        let err = orch.set_active("missing").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert_eq!(orch.active().as_deref(), Some("openai"));
        assert_eq!(settings.save_count(), 1);
    }

    #[test]
    fn test_health_check_and_first_available_have_no_side_effects() {
        let a = FakeProvider::build("anthropic", false, Ok(REPLY.to_string()));
        let b = FakeProvider::ok("openai");
        let mut orch = orchestrator(&["anthropic", "openai"], Some("anthropic"), true);
        orch.register(a.clone());
        orch.register(b.clone());

        assert_eq!(orch.first_available().as_deref(), Some("openai"));
        let health = orch.health_check();
        assert_eq!(health.len(), 2);
        assert_eq!(health[0].id, "anthropic");
        assert!(health[0].active);
        assert!(!health[0].available);
        assert!(health[1].available);
        assert_eq!((a.calls(), b.calls()), (0, 0));
    }

    #[test]
    fn test_saved_active_overrides_config() {
        let mut config = GalaxyConfig::default();
        config.providers.active = Some("anthropic".into());
        let orch = ProviderOrchestrator::new(
            &config,
            Arc::new(ContextCache::default()),
            Arc::new(MemorySettingsStore::with_active("deepseek")),
        );
        assert_eq!(orch.active().as_deref(), Some("deepseek"));
    }
}

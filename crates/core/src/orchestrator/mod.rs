//! Resilience orchestrator
//!
//! The single entry point request handlers use. It maps an operation name to
//! a resolved [`ResilienceConfig`], keeps one [`CircuitBreaker`] per
//! operation and runs calls through a [`RetryExecutor`].
//!
//! The host builds one orchestrator at startup and shares it (usually behind
//! an `Arc`) with every handler; there is no global instance.
//!
//! ```rust,ignore
//! let orchestrator = Orchestrator::builder(settings)
//!     .with_metrics(Arc::clone(&metrics))
//!     .build()?;
//! orchestrator.register("summarize", OperationStrategy::Conservative)?;
//!
//! let summary = orchestrator
//!     .execute("summarize", || client.summarize(&document))
//!     .await?;
//! ```

mod health;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bulwark_common::resilience::{
    AttemptObserver, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState,
    Clock, DefaultClassifier, ExecutionContext, FailureClassifier, ResilienceResult,
    RetryExecutor, SystemClock, TransitionListener,
};
use bulwark_domain::{ConfigResult, OperationStrategy, ResilienceConfig};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

pub use health::{HealthReport, HealthStatus};

use crate::config::{validate_operation_name, ResilienceSettings};
use crate::metrics::{MetricsCollector, MetricsEvent};
use crate::resilience_event_ports::{NoopEventSink, ResilienceEventSink, SinkAdapter};

const DEFAULT_CONFIG_SOURCE: &str = "settings";

/// Builder for [`Orchestrator`]
pub struct OrchestratorBuilder<C: Clock = SystemClock> {
    settings: ResilienceSettings,
    clock: Arc<C>,
    sink: Option<Arc<dyn ResilienceEventSink>>,
    metrics: Option<Arc<MetricsCollector<C>>>,
    classifier: Arc<dyn FailureClassifier>,
    config_source: String,
}

impl OrchestratorBuilder<SystemClock> {
    pub fn new(settings: ResilienceSettings) -> Self {
        Self {
            settings,
            clock: Arc::new(SystemClock),
            sink: None,
            metrics: None,
            classifier: Arc::new(DefaultClassifier),
            config_source: DEFAULT_CONFIG_SOURCE.to_string(),
        }
    }

    /// Drive breakers (and the metrics collector) from another clock
    pub fn with_clock<C2: Clock>(self, clock: Arc<C2>) -> OrchestratorBuilder<C2> {
        OrchestratorBuilder {
            settings: self.settings,
            clock,
            sink: self.sink,
            metrics: None,
            classifier: self.classifier,
            config_source: self.config_source,
        }
    }
}

impl<C: Clock> OrchestratorBuilder<C> {
    /// Collector that receives every event and is reachable through
    /// [`Orchestrator::metrics`]
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector<C>>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Send events to `sink` instead of the metrics collector
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn ResilienceEventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Label recorded with configuration-load events (`env`, a file path, ...)
    #[must_use]
    pub fn with_config_source(mut self, source: impl Into<String>) -> Self {
        self.config_source = source.into();
        self
    }

    /// Validate the settings and build the orchestrator
    ///
    /// # Errors
    /// Returns the first [`bulwark_domain::ConfigError`] the settings produce.
    /// A configuration-load event is recorded either way.
    pub fn build(self) -> ConfigResult<Orchestrator<C>> {
        let sink: Arc<dyn ResilienceEventSink> = match (self.sink, &self.metrics) {
            (Some(sink), _) => sink,
            (None, Some(metrics)) => Arc::clone(metrics) as Arc<dyn ResilienceEventSink>,
            (None, None) => Arc::new(NoopEventSink),
        };

        let validation = self.settings.validate();
        record_config_load(&*sink, &self.settings, &self.config_source, validation.as_ref().err());
        validation?;

        info!(preset = %self.settings.preset, source = %self.config_source, "Resilience orchestrator configured");
        Ok(Orchestrator {
            settings: RwLock::new(SettingsState { generation: 0, settings: Arc::new(self.settings) }),
            registrations: DashMap::new(),
            configs: DashMap::new(),
            breakers: DashMap::new(),
            clock: self.clock,
            adapter: Arc::new(SinkAdapter::new(Arc::clone(&sink))),
            sink,
            metrics: self.metrics,
            classifier: self.classifier,
        })
    }
}

fn record_config_load(
    sink: &dyn ResilienceEventSink,
    settings: &ResilienceSettings,
    source: &str,
    error: Option<&bulwark_domain::ConfigError>,
) {
    if let Some(err) = error {
        warn!(preset = %settings.preset, source, error = %err, "Resilience configuration rejected");
    }
    sink.record(MetricsEvent::ConfigLoaded {
        preset: settings.preset.to_string(),
        source: source.to_string(),
        success: error.is_none(),
        message: error.map(ToString::to_string),
    });
}

/// Settings plus a counter bumped on every successful reconfigure
struct SettingsState {
    generation: u64,
    settings: Arc<ResilienceSettings>,
}

/// Resolved config tagged with the settings generation it came from
#[derive(Clone, Copy)]
struct CachedConfig {
    generation: u64,
    config: ResilienceConfig,
}

/// Registry of operations plus the composed breaker and retry machinery
pub struct Orchestrator<C: Clock = SystemClock> {
    settings: RwLock<SettingsState>,
    registrations: DashMap<String, OperationStrategy>,
    configs: DashMap<String, CachedConfig>,
    breakers: DashMap<String, Arc<CircuitBreaker<C>>>,
    clock: Arc<C>,
    sink: Arc<dyn ResilienceEventSink>,
    adapter: Arc<SinkAdapter>,
    metrics: Option<Arc<MetricsCollector<C>>>,
    classifier: Arc<dyn FailureClassifier>,
}

impl<C: Clock> fmt::Debug for Orchestrator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("preset", &self.settings.read().settings.preset)
            .field("registrations", &self.registrations.len())
            .field("breakers", &self.breakers.len())
            .finish_non_exhaustive()
    }
}

impl Orchestrator<SystemClock> {
    pub fn builder(settings: ResilienceSettings) -> OrchestratorBuilder<SystemClock> {
        OrchestratorBuilder::new(settings)
    }
}

impl<C: Clock> Orchestrator<C> {
    /// Current settings
    pub fn settings(&self) -> Arc<ResilienceSettings> {
        self.settings.read().settings.clone()
    }

    fn current_settings(&self) -> (u64, Arc<ResilienceSettings>) {
        let state = self.settings.read();
        (state.generation, state.settings.clone())
    }

    /// Cache `config` unless a newer generation already wrote the entry
    fn cache_config(&self, operation: &str, generation: u64, config: ResilienceConfig) {
        self.configs
            .entry(operation.to_string())
            .and_modify(|cached| {
                if cached.generation <= generation {
                    *cached = CachedConfig { generation, config };
                }
            })
            .or_insert(CachedConfig { generation, config });
    }

    /// Collector given to the builder, if any
    pub fn metrics(&self) -> Option<&Arc<MetricsCollector<C>>> {
        self.metrics.as_ref()
    }

    /// Register an operation under a strategy
    ///
    /// Registering again replaces the strategy. The config is resolved
    /// immediately so a bad registration fails here rather than on the first
    /// call.
    ///
    /// # Errors
    /// Returns a [`bulwark_domain::ConfigError`] for an invalid operation name
    /// or when the resolved config is invalid.
    pub fn register(&self, operation: &str, strategy: OperationStrategy) -> ConfigResult<()> {
        validate_operation_name(operation)?;
        let (generation, settings) = self.current_settings();
        let config = settings.resolve_operation(operation, Some(strategy))?;
        self.sync_breaker(operation, &config)?;

        self.registrations.insert(operation.to_string(), strategy);
        self.cache_config(operation, generation, config);
        info!(operation, %strategy, "Registered resilient operation");
        Ok(())
    }

    /// Registered operations and their strategies, sorted by name
    pub fn registered_operations(&self) -> Vec<(String, OperationStrategy)> {
        let mut operations: Vec<(String, OperationStrategy)> =
            self.registrations.iter().map(|e| (e.key().clone(), *e.value())).collect();
        operations.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        operations
    }

    /// Strategy `operation` runs with
    pub fn strategy_for(&self, operation: &str) -> OperationStrategy {
        let registered = self.registrations.get(operation).map(|e| *e.value());
        self.settings().strategy_for(operation, registered)
    }

    /// Resolved config for `operation`, cached after the first resolution
    ///
    /// Unregistered operations resolve through the preset and the default
    /// strategy. Entries resolved against settings older than the current
    /// ones are ignored and resolved again.
    ///
    /// # Errors
    /// Returns a [`bulwark_domain::ConfigError`] for invalid operation names.
    pub fn operation_config(&self, operation: &str) -> ConfigResult<ResilienceConfig> {
        let (generation, settings) = self.current_settings();
        if let Some(cached) = self.configs.get(operation) {
            if cached.generation == generation {
                return Ok(cached.config);
            }
        }

        let registered = self.registrations.get(operation).map(|e| *e.value());
        let config = settings.resolve_operation(operation, registered)?;
        self.sync_breaker(operation, &config)?;
        self.cache_config(operation, generation, config);
        debug!(operation, ?config, "Resolved operation config");
        Ok(config)
    }

    /// Push new thresholds to an existing breaker
    fn sync_breaker(&self, operation: &str, config: &ResilienceConfig) -> ConfigResult<()> {
        let wanted = CircuitBreakerConfig::from(config);
        if let Some(breaker) = self.breakers.get(operation) {
            if breaker.config() != wanted {
                breaker.update_config(wanted)?;
                debug!(operation, "Circuit breaker adopted new thresholds");
            }
        }
        Ok(())
    }

    fn breaker(
        &self,
        operation: &str,
        config: &ResilienceConfig,
    ) -> ConfigResult<Arc<CircuitBreaker<C>>> {
        if let Some(breaker) = self.breakers.get(operation) {
            return Ok(Arc::clone(breaker.value()));
        }

        let entry = self.breakers.entry(operation.to_string()).or_try_insert_with(|| {
            let listener: Arc<dyn TransitionListener> = self.adapter.clone();
            CircuitBreaker::with_clock(
                operation,
                CircuitBreakerConfig::from(config),
                Arc::clone(&self.clock),
            )
            .map(|breaker| Arc::new(breaker.with_listener(listener)))
        })?;
        Ok(Arc::clone(entry.value()))
    }

    /// Run `call` with the operation's retry and circuit breaker policy
    ///
    /// # Errors
    /// Returns the terminal [`bulwark_common::ResilienceError`]: configuration,
    /// permanent upstream failure, exhausted retries, open circuit or
    /// cancellation.
    pub async fn execute<F, Fut, T, E>(&self, operation: &str, call: F) -> ResilienceResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.execute_with_context(operation, &ExecutionContext::new(), call).await
    }

    /// [`Orchestrator::execute`] with a per-attempt timeout and cancellation
    ///
    /// # Errors
    /// As [`Orchestrator::execute`].
    #[instrument(skip(self, context, call))]
    pub async fn execute_with_context<F, Fut, T, E>(
        &self,
        operation: &str,
        context: &ExecutionContext,
        call: F,
    ) -> ResilienceResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let config = self.operation_config(operation)?;
        let breaker = self.breaker(operation, &config)?;

        let observer: Arc<dyn AttemptObserver> = self.adapter.clone();
        RetryExecutor::new(operation, config, breaker)
            .with_classifier(Arc::clone(&self.classifier))
            .with_observer(observer)
            .execute(context, call)
            .await
    }

    /// Current circuit state, if the operation has a breaker yet
    pub fn circuit_state(&self, operation: &str) -> Option<CircuitState> {
        self.breakers.get(operation).map(|breaker| breaker.state())
    }

    /// Breaker counters, if the operation has a breaker yet
    pub fn circuit_metrics(&self, operation: &str) -> Option<CircuitBreakerMetrics> {
        self.breakers.get(operation).map(|breaker| breaker.metrics())
    }

    /// Force an operation's circuit closed
    ///
    /// Returns `false` when the operation has no breaker.
    pub fn reset_circuit(&self, operation: &str) -> bool {
        match self.breakers.get(operation) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    /// Health of one operation's circuit, or of every circuit
    ///
    /// An open circuit whose recovery timeout has elapsed is listed as
    /// half-open: the breaker only moves there on its next admission, but the
    /// next call will be let through as a trial.
    pub fn health(&self, operation: Option<&str>) -> HealthReport {
        let mut open = Vec::new();
        let mut half_open = Vec::new();
        let mut checked = 0;

        let mut inspect = |name: &str, breaker: &CircuitBreaker<C>| {
            checked += 1;
            match breaker.state() {
                CircuitState::Open if breaker.retry_after() == Some(Duration::ZERO) => {
                    half_open.push(name.to_string());
                }
                CircuitState::Open => open.push(name.to_string()),
                CircuitState::HalfOpen => half_open.push(name.to_string()),
                CircuitState::Closed => {}
            }
        };

        match operation {
            Some(name) => {
                if let Some(breaker) = self.breakers.get(name) {
                    inspect(name, breaker.value().as_ref());
                }
            }
            None => {
                for entry in self.breakers.iter() {
                    inspect(entry.key(), entry.value().as_ref());
                }
            }
        }

        HealthReport::from_circuits(open, half_open, checked)
    }

    /// Replace the settings
    ///
    /// The new settings are validated (including every registered operation)
    /// before anything changes. The settings generation is bumped, which
    /// invalidates every cached config, including one a concurrent resolution
    /// writes after the swap. Breakers keep
    /// their state and adopt new thresholds when their operation next
    /// resolves.
    ///
    /// # Errors
    /// Returns the first [`bulwark_domain::ConfigError`]; the old settings stay
    /// in effect.
    pub fn reconfigure(&self, settings: ResilienceSettings, source: &str) -> ConfigResult<()> {
        let validation = settings.validate().and_then(|()| {
            self.registrations
                .iter()
                .try_for_each(|e| settings.resolve_operation(e.key(), Some(*e.value())).map(drop))
        });
        record_config_load(&*self.sink, &settings, source, validation.as_ref().err());
        validation?;

        {
            let mut state = self.settings.write();
            state.generation += 1;
            state.settings = Arc::new(settings);
            self.configs.clear();
        }
        info!(source, "Resilience configuration reloaded");
        Ok(())
    }
}

//! WardenRuntime: construction, background loops, and operator calls.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use warden_chain::{ChainAnalyzer, ChainReport};
use warden_core::config::WardenConfig;
use warden_core::errors::{ConfigError, WardenError, WardenResult};
use warden_core::models::{
    AbTestStatus, Action, Decision, ExecutionRecord, OptimizationProposal, ParameterValue,
    PatternDelta, PatternKey, ProposalState, RollbackRecord, SystemMetrics,
};
use warden_core::traits::{IParameterProvider, IRule};
use warden_engine::{CancellationToken, ExecutionEngine, RuleRegistry};
use warden_storage::{
    LearningStore, ParameterStore, PatternEffectiveness, RetentionReport, WriteStats,
};
use warden_tuning::scheduler::{spawn_periodic, spawn_tuner};
use warden_tuning::{AbTestManager, CycleReport, TunedParameters, Tuner};

/// `storage.db_path` value selecting an in-memory database.
pub const IN_MEMORY_DB: &str = ":memory:";

pub struct WardenRuntime {
    config: WardenConfig,
    store: Arc<LearningStore>,
    parameters: Arc<ParameterStore>,
    ab_tests: Arc<AbTestManager>,
    engine: ExecutionEngine,
    tuner: Arc<Tuner>,
    chain: ChainAnalyzer,
    shutdown: watch::Sender<bool>,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

impl WardenRuntime {
    /// Open the store named by `config.storage.db_path`, hydrate parameters
    /// and build the engine and tuner over `rules`.
    ///
    /// Background loops (tuner, retention) start when called inside a Tokio
    /// runtime and `tuner.enabled` is set.
    pub fn open(config: WardenConfig, rules: Vec<Arc<dyn IRule>>) -> WardenResult<Self> {
        config.validate()?;
        warden_observability::init_tracing(&config.observability);
        let store = Arc::new(open_store(&config)?);
        Self::with_store(config, rules, store)
    }

    /// Resolve `root/warden.toml` and `WARDEN_*` overrides, then [`open`](Self::open).
    /// A relative `db_path` is taken relative to `root`.
    pub fn open_project(root: &Path, rules: Vec<Arc<dyn IRule>>) -> WardenResult<Self> {
        let mut config = WardenConfig::load(root)?;
        let relative = Path::new(&config.storage.db_path).is_relative();
        if relative && config.storage.db_path != IN_MEMORY_DB {
            config.storage.db_path = root
                .join(&config.storage.db_path)
                .to_string_lossy()
                .into_owned();
        }
        Self::open(config, rules)
    }

    /// Build over an already opened store.
    pub fn with_store(
        config: WardenConfig,
        rules: Vec<Arc<dyn IRule>>,
        store: Arc<LearningStore>,
    ) -> WardenResult<Self> {
        let registry = Arc::new(RuleRegistry::with_rules(rules)?);
        let parameters = Arc::new(ParameterStore::hydrate(Arc::clone(&store))?);
        let ab_tests = Arc::new(AbTestManager::new(config.ab_test.clone()));

        let provider: Arc<dyn IParameterProvider> = Arc::new(TunedParameters::new(
            Arc::clone(&parameters),
            Arc::clone(&ab_tests),
        ));
        let engine = ExecutionEngine::new(
            Arc::clone(&registry),
            provider,
            store.sink(),
            config.engine.clone(),
        );
        let descriptors = registry.descriptors();
        let tuner = Arc::new(Tuner::new(
            Arc::clone(&store),
            Arc::clone(&parameters),
            Arc::clone(&ab_tests),
            descriptors.clone(),
            config.engine.clone(),
            config.tuner.clone(),
        )?);
        let (shutdown, _) = watch::channel(false);

        let runtime = Self {
            chain: ChainAnalyzer::new(descriptors),
            config,
            store,
            parameters,
            ab_tests,
            engine,
            tuner,
            shutdown,
            loops: Mutex::new(Vec::new()),
        };
        if runtime.config.tuner.enabled && tokio::runtime::Handle::try_current().is_ok() {
            runtime.spawn_background()?;
        }
        tracing::info!(
            rules = registry.len(),
            parameters = runtime.parameters.len(),
            "warden runtime ready"
        );
        Ok(runtime)
    }

    fn spawn_background(&self) -> WardenResult<()> {
        let mut loops = self.lock_loops()?;
        loops.push(spawn_tuner(
            Arc::clone(&self.tuner),
            Duration::from_secs(self.config.tuner.interval_secs),
            self.shutdown.subscribe(),
        ));

        let store = Arc::clone(&self.store);
        let retention_days = self.config.storage.retention_days;
        loops.push(spawn_periodic(
            "retention",
            Duration::from_secs(self.config.storage.purge_interval_secs.max(1)),
            self.shutdown.subscribe(),
            move || {
                if let Err(error) = store.purge(retention_days) {
                    tracing::warn!(%error, "retention purge failed");
                }
            },
        ));
        Ok(())
    }

    fn lock_loops(&self) -> WardenResult<std::sync::MutexGuard<'_, Vec<JoinHandle<()>>>> {
        self.loops
            .lock()
            .map_err(|_| WardenError::ConcurrencyError("runtime loop list poisoned".to_string()))
    }

    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<LearningStore> {
        &self.store
    }

    pub fn tuner(&self) -> &Arc<Tuner> {
        &self.tuner
    }

    pub fn background_loops(&self) -> usize {
        self.lock_loops().map(|loops| loops.len()).unwrap_or(0)
    }

    // --- action intake ---

    pub async fn submit(&self, action: Action) -> Decision {
        self.engine.submit(action).await
    }

    pub async fn submit_with_cancel(
        &self,
        action: Action,
        token: &CancellationToken,
    ) -> Option<Decision> {
        self.engine.submit_with_cancel(action, token).await
    }

    // --- diagnostics ---

    pub fn recent_executions(
        &self,
        rule: &str,
        limit: usize,
    ) -> WardenResult<Vec<ExecutionRecord>> {
        Ok(self.store.recent_executions(rule, limit)?)
    }

    pub fn pattern_effectiveness(&self, rule: &str) -> WardenResult<Vec<PatternEffectiveness>> {
        Ok(self.store.pattern_effectiveness(rule)?)
    }

    /// Label an earlier detection of `pattern` by `rule`.
    pub fn record_feedback(
        &self,
        rule: &str,
        pattern: &PatternKey,
        delta: PatternDelta,
    ) -> WardenResult<()> {
        if self.engine.registry().get(rule).is_none() {
            return Err(WardenError::RuleNotFound {
                name: rule.to_string(),
            });
        }
        if delta.is_empty() {
            return Err(WardenError::ValidationError(
                "feedback carries no counts".to_string(),
            ));
        }
        self.store.record_pattern_outcome(rule, pattern, delta);
        Ok(())
    }

    pub fn system_metrics(&self, window: Duration) -> WardenResult<SystemMetrics> {
        Ok(self.store.system_metrics(window)?)
    }

    /// Dependency and statistics report over the registered rules, with
    /// execution counts from the trailing `window`.
    pub fn chain_report(&self, window: Duration) -> WardenResult<ChainReport> {
        let window = chrono::Duration::from_std(window)
            .map_err(|e| WardenError::ValidationError(format!("report window: {e}")))?;
        let since = Utc::now()
            .checked_sub_signed(window)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        Ok(self.chain.analyze_with_stats(&self.store, since)?)
    }

    // --- parameters and tuning ---

    pub fn parameters(&self) -> BTreeMap<String, ParameterValue> {
        self.parameters.snapshot()
    }

    pub fn parameter(&self, name: &str) -> Option<ParameterValue> {
        self.parameters.get(name)
    }

    /// Run one tuning cycle now.
    pub fn run_optimizations(&self) -> WardenResult<CycleReport> {
        self.tuner.run_cycle()
    }

    pub fn proposals(
        &self,
        state: Option<ProposalState>,
        limit: usize,
    ) -> WardenResult<Vec<OptimizationProposal>> {
        Ok(self.store.proposals(state, limit)?)
    }

    pub fn rollbacks(&self, parameter: Option<&str>) -> WardenResult<Vec<RollbackRecord>> {
        Ok(self.store.rollbacks(parameter)?)
    }

    /// Test `variant` against the parameter's current value.
    pub fn start_ab_test(
        &self,
        parameter: &str,
        variant: ParameterValue,
        duration_secs: Option<u64>,
        sample_ratio: Option<f64>,
    ) -> WardenResult<AbTestStatus> {
        let control = self
            .parameters
            .get(parameter)
            .ok_or_else(|| WardenError::ParameterNotFound {
                name: parameter.to_string(),
            })?;
        self.ab_tests
            .start(parameter, control, variant, duration_secs, sample_ratio, Utc::now())
    }

    pub fn ab_test_status(&self, parameter: &str) -> Option<AbTestStatus> {
        self.ab_tests.status(parameter)
    }

    pub fn ab_tests(&self) -> Vec<AbTestStatus> {
        self.ab_tests.statuses()
    }

    /// Abandon a running test. The live value is left as it is.
    pub fn stop_ab_test(&self, parameter: &str) -> WardenResult<AbTestStatus> {
        self.ab_tests.stop(parameter)
    }

    // --- maintenance ---

    pub fn purge(&self) -> WardenResult<RetentionReport> {
        Ok(self.store.purge(self.config.storage.retention_days)?)
    }

    pub fn flush(&self) -> WardenResult<()> {
        Ok(self.store.flush()?)
    }

    /// Stop background loops, then drain and close the batch writer.
    pub async fn shutdown(&self) -> WardenResult<WriteStats> {
        // Receivers may all be gone already; the loops then exit on their own.
        let _ = self.shutdown.send(true);
        let loops: Vec<JoinHandle<()>> = self.lock_loops()?.drain(..).collect();
        for handle in loops {
            if let Err(error) = handle.await {
                tracing::warn!(%error, "background loop ended abnormally");
            }
        }
        let stats = self.store.shutdown()?;
        tracing::info!(
            executions = stats.executions,
            dropped = self.store.writer().dropped(),
            "warden runtime stopped"
        );
        Ok(stats)
    }
}

fn open_store(config: &WardenConfig) -> WardenResult<LearningStore> {
    let storage = &config.storage;
    if storage.db_path == IN_MEMORY_DB {
        return Ok(LearningStore::open_in_memory(storage)?);
    }
    let path = Path::new(&storage.db_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::ValidationFailed {
            field: "storage.db_path".to_string(),
            message: format!("cannot create {}: {e}", parent.display()),
        })?;
    }
    Ok(LearningStore::open_path(path, storage)?)
}

//! ExecutionEngine: concurrent submit, aggregation, fire-and-forget records.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use warden_core::config::EngineConfig;
use warden_core::models::{Action, Decision, ParameterSpec, RuleDescriptor, RuleParameters};
use warden_core::traits::{IExecutionSink, IParameterProvider, ResolvedParameter};
use warden_observability::events;

use crate::cancellation::CancellationToken;
use crate::evaluation::{deadline_after, RuleRun, RuleTask};
use crate::registry::RuleRegistry;

pub struct ExecutionEngine {
    registry: Arc<RuleRegistry>,
    parameters: Arc<dyn IParameterProvider>,
    sink: Arc<dyn IExecutionSink>,
    config: EngineConfig,
}

impl ExecutionEngine {
    pub fn new(
        registry: Arc<RuleRegistry>,
        parameters: Arc<dyn IParameterProvider>,
        sink: Arc<dyn IExecutionSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            parameters,
            sink,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Judge `action` against every applicable rule.
    ///
    /// Rules run concurrently, at most `max_parallel_rules` at a time, each
    /// under its own deadline. A deadline covers the wait for an evaluation
    /// slot, so the call is bounded by the slowest single timeout however
    /// many rules apply or submits run at once. Rule faults never surface here;
    /// they fail open (or closed, for timeouts under `fail_closed`) and are
    /// logged. One execution record per applicable rule is queued before
    /// returning, without waiting on persistence.
    pub async fn submit(&self, action: Action) -> Decision {
        let action_id = action.id.clone();
        self.execute(action, None)
            .await
            .unwrap_or_else(|| Decision::allow(action_id))
    }

    /// Like [`submit`](Self::submit), but aborts in-flight rules when `token`
    /// is cancelled. A cancelled submission returns `None` and records
    /// nothing.
    pub async fn submit_with_cancel(
        &self,
        action: Action,
        token: &CancellationToken,
    ) -> Option<Decision> {
        if token.is_cancelled() {
            return None;
        }
        self.execute(action, Some(token)).await
    }

    async fn execute(&self, action: Action, cancel: Option<&CancellationToken>) -> Option<Decision> {
        let started = Instant::now();
        let applicable = self.registry.applicable(&action.category);
        if applicable.is_empty() {
            events::decision_made(&action.id, "allow", 0, 0.0);
            return Some(Decision::allow(action.id));
        }

        let action = Arc::new(action);
        let descriptors: Vec<RuleDescriptor> =
            applicable.iter().map(|r| r.descriptor.clone()).collect();

        // Permits are per submit; concurrent submits do not queue behind each other.
        let permits = Arc::new(Semaphore::new(self.config.max_parallel_rules.max(1)));
        let mut tasks = JoinSet::new();
        for (index, registered) in applicable.into_iter().enumerate() {
            let (parameters, resolved, timeout) = self.resolve(&registered.descriptor);
            let task = RuleTask {
                rule: Arc::clone(&registered.rule),
                descriptor: registered.descriptor.clone(),
                action: Arc::clone(&action),
                parameters,
                resolved,
                deadline: deadline_after(timeout),
                timeout,
                policy: self.config.timeout_policy,
                permits: Arc::clone(&permits),
            };
            tasks.spawn(async move { (index, task.run().await) });
        }

        let cancelled = async {
            match cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(cancelled);

        let mut runs: Vec<Option<RuleRun>> = descriptors.iter().map(|_| None).collect();
        loop {
            tokio::select! {
                biased;
                _ = &mut cancelled => {
                    events::submit_cancelled(&action.id, tasks.len());
                    tasks.abort_all();
                    return None;
                }
                joined = tasks.join_next() => match joined {
                    Some(Ok((index, run))) => runs[index] = Some(run),
                    Some(Err(err)) => {
                        tracing::error!(action_id = %action.id, error = %err, "rule task failed to report");
                    }
                    None => break,
                },
            }
        }

        let runs: Vec<RuleRun> = runs
            .into_iter()
            .zip(&descriptors)
            .map(|(run, descriptor)| {
                run.unwrap_or_else(|| RuleRun::lost(descriptor, &action, "task aborted or panicked"))
            })
            .collect();

        let decision = Decision::aggregate(
            action.id.clone(),
            runs.iter()
                .map(|run| (run.record.outcome.verdict(), run.message.as_deref())),
        );

        let rule_count = runs.len();
        for run in runs {
            let success = run.record.is_success();
            for resolved in run.resolved.iter().filter(|r| r.arm.is_some()) {
                self.parameters.observe(resolved, success, run.latency);
            }
            self.sink.record_execution(run.record);
        }

        events::decision_made(
            &decision.action_id,
            decision.outcome.as_str(),
            rule_count,
            started.elapsed().as_secs_f64() * 1000.0,
        );
        Some(decision)
    }

    /// Resolve timeout, strictness, and the rule's declared parameters.
    fn resolve(&self, descriptor: &RuleDescriptor) -> (RuleParameters, Vec<ResolvedParameter>, Duration) {
        let default_timeout_ms = descriptor
            .default_timeout_ms
            .unwrap_or(self.config.default_timeout_ms);

        let mut specs = Vec::with_capacity(descriptor.parameters.len() + 2);
        specs.push(ParameterSpec::timeout(&descriptor.name, default_timeout_ms));
        specs.push(ParameterSpec::strictness(self.config.default_strictness));
        specs.extend(descriptor.parameters.iter().cloned());

        let mut parameters = RuleParameters::new();
        let mut resolved = Vec::with_capacity(specs.len());
        for spec in &specs {
            let value = self.parameters.resolve(spec);
            parameters.insert(value.name.clone(), value.value.clone());
            resolved.push(value);
        }

        let timeout = parameters
            .timeout(&descriptor.name)
            .unwrap_or_else(|| Duration::from_millis(default_timeout_ms));
        (parameters, resolved, timeout)
    }
}

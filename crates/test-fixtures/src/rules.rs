//! Fixture rules covering every fate an evaluation can meet.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use warden_core::errors::RuleError;
use warden_core::models::{
    Action, ParameterSpec, PatternKey, RuleDescriptor, RuleParameters, RuleVerdict, Sensitivity,
};
use warden_core::traits::IRule;

/// Returns the same verdict every time, optionally after a delay.
pub struct FixedRule {
    descriptor: RuleDescriptor,
    verdict: RuleVerdict,
    delay: Option<Duration>,
}

impl FixedRule {
    pub fn new(name: &str, category: &str, verdict: RuleVerdict) -> Self {
        Self {
            descriptor: RuleDescriptor::new(name, category),
            verdict,
            delay: None,
        }
    }

    pub fn allow(name: &str, category: &str) -> Self {
        Self::new(name, category, RuleVerdict::allow())
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.descriptor.priority = priority;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_descriptor(mut self, f: impl FnOnce(RuleDescriptor) -> RuleDescriptor) -> Self {
        self.descriptor = f(self.descriptor);
        self
    }
}

#[async_trait]
impl IRule for FixedRule {
    fn descriptor(&self) -> RuleDescriptor {
        self.descriptor.clone()
    }

    async fn evaluate(
        &self,
        _action: &Action,
        _parameters: &RuleParameters,
    ) -> Result<RuleVerdict, RuleError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.verdict.clone())
    }
}

/// Sleeps well past any sensible timeout.
pub struct SleepingRule {
    descriptor: RuleDescriptor,
    sleep: Duration,
}

impl SleepingRule {
    pub fn new(name: &str, category: &str, sleep: Duration, timeout_ms: u64) -> Self {
        Self {
            descriptor: RuleDescriptor::new(name, category).with_default_timeout_ms(timeout_ms),
            sleep,
        }
    }
}

#[async_trait]
impl IRule for SleepingRule {
    fn descriptor(&self) -> RuleDescriptor {
        self.descriptor.clone()
    }

    async fn evaluate(
        &self,
        _action: &Action,
        _parameters: &RuleParameters,
    ) -> Result<RuleVerdict, RuleError> {
        tokio::time::sleep(self.sleep).await;
        Ok(RuleVerdict::block("slept through its timeout"))
    }
}

/// Always returns an execution error.
pub struct FailingRule {
    descriptor: RuleDescriptor,
}

impl FailingRule {
    pub fn new(name: &str, category: &str) -> Self {
        Self {
            descriptor: RuleDescriptor::new(name, category),
        }
    }
}

#[async_trait]
impl IRule for FailingRule {
    fn descriptor(&self) -> RuleDescriptor {
        self.descriptor.clone()
    }

    async fn evaluate(
        &self,
        _action: &Action,
        _parameters: &RuleParameters,
    ) -> Result<RuleVerdict, RuleError> {
        Err(RuleError::execution(&self.descriptor.name, "fixture failure"))
    }
}

/// Panics inside `evaluate`.
pub struct PanickingRule {
    descriptor: RuleDescriptor,
}

impl PanickingRule {
    pub fn new(name: &str, category: &str) -> Self {
        Self {
            descriptor: RuleDescriptor::new(name, category),
        }
    }
}

#[async_trait]
impl IRule for PanickingRule {
    fn descriptor(&self) -> RuleDescriptor {
        self.descriptor.clone()
    }

    async fn evaluate(
        &self,
        _action: &Action,
        _parameters: &RuleParameters,
    ) -> Result<RuleVerdict, RuleError> {
        panic!("fixture panic in {}", self.descriptor.name);
    }
}

/// Counters shared between a [`CancellationWatch`] and the test.
#[derive(Debug, Default)]
pub struct WatchCounters {
    pub started: AtomicUsize,
    pub finished: AtomicUsize,
    pub dropped: AtomicUsize,
}

impl WatchCounters {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }
}

/// Records whether its evaluation ran to completion or was dropped mid-way.
pub struct CancellationWatch {
    descriptor: RuleDescriptor,
    sleep: Duration,
    counters: Arc<WatchCounters>,
}

impl CancellationWatch {
    pub fn new(name: &str, category: &str, sleep: Duration) -> (Self, Arc<WatchCounters>) {
        let counters = Arc::new(WatchCounters::default());
        let rule = Self {
            descriptor: RuleDescriptor::new(name, category).with_default_timeout_ms(60_000),
            sleep,
            counters: Arc::clone(&counters),
        };
        (rule, counters)
    }
}

struct DropGuard {
    counters: Arc<WatchCounters>,
    armed: bool,
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        if self.armed {
            self.counters.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl IRule for CancellationWatch {
    fn descriptor(&self) -> RuleDescriptor {
        self.descriptor.clone()
    }

    async fn evaluate(
        &self,
        _action: &Action,
        _parameters: &RuleParameters,
    ) -> Result<RuleVerdict, RuleError> {
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        let mut guard = DropGuard {
            counters: Arc::clone(&self.counters),
            armed: true,
        };
        tokio::time::sleep(self.sleep).await;
        guard.armed = false;
        self.counters.finished.fetch_add(1, Ordering::SeqCst);
        Ok(RuleVerdict::allow())
    }
}

/// Keeps a copy of every parameter set it is evaluated with.
pub struct RecordingRule {
    descriptor: RuleDescriptor,
    seen: Arc<Mutex<Vec<RuleParameters>>>,
}

impl RecordingRule {
    pub fn new(descriptor: RuleDescriptor) -> (Self, Arc<Mutex<Vec<RuleParameters>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let rule = Self {
            descriptor,
            seen: Arc::clone(&seen),
        };
        (rule, seen)
    }
}

#[async_trait]
impl IRule for RecordingRule {
    fn descriptor(&self) -> RuleDescriptor {
        self.descriptor.clone()
    }

    async fn evaluate(
        &self,
        _action: &Action,
        parameters: &RuleParameters,
    ) -> Result<RuleVerdict, RuleError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(parameters.clone());
        }
        Ok(RuleVerdict::allow())
    }
}

/// Blocks payloads containing `keyword`, attributing the verdict to a
/// keyword pattern. Reduced sensitivity downgrades the block to a warning.
pub struct KeywordRule {
    descriptor: RuleDescriptor,
    keyword: String,
}

impl KeywordRule {
    pub fn new(name: &str, category: &str, keyword: &str) -> Self {
        let pattern = PatternKey::keyword(keyword);
        Self {
            descriptor: RuleDescriptor::new(name, category)
                .with_parameter(ParameterSpec::sensitivity(name, &pattern)),
            keyword: keyword.to_string(),
        }
    }

    pub fn pattern(&self) -> PatternKey {
        PatternKey::keyword(self.keyword.clone())
    }
}

#[async_trait]
impl IRule for KeywordRule {
    fn descriptor(&self) -> RuleDescriptor {
        self.descriptor.clone()
    }

    async fn evaluate(
        &self,
        action: &Action,
        parameters: &RuleParameters,
    ) -> Result<RuleVerdict, RuleError> {
        if !action.payload.contains(&self.keyword) {
            return Ok(RuleVerdict::allow());
        }
        let pattern = self.pattern();
        let message = format!("payload contains {}", self.keyword);
        let verdict = match parameters.sensitivity(&self.descriptor.name, &pattern) {
            Sensitivity::Reduced => RuleVerdict::warn(message),
            Sensitivity::Normal | Sensitivity::Increased => RuleVerdict::block(message),
        };
        Ok(verdict.with_pattern(pattern))
    }
}

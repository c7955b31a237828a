use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{sensitivity_parameter, timeout_parameter, STRICTNESS_PARAMETER};
use crate::errors::{WardenError, WardenResult};

use super::pattern::PatternKey;

/// A tunable value. Numeric parameters hold timeouts and thresholds;
/// categorical ones hold levels such as strictness or sensitivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    Numeric(f64),
    Categorical(String),
}

impl ParameterValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "numeric",
            Self::Categorical(_) => "categorical",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(*v),
            Self::Categorical(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Numeric(_) => None,
            Self::Categorical(v) => Some(v),
        }
    }

    /// Text stored in the `value` column. `f64` display output parses back
    /// to the identical bit pattern.
    pub fn encode(&self) -> String {
        match self {
            Self::Numeric(v) => v.to_string(),
            Self::Categorical(v) => v.clone(),
        }
    }

    /// Inverse of [`encode`](Self::encode) given the `kind` column.
    pub fn decode(kind: &str, text: &str) -> WardenResult<Self> {
        match kind {
            "numeric" => text.parse::<f64>().map(Self::Numeric).map_err(|e| {
                WardenError::ValidationError(format!("bad numeric parameter {text}: {e}"))
            }),
            "categorical" => Ok(Self::Categorical(text.to_string())),
            other => Err(WardenError::ValidationError(format!(
                "unknown parameter kind: {other}"
            ))),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Numeric(value)
    }
}

impl From<StrictnessLevel> for ParameterValue {
    fn from(level: StrictnessLevel) -> Self {
        Self::Categorical(level.as_str().to_string())
    }
}

impl From<Sensitivity> for ParameterValue {
    fn from(sensitivity: Sensitivity) -> Self {
        Self::Categorical(sensitivity.as_str().to_string())
    }
}

/// Ordered strictness levels: `Permissive < Relaxed < Standard < Strict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrictnessLevel {
    Permissive,
    Relaxed,
    Standard,
    Strict,
}

impl StrictnessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permissive => "permissive",
            Self::Relaxed => "relaxed",
            Self::Standard => "standard",
            Self::Strict => "strict",
        }
    }

    /// One level looser, or `None` at the bottom.
    pub fn relax(&self) -> Option<Self> {
        match self {
            Self::Permissive => None,
            Self::Relaxed => Some(Self::Permissive),
            Self::Standard => Some(Self::Relaxed),
            Self::Strict => Some(Self::Standard),
        }
    }

    /// One level stricter, or `None` at the top.
    pub fn tighten(&self) -> Option<Self> {
        match self {
            Self::Permissive => Some(Self::Relaxed),
            Self::Relaxed => Some(Self::Standard),
            Self::Standard => Some(Self::Strict),
            Self::Strict => None,
        }
    }
}

impl FromStr for StrictnessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permissive" => Ok(Self::Permissive),
            "relaxed" => Ok(Self::Relaxed),
            "standard" => Ok(Self::Standard),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown strictness level: {other}")),
        }
    }
}

/// Pattern sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Reduced,
    Normal,
    Increased,
}

impl Sensitivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reduced => "reduced",
            Self::Normal => "normal",
            Self::Increased => "increased",
        }
    }
}

impl FromStr for Sensitivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reduced" => Ok(Self::Reduced),
            "normal" => Ok(Self::Normal),
            "increased" => Ok(Self::Increased),
            other => Err(format!("unknown sensitivity: {other}")),
        }
    }
}

/// Declaration of a parameter a rule reads, with the default used on
/// first use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub default: ParameterValue,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, default: impl Into<ParameterValue>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
        }
    }

    pub fn timeout(rule: &str, default_ms: u64) -> Self {
        Self::new(timeout_parameter(rule), default_ms as f64)
    }

    pub fn strictness(default: StrictnessLevel) -> Self {
        Self::new(STRICTNESS_PARAMETER, default)
    }

    pub fn sensitivity(rule: &str, pattern: &PatternKey) -> Self {
        Self::new(sensitivity_parameter(rule, pattern), Sensitivity::Normal)
    }
}

/// Parameter values resolved for one rule evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleParameters {
    values: BTreeMap<String, ParameterValue>,
}

impl RuleParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParameterValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParameterValue::as_f64)
    }

    pub fn timeout(&self, rule: &str) -> Option<Duration> {
        self.numeric(&timeout_parameter(rule))
            .filter(|ms| ms.is_finite() && *ms > 0.0)
            .map(|ms| Duration::from_micros((ms * 1000.0) as u64))
    }

    pub fn strictness(&self) -> StrictnessLevel {
        self.get(STRICTNESS_PARAMETER)
            .and_then(ParameterValue::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(StrictnessLevel::Standard)
    }

    pub fn sensitivity(&self, rule: &str, pattern: &PatternKey) -> Sensitivity {
        self.get(&sensitivity_parameter(rule, pattern))
            .and_then(ParameterValue::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(Sensitivity::Normal)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterValue)> {
        self.values.iter()
    }
}

/// One row of `parameter_history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterChange {
    pub name: String,
    pub old_value: Option<ParameterValue>,
    pub new_value: ParameterValue,
    pub reason: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

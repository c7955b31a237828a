use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::confidence;

/// Kind of detection a pattern key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Regex,
    Keyword,
    Structural,
    Custom,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regex => "regex",
            Self::Keyword => "keyword",
            Self::Structural => "structural",
            Self::Custom => "custom",
        }
    }
}

impl FromStr for PatternKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regex" => Ok(Self::Regex),
            "keyword" => Ok(Self::Keyword),
            "structural" => Ok(Self::Structural),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown pattern kind: {other}")),
        }
    }
}

/// Tagged identifier of one pattern within a rule. Renders as `kind:id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternKey {
    pub kind: PatternKind,
    pub id: String,
}

impl PatternKey {
    pub fn new(kind: PatternKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn regex(id: impl Into<String>) -> Self {
        Self::new(PatternKind::Regex, id)
    }

    pub fn keyword(id: impl Into<String>) -> Self {
        Self::new(PatternKind::Keyword, id)
    }
}

impl fmt::Display for PatternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

impl FromStr for PatternKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| format!("pattern key missing kind prefix: {s}"))?;
        if id.is_empty() {
            return Err(format!("pattern key has empty id: {s}"));
        }
        Ok(Self::new(kind.parse()?, id))
    }
}

/// Counter increments applied to a pattern's confusion matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDelta {
    pub true_positives: u64,
    pub false_positives: u64,
    pub true_negatives: u64,
    pub false_negatives: u64,
}

impl PatternDelta {
    pub fn true_positive() -> Self {
        Self {
            true_positives: 1,
            ..Self::default()
        }
    }

    pub fn false_positive() -> Self {
        Self {
            false_positives: 1,
            ..Self::default()
        }
    }

    pub fn true_negative() -> Self {
        Self {
            true_negatives: 1,
            ..Self::default()
        }
    }

    pub fn false_negative() -> Self {
        Self {
            false_negatives: 1,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> u64 {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }
}

/// Aggregate effectiveness counters per (rule, pattern). Updated incrementally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternStat {
    pub rule: String,
    pub pattern: PatternKey,
    pub true_positives: u64,
    pub false_positives: u64,
    pub true_negatives: u64,
    pub false_negatives: u64,
    pub updated_at: DateTime<Utc>,
}

impl PatternStat {
    pub fn total(&self) -> u64 {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    /// Derived metrics. Every ratio with a zero denominator is 0.
    pub fn metrics(&self) -> PatternMetrics {
        let tp = self.true_positives as f64;
        let fp = self.false_positives as f64;
        let tn = self.true_negatives as f64;
        let fneg = self.false_negatives as f64;

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fneg);
        let f1 = ratio(2.0 * precision * recall, precision + recall);
        let false_positive_rate = ratio(fp, fp + tn);
        let false_negative_rate = ratio(fneg, fneg + tp);

        // Precision near 0 or 1 is decisive; near 0.5 it carries little signal.
        let spread = (precision * (1.0 - precision)).sqrt();
        let confidence = confidence::sample_confidence(self.total(), 1.0 - 2.0 * spread);

        PatternMetrics {
            sample_size: self.total(),
            precision,
            recall,
            f1,
            false_positive_rate,
            false_negative_rate,
            confidence,
        }
    }
}

/// Derived view of a [`PatternStat`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternMetrics {
    pub sample_size: u64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub false_positive_rate: f64,
    pub false_negative_rate: f64,
    pub confidence: f64,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

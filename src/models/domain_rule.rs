use serde::{Deserialize, Serialize};

/// A validity rule applied after ranking.
///
/// The two variants carry different policies on purpose: a price below the
/// floor rejects the whole record, an implausible duration only nulls the
/// field (and its `_LOG`/`_RANK` companions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum DomainRule {
    DropRecordBelow { metric: String, min: f64 },
    NullifyAbove { metric: String, max: f64 },
}

impl DomainRule {
    pub fn metric(&self) -> &str {
        match self {
            DomainRule::DropRecordBelow { metric, .. } => metric,
            DomainRule::NullifyAbove { metric, .. } => metric,
        }
    }

    pub fn threshold(&self) -> f64 {
        match self {
            DomainRule::DropRecordBelow { min, .. } => *min,
            DomainRule::NullifyAbove { max, .. } => *max,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DomainRule::DropRecordBelow { metric, min } => {
                format!("drop records with {} < {}", metric, min)
            }
            DomainRule::NullifyAbove { metric, max } => {
                format!("nullify {} values > {}", metric, max)
            }
        }
    }
}

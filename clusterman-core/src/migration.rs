use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a [`MigrationEvent`] as it's processed by a migration worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    Pending,
    Inprogress,
    Completed,
    Skipped,
    Stop,
    Failed,
}

/// The node property a migration condition is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionTrait {
    Kernel,
    LsbRelease,
    InstanceType,
    Uptime,
}

impl ConditionTrait {
    /// Parses the `--condition-trait` CLI flag / YAML `trait` key. Accepts
    /// both `lsb_release` and `lsbrelease` since the CRD spec (§6.2) and
    /// the CLI flag disagree on the separator.
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "kernel" => Self::Kernel,
            "lsbrelease" | "lsb_release" => Self::LsbRelease,
            "instance_type" => Self::InstanceType,
            "uptime" => Self::Uptime,
            _ => return None,
        })
    }
}

/// Comparison applied between a node's trait value and the condition's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl ConditionOperator {
    /// Parses the `--condition-operator` CLI flag / YAML `operator` key.
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "eq" | "==" => Self::Eq,
            "noteq" | "not_eq" | "!=" => Self::NotEq,
            "lt" | "<" => Self::Lt,
            "lte" | "<=" => Self::Lte,
            "gt" | ">" => Self::Gt,
            "gte" | ">=" => Self::Gte,
            _ => return None,
        })
    }

    /// `instance_type` compares against a set of allowed values; every
    /// other trait compares against a single scalar/version target.
    pub fn expecting_collection(self, trait_: ConditionTrait) -> bool {
        trait_ == ConditionTrait::InstanceType && matches!(self, ConditionOperator::Eq | ConditionOperator::NotEq)
    }

    /// Per-trait support matrix: which operators are valid for which trait.
    /// Mirrors the original's `CONDITION_OPERATOR_SUPPORT_MATRIX`.
    pub fn supported_for(trait_: ConditionTrait) -> &'static [ConditionOperator] {
        use ConditionOperator::*;
        match trait_ {
            ConditionTrait::Kernel | ConditionTrait::LsbRelease => &[Eq, NotEq, Lt, Lte, Gt, Gte],
            ConditionTrait::InstanceType => &[Eq, NotEq],
            ConditionTrait::Uptime => &[Lt, Lte, Gt, Gte, Eq, NotEq],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationCondition {
    pub trait_: ConditionTrait,
    pub operator: ConditionOperator,
    /// Stringly-typed target: a SemVer string for `Kernel`, a dotted version
    /// for `LsbRelease`, a comma-separated set for `InstanceType`, or a
    /// number-of-seconds string for `Uptime`.
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationEvent {
    pub resource_name: String,
    pub cluster: String,
    pub pool: String,
    pub condition: MigrationCondition,
    pub label_selectors: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub previous_attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_trait_parses_both_lsb_release_spellings() {
        assert_eq!(ConditionTrait::parse("lsbrelease"), Some(ConditionTrait::LsbRelease));
        assert_eq!(ConditionTrait::parse("lsb_release"), Some(ConditionTrait::LsbRelease));
        assert_eq!(ConditionTrait::parse("bogus"), None);
    }

    #[test]
    fn condition_operator_parses_symbolic_and_word_forms() {
        assert_eq!(ConditionOperator::parse("gte"), Some(ConditionOperator::Gte));
        assert_eq!(ConditionOperator::parse(">="), Some(ConditionOperator::Gte));
        assert_eq!(ConditionOperator::parse("nope"), None);
    }
}

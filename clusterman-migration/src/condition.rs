//! Evaluates a [`MigrationCondition`] against one node's observed traits,
//! ported from `migration/event_enums.py`'s `ConditionTrait`/
//! `ConditionOperator` dispatch.

use clusterman_core::migration::{ConditionOperator, ConditionTrait, MigrationCondition};

use crate::error::MigrationError;

/// The subset of node state a condition ever compares against. Kernel and
/// LSB release are scheduler-reported and may be absent (Mesos agents
/// don't carry them); a missing trait never matches.
#[derive(Debug, Clone)]
pub struct NodeTraits {
    pub kernel_version: Option<String>,
    pub lsb_release: Option<String>,
    pub instance_type: String,
    pub uptime_seconds: i64,
}

pub fn evaluate(condition: &MigrationCondition, node: &NodeTraits) -> Result<bool, MigrationError> {
    if !ConditionOperator::supported_for(condition.trait_).contains(&condition.operator) {
        return Err(MigrationError::UnsupportedOperator { trait_: condition.trait_, operator: condition.operator });
    }

    match condition.trait_ {
        ConditionTrait::Kernel => match &node.kernel_version {
            Some(actual) => compare_dotted_versions(actual, condition.operator, &condition.target),
            None => Ok(false),
        },
        ConditionTrait::LsbRelease => match &node.lsb_release {
            Some(actual) => compare_dotted_versions(actual, condition.operator, &condition.target),
            None => Ok(false),
        },
        ConditionTrait::InstanceType => {
            let allowed: std::collections::HashSet<&str> = condition.target.split(',').map(str::trim).collect();
            let member = allowed.contains(node.instance_type.as_str());
            Ok(match condition.operator {
                ConditionOperator::Eq => member,
                ConditionOperator::NotEq => !member,
                _ => unreachable!("supported_for only allows Eq/NotEq for InstanceType"),
            })
        }
        ConditionTrait::Uptime => {
            let target: i64 = condition
                .target
                .trim()
                .parse()
                .map_err(|_| MigrationError::InvalidCondition {
                    trait_: condition.trait_,
                    target: condition.target.clone(),
                    reason: "uptime target must be an integer number of seconds".to_string(),
                })?;
            Ok(compare_ordering(node.uptime_seconds.cmp(&target), condition.operator))
        }
    }
}

/// Compares two version strings by their leading numeric dot-segments,
/// ignoring any non-numeric suffix (e.g. `5.10.0-generic`). Neither the
/// kernel string nor `lsb_release` format is strict SemVer, so this is a
/// deliberately lenient stand-in: the `semver` crate's parser is tried
/// first since well-formed kernel versions already satisfy it, falling
/// back to a plain numeric-segment compare for everything else.
fn compare_dotted_versions(actual: &str, operator: ConditionOperator, target: &str) -> Result<bool, MigrationError> {
    if let (Ok(a), Ok(b)) = (semver::Version::parse(actual), semver::Version::parse(target)) {
        return Ok(compare_ordering(a.cmp(&b), operator));
    }
    let a = numeric_segments(actual);
    let b = numeric_segments(target);
    Ok(compare_ordering(a.cmp(&b), operator))
}

fn numeric_segments(raw: &str) -> Vec<u64> {
    raw.split(['.', '-', '+'])
        .take_while(|segment| segment.chars().all(|c| c.is_ascii_digit()) && !segment.is_empty())
        .map(|segment| segment.parse().unwrap_or(0))
        .collect()
}

fn compare_ordering(ordering: std::cmp::Ordering, operator: ConditionOperator) -> bool {
    use std::cmp::Ordering::*;
    match operator {
        ConditionOperator::Eq => ordering == Equal,
        ConditionOperator::NotEq => ordering != Equal,
        ConditionOperator::Lt => ordering == Less,
        ConditionOperator::Lte => ordering != Greater,
        ConditionOperator::Gt => ordering == Greater,
        ConditionOperator::Gte => ordering != Less,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kernel: &str, uptime: i64) -> NodeTraits {
        NodeTraits { kernel_version: Some(kernel.to_string()), lsb_release: None, instance_type: "m5.large".to_string(), uptime_seconds: uptime }
    }

    fn condition(trait_: ConditionTrait, operator: ConditionOperator, target: &str) -> MigrationCondition {
        MigrationCondition { trait_, operator, target: target.to_string() }
    }

    #[test]
    fn kernel_lt_matches_older_version() {
        let c = condition(ConditionTrait::Kernel, ConditionOperator::Lt, "5.10.0");
        assert!(evaluate(&c, &node("5.4.0", 0)).unwrap());
        assert!(!evaluate(&c, &node("5.10.0", 0)).unwrap());
    }

    #[test]
    fn kernel_with_non_semver_suffix_falls_back_to_numeric_compare() {
        let c = condition(ConditionTrait::Kernel, ConditionOperator::Lt, "5.10.0");
        assert!(evaluate(&c, &node("5.4.0-1018-aws", 0)).unwrap());
    }

    #[test]
    fn missing_trait_never_matches() {
        let c = condition(ConditionTrait::Kernel, ConditionOperator::Lt, "5.10.0");
        let n = NodeTraits { kernel_version: None, lsb_release: None, instance_type: "m5.large".to_string(), uptime_seconds: 0 };
        assert!(!evaluate(&c, &n).unwrap());
    }

    #[test]
    fn instance_type_membership() {
        let c = condition(ConditionTrait::InstanceType, ConditionOperator::Eq, "m5.large, c5.xlarge");
        let mut n = node("5.4.0", 0);
        n.instance_type = "c5.xlarge".to_string();
        assert!(evaluate(&c, &n).unwrap());
        n.instance_type = "r5.large".to_string();
        assert!(!evaluate(&c, &n).unwrap());
    }

    #[test]
    fn uptime_gte_threshold() {
        let c = condition(ConditionTrait::Uptime, ConditionOperator::Gte, "86400");
        assert!(evaluate(&c, &node("5.4.0", 90000)).unwrap());
        assert!(!evaluate(&c, &node("5.4.0", 100)).unwrap());
    }

    #[test]
    fn instance_type_rejects_ordering_operators() {
        let c = condition(ConditionTrait::InstanceType, ConditionOperator::Lt, "m5.large");
        assert!(evaluate(&c, &node("5.4.0", 0)).is_err());
    }
}

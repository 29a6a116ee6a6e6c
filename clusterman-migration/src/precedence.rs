//! Orders drain candidates, ported from `migration/event.py`'s
//! `_sort_nodes_by_precedence`. A pool's migration strategy names an
//! ordered list of rules; candidates are sorted lexicographically by that
//! list, so an earlier rule always outranks a later one.

use std::cmp::Ordering;

use clusterman_pool::metadata::InstanceMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecedenceRule {
    HighestUptime,
    LowestTaskCount,
    AzNameAlphabetical,
}

impl PrecedenceRule {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "highest_uptime" => PrecedenceRule::HighestUptime,
            "lowest_task_count" => PrecedenceRule::LowestTaskCount,
            "az_name_alphabetical" => PrecedenceRule::AzNameAlphabetical,
            _ => return None,
        })
    }

    fn compare(self, a: &InstanceMetadata, b: &InstanceMetadata) -> Ordering {
        match self {
            // Highest first: reverse the natural ascending order.
            PrecedenceRule::HighestUptime => b.uptime.cmp(&a.uptime),
            PrecedenceRule::LowestTaskCount => a.task_count.cmp(&b.task_count),
            PrecedenceRule::AzNameAlphabetical => a.market.availability_zone.cmp(&b.market.availability_zone),
        }
    }
}

/// Stable sort of `candidates` by `rules`, highest precedence first.
pub fn sort_candidates(candidates: &mut [InstanceMetadata], rules: &[PrecedenceRule]) {
    candidates.sort_by(|a, b| {
        for rule in rules {
            let ordering = rule.compare(a, b);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use clusterman_core::agent::AgentState;
    use clusterman_core::market::InstanceMarket;
    use clusterman_core::resources::ClustermanResources;

    use super::*;

    fn metadata(id: &str, uptime_secs: i64, task_count: u32, az: &str) -> InstanceMetadata {
        InstanceMetadata {
            instance_id: id.to_string(),
            group_id: "g-1".to_string(),
            market: InstanceMarket::new("m5.large", az),
            instance_ip: None,
            is_stale: false,
            agent_state: AgentState::Running,
            task_count,
            total_resources: ClustermanResources::default(),
            allocated_resources: ClustermanResources::default(),
            uptime: Duration::seconds(uptime_secs),
            weight: 1.0,
        }
    }

    #[test]
    fn highest_uptime_sorts_oldest_first() {
        let mut candidates = vec![metadata("a", 100, 0, "us-west-2a"), metadata("b", 500, 0, "us-west-2a")];
        sort_candidates(&mut candidates, &[PrecedenceRule::HighestUptime]);
        assert_eq!(candidates[0].instance_id, "b");
    }

    #[test]
    fn ties_fall_through_to_the_next_rule() {
        let mut candidates = vec![
            metadata("a", 100, 2, "us-west-2b"),
            metadata("b", 100, 1, "us-west-2a"),
        ];
        sort_candidates(&mut candidates, &[PrecedenceRule::HighestUptime, PrecedenceRule::LowestTaskCount]);
        assert_eq!(candidates[0].instance_id, "b");
    }

    #[test]
    fn az_name_alphabetical_breaks_remaining_ties() {
        let mut candidates = vec![metadata("a", 100, 0, "us-west-2b"), metadata("b", 100, 0, "us-west-2a")];
        sort_candidates(&mut candidates, &[PrecedenceRule::AzNameAlphabetical]);
        assert_eq!(candidates[0].instance_id, "b");
    }
}

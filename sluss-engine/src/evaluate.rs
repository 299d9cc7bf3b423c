//! Assertion evaluator.
//!
//! Field-by-field comparison of expected fixture values against observed
//! collaborator state. Unspecified expected fields always match; every
//! mismatch carries the field name with both renderings so a timed-out
//! assertion can report exactly what was last seen.

use sluss_config::{AssertTask, PfsHistoryTask};
use sluss_core::{Amount, ChannelSnapshot, NodeIndex, PfsRequestRecord};

/// One field that failed to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub field: String,
    pub expected: String,
    pub observed: String,
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: expected {}, observed {}",
            self.field, self.expected, self.observed
        )
    }
}

/// Outcome of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    pub mismatches: Vec<Mismatch>,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        self.mismatches.is_empty()
    }

    fn push(&mut self, field: impl Into<String>, expected: impl ToString, observed: impl ToString) {
        self.mismatches.push(Mismatch {
            field: field.into(),
            expected: expected.to_string(),
            observed: observed.to_string(),
        });
    }

    fn check<T: PartialEq + ToString>(
        &mut self,
        field: &str,
        expected: Option<&T>,
        observed: &T,
    ) {
        if let Some(expected) = expected {
            if expected != observed {
                self.push(field, expected.to_string(), observed.to_string());
            }
        }
    }
}

impl std::fmt::Display for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_match() {
            return f.write_str("match");
        }
        let parts: Vec<String> = self.mismatches.iter().map(Mismatch::to_string).collect();
        f.write_str(&parts.join("; "))
    }
}

/// Compare an `assert` task's expectations against one observed leg.
pub fn evaluate_channel(expected: &AssertTask, observed: &ChannelSnapshot) -> MatchResult {
    let mut result = MatchResult::default();
    result.check(
        "total_deposit",
        expected.total_deposit.as_ref(),
        &observed.total_deposit,
    );
    result.check("balance", expected.balance.as_ref(), &observed.balance);
    result.check("state", expected.state.as_ref(), &observed.state);
    result
}

/// Compare `assert_pfs_history` expectations against the recorded request
/// sequence. Order matters: the Nth record is the Nth request issued by
/// the source.
pub fn evaluate_pfs_history(
    expected: &PfsHistoryTask,
    observed: &[PfsRequestRecord],
) -> MatchResult {
    let mut result = MatchResult::default();
    result.check("request_count", expected.request_count.as_ref(), &observed.len());

    if let Some(routes) = &expected.expected_routes {
        for (i, expected_route) in routes.iter().enumerate() {
            match observed.get(i) {
                Some(record) if &record.route == expected_route => {}
                Some(record) => result.push(
                    format!("expected_routes[{i}]"),
                    render_route(expected_route),
                    render_route(&record.route),
                ),
                None => result.push(
                    format!("expected_routes[{i}]"),
                    render_route(expected_route),
                    "no request",
                ),
            }
        }
        // Exact sequence: requests beyond the expected list are mismatches
        // too, not silently accepted.
        for (i, record) in observed.iter().enumerate().skip(routes.len()) {
            result.push(
                format!("expected_routes[{i}]"),
                "no request",
                render_route(&record.route),
            );
        }
    }

    if let Some(counts) = &expected.routes_count {
        for (i, expected_count) in counts.iter().enumerate() {
            match observed.get(i) {
                Some(record) if record.routes_count == *expected_count => {}
                Some(record) => result.push(
                    format!("routes_count[{i}]"),
                    expected_count,
                    record.routes_count,
                ),
                None => result.push(format!("routes_count[{i}]"), expected_count, "no request"),
            }
        }
    }
    result
}

/// Compare `assert_pfs_iou` against the accumulated fee owed. Exact:
/// the IOU is strictly increasing per answered request, so any earlier
/// or later total is a mismatch.
pub fn evaluate_pfs_iou(expected: Amount, observed: Amount) -> MatchResult {
    let mut result = MatchResult::default();
    if expected != observed {
        result.push("iou", expected, observed);
    }
    result
}

fn render_route(route: &[NodeIndex]) -> String {
    let hops: Vec<String> = route.iter().map(NodeIndex::to_string).collect();
    format!("[{}]", hops.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluss_core::ChannelState;

    fn snapshot(deposit: Amount, balance: Amount) -> ChannelSnapshot {
        ChannelSnapshot {
            state: ChannelState::Opened,
            total_deposit: deposit,
            balance,
        }
    }

    fn assert_task(deposit: Option<Amount>, balance: Option<Amount>) -> AssertTask {
        AssertTask {
            from: NodeIndex(0),
            to: NodeIndex(1),
            total_deposit: deposit,
            balance,
            state: None,
        }
    }

    #[test]
    fn absent_fields_are_wildcards() {
        let result = evaluate_channel(&assert_task(None, None), &snapshot(100, 40));
        assert!(result.is_match());
    }

    #[test]
    fn mismatch_names_field_and_values() {
        let result = evaluate_channel(&assert_task(Some(100), Some(50)), &snapshot(100, 40));
        assert_eq!(result.mismatches.len(), 1);
        assert_eq!(result.mismatches[0].field, "balance");
        assert_eq!(result.to_string(), "balance: expected 50, observed 40");
    }

    fn record(route: &[usize]) -> PfsRequestRecord {
        PfsRequestRecord {
            route: route.iter().copied().map(NodeIndex).collect(),
            routes_count: 1,
        }
    }

    #[test]
    fn history_sequence_must_match_in_order() {
        let expected = PfsHistoryTask {
            source: NodeIndex(0),
            request_count: Some(2),
            expected_routes: Some(vec![
                vec![NodeIndex(0), NodeIndex(4), NodeIndex(3)],
                vec![NodeIndex(0), NodeIndex(1), NodeIndex(2), NodeIndex(3)],
            ]),
            routes_count: None,
        };
        let observed = [record(&[0, 4, 3]), record(&[0, 1, 2, 3])];
        assert!(evaluate_pfs_history(&expected, &observed).is_match());

        // Same routes, wrong order: not a match.
        let reversed = [record(&[0, 1, 2, 3]), record(&[0, 4, 3])];
        let result = evaluate_pfs_history(&expected, &reversed);
        assert_eq!(result.mismatches.len(), 2);
    }

    #[test]
    fn missing_request_reported() {
        let expected = PfsHistoryTask {
            source: NodeIndex(0),
            request_count: Some(2),
            expected_routes: Some(vec![vec![NodeIndex(0), NodeIndex(1)]; 2]),
            routes_count: Some(vec![1, 1]),
        };
        let result = evaluate_pfs_history(&expected, &[record(&[0, 1])]);
        assert!(!result.is_match());
        assert!(result.to_string().contains("request_count: expected 2, observed 1"));
        assert!(result.to_string().contains("no request"));
    }

    #[test]
    fn trailing_observed_request_is_a_mismatch() {
        let expected = PfsHistoryTask {
            source: NodeIndex(0),
            request_count: None,
            expected_routes: Some(vec![vec![NodeIndex(0), NodeIndex(1)]]),
            routes_count: None,
        };
        let observed = [record(&[0, 1]), record(&[0, 2])];
        let result = evaluate_pfs_history(&expected, &observed);
        assert_eq!(result.mismatches.len(), 1);
        assert_eq!(result.mismatches[0].field, "expected_routes[1]");
        assert_eq!(result.mismatches[0].expected, "no request");
    }

    #[test]
    fn iou_is_exact() {
        assert!(evaluate_pfs_iou(1_000, 1_000).is_match());
        assert!(!evaluate_pfs_iou(1_000, 999).is_match());
        assert!(!evaluate_pfs_iou(1_000, 2_000).is_match());
    }
}

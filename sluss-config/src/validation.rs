//! Structural validation of a loaded scenario.
//!
//! Runs before any handle is provisioned: every node index referenced by a
//! task must exist in the topology, and lifecycle tasks are only legal for
//! managed nodes. Violations are fatal (`ScenarioError::Malformed`), not
//! task failures.

use sluss_core::{NodeIndex, ScenarioError};

use crate::settings::NodeMode;
use crate::task::{TaskKind, TaskNode};
use crate::ScenarioFile;

pub fn validate_structure(scenario: &ScenarioFile) -> Result<(), ScenarioError> {
    let count = scenario.nodes.count;
    let mut check = |node: NodeIndex, task: &'static str| {
        if node.0 >= count {
            Err(ScenarioError::Malformed(format!(
                "task '{task}' references node {node}, but the topology has {count} nodes"
            )))
        } else {
            Ok(())
        }
    };

    let mut stack = vec![&scenario.scenario];
    while let Some(node) = stack.pop() {
        match node {
            TaskNode::Serial(children) | TaskNode::Parallel(children) => {
                stack.extend(children.iter());
            }
            TaskNode::Leaf(kind) => match kind {
                TaskKind::OpenChannel(t) | TaskKind::Deposit(t) | TaskKind::CloseChannel(t) => {
                    check(t.from, kind.name())?;
                    check(t.to, kind.name())?;
                }
                TaskKind::Transfer(t) => {
                    check(t.from, "transfer")?;
                    check(t.to, "transfer")?;
                }
                TaskKind::LeaveNetwork(t) => check(t.from, "leave_network")?,
                TaskKind::Assert(t) => {
                    check(t.from, "assert")?;
                    check(t.to, "assert")?;
                }
                TaskKind::AssertPfsHistory(t) => check(t.source, "assert_pfs_history")?,
                TaskKind::AssertPfsIou(t) => check(t.source, "assert_pfs_iou")?,
                TaskKind::StopNode(n) | TaskKind::StartNode(n) | TaskKind::KillNode(n) => {
                    check(*n, kind.name())?;
                    if scenario.nodes.mode == NodeMode::External {
                        return Err(ScenarioError::Malformed(format!(
                            "task '{}' requires managed nodes, but nodes.mode is 'external'",
                            kind.name()
                        )));
                    }
                }
                TaskKind::Wait(_) | TaskKind::WaitBlocks(_) => {}
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScenarioFile;

    fn scenario(count: usize, tree: &str) -> ScenarioFile {
        let yaml = format!("nodes:\n  count: {count}\nscenario:\n  {tree}\n");
        serde_yaml::from_str(&yaml).expect("scenario parses")
    }

    #[test]
    fn accepts_in_range_references() {
        let s = scenario(2, "transfer: {from: 0, to: 1, amount: 5}");
        assert!(validate_structure(&s).is_ok());
    }

    #[test]
    fn rejects_out_of_range_node() {
        let s = scenario(2, "transfer: {from: 0, to: 5, amount: 5}");
        let err = validate_structure(&s).unwrap_err();
        assert!(err.to_string().contains("references node 5"));
    }

    #[test]
    fn rejects_lifecycle_task_on_external_nodes() {
        let yaml = "nodes:\n  mode: external\n  count: 3\nscenario:\n  stop_node: 1\n";
        let s: ScenarioFile = serde_yaml::from_str(yaml).unwrap();
        let err = validate_structure(&s).unwrap_err();
        assert!(err.to_string().contains("managed nodes"));
    }
}

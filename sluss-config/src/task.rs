//! The task tree.
//!
//! Every node of `scenario:` is a single-key YAML mapping: `serial:` /
//! `parallel:` composition blocks, or one leaf task keyed by its name.
//! The tree is immutable once parsed and never cyclic.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_yaml::Value;

use sluss_core::{amount, Amount, ChannelState, NodeIndex, StatusPattern};

/// One node of the scenario task tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskNode {
    /// Ordered children; strict happens-before, fail-fast.
    Serial(Vec<TaskNode>),
    /// Independent children, executed concurrently and joined.
    Parallel(Vec<TaskNode>),
    /// One concrete operation.
    Leaf(TaskKind),
}

impl TaskNode {
    /// Number of leaf tasks in this subtree.
    pub fn leaf_count(&self) -> usize {
        match self {
            TaskNode::Serial(children) | TaskNode::Parallel(children) => {
                children.iter().map(TaskNode::leaf_count).sum()
            }
            TaskNode::Leaf(_) => 1,
        }
    }
}

/// A concrete leaf operation with its fixture parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    OpenChannel(ChannelTask),
    Deposit(ChannelTask),
    Transfer(TransferTask),
    CloseChannel(ChannelTask),
    LeaveNetwork(LeaveTask),
    Assert(AssertTask),
    AssertPfsHistory(PfsHistoryTask),
    AssertPfsIou(PfsIouTask),
    /// Unconditional sleep of N time-units.
    Wait(u64),
    /// Wait until chain height advances by N from task start.
    WaitBlocks(u64),
    StopNode(NodeIndex),
    StartNode(NodeIndex),
    KillNode(NodeIndex),
}

impl TaskKind {
    /// Fixture key for this task, used in task paths and reports.
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::OpenChannel(_) => "open_channel",
            TaskKind::Deposit(_) => "deposit",
            TaskKind::Transfer(_) => "transfer",
            TaskKind::CloseChannel(_) => "close_channel",
            TaskKind::LeaveNetwork(_) => "leave_network",
            TaskKind::Assert(_) => "assert",
            TaskKind::AssertPfsHistory(_) => "assert_pfs_history",
            TaskKind::AssertPfsIou(_) => "assert_pfs_iou",
            TaskKind::Wait(_) => "wait",
            TaskKind::WaitBlocks(_) => "wait_blocks",
            TaskKind::StopNode(_) => "stop_node",
            TaskKind::StartNode(_) => "start_node",
            TaskKind::KillNode(_) => "kill_node",
        }
    }
}

/// Parameters shared by `open_channel`, `deposit`, and `close_channel`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelTask {
    pub from: NodeIndex,
    pub to: NodeIndex,
    #[serde(default, deserialize_with = "amount::deserialize_opt")]
    pub total_deposit: Option<Amount>,
    pub expected_http_status: Option<StatusPattern>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferTask {
    pub from: NodeIndex,
    pub to: NodeIndex,
    #[serde(deserialize_with = "amount::deserialize")]
    pub amount: Amount,
    pub expected_http_status: Option<StatusPattern>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeaveTask {
    pub from: NodeIndex,
    pub expected_http_status: Option<StatusPattern>,
}

/// Expected channel outcome. Absent fields are wildcards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssertTask {
    pub from: NodeIndex,
    pub to: NodeIndex,
    #[serde(default, deserialize_with = "amount::deserialize_opt")]
    pub total_deposit: Option<Amount>,
    #[serde(default, deserialize_with = "amount::deserialize_opt")]
    pub balance: Option<Amount>,
    pub state: Option<ChannelState>,
}

/// Expected path-finding request history for one source node.
///
/// `expected_routes` is matched as an exact sequence: the Nth route is the
/// Nth request issued by `source`. `routes_count` is per-request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PfsHistoryTask {
    pub source: NodeIndex,
    pub request_count: Option<usize>,
    pub expected_routes: Option<Vec<Vec<NodeIndex>>>,
    pub routes_count: Option<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PfsIouTask {
    pub source: NodeIndex,
    #[serde(deserialize_with = "amount::deserialize")]
    pub amount: Amount,
}

impl<'de> Deserialize<'de> for TaskNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        node_from_value(&value).map_err(de::Error::custom)
    }
}

fn node_from_value(value: &Value) -> Result<TaskNode, String> {
    let mapping = value
        .as_mapping()
        .ok_or_else(|| "task node must be a single-key mapping".to_string())?;
    if mapping.len() != 1 {
        return Err(format!(
            "task node must have exactly one key, found {}",
            mapping.len()
        ));
    }
    let (key, body) = mapping
        .iter()
        .next()
        .ok_or_else(|| "task node must not be empty".to_string())?;
    let name = key
        .as_str()
        .ok_or_else(|| "task name must be a string".to_string())?;

    match name {
        "serial" => Ok(TaskNode::Serial(children_from_value(body)?)),
        "parallel" => Ok(TaskNode::Parallel(children_from_value(body)?)),
        _ => Ok(TaskNode::Leaf(leaf_from_value(name, body)?)),
    }
}

/// Composition body: `{tasks: [...]}` as written in fixtures, or a bare
/// list.
fn children_from_value(body: &Value) -> Result<Vec<TaskNode>, String> {
    let list = match body {
        Value::Sequence(list) => list,
        Value::Mapping(map) => map
            .get("tasks")
            .and_then(Value::as_sequence)
            .ok_or_else(|| "composition block needs a 'tasks' list".to_string())?,
        _ => return Err("composition block needs a 'tasks' list".to_string()),
    };
    list.iter().map(node_from_value).collect()
}

fn leaf_from_value(name: &str, body: &Value) -> Result<TaskKind, String> {
    fn params<T: serde::de::DeserializeOwned>(name: &str, body: &Value) -> Result<T, String> {
        serde_yaml::from_value(body.clone()).map_err(|e| format!("task '{name}': {e}"))
    }

    match name {
        "open_channel" => Ok(TaskKind::OpenChannel(params(name, body)?)),
        "deposit" => {
            let task: ChannelTask = params(name, body)?;
            if task.total_deposit.is_none() {
                return Err("task 'deposit': missing field 'total_deposit'".to_string());
            }
            Ok(TaskKind::Deposit(task))
        }
        "transfer" => Ok(TaskKind::Transfer(params(name, body)?)),
        "close_channel" => Ok(TaskKind::CloseChannel(params(name, body)?)),
        "leave_network" => Ok(TaskKind::LeaveNetwork(params(name, body)?)),
        "assert" => Ok(TaskKind::Assert(params(name, body)?)),
        "assert_pfs_history" => Ok(TaskKind::AssertPfsHistory(params(name, body)?)),
        "assert_pfs_iou" => Ok(TaskKind::AssertPfsIou(params(name, body)?)),
        "wait" => Ok(TaskKind::Wait(scalar_u64(name, body)?)),
        "wait_blocks" => Ok(TaskKind::WaitBlocks(scalar_u64(name, body)?)),
        "stop_node" => Ok(TaskKind::StopNode(scalar_node(name, body)?)),
        "start_node" => Ok(TaskKind::StartNode(scalar_node(name, body)?)),
        "kill_node" => Ok(TaskKind::KillNode(scalar_node(name, body)?)),
        other => Err(format!("unknown task '{other}'")),
    }
}

fn scalar_u64(name: &str, body: &Value) -> Result<u64, String> {
    match body {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| format!("task '{name}': value must be a non-negative integer")),
        Value::String(s) => sluss_core::parse_amount(s)
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .ok_or_else(|| format!("task '{name}': value must be a non-negative integer")),
        _ => Err(format!("task '{name}': value must be a non-negative integer")),
    }
}

fn scalar_node(name: &str, body: &Value) -> Result<NodeIndex, String> {
    scalar_u64(name, body).map(|v| NodeIndex(v as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> TaskNode {
        serde_yaml::from_str(yaml).expect("task tree parses")
    }

    #[test]
    fn parses_nested_serial_parallel_tree() {
        let tree = parse(
            r#"
serial:
  tasks:
    - open_channel: {from: 0, to: 1, total_deposit: 1_000_000_000_000_000_000}
    - parallel:
        tasks:
          - transfer: {from: 0, to: 1, amount: 500}
          - transfer: {from: 1, to: 0, amount: 500}
    - wait: 10
"#,
        );
        let TaskNode::Serial(children) = &tree else {
            panic!("expected serial root");
        };
        assert_eq!(children.len(), 3);
        assert_eq!(tree.leaf_count(), 4);
        match &children[0] {
            TaskNode::Leaf(TaskKind::OpenChannel(task)) => {
                assert_eq!(task.from, NodeIndex(0));
                assert_eq!(task.total_deposit, Some(10u128.pow(18)));
            }
            other => panic!("expected open_channel, got {other:?}"),
        }
        assert!(matches!(&children[1], TaskNode::Parallel(kids) if kids.len() == 2));
        assert!(matches!(&children[2], TaskNode::Leaf(TaskKind::Wait(10))));
    }

    #[test]
    fn parses_lifecycle_scalars() {
        assert_eq!(
            parse("stop_node: 4"),
            TaskNode::Leaf(TaskKind::StopNode(NodeIndex(4)))
        );
        assert_eq!(
            parse("start_node: 0"),
            TaskNode::Leaf(TaskKind::StartNode(NodeIndex(0)))
        );
        assert_eq!(
            parse("kill_node: 2"),
            TaskNode::Leaf(TaskKind::KillNode(NodeIndex(2)))
        );
        assert_eq!(parse("wait_blocks: 1"), TaskNode::Leaf(TaskKind::WaitBlocks(1)));
    }

    #[test]
    fn parses_assert_with_wildcard_fields() {
        let tree = parse("assert: {from: 0, to: 1, balance: 999_000_000_000_000_000, state: opened}");
        let TaskNode::Leaf(TaskKind::Assert(task)) = tree else {
            panic!("expected assert leaf");
        };
        assert_eq!(task.balance, Some(999_000_000_000_000_000));
        assert_eq!(task.total_deposit, None);
        assert_eq!(task.state, Some(ChannelState::Opened));
    }

    #[test]
    fn parses_pfs_assertions() {
        let tree = parse(
            r#"
assert_pfs_history:
  source: 0
  request_count: 2
  expected_routes:
    - [0, 4, 3]
    - [0, 1, 2, 3]
"#,
        );
        let TaskNode::Leaf(TaskKind::AssertPfsHistory(task)) = tree else {
            panic!("expected assert_pfs_history leaf");
        };
        assert_eq!(task.request_count, Some(2));
        assert_eq!(
            task.expected_routes,
            Some(vec![
                vec![NodeIndex(0), NodeIndex(4), NodeIndex(3)],
                vec![NodeIndex(0), NodeIndex(1), NodeIndex(2), NodeIndex(3)],
            ])
        );
    }

    #[test]
    fn parses_expected_http_status_alternation() {
        let tree = parse("transfer: {from: 0, to: 3, amount: 1, expected_http_status: \"(200|409)\"}");
        let TaskNode::Leaf(TaskKind::Transfer(task)) = tree else {
            panic!("expected transfer leaf");
        };
        let pattern = task.expected_http_status.unwrap();
        assert!(pattern.matches(409));
    }

    #[test]
    fn rejects_unknown_task_name() {
        let err = serde_yaml::from_str::<TaskNode>("explode_node: 1").unwrap_err();
        assert!(err.to_string().contains("unknown task"));
    }

    #[test]
    fn rejects_deposit_without_total() {
        let err = serde_yaml::from_str::<TaskNode>("deposit: {from: 0, to: 1}").unwrap_err();
        assert!(err.to_string().contains("total_deposit"));
    }

    #[test]
    fn rejects_multi_key_node() {
        let err =
            serde_yaml::from_str::<TaskNode>("{wait: 1, stop_node: 2}").unwrap_err();
        assert!(err.to_string().contains("exactly one key"));
    }
}

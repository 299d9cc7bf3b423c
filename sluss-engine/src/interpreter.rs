//! Task-tree interpreter.
//!
//! Recursively executes a tree of task nodes. `Serial` blocks run
//! children in listed order and fail fast: once a child fails, the
//! remaining children are recorded `Cancelled` and never started.
//! `Parallel` blocks spawn every child concurrently and fail together:
//! siblings of a failed child run to completion (an in-flight chain
//! operation cannot be safely aborted) and every individual failure is
//! recorded, not just the first.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, warn};

use sluss_config::{TaskKind, TaskNode};
use sluss_core::{RpcError, TaskError};

use crate::context::RunContext;
use crate::handlers;
use crate::path::TaskPath;

/// Execution state of one task node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        };
        f.write_str(tag)
    }
}

/// Terminal record of one leaf task.
#[derive(Debug, Clone)]
pub struct LeafRecord {
    pub path: TaskPath,
    pub name: &'static str,
    pub status: TaskStatus,
    pub error: Option<TaskError>,
}

/// Result of executing a subtree: the subtree's terminal status plus the
/// terminal record of every leaf under it.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub status: TaskStatus,
    pub leaves: Vec<LeafRecord>,
}

impl Outcome {
    pub fn failed(&self) -> bool {
        self.status == TaskStatus::Failed
    }
}

type BoxedOutcome = Pin<Box<dyn Future<Output = Outcome> + Send>>;

/// Execute `node` under `ctx`. Takes the subtree by value so `Parallel`
/// children can be moved onto spawned tasks.
pub fn execute(ctx: Arc<RunContext>, node: TaskNode, path: TaskPath) -> BoxedOutcome {
    Box::pin(async move {
        match node {
            TaskNode::Leaf(kind) => run_leaf(ctx, kind, path).await,
            TaskNode::Serial(children) => run_serial(ctx, children, path).await,
            TaskNode::Parallel(children) => run_parallel(ctx, children, path).await,
        }
    })
}

async fn run_leaf(ctx: Arc<RunContext>, kind: TaskKind, path: TaskPath) -> Outcome {
    let path = path.leaf(kind.name());
    debug!(path = %path, "task running");
    let (status, error) = match handlers::run(&ctx, &kind).await {
        Ok(()) => (TaskStatus::Succeeded, None),
        Err(error) => {
            warn!(path = %path, %error, "task failed");
            (TaskStatus::Failed, Some(error))
        }
    };
    Outcome {
        status,
        leaves: vec![LeafRecord {
            path,
            name: kind.name(),
            status,
            error,
        }],
    }
}

async fn run_serial(ctx: Arc<RunContext>, children: Vec<TaskNode>, path: TaskPath) -> Outcome {
    let mut leaves = Vec::new();
    let mut children = children.into_iter().enumerate();

    for (index, child) in &mut children {
        let outcome = execute(ctx.clone(), child, path.child("serial", index)).await;
        let failed = outcome.failed();
        leaves.extend(outcome.leaves);
        if failed {
            // Fail fast: everything after this child is never started.
            for (index, child) in children {
                cancel_subtree(&child, path.child("serial", index), &mut leaves);
            }
            return Outcome {
                status: TaskStatus::Failed,
                leaves,
            };
        }
    }
    Outcome {
        status: TaskStatus::Succeeded,
        leaves,
    }
}

async fn run_parallel(ctx: Arc<RunContext>, children: Vec<TaskNode>, path: TaskPath) -> Outcome {
    let mut handles = Vec::with_capacity(children.len());
    for (index, child) in children.into_iter().enumerate() {
        let child_path = path.child("parallel", index);
        handles.push((
            child_path.clone(),
            tokio::spawn(execute(ctx.clone(), child, child_path)),
        ));
    }

    let mut leaves = Vec::new();
    let mut any_failed = false;
    for (child_path, handle) in handles {
        match handle.await {
            Ok(outcome) => {
                any_failed |= outcome.failed();
                leaves.extend(outcome.leaves);
            }
            Err(join_error) => {
                any_failed = true;
                leaves.push(LeafRecord {
                    path: child_path,
                    name: "parallel",
                    status: TaskStatus::Failed,
                    error: Some(TaskError::Rpc(RpcError::Transport(format!(
                        "task aborted: {join_error}"
                    )))),
                });
            }
        }
    }
    Outcome {
        status: if any_failed {
            TaskStatus::Failed
        } else {
            TaskStatus::Succeeded
        },
        leaves,
    }
}

/// Record every leaf of a never-started subtree as `Cancelled`.
fn cancel_subtree(node: &TaskNode, path: TaskPath, leaves: &mut Vec<LeafRecord>) {
    match node {
        TaskNode::Leaf(kind) => leaves.push(LeafRecord {
            path: path.leaf(kind.name()),
            name: kind.name(),
            status: TaskStatus::Cancelled,
            error: None,
        }),
        TaskNode::Serial(children) => {
            for (index, child) in children.iter().enumerate() {
                cancel_subtree(child, path.child("serial", index), leaves);
            }
        }
        TaskNode::Parallel(children) => {
            for (index, child) in children.iter().enumerate() {
                cancel_subtree(child, path.child("parallel", index), leaves);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RunContext, Timing};
    use sluss_config::TransferTask;
    use sluss_core::{NodeHandle, NodeIndex};
    use sluss_sim::{SimConfig, SimNetwork};
    use std::time::Duration;

    fn test_timing() -> Timing {
        Timing {
            poll_interval: Duration::from_millis(10),
            task_timeout: Duration::from_millis(200),
            wait_unit: Duration::from_millis(1),
            block_time: Duration::from_millis(20),
        }
    }

    fn context(node_count: usize) -> (Arc<RunContext>, Arc<SimNetwork>) {
        let sim = SimNetwork::new(node_count, SimConfig::default());
        let rpc: Arc<dyn sluss_core::NodeRpc> = sim.clone();
        let chain: Arc<dyn sluss_core::ChainOracle> = sim.clone();
        let process: Arc<dyn sluss_core::ProcessControl> = sim.clone();
        let pfs: Arc<dyn sluss_core::PfsApi> = sim.clone();
        let handles = (0..node_count)
            .map(|i| Arc::new(NodeHandle::new(NodeIndex(i), rpc.clone())))
            .collect();
        let ctx = Arc::new(RunContext::new(
            handles,
            chain,
            process,
            Some(pfs),
            test_timing(),
        ));
        (ctx, sim)
    }

    fn transfer(from: usize, to: usize, amount: u128) -> TaskNode {
        TaskNode::Leaf(TaskKind::Transfer(TransferTask {
            from: NodeIndex(from),
            to: NodeIndex(to),
            amount,
            expected_http_status: None,
        }))
    }

    fn open(from: usize, to: usize, deposit: u128) -> TaskNode {
        TaskNode::Leaf(TaskKind::OpenChannel(sluss_config::ChannelTask {
            from: NodeIndex(from),
            to: NodeIndex(to),
            total_deposit: Some(deposit),
            expected_http_status: None,
        }))
    }

    #[tokio::test]
    async fn serial_fails_fast_and_cancels_rest() {
        let (ctx, _sim) = context(2);
        // No channel exists: the transfer fails with 409, so the
        // following tasks must never start.
        let tree = TaskNode::Serial(vec![
            transfer(0, 1, 10),
            open(0, 1, 100),
            TaskNode::Leaf(TaskKind::Wait(1)),
        ]);
        let outcome = execute(ctx.clone(), tree, TaskPath::root()).await;

        assert_eq!(outcome.status, TaskStatus::Failed);
        assert_eq!(outcome.leaves.len(), 3);
        assert_eq!(outcome.leaves[0].status, TaskStatus::Failed);
        assert_eq!(outcome.leaves[1].status, TaskStatus::Cancelled);
        assert_eq!(outcome.leaves[2].status, TaskStatus::Cancelled);
        // Never started: the open_channel was cancelled, so node 0 still
        // has no channel.
        let response = ctx
            .handle(NodeIndex(0))
            .unwrap()
            .invoke(sluss_core::RpcOp::ChannelStatus {
                partner: NodeIndex(1),
            })
            .await
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn parallel_runs_all_children_and_aggregates_failures() {
        let (ctx, _sim) = context(3);
        execute(ctx.clone(), open(0, 1, 100), TaskPath::root()).await;

        // Two failing transfers (no route to node 2) and one good one.
        let tree = TaskNode::Parallel(vec![
            transfer(0, 2, 10),
            transfer(0, 1, 10),
            transfer(1, 2, 10),
        ]);
        let outcome = execute(ctx, tree, TaskPath::root()).await;

        assert_eq!(outcome.status, TaskStatus::Failed);
        let failed: Vec<String> = outcome
            .leaves
            .iter()
            .filter(|leaf| leaf.status == TaskStatus::Failed)
            .map(|leaf| leaf.path.to_string())
            .collect();
        assert_eq!(
            failed,
            vec![
                "scenario.parallel[0].transfer".to_string(),
                "scenario.parallel[2].transfer".to_string(),
            ]
        );
        // The succeeding sibling ran to completion despite the failures.
        assert_eq!(outcome.leaves[1].status, TaskStatus::Succeeded);
    }

    #[tokio::test]
    async fn nested_tree_paths_are_full() {
        let (ctx, _sim) = context(2);
        let tree = TaskNode::Serial(vec![TaskNode::Parallel(vec![TaskNode::Leaf(
            TaskKind::Wait(0),
        )])]);
        let outcome = execute(ctx, tree, TaskPath::root()).await;
        assert_eq!(
            outcome.leaves[0].path.to_string(),
            "scenario.serial[0].parallel[0].wait"
        );
    }

    #[tokio::test]
    async fn start_node_on_running_node_is_noop_success() {
        let (ctx, _sim) = context(1);
        let tree = TaskNode::Leaf(TaskKind::StartNode(NodeIndex(0)));
        let outcome = execute(ctx, tree, TaskPath::root()).await;
        assert_eq!(outcome.status, TaskStatus::Succeeded);
    }

    #[tokio::test]
    async fn stop_then_invoke_reports_node_unavailable() {
        let (ctx, _sim) = context(2);
        execute(ctx.clone(), open(0, 1, 100), TaskPath::root()).await;
        let stop = TaskNode::Leaf(TaskKind::StopNode(NodeIndex(0)));
        assert_eq!(
            execute(ctx.clone(), stop, TaskPath::root()).await.status,
            TaskStatus::Succeeded
        );

        let outcome = execute(ctx, transfer(0, 1, 1), TaskPath::root()).await;
        assert_eq!(outcome.status, TaskStatus::Failed);
        assert_eq!(
            outcome.leaves[0].error,
            Some(TaskError::NodeUnavailable(NodeIndex(0)))
        );
    }

    #[tokio::test]
    async fn wait_blocks_returns_once_chain_advances() {
        let sim = SimNetwork::new(1, SimConfig {
            block_time: Duration::from_millis(20),
            ..SimConfig::default()
        });
        let rpc: Arc<dyn sluss_core::NodeRpc> = sim.clone();
        let chain: Arc<dyn sluss_core::ChainOracle> = sim.chain();
        let process: Arc<dyn sluss_core::ProcessControl> = sim.clone();
        let handles = vec![Arc::new(NodeHandle::new(NodeIndex(0), rpc))];
        let ctx = Arc::new(RunContext::new(handles, chain, process, None, test_timing()));

        let tree = TaskNode::Leaf(TaskKind::WaitBlocks(2));
        let outcome = execute(ctx, tree, TaskPath::root()).await;
        assert_eq!(outcome.status, TaskStatus::Succeeded);
    }

    #[tokio::test]
    async fn kill_then_start_restores_node() {
        let (ctx, _sim) = context(2);
        execute(ctx.clone(), open(0, 1, 100), TaskPath::root()).await;
        let tree = TaskNode::Serial(vec![
            TaskNode::Leaf(TaskKind::KillNode(NodeIndex(0))),
            TaskNode::Leaf(TaskKind::StartNode(NodeIndex(0))),
            transfer(0, 1, 5),
        ]);
        let outcome = execute(ctx, tree, TaskPath::root()).await;
        assert_eq!(outcome.status, TaskStatus::Succeeded);
    }
}

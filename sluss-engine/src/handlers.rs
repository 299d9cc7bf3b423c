//! Leaf task handlers.
//!
//! Each handler performs exactly one operation through a node handle or
//! the poller and reports `Ok`/`TaskError`. Network invocation and
//! polling are the only suspension points.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use sluss_config::{AssertTask, ChannelTask, PfsHistoryTask, PfsIouTask, TaskKind, TransferTask};
use sluss_core::{
    poll_until, ChannelLeg, NodeIndex, RpcError, RpcOp, StatusPattern, TaskError,
};

use crate::context::RunContext;
use crate::evaluate::{evaluate_channel, evaluate_pfs_history, evaluate_pfs_iou};

/// Dispatch one leaf task.
pub async fn run(ctx: &Arc<RunContext>, kind: &TaskKind) -> Result<(), TaskError> {
    match kind {
        TaskKind::OpenChannel(task) => {
            let op = RpcOp::OpenChannel {
                partner: task.to,
                total_deposit: task.total_deposit.unwrap_or(0),
            };
            invoke_checked(ctx, task.from, op, pattern_for(task, kind)).await
        }
        TaskKind::Deposit(task) => {
            let op = RpcOp::Deposit {
                partner: task.to,
                // Presence enforced when the tree was parsed.
                total_deposit: task.total_deposit.unwrap_or(0),
            };
            invoke_checked(ctx, task.from, op, pattern_for(task, kind)).await
        }
        TaskKind::Transfer(task) => run_transfer(ctx, task).await,
        TaskKind::CloseChannel(task) => {
            let op = RpcOp::CloseChannel { partner: task.to };
            invoke_checked(ctx, task.from, op, pattern_for(task, kind)).await
        }
        TaskKind::LeaveNetwork(task) => {
            let pattern = task
                .expected_http_status
                .clone()
                .unwrap_or_else(|| StatusPattern::exact(200));
            invoke_checked(ctx, task.from, RpcOp::LeaveNetwork, pattern).await
        }
        TaskKind::Assert(task) => run_assert(ctx, task).await,
        TaskKind::AssertPfsHistory(task) => run_assert_pfs_history(ctx, task).await,
        TaskKind::AssertPfsIou(task) => run_assert_pfs_iou(ctx, task).await,
        TaskKind::Wait(units) => {
            let pause = ctx.timing.wait_unit * u32::try_from(*units).unwrap_or(u32::MAX);
            debug!(?pause, "wait task sleeping");
            tokio::time::sleep(pause).await;
            Ok(())
        }
        TaskKind::WaitBlocks(blocks) => run_wait_blocks(ctx, *blocks).await,
        TaskKind::StopNode(node) => run_stop(ctx, *node).await,
        TaskKind::StartNode(node) => run_start(ctx, *node).await,
        TaskKind::KillNode(node) => run_kill(ctx, *node).await,
    }
}

/// Accepted statuses for a channel operation: the fixture's pattern, or
/// the operation default (201 also accepted for `open_channel`).
fn pattern_for(task: &ChannelTask, kind: &TaskKind) -> StatusPattern {
    if let Some(pattern) = &task.expected_http_status {
        return pattern.clone();
    }
    match kind {
        TaskKind::OpenChannel(_) => StatusPattern::any_of([200, 201]),
        _ => StatusPattern::exact(200),
    }
}

async fn invoke_checked(
    ctx: &Arc<RunContext>,
    from: NodeIndex,
    op: RpcOp,
    pattern: StatusPattern,
) -> Result<(), TaskError> {
    let handle = ctx.handle(from)?;
    let response = handle.invoke(op).await?;
    if pattern.matches(response.status) {
        Ok(())
    } else {
        Err(TaskError::UnexpectedStatus {
            pattern,
            status: response.status,
        })
    }
}

async fn run_transfer(ctx: &Arc<RunContext>, task: &TransferTask) -> Result<(), TaskError> {
    let pattern = task
        .expected_http_status
        .clone()
        .unwrap_or_else(|| StatusPattern::exact(200));
    info!(from = %task.from, to = %task.to, amount = task.amount, "transfer");
    invoke_checked(
        ctx,
        task.from,
        RpcOp::Transfer {
            to: task.to,
            amount: task.amount,
        },
        pattern,
    )
    .await
}

/// Poll the observing node's channel view until the expectation holds.
async fn run_assert(ctx: &Arc<RunContext>, task: &AssertTask) -> Result<(), TaskError> {
    let handle = ctx.handle(task.from)?;
    let timing = ctx.timing;

    let check = {
        let handle = handle.clone();
        let task = task.clone();
        move || {
            let handle = handle.clone();
            let task = task.clone();
            async move {
                let response = handle
                    .invoke(RpcOp::ChannelStatus { partner: task.to })
                    .await
                    .map_err(|e| e.to_string())?;
                match response.channel {
                    Some(observed) if response.status == 200 => {
                        let result = evaluate_channel(&task, &observed);
                        if result.is_match() {
                            Ok(())
                        } else {
                            Err(result.to_string())
                        }
                    }
                    _ => Err(format!(
                        "channel {} not reported (status {})",
                        ChannelLeg::new(task.from, task.to),
                        response.status
                    )),
                }
            }
        }
    };

    poll_until(timing.poll_interval, timing.task_timeout, check)
        .await
        .map_err(|timeout| TaskError::AssertionTimeout {
            timeout: timeout.timeout,
            mismatches: timeout.last.unwrap_or_else(|| "no observation".to_string()),
        })
}

fn pfs(ctx: &Arc<RunContext>) -> Result<Arc<dyn sluss_core::PfsApi>, TaskError> {
    ctx.pfs.clone().ok_or_else(|| {
        TaskError::Rpc(RpcError::Transport(
            "no path-finding service configured".to_string(),
        ))
    })
}

async fn run_assert_pfs_history(
    ctx: &Arc<RunContext>,
    task: &PfsHistoryTask,
) -> Result<(), TaskError> {
    let pfs = pfs(ctx)?;
    let timing = ctx.timing;

    let check = {
        let task = task.clone();
        move || {
            let pfs = pfs.clone();
            let task = task.clone();
            async move {
                let observed = pfs.history(task.source).await.map_err(|e| e.to_string())?;
                let result = evaluate_pfs_history(&task, &observed);
                if result.is_match() {
                    Ok(())
                } else {
                    Err(result.to_string())
                }
            }
        }
    };

    poll_until(timing.poll_interval, timing.task_timeout, check)
        .await
        .map_err(|timeout| TaskError::AssertionTimeout {
            timeout: timeout.timeout,
            mismatches: timeout.last.unwrap_or_else(|| "no observation".to_string()),
        })
}

async fn run_assert_pfs_iou(ctx: &Arc<RunContext>, task: &PfsIouTask) -> Result<(), TaskError> {
    let pfs = pfs(ctx)?;
    let timing = ctx.timing;
    let (source, amount) = (task.source, task.amount);

    let check = move || {
        let pfs = pfs.clone();
        async move {
            let observed = pfs.iou(source).await.map_err(|e| e.to_string())?;
            let result = evaluate_pfs_iou(amount, observed);
            if result.is_match() {
                Ok(())
            } else {
                Err(result.to_string())
            }
        }
    };

    poll_until(timing.poll_interval, timing.task_timeout, check)
        .await
        .map_err(|timeout| TaskError::AssertionTimeout {
            timeout: timeout.timeout,
            mismatches: timeout.last.unwrap_or_else(|| "no observation".to_string()),
        })
}

/// Wait until chain height advances by `blocks` from the height observed
/// at task start.
async fn run_wait_blocks(ctx: &Arc<RunContext>, blocks: u64) -> Result<(), TaskError> {
    let start = ctx.chain.current_height().await.map_err(TaskError::Rpc)?;
    let target = start + blocks;
    let timing = ctx.timing;
    // Budget at least two block intervals per expected block.
    let intervals = blocks.saturating_add(1).min(10_000) as u32 * 2;
    let timeout = timing.task_timeout.max(timing.block_time * intervals);
    debug!(start, target, "waiting for chain height");

    let chain = ctx.chain.clone();
    let check = move || {
        let chain = chain.clone();
        async move {
            let height = chain.current_height().await.map_err(|e| e.to_string())?;
            if height >= target {
                Ok(())
            } else {
                Err(height.to_string())
            }
        }
    };

    poll_until(timing.poll_interval.min(timing.block_time), timeout, check)
        .await
        .map_err(|poll| TaskError::ChainStalled {
            target,
            observed: poll
                .last
                .and_then(|s| s.parse().ok())
                .unwrap_or(start),
            timeout: poll.timeout,
        })
}

/// Graceful stop: flag first so no new invokes land during the drain.
async fn run_stop(ctx: &Arc<RunContext>, node: NodeIndex) -> Result<(), TaskError> {
    let handle = ctx.handle(node)?;
    handle.set_running(false);
    info!(node = %node, "stopping node");
    ctx.process
        .stop(node)
        .await
        .map_err(|e| TaskError::Process {
            node,
            reason: e.to_string(),
        })
}

async fn run_kill(ctx: &Arc<RunContext>, node: NodeIndex) -> Result<(), TaskError> {
    let handle = ctx.handle(node)?;
    handle.set_running(false);
    info!(node = %node, "killing node");
    ctx.process
        .kill(node)
        .await
        .map_err(|e| TaskError::Process {
            node,
            reason: e.to_string(),
        })
}

/// Idempotent: starting an already-running node is a no-op success.
async fn run_start(ctx: &Arc<RunContext>, node: NodeIndex) -> Result<(), TaskError> {
    let handle = ctx.handle(node)?;
    if handle.is_running() {
        debug!(node = %node, "start_node on running node, no-op");
        return Ok(());
    }
    info!(node = %node, "starting node");
    ctx.process
        .start(node)
        .await
        .map_err(|e| TaskError::Process {
            node,
            reason: e.to_string(),
        })?;
    handle.set_running(true);
    Ok(())
}

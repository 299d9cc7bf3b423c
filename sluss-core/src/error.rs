//! Error taxonomy for scenario execution.
//!
//! [`TaskError`] is a leaf-task failure and becomes that leaf's `Failed`
//! result; [`ScenarioError`] is fatal and aborts the run before (or
//! instead of) task execution.

use std::time::Duration;

use thiserror::Error;

use crate::status::StatusPattern;
use crate::types::NodeIndex;

/// Transport-level failure talking to a collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    #[error("node {0} is unreachable")]
    Unreachable(NodeIndex),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Failure of one leaf task. Never silently swallowed: it is recorded as
/// that leaf's result and aggregated per the composition rules.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Operation invoked on a stopped node handle.
    #[error("node {0} is not running")]
    NodeUnavailable(NodeIndex),

    /// Response status outside the accepted pattern.
    #[error("unexpected HTTP status {status}, accepted {pattern}")]
    UnexpectedStatus { pattern: StatusPattern, status: u16 },

    /// Observed state never matched the expectation within the deadline.
    #[error("assertion did not hold within {timeout:?}; last mismatch: {mismatches}")]
    AssertionTimeout {
        timeout: Duration,
        mismatches: String,
    },

    /// Block height did not advance far enough within the deadline.
    #[error("chain stalled: height {observed} never reached {target} within {timeout:?}")]
    ChainStalled {
        target: u64,
        observed: u64,
        timeout: Duration,
    },

    /// Node process lifecycle operation failed.
    #[error("process control failed on node {node}: {reason}")]
    Process { node: NodeIndex, reason: String },

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Fatal, pre-execution failure. Not part of the task-result tree.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Structural validation failed, e.g. a task references a node index
    /// outside the configured topology.
    #[error("malformed scenario: {0}")]
    Malformed(String),

    /// Setup failed before any task ran.
    #[error("provisioning failed: {0}")]
    Provisioning(String),
}

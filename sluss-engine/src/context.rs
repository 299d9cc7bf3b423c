//! Shared execution context.
//!
//! The node-handle registry is a single owned table passed into the
//! interpreter, not ambient global state; leaves share it read-mostly and
//! only the lifecycle tasks flip running flags.

use std::sync::Arc;
use std::time::Duration;

use sluss_config::Settings;
use sluss_core::{
    ChainOracle, NodeHandle, NodeIndex, PfsApi, ProcessControl, RpcError, TaskError,
};

/// Timing knobs derived from scenario settings.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    pub poll_interval: Duration,
    pub task_timeout: Duration,
    pub wait_unit: Duration,
    pub block_time: Duration,
}

impl From<&Settings> for Timing {
    fn from(settings: &Settings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            task_timeout: settings.task_timeout(),
            wait_unit: settings.wait_unit(),
            block_time: settings.block_time(),
        }
    }
}

pub struct RunContext {
    handles: Vec<Arc<NodeHandle>>,
    pub chain: Arc<dyn ChainOracle>,
    pub process: Arc<dyn ProcessControl>,
    pub pfs: Option<Arc<dyn PfsApi>>,
    pub timing: Timing,
}

impl RunContext {
    pub fn new(
        handles: Vec<Arc<NodeHandle>>,
        chain: Arc<dyn ChainOracle>,
        process: Arc<dyn ProcessControl>,
        pfs: Option<Arc<dyn PfsApi>>,
        timing: Timing,
    ) -> Self {
        Self {
            handles,
            chain,
            process,
            pfs,
            timing,
        }
    }

    /// Handle for `node`. Structural validation guarantees the index is
    /// in range for any loaded scenario.
    pub fn handle(&self, node: NodeIndex) -> Result<Arc<NodeHandle>, TaskError> {
        self.handles
            .get(node.0)
            .cloned()
            .ok_or_else(|| TaskError::Rpc(RpcError::Transport(format!("unknown node {node}"))))
    }

    pub fn node_count(&self) -> usize {
        self.handles.len()
    }
}

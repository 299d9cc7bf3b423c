//! Runtime node handles.
//!
//! One handle per topology index, created by the scenario runner and
//! shared read-mostly across concurrently executing leaves. Only the
//! lifecycle tasks flip the running flag; the flag is atomic so a
//! `stop_node` in one parallel branch is immediately visible to invokes
//! in another.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::error::TaskError;
use crate::rpc::{NodeRpc, RpcOp, RpcResponse};
use crate::types::NodeIndex;

pub struct NodeHandle {
    index: NodeIndex,
    running: AtomicBool,
    rpc: Arc<dyn NodeRpc>,
}

impl NodeHandle {
    /// New handle in the Running state.
    pub fn new(index: NodeIndex, rpc: Arc<dyn NodeRpc>) -> Self {
        Self {
            index,
            running: AtomicBool::new(true),
            rpc,
        }
    }

    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn set_running(&self, running: bool) {
        debug!(node = %self.index, running, "node running flag updated");
        self.running.store(running, Ordering::Release);
    }

    /// Dispatch one operation. Fails with [`TaskError::NodeUnavailable`]
    /// without touching the backend when the node is stopped.
    pub async fn invoke(&self, op: RpcOp) -> Result<RpcResponse, TaskError> {
        if !self.is_running() {
            return Err(TaskError::NodeUnavailable(self.index));
        }
        debug!(node = %self.index, op = op.name(), "invoking node operation");
        Ok(self.rpc.invoke(self.index, op).await?)
    }
}

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle")
            .field("index", &self.index)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    struct CountingRpc {
        calls: AtomicU32,
    }

    #[async_trait]
    impl NodeRpc for CountingRpc {
        async fn invoke(&self, _node: NodeIndex, _op: RpcOp) -> Result<RpcResponse, crate::RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RpcResponse::status_only(200))
        }
    }

    fn handle_with_counter() -> (NodeHandle, Arc<CountingRpc>) {
        let rpc = Arc::new(CountingRpc {
            calls: AtomicU32::new(0),
        });
        (NodeHandle::new(NodeIndex(3), rpc.clone()), rpc)
    }

    #[tokio::test]
    async fn invoke_reaches_backend_while_running() {
        let (handle, rpc) = handle_with_counter();
        let response = handle.invoke(RpcOp::LeaveNetwork).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(rpc.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invoke_on_stopped_node_fails_without_backend_call() {
        let (handle, rpc) = handle_with_counter();
        handle.set_running(false);
        let err = handle.invoke(RpcOp::LeaveNetwork).await.unwrap_err();
        assert_eq!(err, TaskError::NodeUnavailable(NodeIndex(3)));
        assert_eq!(rpc.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn restart_makes_handle_invokable_again() {
        let (handle, rpc) = handle_with_counter();
        handle.set_running(false);
        handle.set_running(true);
        assert!(handle.invoke(RpcOp::LeaveNetwork).await.is_ok());
        assert_eq!(rpc.calls.load(Ordering::SeqCst), 1);
    }
}

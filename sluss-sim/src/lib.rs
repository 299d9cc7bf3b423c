//! ## sluss-sim
//! **Deterministic in-memory payment-channel network**
//!
//! Implements every collaborator seam the engine calls — node RPC,
//! process control, chain height, path-finding queries, and the
//! user-deposit contract — against a single locked state table. Routing
//! is fewest-hops BFS over currently usable legs, the chain clock derives
//! from tokio time, and an optional per-call latency models in-flight
//! requests so graceful stops have something to drain.

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use sluss_core::{
    Amount, ChainOracle, NodeIndex, NodeRpc, PfsApi, PfsRequestRecord, ProcessControl, RpcError,
    RpcOp, RpcResponse, UdcApi,
};

mod chain;
mod routing;
mod state;

pub use chain::SimChain;

use state::NetState;

/// Simulation tuning knobs.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Artificial per-invocation latency; gives `stop` drains something
    /// to wait for.
    pub latency: Duration,
    /// Fee charged per answered path-finding request.
    pub pfs_fee: Amount,
    pub block_time: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            pfs_fee: 1_000_000,
            block_time: Duration::from_secs(15),
        }
    }
}

/// The simulated network. One instance serves all topology nodes; clone
/// the [`Arc`] into each collaborator slot.
pub struct SimNetwork {
    state: Mutex<NetState>,
    chain: Arc<SimChain>,
    config: SimConfig,
}

impl SimNetwork {
    pub fn new(node_count: usize, config: SimConfig) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(NetState::with_nodes(node_count)),
            chain: Arc::new(SimChain::new(config.block_time)),
            config,
        })
    }

    pub fn chain(&self) -> Arc<SimChain> {
        self.chain.clone()
    }

    /// Service-fee collateral recorded for `node` by UDC deposits.
    pub fn udc_balance(&self, node: NodeIndex) -> Amount {
        self.state
            .lock()
            .udc_deposits
            .get(&node.0)
            .copied()
            .unwrap_or(0)
    }

    fn begin_invoke(&self, node: NodeIndex) -> Result<(), RpcError> {
        let mut state = self.state.lock();
        let sim_node = state
            .nodes
            .get_mut(node.0)
            .ok_or_else(|| RpcError::Transport(format!("unknown node {node}")))?;
        if !sim_node.running {
            return Err(RpcError::Unreachable(node));
        }
        sim_node.in_flight += 1;
        Ok(())
    }

    fn apply(&self, node: NodeIndex, op: RpcOp) -> RpcResponse {
        let mut state = self.state.lock();
        let response = match op {
            RpcOp::OpenChannel {
                partner,
                total_deposit,
            } => state.open_channel(node.0, partner.0, total_deposit),
            RpcOp::Deposit {
                partner,
                total_deposit,
            } => state.deposit(node.0, partner.0, total_deposit),
            RpcOp::Transfer { to, amount } => {
                state.transfer(node.0, to.0, amount, self.config.pfs_fee)
            }
            RpcOp::CloseChannel { partner } => state.close_channel(node.0, partner.0),
            RpcOp::LeaveNetwork => state.leave_network(node.0),
            RpcOp::ChannelStatus { partner } => state.channel_status(node.0, partner.0),
        };
        if let Some(sim_node) = state.nodes.get_mut(node.0) {
            sim_node.in_flight = sim_node.in_flight.saturating_sub(1);
        }
        response
    }
}

#[async_trait]
impl NodeRpc for SimNetwork {
    async fn invoke(&self, node: NodeIndex, op: RpcOp) -> Result<RpcResponse, RpcError> {
        self.begin_invoke(node)?;
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
        // An operation dispatched before a kill runs to completion; only
        // new invocations see the stopped node.
        let response = self.apply(node, op);
        debug!(node = %node, op = op.name(), status = response.status, "simulated operation");
        Ok(response)
    }
}

#[async_trait]
impl ProcessControl for SimNetwork {
    async fn stop(&self, node: NodeIndex) -> Result<(), RpcError> {
        {
            let mut state = self.state.lock();
            let sim_node = state
                .nodes
                .get_mut(node.0)
                .ok_or_else(|| RpcError::Transport(format!("unknown node {node}")))?;
            sim_node.running = false;
        }
        // Graceful: drain whatever was already dispatched.
        loop {
            let in_flight = self.state.lock().nodes[node.0].in_flight;
            if in_flight == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        debug!(node = %node, "node stopped");
        Ok(())
    }

    async fn kill(&self, node: NodeIndex) -> Result<(), RpcError> {
        let mut state = self.state.lock();
        let sim_node = state
            .nodes
            .get_mut(node.0)
            .ok_or_else(|| RpcError::Transport(format!("unknown node {node}")))?;
        sim_node.running = false;
        debug!(node = %node, "node killed");
        Ok(())
    }

    async fn start(&self, node: NodeIndex) -> Result<(), RpcError> {
        let mut state = self.state.lock();
        let sim_node = state
            .nodes
            .get_mut(node.0)
            .ok_or_else(|| RpcError::Transport(format!("unknown node {node}")))?;
        // Idempotent: starting a running node is a no-op.
        sim_node.running = true;
        debug!(node = %node, "node started");
        Ok(())
    }
}

#[async_trait]
impl ChainOracle for SimNetwork {
    async fn current_height(&self) -> Result<u64, RpcError> {
        Ok(self.chain.height())
    }
}

#[async_trait]
impl PfsApi for SimNetwork {
    async fn history(&self, source: NodeIndex) -> Result<Vec<PfsRequestRecord>, RpcError> {
        Ok(self
            .state
            .lock()
            .pfs_history
            .get(&source.0)
            .cloned()
            .unwrap_or_default())
    }

    async fn iou(&self, source: NodeIndex) -> Result<Amount, RpcError> {
        Ok(self
            .state
            .lock()
            .pfs_iou
            .get(&source.0)
            .copied()
            .unwrap_or(0))
    }
}

#[async_trait]
impl UdcApi for SimNetwork {
    async fn deposit(&self, node: NodeIndex, amount: Amount) -> Result<(), RpcError> {
        let mut state = self.state.lock();
        if node.0 >= state.nodes.len() {
            return Err(RpcError::Transport(format!("unknown node {node}")));
        }
        *state.udc_deposits.entry(node.0).or_insert(0) += amount;
        Ok(())
    }
}

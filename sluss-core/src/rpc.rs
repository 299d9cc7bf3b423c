//! Collaborator seams.
//!
//! The engine is purely a caller of these interfaces; the payment-channel
//! protocol, path-finding service, chain, and node process management all
//! live behind them. `sluss-sim` provides the deterministic in-memory
//! implementation.

use async_trait::async_trait;

use crate::error::RpcError;
use crate::types::{ChannelSnapshot, NodeIndex};
use crate::Amount;

/// One node-level operation, dispatched through a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcOp {
    /// Open the channel towards `partner`, funding this side with
    /// `total_deposit`.
    OpenChannel {
        partner: NodeIndex,
        total_deposit: Amount,
    },
    /// Raise this side's total deposit to `total_deposit`.
    Deposit {
        partner: NodeIndex,
        total_deposit: Amount,
    },
    /// Pay `amount` to `to`, directly or mediated through the network.
    Transfer { to: NodeIndex, amount: Amount },
    CloseChannel { partner: NodeIndex },
    LeaveNetwork,
    /// Query this node's view of its leg towards `partner`.
    ChannelStatus { partner: NodeIndex },
}

impl RpcOp {
    /// Name used in task paths and logs.
    pub fn name(&self) -> &'static str {
        match self {
            RpcOp::OpenChannel { .. } => "open_channel",
            RpcOp::Deposit { .. } => "deposit",
            RpcOp::Transfer { .. } => "transfer",
            RpcOp::CloseChannel { .. } => "close_channel",
            RpcOp::LeaveNetwork => "leave_network",
            RpcOp::ChannelStatus { .. } => "channel_status",
        }
    }
}

/// HTTP-style reply from a node operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcResponse {
    pub status: u16,
    pub channel: Option<ChannelSnapshot>,
}

impl RpcResponse {
    pub fn status_only(status: u16) -> Self {
        Self {
            status,
            channel: None,
        }
    }
}

/// Node RPC surface. One implementation serves every node in the
/// topology; the node is addressed per call.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    async fn invoke(&self, node: NodeIndex, op: RpcOp) -> Result<RpcResponse, RpcError>;
}

/// Lifecycle control of the underlying node process.
#[async_trait]
pub trait ProcessControl: Send + Sync {
    /// Graceful shutdown: drains in-flight requests before returning.
    async fn stop(&self, node: NodeIndex) -> Result<(), RpcError>;
    /// Immediate termination, no drain. The node stays restart-able.
    async fn kill(&self, node: NodeIndex) -> Result<(), RpcError>;
    async fn start(&self, node: NodeIndex) -> Result<(), RpcError>;
}

/// External chain height source.
#[async_trait]
pub trait ChainOracle: Send + Sync {
    async fn current_height(&self) -> Result<u64, RpcError>;
}

/// One recorded path-finding request, ordered by occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PfsRequestRecord {
    pub route: Vec<NodeIndex>,
    pub routes_count: usize,
}

/// Query surface of the path-finding service.
#[async_trait]
pub trait PfsApi: Send + Sync {
    /// All requests issued by `source`, in request order.
    async fn history(&self, source: NodeIndex) -> Result<Vec<PfsRequestRecord>, RpcError>;
    /// Accumulated fee owed by `source`. Strictly increasing across
    /// successive requests.
    async fn iou(&self, source: NodeIndex) -> Result<Amount, RpcError>;
}

/// User-deposit contract: service-fee collateral, funded once per node
/// during provisioning.
#[async_trait]
pub trait UdcApi: Send + Sync {
    async fn deposit(&self, node: NodeIndex, amount: Amount) -> Result<(), RpcError>;
}

//! ## sluss-core
//! **Identities, collaborator seams, and polling primitives**
//!
//! Shared vocabulary for the Sluss scenario engine: node and channel
//! identities, token amounts (with `_` digit-group parsing), HTTP status
//! patterns, the condition poller used by every `wait*`/`assert*` task,
//! and the async trait seams behind which the real payment-channel
//! network (or the simulator) lives.
//!
//! ### Key Submodules:
//! - `types/`: `NodeIndex`, `ChannelLeg`, `ChannelState`, amounts
//! - `status/`: `expected_http_status` alternation patterns
//! - `poll/`: deadline-bounded condition polling
//! - `rpc/`: `NodeRpc`, `ProcessControl`, `ChainOracle`, `PfsApi`
//! - `handle/`: per-node handles gating RPC on the running flag

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod amount;
pub mod error;
pub mod handle;
pub mod poll;
pub mod rpc;
pub mod status;
pub mod types;

pub use amount::{parse_amount, Amount};
pub use error::{RpcError, ScenarioError, TaskError};
pub use handle::NodeHandle;
pub use poll::{poll_until, PollTimeout};
pub use rpc::{
    ChainOracle, NodeRpc, PfsApi, PfsRequestRecord, ProcessControl, RpcOp, RpcResponse, UdcApi,
};
pub use status::StatusPattern;
pub use types::{ChannelLeg, ChannelSnapshot, ChannelState, NodeIndex};

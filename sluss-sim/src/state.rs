//! In-memory network state: nodes, directional legs, and PFS accounting.
//!
//! All mutation happens under the [`SimNetwork`](crate::SimNetwork) lock;
//! methods here are synchronous and check every invariant before touching
//! state (balances never go negative, deposits never decrease).

use std::collections::{BTreeMap, BTreeSet};

use sluss_core::{Amount, ChannelSnapshot, ChannelState, NodeIndex, PfsRequestRecord, RpcResponse};

use crate::routing::shortest_route;

#[derive(Debug)]
pub(crate) struct SimNode {
    pub running: bool,
    pub in_flight: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Leg {
    pub state: ChannelState,
    pub total_deposit: Amount,
    pub balance: Amount,
}

impl Leg {
    fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            state: self.state,
            total_deposit: self.total_deposit,
            balance: self.balance,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct NetState {
    pub nodes: Vec<SimNode>,
    pub legs: BTreeMap<(usize, usize), Leg>,
    pub pfs_history: BTreeMap<usize, Vec<PfsRequestRecord>>,
    pub pfs_iou: BTreeMap<usize, Amount>,
    pub udc_deposits: BTreeMap<usize, Amount>,
}

impl NetState {
    pub fn with_nodes(count: usize) -> Self {
        Self {
            nodes: (0..count)
                .map(|_| SimNode {
                    running: true,
                    in_flight: 0,
                })
                .collect(),
            ..Default::default()
        }
    }

    /// Open both directions, funding the opener's side. Re-opening an
    /// existing channel is a 409 conflict and leaves state untouched.
    pub fn open_channel(&mut self, from: usize, to: usize, deposit: Amount) -> RpcResponse {
        if let Some(existing) = self.legs.get(&(from, to)) {
            return RpcResponse {
                status: 409,
                channel: Some(existing.snapshot()),
            };
        }
        let leg = Leg {
            state: ChannelState::Opened,
            total_deposit: deposit,
            balance: deposit,
        };
        self.legs.insert((from, to), leg);
        self.legs.entry((to, from)).or_insert(Leg {
            state: ChannelState::Opened,
            total_deposit: 0,
            balance: 0,
        });
        RpcResponse {
            status: 201,
            channel: Some(leg.snapshot()),
        }
    }

    /// Raise the leg's total deposit to `new_total`. Deposits are
    /// monotonically non-decreasing; lowering is a 409 conflict.
    pub fn deposit(&mut self, from: usize, to: usize, new_total: Amount) -> RpcResponse {
        let Some(leg) = self.legs.get_mut(&(from, to)) else {
            return RpcResponse::status_only(404);
        };
        if leg.state != ChannelState::Opened {
            return RpcResponse {
                status: 409,
                channel: Some(leg.snapshot()),
            };
        }
        if new_total < leg.total_deposit {
            return RpcResponse {
                status: 409,
                channel: Some(leg.snapshot()),
            };
        }
        let delta = new_total - leg.total_deposit;
        leg.total_deposit = new_total;
        leg.balance += delta;
        RpcResponse {
            status: 200,
            channel: Some(leg.snapshot()),
        }
    }

    /// Pay `amount` from `from` to `to`. Adjacent funded legs settle
    /// directly; anything else is a mediated transfer through one
    /// path-finding request. Self-payments and no viable route are a 409.
    pub fn transfer(&mut self, from: usize, to: usize, amount: Amount, pfs_fee: Amount) -> RpcResponse {
        if from == to {
            return RpcResponse::status_only(409);
        }
        if self.usable_edges(amount).contains(&(from, to)) {
            self.move_along(&[from, to], amount);
            return RpcResponse::status_only(200);
        }

        // The fee is owed per answered path request; a query with no
        // viable route returns empty-handed and charges nothing.
        match shortest_route(&self.usable_edges(amount), from, to) {
            Some(path) => {
                self.pfs_history.entry(from).or_default().push(PfsRequestRecord {
                    route: path.iter().copied().map(NodeIndex).collect(),
                    routes_count: 1,
                });
                *self.pfs_iou.entry(from).or_insert(0) += pfs_fee;
                self.move_along(&path, amount);
                RpcResponse::status_only(200)
            }
            None => RpcResponse::status_only(409),
        }
    }

    pub fn close_channel(&mut self, from: usize, to: usize) -> RpcResponse {
        let Some(leg) = self.legs.get_mut(&(from, to)) else {
            return RpcResponse::status_only(404);
        };
        if leg.state != ChannelState::Opened {
            return RpcResponse {
                status: 409,
                channel: Some(leg.snapshot()),
            };
        }
        leg.state = ChannelState::Closed;
        let snapshot = leg.snapshot();
        if let Some(reverse) = self.legs.get_mut(&(to, from)) {
            reverse.state = ChannelState::Closed;
        }
        RpcResponse {
            status: 200,
            channel: Some(snapshot),
        }
    }

    /// Close every leg adjacent to `node`, both directions.
    pub fn leave_network(&mut self, node: usize) -> RpcResponse {
        for (&(a, b), leg) in self.legs.iter_mut() {
            if (a == node || b == node) && leg.state == ChannelState::Opened {
                leg.state = ChannelState::Closed;
            }
        }
        RpcResponse::status_only(200)
    }

    pub fn channel_status(&self, from: usize, to: usize) -> RpcResponse {
        match self.legs.get(&(from, to)) {
            Some(leg) => RpcResponse {
                status: 200,
                channel: Some(leg.snapshot()),
            },
            None => RpcResponse::status_only(404),
        }
    }

    /// Directed edges a payment of `amount` can traverse right now:
    /// both endpoints running, leg opened, and sufficient balance.
    fn usable_edges(&self, amount: Amount) -> BTreeSet<(usize, usize)> {
        self.legs
            .iter()
            .filter(|(&(a, b), leg)| {
                leg.state == ChannelState::Opened
                    && leg.balance >= amount
                    && self.nodes.get(a).is_some_and(|n| n.running)
                    && self.nodes.get(b).is_some_and(|n| n.running)
            })
            .map(|(&edge, _)| edge)
            .collect()
    }

    /// Move `amount` hop by hop along `path`. Capacity was verified when
    /// the edges were selected; the debit checks again so a balance can
    /// never underflow.
    fn move_along(&mut self, path: &[usize], amount: Amount) {
        for pair in path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if let Some(leg) = self.legs.get_mut(&(a, b)) {
                leg.balance = leg.balance.saturating_sub(amount);
            }
            if let Some(reverse) = self.legs.get_mut(&(b, a)) {
                reverse.balance += amount;
            }
        }
    }
}

//! Node and channel identities shared across the workspace.

use serde::{Deserialize, Serialize};

use crate::Amount;

/// Integer index into the scenario topology. Maps to one runtime
/// [`NodeHandle`](crate::NodeHandle).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct NodeIndex(pub usize);

impl std::fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for NodeIndex {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

/// One directional balance relationship between two nodes.
///
/// Legs are not globally unique: `(a, b)` and `(b, a)` carry independent
/// deposits and balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelLeg {
    pub from: NodeIndex,
    pub to: NodeIndex,
}

impl ChannelLeg {
    pub fn new(from: impl Into<NodeIndex>, to: impl Into<NodeIndex>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// The opposite direction of this leg.
    pub fn reversed(self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }
}

impl std::fmt::Display for ChannelLeg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// Lifecycle state of a channel leg as reported by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Opened,
    Closed,
    Settled,
}

impl ChannelState {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelState::Opened => "opened",
            ChannelState::Closed => "closed",
            ChannelState::Settled => "settled",
        }
    }
}

impl std::str::FromStr for ChannelState {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "opened" => Ok(ChannelState::Opened),
            "closed" => Ok(ChannelState::Closed),
            "settled" => Ok(ChannelState::Settled),
            other => Err(format!(
                "invalid channel state '{other}'. valid values: opened, closed, settled"
            )),
        }
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed per-leg state returned by a node's channel query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub state: ChannelState,
    pub total_deposit: Amount,
    pub balance: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leg_reversed_swaps_direction() {
        let leg = ChannelLeg::new(0, 4);
        assert_eq!(leg.reversed(), ChannelLeg::new(4, 0));
        assert_eq!(leg.reversed().reversed(), leg);
    }

    #[test]
    fn channel_state_serializes_snake_case() {
        let yaml = serde_yaml::to_string(&ChannelState::Opened).unwrap();
        assert_eq!(yaml.trim(), "opened");
        let state: ChannelState = serde_yaml::from_str("settled").unwrap();
        assert_eq!(state, ChannelState::Settled);
    }

    #[test]
    fn channel_state_from_str_rejects_unknown() {
        assert!("half-open".parse::<ChannelState>().is_err());
        assert_eq!("Opened".parse::<ChannelState>(), Ok(ChannelState::Opened));
    }
}

//! Simulated chain height.
//!
//! Height is derived from elapsed tokio time over a fixed block interval,
//! so paused-clock tests drive `wait_blocks` deterministically by just
//! sleeping.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use sluss_core::{ChainOracle, RpcError};

pub struct SimChain {
    genesis: Instant,
    block_time: Duration,
}

impl SimChain {
    pub fn new(block_time: Duration) -> Self {
        Self {
            genesis: Instant::now(),
            block_time,
        }
    }

    pub fn height(&self) -> u64 {
        let elapsed = self.genesis.elapsed();
        (elapsed.as_nanos() / self.block_time.as_nanos().max(1)) as u64
    }
}

#[async_trait]
impl ChainOracle for SimChain {
    async fn current_height(&self) -> Result<u64, RpcError> {
        Ok(self.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn height_tracks_block_interval() {
        let chain = SimChain::new(Duration::from_millis(100));
        assert_eq!(chain.height(), 0);
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(chain.height(), 3);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(chain.height(), 4);
    }
}

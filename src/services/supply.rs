//! Circulating supply derived from block height.
//!
//! Walks the halving epochs block by block, then adds the genesis reward once.
//! The per-block walk covers heights 1..=h; the genesis block is not part of it.

use rust_decimal::Decimal;

/// Blocks per halving epoch
pub const HALVING_INTERVAL: u64 = 210_000;

/// Initial block reward in satoshis (50 BTC)
pub const INITIAL_REWARD_SATS: u64 = 5_000_000_000;

/// Satoshis per BTC, expressed as the decimal scale
const BTC_SCALE: u32 = 8;

/// Total supply in satoshis as of `block_height`.
pub fn circulating_supply_sats(block_height: u64) -> u64 {
    let mut supply: u64 = 0;
    let mut remaining = block_height;
    let mut epoch: u32 = 0;

    while remaining > 0 {
        // Integer shift rounds the reward toward zero, same as consensus
        let reward = INITIAL_REWARD_SATS.checked_shr(epoch).unwrap_or(0);
        if reward == 0 {
            break;
        }

        let blocks_in_epoch = remaining.min(HALVING_INTERVAL);
        supply += blocks_in_epoch * reward;
        remaining -= blocks_in_epoch;
        epoch += 1;
    }

    supply + INITIAL_REWARD_SATS
}

/// Total supply in BTC as of `block_height`.
pub fn circulating_supply(block_height: u64) -> Decimal {
    let sats = circulating_supply_sats(block_height);
    // Max supply (~2.1e15 sats) fits comfortably in i64
    Decimal::new(sats as i64, BTC_SCALE).normalize()
}

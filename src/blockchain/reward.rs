/* ------------------- Decaying reward economic model -------------------
   - base reward of 75 coins
   - divided by 1.5 at every epoch of 3,435,000 blocks
   - floored at a 0.3 tail reward
--------------------------------------------------------------------- */

const BASE_REWARD: f64 = 75.0;
const DECREASE_FACTOR: f64 = 1.5;
const BLOCKS_PER_EPOCH: u32 = 3_435_000;
const TAIL_REWARD: f64 = 0.3;

/// Reward paid by the block that will sit at `next_index` in the chain.
pub fn reward_at_height(next_index: u32) -> f64 {
    let epoch = next_index / BLOCKS_PER_EPOCH;
    let decayed = BASE_REWARD / DECREASE_FACTOR.powi(epoch as i32);
    decayed.max(TAIL_REWARD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_epoch_pays_base_reward() {
        assert_eq!(reward_at_height(0), 75.0);
        assert_eq!(reward_at_height(1), 75.0);
        assert_eq!(reward_at_height(BLOCKS_PER_EPOCH - 1), 75.0);
    }

    #[test]
    fn reward_decays_per_epoch() {
        assert_eq!(reward_at_height(BLOCKS_PER_EPOCH), 50.0);
        assert_eq!(reward_at_height(2 * BLOCKS_PER_EPOCH), 75.0 / 2.25);
    }

    #[test]
    fn reward_never_falls_below_tail() {
        // Deep in the schedule the decay has long passed the floor.
        let far = reward_at_height(u32::MAX);
        assert_eq!(far, TAIL_REWARD);
    }
}

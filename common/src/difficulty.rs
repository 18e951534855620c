// Difficulty here is "leading zero bytes required in a block hash", not a
// hashrate-normalized target: it grows by one every 128 blocks.
pub fn difficulty(height: u64) -> u32 {
    (height / 128) as u32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_difficulty_is_one() {
        assert_eq!(difficulty(0), 1);
    }

    #[test]
    fn difficulty_steps_every_128_blocks() {
        assert_eq!(difficulty(127), 1);
        assert_eq!(difficulty(128), 2);
        assert_eq!(difficulty(255), 2);
        assert_eq!(difficulty(256), 3);
    }
}

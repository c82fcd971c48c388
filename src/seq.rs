//! Sequence-number arithmetic in the protocol's 16-bit wrap-around space.
//!
//! Sequence numbers live in `[0, SEQ_MAX)`; all addition is modulo
//! `SEQ_MAX`. A sequence `s` is "in the forward window from base `b`" iff
//! `(s - b) mod SEQ_MAX < SEQ_MAX / 2`, which gives an unambiguous
//! past/future split of the whole space around any base.

use rand::Rng;

/// Modulus of the sequence-number space.
pub const SEQ_MAX: u32 = 30720;

/// Maximum payload bytes of one segment.
pub const MSS: u32 = 1024;

/// `(base + delta) mod SEQ_MAX`.
pub fn add(base: u32, delta: u32) -> u32 {
    (base + delta) % SEQ_MAX
}

/// Whether `s` falls in the forward half of the sequence space measured
/// from `base`, i.e. is "ahead of or at" `base` rather than behind it.
pub fn in_forward_window(s: u32, base: u32) -> bool {
    let diff = (s + SEQ_MAX - base) % SEQ_MAX;
    diff < SEQ_MAX / 2
}

/// Draw a uniformly random initial sequence number in `[0, SEQ_MAX]`.
pub fn random_isn() -> u32 {
    rand::thread_rng().gen_range(0..=SEQ_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_wraps() {
        assert_eq!(add(SEQ_MAX - 1, 1), 0);
        assert_eq!(add(0, SEQ_MAX), 0);
        assert_eq!(add(100, 50), 150);
    }

    #[test]
    fn add_is_associative() {
        let cases = [(1u32, 2u32, 3u32), (SEQ_MAX - 5, 10, 20), (0, 0, 0)];
        for (a, b, c) in cases {
            assert_eq!(add(add(a, b), c), add(a, add(b, c)));
        }
    }

    #[test]
    fn forward_window_matches_half_space_rule() {
        let base = 12345;
        for k in 0..SEQ_MAX {
            let s = add(base, k);
            assert_eq!(in_forward_window(s, base), k < SEQ_MAX / 2, "k={k}");
        }
    }

    #[test]
    fn forward_window_wraps_around_zero() {
        let base = SEQ_MAX - 10;
        assert!(in_forward_window(add(base, 5), base));
        assert!(!in_forward_window(add(base, SEQ_MAX / 2 + 5), base));
    }

    #[test]
    fn random_isn_in_range() {
        for _ in 0..1000 {
            let isn = random_isn();
            assert!(isn <= SEQ_MAX);
        }
    }
}

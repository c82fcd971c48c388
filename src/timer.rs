//! Timer utilities: monotonic clock reads and their translation into the
//! socket's receive-timeout format.
//!
//! All protocol timers are computed relative to the earliest outstanding
//! `send_time`, never wall-clock epoch, so a timeout always measures how
//! long a segment has actually been waiting rather than drifting with
//! however long the caller took between loop iterations.

use std::time::{Duration, Instant};

/// Retransmit timeout used throughout the handshake, send engine and
/// receive-side ACK cadence.
pub const RTO: Duration = Duration::from_millis(500);

/// Close-wait silence window at teardown.
pub const CLOSE_WAIT: Duration = Duration::from_millis(750);

/// How long to block on the next `recv` given the moment the earliest
/// outstanding segment was last sent. Never negative; clamps to zero once
/// `deadline` is already behind `now`.
pub fn remaining(now: Instant, send_time: Instant, deadline: Duration) -> Duration {
    deadline.saturating_sub(now.saturating_duration_since(send_time))
}

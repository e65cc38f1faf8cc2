//! The EWMA queue-occupancy estimator, including idle-period catch-up
//! (spec §4.2).
//!
//! `red-queue.cc::Estimator` computes this with a decrementing loop:
//!
//! ```text
//! newAve = qAvg;
//! while (--m >= 1) { newAve *= 1.0 - qW; }
//! newAve *= 1.0 - qW;
//! newAve += qW * nQueued;
//! ```
//!
//! which is `m` applications of `newAve *= (1 - qw)` (the loop runs while
//! the pre-decremented `m` is still `>= 1`, i.e. `m - 1` times, plus the one
//! unconditional multiply after the loop — `m` total), followed by one
//! weighted sample against `nQueued`. That is exactly `(1-qw)^m · qAvg`
//! before the sample is mixed in. We compute the same quantity in closed
//! form, sidestepping the `uint` underflow the reference's `--m` is prone to
//! (REDESIGN FLAG 5) since `m` is resolved to a signed count before it ever
//! reaches this function.
pub fn update(q_avg: f64, n_queued: u32, m: u32, qw: f64) -> f64 {
    let decay = (1.0 - qw).powi(m as i32);
    decay * q_avg + qw * n_queued as f64
}

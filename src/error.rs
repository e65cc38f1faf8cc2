//! Fatal configuration errors.
//!
//! Per the spec's error handling design, the RED core never propagates an
//! error from the packet path — `enqueue`/`dequeue`/`peek` cannot fail.
//! The only place an invalid setup is rejected is at configuration build
//! time, before any packet has been queued.

use thiserror::Error;

/// Reasons [`crate::config::ConfigBuilder::build`] can refuse to produce a
/// [`crate::config::Config`].
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// `l_interm <= 0`; `cur_max_p = 1/l_interm` would be non-positive or
    /// infinite.
    #[error("l_interm must be positive, got {0}")]
    NonPositiveLInterm(f64),

    /// `mean_pkt_size == 0`; `ptc` and byte-mode scaling both divide by it.
    #[error("mean_pkt_size must be nonzero")]
    ZeroMeanPacketSize,

    /// `queue_limit == 0`; no packet could ever be admitted.
    #[error("queue_limit must be nonzero")]
    ZeroQueueLimit,

    /// `min_th < 0` or `max_th < 0`; thresholds are occupancy measures and
    /// cannot be negative.
    #[error("thresholds must be non-negative (min_th={min_th}, max_th={max_th})")]
    NegativeThreshold { min_th: f64, max_th: f64 },

    /// `cautious` outside `{0, 1, 2, 3}`.
    #[error("cautious mode must be 0-3, got {0}")]
    InvalidCautiousMode(u8),

    /// `link_bandwidth_bps == 0`; `ptc` would be zero, making the idle
    /// catch-up and `qw` auto-derivation both degenerate.
    #[error("link_bandwidth_bps must be nonzero")]
    ZeroLinkBandwidth,

    /// `cautious == 3` (idle catch-up scaled by `idle_pkt_size`) but
    /// `idle_pkt_size == 0`; the idle-catch-up rate would divide by zero.
    #[error("idle_pkt_size must be nonzero when cautious mode 3 is selected")]
    ZeroIdlePacketSize,
}

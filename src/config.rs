//! RED configuration.
//!
//! `Config` is the validated, immutable-after-construction parameter bundle
//! described in spec §3. It is built through [`ConfigBuilder`] rather than
//! constructed directly, so every `Config` in existence has already passed
//! the out-of-range checks in spec §7 — the packet path never has to worry
//! about an invalid parameter.
//!
//! Defaults mirror the ns-3 `RedQueue` attribute table
//! (`examples/original_source/src/node/red-queue.cc::GetTypeId`) field for
//! field, so a config file ported from an ns-3 simulation script carries
//! over unchanged.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Unit the queue's thresholds and `queue_limit` are measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Occupancy and limits are counted in packets.
    Packets,
    /// Occupancy and limits are counted in bytes.
    Bytes,
}

/// Experimental instantaneous-vs-average gating modes (spec §4.4 note,
/// §4.6). `0` is the default RED behavior; `1`-`3` are ns-2 compatibility
/// knobs kept for parity with the reference, not recommended for new
/// deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Cautious {
    /// Default RED: no instantaneous-vs-average gating.
    Off = 0,
    /// Skip the random drop when the instantaneous queue is far below the
    /// average (decline to drop).
    SkipWhenBelowAverage = 1,
    /// Scale the drawn uniform sample when the instantaneous queue is
    /// below the average, rather than skipping outright.
    ScaleWhenBelowAverage = 2,
    /// Use `idle_pkt_size` instead of `mean_pkt_size` when computing the
    /// idle catch-up rate.
    IdlePacketSizeCatchUp = 3,
}

impl Cautious {
    fn from_u8(v: u8) -> Result<Self, ConfigError> {
        match v {
            0 => Ok(Cautious::Off),
            1 => Ok(Cautious::SkipWhenBelowAverage),
            2 => Ok(Cautious::ScaleWhenBelowAverage),
            3 => Ok(Cautious::IdlePacketSizeCatchUp),
            other => Err(ConfigError::InvalidCautiousMode(other)),
        }
    }
}

/// Validated RED parameters. Construct through [`ConfigBuilder`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub(crate) mode: Mode,
    pub(crate) mean_pkt_size: u32,
    pub(crate) idle_pkt_size: u32,
    pub(crate) wait: bool,
    pub(crate) gentle: bool,
    pub(crate) min_th: f64,
    pub(crate) max_th: f64,
    pub(crate) queue_limit: u32,
    pub(crate) qw: f64,
    pub(crate) l_interm: f64,
    pub(crate) ns1_compat: bool,
    pub(crate) link_bandwidth_bps: u64,
    pub(crate) link_delay: Duration,
    pub(crate) cautious: Cautious,
}

impl Config {
    /// Start building a `Config` from ns-3-compatible defaults:
    /// `PACKETS` mode, `min_th=5`, `max_th=15`, `queue_limit=25`,
    /// `qw=0.002`, `l_interm=50`, `gentle=true`, `wait=true`,
    /// `mean_pkt_size=500`, `link_bandwidth=1.5Mbps`, `link_delay=20ms`.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn mean_pkt_size(&self) -> u32 {
        self.mean_pkt_size
    }

    pub fn idle_pkt_size(&self) -> u32 {
        self.idle_pkt_size
    }

    pub fn wait(&self) -> bool {
        self.wait
    }

    pub fn gentle(&self) -> bool {
        self.gentle
    }

    pub fn min_th(&self) -> f64 {
        self.min_th
    }

    pub fn max_th(&self) -> f64 {
        self.max_th
    }

    pub fn queue_limit(&self) -> u32 {
        self.queue_limit
    }

    /// The raw `qw` as configured — may still be a sentinel (`0`, `-1`,
    /// `-2`) awaiting auto-derivation; see [`crate::queue::RedQueue::ensure_initialized`].
    pub fn qw(&self) -> f64 {
        self.qw
    }

    pub fn l_interm(&self) -> f64 {
        self.l_interm
    }

    pub fn ns1_compat(&self) -> bool {
        self.ns1_compat
    }

    pub fn link_bandwidth_bps(&self) -> u64 {
        self.link_bandwidth_bps
    }

    pub fn link_delay(&self) -> Duration {
        self.link_delay
    }

    pub fn cautious(&self) -> Cautious {
        self.cautious
    }
}

/// Chained-setter builder for [`Config`], validated on [`ConfigBuilder::build`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    mode: Mode,
    mean_pkt_size: u32,
    idle_pkt_size: u32,
    wait: bool,
    gentle: bool,
    min_th: f64,
    max_th: f64,
    queue_limit: u32,
    qw: f64,
    l_interm: f64,
    ns1_compat: bool,
    link_bandwidth_bps: u64,
    link_delay: Duration,
    cautious: u8,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        ConfigBuilder {
            mode: Mode::Packets,
            mean_pkt_size: 500,
            idle_pkt_size: 0,
            wait: true,
            gentle: true,
            min_th: 5.0,
            max_th: 15.0,
            queue_limit: 25,
            qw: 0.002,
            l_interm: 50.0,
            ns1_compat: false,
            link_bandwidth_bps: 1_500_000,
            link_delay: Duration::from_millis(20),
            cautious: 0,
        }
    }
}

impl ConfigBuilder {
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mean_pkt_size(mut self, bytes: u32) -> Self {
        self.mean_pkt_size = bytes;
        self
    }

    pub fn idle_pkt_size(mut self, bytes: u32) -> Self {
        self.idle_pkt_size = bytes;
        self
    }

    pub fn wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    pub fn gentle(mut self, gentle: bool) -> Self {
        self.gentle = gentle;
        self
    }

    pub fn thresholds(mut self, min_th: f64, max_th: f64) -> Self {
        self.min_th = min_th;
        self.max_th = max_th;
        self
    }

    pub fn queue_limit(mut self, limit: u32) -> Self {
        self.queue_limit = limit;
        self
    }

    /// Set the EWMA weight. `0.0`, `-1.0`, and `-2.0` are sentinels that
    /// trigger auto-derivation from the link parameters at initialization
    /// (spec §4.3) rather than literal weights.
    pub fn qw(mut self, qw: f64) -> Self {
        self.qw = qw;
        self
    }

    pub fn l_interm(mut self, l_interm: f64) -> Self {
        self.l_interm = l_interm;
        self
    }

    pub fn ns1_compat(mut self, enabled: bool) -> Self {
        self.ns1_compat = enabled;
        self
    }

    pub fn link(mut self, bandwidth_bps: u64, delay: Duration) -> Self {
        self.link_bandwidth_bps = bandwidth_bps;
        self.link_delay = delay;
        self
    }

    pub fn cautious(mut self, mode: u8) -> Self {
        self.cautious = mode;
        self
    }

    /// Validate and produce a [`Config`].
    ///
    /// `max_th == min_th` is intentionally *not* rejected here: per spec §7
    /// it is a documented compatibility quirk, substituted with
    /// `th_diff = 1.0` at initialization rather than treated as fatal.
    pub fn build(self) -> Result<Config, ConfigError> {
        if self.l_interm <= 0.0 {
            return Err(ConfigError::NonPositiveLInterm(self.l_interm));
        }
        if self.mean_pkt_size == 0 {
            return Err(ConfigError::ZeroMeanPacketSize);
        }
        if self.queue_limit == 0 {
            return Err(ConfigError::ZeroQueueLimit);
        }
        if self.min_th < 0.0 || self.max_th < 0.0 {
            return Err(ConfigError::NegativeThreshold {
                min_th: self.min_th,
                max_th: self.max_th,
            });
        }
        if self.link_bandwidth_bps == 0 {
            return Err(ConfigError::ZeroLinkBandwidth);
        }
        let cautious = Cautious::from_u8(self.cautious)?;
        if matches!(cautious, Cautious::IdlePacketSizeCatchUp) && self.idle_pkt_size == 0 {
            return Err(ConfigError::ZeroIdlePacketSize);
        }

        Ok(Config {
            mode: self.mode,
            mean_pkt_size: self.mean_pkt_size,
            idle_pkt_size: self.idle_pkt_size,
            wait: self.wait,
            gentle: self.gentle,
            min_th: self.min_th,
            max_th: self.max_th,
            queue_limit: self.queue_limit,
            qw: self.qw,
            l_interm: self.l_interm,
            ns1_compat: self.ns1_compat,
            link_bandwidth_bps: self.link_bandwidth_bps,
            link_delay: self.link_delay,
            cautious,
        })
    }
}

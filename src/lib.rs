//! # red-queue
//!
//! Random Early Detection (RED) active queue management: a FIFO packet
//! buffer that probabilistically drops packets before it is full, using an
//! EWMA of queue occupancy as the congestion signal. Implements the
//! "gentle" variant described by Floyd and Jacobson, ported from the NS-2 /
//! ns-3 reference implementation with its common compatibility knobs
//! (`wait`, `ns1_compat`, `cautious`).
//!
//! The core never performs I/O, spawns threads, or reaches for a
//! process-wide clock or RNG: [`time::Clock`] and [`random::UniformSource`]
//! are injected, so the same engine drives a discrete-event simulation or a
//! real packet-path thread.
//!
//! ## Crate structure
//!
//! - [`time`] — injected monotonic clock
//! - [`random`] — injected uniform `[0,1)` sampler
//! - [`packet`] — the `Packet` trait and a minimal `SizedPacket`
//! - [`error`] — fatal configuration errors
//! - [`config`] — validated RED parameters and their builder
//! - [`estimator`] — EWMA queue-occupancy average, including idle catch-up
//! - [`probability`] — `calculate_p_new` / `modify_p` / `drop_early`
//! - [`stats`] — drop/backlog counters and Prometheus rendering
//! - [`queue`] — `RedQueue`, the FIFO buffer and drop-decision state machine

pub mod config;
pub mod error;
pub mod estimator;
pub mod packet;
pub mod probability;
pub mod queue;
pub mod random;
pub mod stats;
pub mod time;

pub use config::{Cautious, Config, ConfigBuilder, Mode};
pub use error::ConfigError;
pub use packet::{Packet, SizedPacket};
pub use queue::{DropHook, Queue, RedQueue};
pub use random::{RandUniform, UniformSource};
pub use stats::{DropKind, Stats};
pub use time::{Clock, Instant, SystemClock};

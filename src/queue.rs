//! The RED state machine: enqueue/dequeue/peek and the forced/unforced drop
//! decision (spec §3, §4.1, §4.5, §4.7).
//!
//! Grounded in `red-queue.cc::DoEnqueue`/`DoDequeue`/`DoPeek`, with the
//! ns-3 `Queue` base class's virtual dispatch replaced by the narrow
//! [`Queue`] trait (REDESIGN FLAG 4) and the simulator/RNG singletons
//! replaced by the injected [`Clock`]/[`UniformSource`] collaborators
//! (REDESIGN FLAG 1).

use std::collections::VecDeque;

use crate::config::{Cautious, Config};
use crate::packet::Packet;
use crate::probability::{self, ProbabilityConstants};
use crate::random::UniformSource;
use crate::stats::{DropKind, Stats};
use crate::time::{Clock, Instant};
use crate::{estimator, random};

/// Observability callback invoked exactly once per refused packet
/// (spec §6 "Injected collaborators: ... Drop hook"). Ownership of the
/// packet passes to the hook; the queue never touches it again.
pub type DropHook<P> = Box<dyn FnMut(P, DropKind) + Send>;

/// The narrow capability surface external code drives a RED queue through
/// (spec §6 "Queue interface"). `RedQueue` is the sole implementor.
pub trait Queue {
    type Packet;

    fn enqueue(&mut self, packet: Self::Packet) -> bool;
    fn dequeue(&mut self) -> Option<Self::Packet>;
    fn peek(&self) -> Option<&Self::Packet>;
    fn size(&self) -> u32;
    fn stats(&self) -> &Stats;
}

/// A RED-managed FIFO packet buffer.
///
/// Generic over the packet type `P`, an injected [`Clock`] `C`, and an
/// injected [`UniformSource`] `R`, so the same core drives both a
/// discrete-event simulation and a real packet-path thread without any
/// process-global state.
pub struct RedQueue<P, C, R>
where
    P: Packet,
    C: Clock,
    R: UniformSource,
{
    config: Config,
    clock: C,
    rng: R,
    drop_hook: Option<DropHook<P>>,

    buffer: VecDeque<P>,
    bytes_in_queue: u32,

    q_avg: f64,
    count: u32,
    count_bytes: u32,
    old: bool,
    idle: bool,
    idle_time: Option<Instant>,
    v_prob: f64,
    v_prob1: f64,

    initialized: bool,
    warned_th_diff: bool,
    ptc: f64,
    qw: f64,
    prob_constants: ProbabilityConstants,

    stats: Stats,
}

impl<P, C> RedQueue<P, C, random::RandUniform>
where
    P: Packet,
    C: Clock,
{
    /// Build a queue with an OS-seeded uniform source, the common case for
    /// anything other than a deterministic test.
    pub fn with_system_rng(config: Config, clock: C) -> Self {
        Self::new(config, clock, random::RandUniform::new())
    }
}

impl<P, C, R> RedQueue<P, C, R>
where
    P: Packet,
    C: Clock,
    R: UniformSource,
{
    pub fn new(config: Config, clock: C, rng: R) -> Self {
        RedQueue {
            config,
            clock,
            rng,
            drop_hook: None,

            buffer: VecDeque::new(),
            bytes_in_queue: 0,

            q_avg: 0.0,
            count: 0,
            count_bytes: 0,
            old: false,
            idle: true,
            idle_time: None,
            v_prob: 0.0,
            v_prob1: 0.0,

            initialized: false,
            warned_th_diff: false,
            ptc: 0.0,
            qw: 0.0,
            prob_constants: ProbabilityConstants {
                v_a: 0.0,
                v_b: 0.0,
                v_c: 0.0,
                v_d: 0.0,
                cur_max_p: 0.0,
            },

            stats: Stats::default(),
        }
    }

    /// Install a callback invoked once per refused packet. Chainable at
    /// construction time, mirroring the teacher's `with_*` builder idiom
    /// (`pool::PacketContext::with_priority`).
    pub fn with_drop_hook(mut self, hook: impl FnMut(P, DropKind) + Send + 'static) -> Self {
        self.drop_hook = Some(Box::new(hook));
        self
    }

    pub fn q_avg(&self) -> f64 {
        self.q_avg
    }

    pub fn v_prob(&self) -> f64 {
        self.v_prob
    }

    pub fn v_prob1(&self) -> f64 {
        self.v_prob1
    }

    pub fn bytes_in_queue(&self) -> u32 {
        self.bytes_in_queue
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lazy one-shot derivation of `ptc`, `qw`, and the probability
    /// constants (spec §4.3). Mirrors `RedQueue::InitializeParams`.
    fn ensure_initialized(&mut self) {
        if self.initialized {
            return;
        }
        tracing::debug!("initializing RED queue parameters");

        let min_th = self.config.min_th();
        let max_th = self.config.max_th();
        let mut th_diff = max_th - min_th;
        if th_diff == 0.0 {
            if !self.warned_th_diff {
                tracing::warn!(
                    min_th,
                    max_th,
                    "min_th == max_th; substituting th_diff = 1.0 for compatibility"
                );
                self.warned_th_diff = true;
            }
            th_diff = 1.0;
        }

        let cur_max_p = 1.0 / self.config.l_interm();
        let v_a = 1.0 / th_diff;
        let v_b = -min_th / th_diff;
        let (v_c, v_d) = if self.config.gentle() {
            ((1.0 - cur_max_p) / max_th, 2.0 * cur_max_p - 1.0)
        } else {
            (0.0, 0.0)
        };
        self.prob_constants = ProbabilityConstants {
            v_a,
            v_b,
            v_c,
            v_d,
            cur_max_p,
        };

        self.ptc =
            self.config.link_bandwidth_bps() as f64 / (8.0 * self.config.mean_pkt_size() as f64);

        self.qw = resolve_qw(
            self.config.qw(),
            self.ptc,
            self.config.link_delay().as_secs_f64(),
        );

        self.q_avg = 0.0;
        self.count = 0;
        self.count_bytes = 0;
        self.old = false;
        self.idle = true;
        self.idle_time = Some(self.clock.now());

        self.initialized = true;
    }

    /// Virtual packet times served during the preceding idle interval
    /// (spec §4.2). `idle_time` is always `Some` once initialized, since
    /// `ensure_initialized` and `dequeue`'s empty branch both set it.
    fn idle_catchup_steps(&mut self) -> u32 {
        if !self.idle {
            return 0;
        }
        self.idle = false;

        let idle_time = self
            .idle_time
            .expect("idle_time set by ensure_initialized before first catch-up");
        let elapsed = self.clock.now().saturating_duration_since(idle_time);

        let ptc = if self.config.cautious() == Cautious::IdlePacketSizeCatchUp {
            self.ptc * self.config.mean_pkt_size() as f64 / self.config.idle_pkt_size() as f64
        } else {
            self.ptc
        };

        (ptc * elapsed.as_secs_f64()).max(0.0) as u32
    }
}

impl<P, C, R> Queue for RedQueue<P, C, R>
where
    P: Packet,
    C: Clock,
    R: UniformSource,
{
    type Packet = P;

    fn enqueue(&mut self, packet: P) -> bool {
        self.ensure_initialized();

        let pkt_size = packet.size_bytes();
        let nqueued = self.size();

        let m = self.idle_catchup_steps();
        self.q_avg = estimator::update(self.q_avg, nqueued, m + 1, self.qw);

        self.count += 1;
        self.count_bytes += pkt_size;

        let min_th = self.config.min_th();
        let max_th = self.config.max_th();
        let gentle = self.config.gentle();

        let mut drop_kind = DropKind::None;
        if self.q_avg >= min_th && nqueued > 1 {
            if (!gentle && self.q_avg >= max_th) || (gentle && self.q_avg >= 2.0 * max_th) {
                drop_kind = DropKind::Forced;
            } else if !self.old {
                // Crossing from below min_th (or min_th with an empty
                // queue) to above it: reset the random-drop counters, no
                // drop on the crossing packet itself.
                self.count = 1;
                self.count_bytes = pkt_size;
                self.old = true;
            } else {
                let result = probability::drop_early(
                    &mut self.rng,
                    self.q_avg,
                    nqueued,
                    self.count,
                    self.count_bytes,
                    pkt_size,
                    self.config.mean_pkt_size(),
                    self.config.wait(),
                    gentle,
                    max_th,
                    self.config.mode(),
                    self.config.cautious(),
                    self.ptc,
                    self.qw,
                    &self.prob_constants,
                );
                self.v_prob1 = result.v_prob1;
                self.v_prob = result.v_prob;
                if result.drop {
                    self.count = 0;
                    self.count_bytes = 0;
                    drop_kind = DropKind::Unforced;
                }
            }
        } else {
            self.v_prob = 0.0;
            self.old = false;
        }

        if nqueued >= self.config.queue_limit() {
            drop_kind = DropKind::Forced;
        }

        tracing::trace!(q_avg = self.q_avg, nqueued, ?drop_kind, "enqueue");

        match drop_kind {
            DropKind::Unforced => {
                self.stats.record_drop(DropKind::Unforced);
                tracing::debug!(q_avg = self.q_avg, "dropping due to random mark");
                if let Some(hook) = &mut self.drop_hook {
                    hook(packet, DropKind::Unforced);
                }
                false
            }
            DropKind::Forced => {
                self.stats.record_drop(DropKind::Forced);
                if self.config.ns1_compat() {
                    self.count = 0;
                    self.count_bytes = 0;
                }
                tracing::debug!(q_avg = self.q_avg, "dropping due to hard mark");
                if let Some(hook) = &mut self.drop_hook {
                    hook(packet, DropKind::Forced);
                }
                false
            }
            DropKind::None => {
                self.bytes_in_queue += pkt_size;
                self.stats.record_enqueue();
                self.buffer.push_back(packet);
                true
            }
        }
    }

    fn dequeue(&mut self) -> Option<P> {
        match self.buffer.pop_front() {
            Some(p) => {
                self.idle = false;
                self.bytes_in_queue -= p.size_bytes();
                self.stats.record_dequeue();
                tracing::trace!(bytes_in_queue = self.bytes_in_queue, "dequeue");
                Some(p)
            }
            None => {
                self.idle = true;
                self.idle_time = Some(self.clock.now());
                tracing::trace!("dequeue on empty queue; idle onset");
                None
            }
        }
    }

    fn peek(&self) -> Option<&P> {
        self.buffer.front()
    }

    fn size(&self) -> u32 {
        match self.config.mode() {
            crate::config::Mode::Bytes => self.bytes_in_queue,
            crate::config::Mode::Packets => self.buffer.len() as u32,
        }
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}

/// `qw` auto-derivation from link parameters (spec §4.3). `0`, `-1`, `-2`
/// are sentinels; any other value passes through unchanged.
fn resolve_qw(qw: f64, ptc: f64, link_delay_secs: f64) -> f64 {
    if qw == 0.0 {
        1.0 - (-1.0 / ptc).exp()
    } else if qw == -1.0 {
        let rtt = (3.0 * (link_delay_secs + 1.0 / ptc)).max(0.1);
        1.0 - (-1.0 / (10.0 * rtt * ptc)).exp()
    } else if qw == -2.0 {
        1.0 - (-10.0 / ptc).exp()
    } else {
        qw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Mode};
    use crate::packet::SizedPacket;
    use crate::random::testing::{Fixed, Sequence};
    use crate::time::testing::MockClock;
    use bytes::Bytes;

    fn packet(size: usize) -> SizedPacket {
        SizedPacket::new(Bytes::from(vec![0u8; size]))
    }

    fn default_queue() -> RedQueue<SizedPacket, MockClock, Fixed> {
        let (clock, _mock) = MockClock::new();
        let config = Config::builder()
            .mode(Mode::Packets)
            .thresholds(5.0, 15.0)
            .queue_limit(25)
            .qw(0.002)
            .l_interm(50.0)
            .gentle(true)
            .wait(true)
            .mean_pkt_size(500)
            .link(1_500_000, std::time::Duration::from_millis(20))
            .build()
            .unwrap();
        RedQueue::new(config, clock, Fixed(1.0))
    }

    #[test]
    fn cold_start_single_packet_is_accepted() {
        let mut q = default_queue();
        assert!(q.enqueue(packet(500)));
        assert_eq!(q.bytes_in_queue(), 500);
        assert_eq!(q.size(), 1);
        assert_eq!(q.stats().pdrop(), 0);
    }

    #[test]
    fn below_min_th_all_accepted_and_old_stays_clear() {
        let mut q = default_queue();
        for _ in 0..4 {
            assert!(q.enqueue(packet(500)));
        }
        assert_eq!(q.stats().pdrop(), 0);
        assert!(!q.old);
    }

    #[test]
    fn threshold_crossing_resets_counters() {
        let mut q = default_queue();
        // Prime q_avg above min_th with nqueued > 1 by forcing a large
        // average directly, simulating a queue that has been filling.
        q.q_avg = 10.0;
        q.old = false;
        for _ in 0..3 {
            q.buffer.push_back(packet(500));
            q.bytes_in_queue += 500;
        }
        assert!(q.enqueue(packet(500)));
        assert!(q.old);
        assert_eq!(q.count, 1);
        assert_eq!(q.count_bytes, 500);
    }

    #[test]
    fn forced_drop_at_2x_max_th_under_gentle() {
        let mut q = default_queue();
        q.q_avg = 30.0;
        q.old = true;
        for _ in 0..3 {
            q.buffer.push_back(packet(500));
            q.bytes_in_queue += 500;
        }
        assert!(!q.enqueue(packet(500)));
        assert_eq!(q.stats().forced_drop(), 1);
    }

    #[test]
    fn queue_limit_forces_drop_regardless_of_q_avg() {
        let mut q = default_queue();
        for _ in 0..25 {
            q.buffer.push_back(packet(500));
            q.bytes_in_queue += 500;
        }
        assert!(!q.enqueue(packet(500)));
        assert_eq!(q.stats().forced_drop(), 1);
        assert_eq!(q.size(), 25);
    }

    #[test]
    fn deterministic_unforced_drop_with_zero_sample() {
        let (clock, _mock) = MockClock::new();
        let config = Config::builder()
            .mode(Mode::Packets)
            .thresholds(5.0, 15.0)
            .queue_limit(25)
            .qw(0.002)
            .l_interm(50.0)
            .gentle(true)
            .wait(false)
            .mean_pkt_size(500)
            .link(1_500_000, std::time::Duration::from_millis(20))
            .build()
            .unwrap();
        let mut q: RedQueue<SizedPacket, MockClock, Sequence> =
            RedQueue::new(config, clock, Sequence::new(vec![0.0]));
        q.q_avg = 10.0;
        q.old = true;
        q.count = 100;
        for _ in 0..3 {
            q.buffer.push_back(packet(500));
            q.bytes_in_queue += 500;
        }
        assert!(!q.enqueue(packet(500)));
        assert_eq!(q.stats().unforced_drop(), 1);
        assert_eq!(q.count, 0);
        assert_eq!(q.count_bytes, 0);
    }

    #[test]
    fn dequeue_is_fifo() {
        let mut q = default_queue();
        assert!(q.enqueue(packet(100)));
        assert!(q.enqueue(packet(200)));
        assert!(q.enqueue(packet(300)));
        assert_eq!(q.dequeue().unwrap().size_bytes(), 100);
        assert_eq!(q.dequeue().unwrap().size_bytes(), 200);
        assert_eq!(q.dequeue().unwrap().size_bytes(), 300);
        assert!(q.dequeue().is_none());
    }

    #[test]
    fn dequeue_on_empty_sets_idle() {
        let mut q = default_queue();
        assert!(q.dequeue().is_none());
        assert!(q.idle);
    }

    #[test]
    fn peek_does_not_mutate() {
        let mut q = default_queue();
        q.enqueue(packet(500));
        assert_eq!(q.peek().unwrap().size_bytes(), 500);
        assert_eq!(q.peek().unwrap().size_bytes(), 500);
        assert_eq!(q.size(), 1);
    }

    #[test]
    fn resolve_qw_sentinel_zero_matches_reference_formula() {
        let ptc = 375.0; // 1.5e6 / (8*500)
        let qw = resolve_qw(0.0, ptc, 0.02);
        let want = 1.0 - (-1.0 / ptc).exp();
        assert!((qw - want).abs() < 1e-12);
    }

    #[test]
    fn resolve_qw_passes_through_non_sentinel() {
        assert_eq!(resolve_qw(0.5, 375.0, 0.02), 0.5);
    }

    #[test]
    fn equal_thresholds_do_not_panic_on_initialize() {
        let (clock, _mock) = MockClock::new();
        let config = Config::builder().thresholds(10.0, 10.0).build().unwrap();
        let mut q: RedQueue<SizedPacket, MockClock, Fixed> =
            RedQueue::new(config, clock, Fixed(1.0));
        assert!(q.enqueue(packet(500)));
    }
}

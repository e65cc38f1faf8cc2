//! Drop accounting and Prometheus exposition (spec §3, §9).
//!
//! Field names mirror `RedQueue::Stats` (`red-queue.h`): `unforced_drop`,
//! `forced_drop`, `pdrop`, `other`, `backlog`. The hard `queue_limit`
//! overflow in §4.5 step 5 is classified `FORCED`, same as the reference —
//! there is no separate counter for it. `other` is reserved for drops a host
//! records outside RED's own classification (e.g. a downstream discipline
//! discarding a dequeued packet); the core itself never increments it.
//! `render_prometheus` is ambient observability — the packet path never
//! calls it.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Why a packet was refused admission. `None` on the success path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropKind {
    /// Admitted; not a drop.
    None,
    /// `drop_early`'s random draw fired.
    Unforced,
    /// `q_avg` past threshold, or the hard `queue_limit` was reached.
    Forced,
}

/// Cumulative drop and throughput counters for one [`crate::queue::RedQueue`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    enqueued: u64,
    dequeued: u64,
    unforced_drop: u64,
    forced_drop: u64,
    other: u64,
}

impl Stats {
    pub fn record_enqueue(&mut self) {
        self.enqueued += 1;
    }

    pub fn record_dequeue(&mut self) {
        self.dequeued += 1;
    }

    pub fn record_drop(&mut self, kind: DropKind) {
        match kind {
            DropKind::None => {}
            DropKind::Unforced => self.unforced_drop += 1,
            DropKind::Forced => self.forced_drop += 1,
        }
    }

    /// Record a drop a host attributes to something other than RED's own
    /// classification. The core never calls this itself.
    pub fn record_other(&mut self) {
        self.other += 1;
    }

    pub fn enqueued(&self) -> u64 {
        self.enqueued
    }

    pub fn dequeued(&self) -> u64 {
        self.dequeued
    }

    pub fn unforced_drop(&self) -> u64 {
        self.unforced_drop
    }

    pub fn forced_drop(&self) -> u64 {
        self.forced_drop
    }

    pub fn other(&self) -> u64 {
        self.other
    }

    /// All drops combined, regardless of kind.
    pub fn pdrop(&self) -> u64 {
        self.unforced_drop + self.forced_drop + self.other
    }
}

/// Render one queue's [`Stats`] plus its current backlog as Prometheus text
/// exposition format, labeled by `queue_id` so a host can scrape several
/// instances under one endpoint.
pub fn render_prometheus(queue_id: &str, stats: &Stats, backlog: u32, q_avg: f64) -> String {
    let mut out = String::with_capacity(1024);

    writeln!(out, "# HELP red_queue_enqueued_total Packets admitted.").unwrap();
    writeln!(out, "# TYPE red_queue_enqueued_total counter").unwrap();
    writeln!(
        out,
        "red_queue_enqueued_total{{queue=\"{queue_id}\"}} {}",
        stats.enqueued
    )
    .unwrap();

    writeln!(out, "# HELP red_queue_dequeued_total Packets served.").unwrap();
    writeln!(out, "# TYPE red_queue_dequeued_total counter").unwrap();
    writeln!(
        out,
        "red_queue_dequeued_total{{queue=\"{queue_id}\"}} {}",
        stats.dequeued
    )
    .unwrap();

    writeln!(
        out,
        "# HELP red_queue_drops_total Packets dropped, by kind."
    )
    .unwrap();
    writeln!(out, "# TYPE red_queue_drops_total counter").unwrap();
    writeln!(
        out,
        "red_queue_drops_total{{queue=\"{queue_id}\",kind=\"unforced\"}} {}",
        stats.unforced_drop
    )
    .unwrap();
    writeln!(
        out,
        "red_queue_drops_total{{queue=\"{queue_id}\",kind=\"forced\"}} {}",
        stats.forced_drop
    )
    .unwrap();
    writeln!(
        out,
        "red_queue_drops_total{{queue=\"{queue_id}\",kind=\"other\"}} {}",
        stats.other
    )
    .unwrap();

    writeln!(
        out,
        "# HELP red_queue_backlog Current queue occupancy (units per configured mode)."
    )
    .unwrap();
    writeln!(out, "# TYPE red_queue_backlog gauge").unwrap();
    writeln!(out, "red_queue_backlog{{queue=\"{queue_id}\"}} {backlog}").unwrap();

    writeln!(
        out,
        "# HELP red_queue_avg Smoothed (EWMA) queue occupancy."
    )
    .unwrap();
    writeln!(out, "# TYPE red_queue_avg gauge").unwrap();
    writeln!(out, "red_queue_avg{{queue=\"{queue_id}\"}} {q_avg:.6}").unwrap();

    out
}

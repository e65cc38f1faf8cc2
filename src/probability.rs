//! The drop-probability engine (spec §4.4, §4.6).
//!
//! Ported function-for-function from `red-queue.cc::CalculatePNew` /
//! `ModifyP` / `DropEarly`, with `ns3::UniformVariable` replaced by the
//! injected [`crate::random::UniformSource`].

use crate::config::{Cautious, Mode};
use crate::random::UniformSource;

/// Derived constants needed by [`calculate_p_new`], computed once at
/// initialization (spec §4.3): `v_a = 1/th_diff`, `v_b = -min_th/th_diff`,
/// and (only when `gentle`) `v_c`, `v_d` for the linear ramp past `max_th`.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilityConstants {
    pub v_a: f64,
    pub v_b: f64,
    pub v_c: f64,
    pub v_d: f64,
    pub cur_max_p: f64,
}

/// `CalculatePNew`: the base drop probability from the current `q_avg`,
/// before `modify_p`'s count-based adjustment.
pub fn calculate_p_new(q_avg: f64, max_th: f64, gentle: bool, k: &ProbabilityConstants) -> f64 {
    let p = if gentle && q_avg >= max_th {
        // p ranges from cur_max_p at max_th to 1.0 at 2*max_th.
        k.v_c * q_avg + k.v_d
    } else if !gentle && q_avg >= max_th {
        1.0
    } else {
        // p ranges from 0 at min_th to cur_max_p at max_th.
        (k.v_a * q_avg + k.v_b) * k.cur_max_p
    };

    p.min(1.0)
}

/// `ModifyP`: adjusts the base probability by how long it has been since
/// the last random drop, so that successive drops are spaced out
/// (geometrically without `wait`, uniformly with `wait`) rather than
/// clustering.
#[allow(clippy::too_many_arguments)]
pub fn modify_p(
    p: f64,
    count: u32,
    count_bytes: u32,
    mean_pkt_size: u32,
    wait: bool,
    pkt_size: u32,
    mode: Mode,
) -> f64 {
    let c = match mode {
        Mode::Bytes => (count_bytes / mean_pkt_size) as f64,
        Mode::Packets => count as f64,
    };

    let mut p = if wait {
        if c * p < 1.0 {
            0.0
        } else if c * p < 2.0 {
            p / (2.0 - c * p)
        } else {
            1.0
        }
    } else if c * p < 1.0 {
        p / (1.0 - c * p)
    } else {
        1.0
    };

    if mode == Mode::Bytes && p < 1.0 {
        p = p * pkt_size as f64 / mean_pkt_size as f64;
    }

    p.min(1.0)
}

/// Outcome of [`drop_early`]: whether a random (unforced) drop fires, and
/// the two probabilities computed along the way (kept for tracing/testing
/// parity with the reference's `m_vProb`/`m_vProb1`).
#[derive(Debug, Clone, Copy)]
pub struct EarlyDropResult {
    pub drop: bool,
    pub v_prob1: f64,
    pub v_prob: f64,
}

/// `DropEarly`: computes the drop probability and draws against it,
/// applying the experimental `cautious` gates from spec §4.6.
#[allow(clippy::too_many_arguments)]
pub fn drop_early(
    rng: &mut impl UniformSource,
    q_avg: f64,
    q_size: u32,
    count: u32,
    count_bytes: u32,
    pkt_size: u32,
    mean_pkt_size: u32,
    wait: bool,
    gentle: bool,
    max_th: f64,
    mode: Mode,
    cautious: Cautious,
    ptc: f64,
    qw: f64,
    k: &ProbabilityConstants,
) -> EarlyDropResult {
    let v_prob1 = calculate_p_new(q_avg, max_th, gentle, k);
    let v_prob = modify_p(v_prob1, count, count_bytes, mean_pkt_size, wait, pkt_size, mode);

    if cautious == Cautious::SkipWhenBelowAverage {
        let pkts = ptc * 0.05;
        let fraction = (1.0 - qw).powf(pkts);
        if (q_size as f64) < fraction * q_avg {
            return EarlyDropResult {
                drop: false,
                v_prob1,
                v_prob,
            };
        }
    }

    let mut u = rng.sample();

    if cautious == Cautious::ScaleWhenBelowAverage {
        let pkts = ptc * 0.05;
        let fraction = (1.0 - qw).powf(pkts);
        let ratio = q_size as f64 / (fraction * q_avg);
        if ratio < 1.0 {
            u /= ratio;
        }
    }

    EarlyDropResult {
        drop: u <= v_prob,
        v_prob1,
        v_prob,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::testing::Fixed;

    fn constants(min_th: f64, max_th: f64, l_interm: f64, gentle: bool) -> ProbabilityConstants {
        let th_diff = if max_th == min_th { 1.0 } else { max_th - min_th };
        let cur_max_p = 1.0 / l_interm;
        let (v_c, v_d) = if gentle {
            ((1.0 - cur_max_p) / max_th, 2.0 * cur_max_p - 1.0)
        } else {
            (0.0, 0.0)
        };
        ProbabilityConstants {
            v_a: 1.0 / th_diff,
            v_b: -min_th / th_diff,
            v_c,
            v_d,
            cur_max_p,
        }
    }

    #[test]
    fn below_min_th_gives_zero_probability() {
        let k = constants(5.0, 15.0, 50.0, true);
        let p = calculate_p_new(5.0, 15.0, true, &k);
        assert!((p - 0.0).abs() < 1e-12);
    }

    #[test]
    fn at_max_th_gives_cur_max_p() {
        let k = constants(5.0, 15.0, 50.0, true);
        let p = calculate_p_new(15.0, 15.0, true, &k);
        assert!((p - k.cur_max_p).abs() < 1e-9);
    }

    #[test]
    fn gentle_at_2x_max_th_gives_exactly_one() {
        let k = constants(5.0, 15.0, 50.0, true);
        let p = calculate_p_new(30.0, 15.0, true, &k);
        assert_eq!(p, 1.0);
    }

    #[test]
    fn non_gentle_clamps_to_one_at_max_th() {
        let k = constants(5.0, 15.0, 50.0, false);
        let p = calculate_p_new(15.0, 15.0, false, &k);
        assert_eq!(p, 1.0);
        let p2 = calculate_p_new(100.0, 15.0, false, &k);
        assert_eq!(p2, 1.0);
    }

    #[test]
    fn modify_p_wait_zeroes_below_threshold() {
        // c*p < 1.0 => p = 0 when wait is set.
        let p = modify_p(0.01, 10, 0, 500, true, 500, Mode::Packets);
        assert_eq!(p, 0.0);
    }

    #[test]
    fn modify_p_wait_scales_in_middle_band() {
        // Choose count so that 1.0 <= c*p < 2.0.
        let p = modify_p(0.1, 15, 0, 500, true, 500, Mode::Packets);
        assert!(p > 0.0 && p <= 1.0);
    }

    #[test]
    fn modify_p_no_wait_grows_probability() {
        let p_nowait = modify_p(0.1, 5, 0, 500, false, 500, Mode::Packets);
        assert!(p_nowait >= 0.1);
    }

    #[test]
    fn modify_p_bytes_mode_scales_by_packet_size() {
        let p_big = modify_p(0.2, 0, 2500, 500, false, 1000, Mode::Bytes);
        let p_small = modify_p(0.2, 0, 2500, 500, false, 100, Mode::Bytes);
        assert!(p_big > p_small);
    }

    #[test]
    fn modify_p_always_clamped_to_one() {
        let p = modify_p(0.9, 1000, 0, 500, false, 500, Mode::Packets);
        assert_eq!(p, 1.0);
    }

    #[test]
    fn drop_early_fires_when_sample_at_or_below_probability() {
        let k = constants(5.0, 15.0, 50.0, true);
        let mut rng = Fixed(0.0);
        let result = drop_early(
            &mut rng, 10.0, 10, 20, 0, 500, 500, false, true, 15.0, Mode::Packets,
            Cautious::Off, 100.0, 0.002, &k,
        );
        assert!(result.drop, "u=0.0 should always be <= any nonnegative probability");
    }

    #[test]
    fn drop_early_declines_when_sample_exceeds_probability() {
        let k = constants(5.0, 15.0, 50.0, true);
        let mut rng = Fixed(0.999999);
        let result = drop_early(
            &mut rng, 6.0, 6, 1, 0, 500, 500, true, true, 15.0, Mode::Packets,
            Cautious::Off, 100.0, 0.002, &k,
        );
        assert!(!result.drop);
    }

    #[test]
    fn cautious_1_declines_when_instantaneous_far_below_average() {
        let k = constants(5.0, 15.0, 50.0, true);
        let mut rng = Fixed(0.0);
        // q_size tiny relative to q_avg => should decline regardless of u.
        let result = drop_early(
            &mut rng, 20.0, 0, 50, 0, 500, 500, false, true, 15.0, Mode::Packets,
            Cautious::SkipWhenBelowAverage, 100.0, 0.002, &k,
        );
        assert!(!result.drop);
    }
}

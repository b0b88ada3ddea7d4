//! Pure tournament rules: rounding, grouping, bracket ordering and round
//! resolution. Nothing in here touches the entity arena.

use std::cmp::Ordering;

use crate::constants::{SCORE_DECIMALS, SCORE_EPSILON};
use crate::types::{DriverId, Groups};

pub type Pair = (DriverId, DriverId);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BattleSlot {
    Driver1,
    Driver2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoundResolution {
    /// `None` when the round is an exact tie and another round must be run.
    pub winner: Option<BattleSlot>,
    pub driver1_round_score: f64,
    pub driver2_round_score: f64,
}

/// Rounds the exact binary value to two decimals, ties to even.
pub fn round_score(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.prec$}", prec = SCORE_DECIMALS as usize)
        .parse()
        .unwrap_or(value)
}

pub fn average<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}

pub fn cmp_desc_f64(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Rank 1 -> A, rank 2 -> B, rank 3 -> A, ...
pub fn assign_groups_alternating(ordered_driver_ids: &[DriverId]) -> Groups {
    let mut groups = Groups::default();
    for (idx, driver_id) in ordered_driver_ids.iter().enumerate() {
        if idx % 2 == 0 {
            groups.a.push(*driver_id);
        } else {
            groups.b.push(*driver_id);
        }
    }
    groups
}

pub fn build_round_robin_pairs(driver_ids: &[DriverId]) -> Vec<Pair> {
    let mut pairs = Vec::new();
    for (idx, first) in driver_ids.iter().enumerate() {
        for second in &driver_ids[idx + 1..] {
            pairs.push((*first, *second));
        }
    }
    pairs
}

/// Greedy ordering: each step takes the remaining pair sharing the fewest
/// drivers with the previously scheduled pair, lowest ids first on ties.
pub fn order_battles_avoid_consecutive(pairs: &[Pair]) -> Vec<Pair> {
    let mut remaining: Vec<Pair> = pairs.to_vec();
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut last: Option<Pair> = None;

    while !remaining.is_empty() {
        let best_idx = remaining
            .iter()
            .enumerate()
            .min_by_key(|(idx, pair)| (overlap(**pair, last), pair.0, pair.1, *idx))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        let chosen = remaining.remove(best_idx);
        ordered.push(chosen);
        last = Some(chosen);
    }

    ordered
}

fn overlap(pair: Pair, last: Option<Pair>) -> usize {
    let Some((x, y)) = last else {
        return 0;
    };
    let mut count = 0;
    if pair.0 == x || pair.0 == y {
        count += 1;
    }
    if pair.1 != pair.0 && (pair.1 == x || pair.1 == y) {
        count += 1;
    }
    count
}

/// Round score per driver is the mean of both run averages, rounded.
pub fn resolve_two_run_round(
    run1_driver1_avg: f64,
    run1_driver2_avg: f64,
    run2_driver1_avg: f64,
    run2_driver2_avg: f64,
) -> RoundResolution {
    let driver1_round_score = round_score((run1_driver1_avg + run2_driver1_avg) / 2.0);
    let driver2_round_score = round_score((run1_driver2_avg + run2_driver2_avg) / 2.0);

    let winner = if (driver1_round_score - driver2_round_score).abs() < SCORE_EPSILON {
        None
    } else if driver1_round_score > driver2_round_score {
        Some(BattleSlot::Driver1)
    } else {
        Some(BattleSlot::Driver2)
    };

    RoundResolution {
        winner,
        driver1_round_score,
        driver2_round_score,
    }
}

/// Sum with exactly one occurrence of the lowest value removed, when there
/// is more than one value.
pub fn total_after_drop_lowest_once(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let sum: f64 = scores.iter().sum();
    if scores.len() == 1 {
        return sum;
    }
    let lowest = scores.iter().copied().fold(f64::INFINITY, f64::min);
    sum - lowest
}

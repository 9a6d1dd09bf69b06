// SPDX-License-Identifier: MIT

//!
//! Interest dates
//!
//! The instants at which something starts, plus now, with the features active
//! at each and what changes between neighbours.  Stepping uses the changes to
//! skip dates where nothing in view happens.
//!

use crate::Feature;
use log::debug;
use open_atlas_core::Instant;

/// Feature positions (into the loaded feature list) are kept sorted
type Positions = Vec<usize>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterestDateIndex {
    /// Strictly increasing, at most one per calendar day
    dates: Vec<Instant>,

    /// The features active at each date
    active: Vec<Positions>,

    /// Active at date `i` but not at `i - 1` (all of them for the first date)
    adds: Vec<Positions>,

    /// Active at `i - 1` but not at `i` (none for the first date)
    removes: Vec<Positions>,
}

impl InterestDateIndex {
    /// Build the index for the given features
    pub fn build(features: &[Feature], now: Instant) -> Self {
        let mut dates: Vec<Instant> = features.iter().map(Feature::start).collect();
        dates.push(now);

        // Stable, so the earliest instant of each day survives the dedup
        dates.sort();
        dates.dedup_by_key(|date| date.calendar_day());

        let active: Vec<Positions> = dates
            .iter()
            .map(|date| {
                features
                    .iter()
                    .enumerate()
                    .filter(|(_, feature)| feature.is_active_at(*date))
                    .map(|(position, _)| position)
                    .collect()
            })
            .collect();

        let mut adds = Vec::with_capacity(dates.len());
        let mut removes = Vec::with_capacity(dates.len());
        let empty = Positions::new();
        for (i, now_active) in active.iter().enumerate() {
            let before = match i {
                0 => &empty,
                _ => &active[i - 1],
            };
            let (added, removed) = sorted_difference(before, now_active);
            adds.push(added);
            removes.push(removed);
        }

        debug!(
            "Built interest date index: {} dates from {} features",
            dates.len(),
            features.len()
        );
        Self {
            dates,
            active,
            adds,
            removes,
        }
    }

    pub fn dates(&self) -> &[Instant] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn date(&self, i: usize) -> Option<Instant> {
        self.dates.get(i).copied()
    }

    /// The features that become active at date `i`
    pub fn adds(&self, i: usize) -> &[usize] {
        self.adds.get(i).map_or(&[], Vec::as_slice)
    }

    /// The features that stop being active at date `i`
    pub fn removes(&self, i: usize) -> &[usize] {
        self.removes.get(i).map_or(&[], Vec::as_slice)
    }

    /// The features active at date `i`
    pub fn active_at(&self, i: usize) -> &[usize] {
        self.active.get(i).map_or(&[], Vec::as_slice)
    }

    /// The position of the first date strictly after the instant
    pub fn next_after(&self, instant: Instant) -> Option<usize> {
        let i = self.dates.partition_point(|date| *date <= instant);
        (i < self.dates.len()).then_some(i)
    }

    /// The position of the last date strictly before the instant
    pub fn previous_before(&self, instant: Instant) -> Option<usize> {
        self.dates
            .partition_point(|date| *date < instant)
            .checked_sub(1)
    }
}

/// `(in b but not a, in a but not b)`, for sorted slices
fn sorted_difference(a: &[usize], b: &[usize]) -> (Positions, Positions) {
    let (mut only_b, mut only_a) = (Vec::new(), Vec::new());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                only_a.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                only_b.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    only_a.extend_from_slice(&a[i..]);
    only_b.extend_from_slice(&b[j..]);
    (only_b, only_a)
}

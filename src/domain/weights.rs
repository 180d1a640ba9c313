//! Portfolio weight vectors and the rebalance schedule of target weights.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use super::error::RebalsimError;

/// Weight per asset. Lookups of assets that were never inserted read as 0.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Weights {
    entries: BTreeMap<String, f64>,
}

impl Weights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: impl Into<String>, weight: f64) {
        self.entries.insert(asset.into(), weight);
    }

    /// Weight of `asset`, or 0 when it is not part of this vector.
    pub fn weight(&self, asset: &str) -> f64 {
        self.entries.get(asset).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, asset: &str) -> bool {
        self.entries.contains_key(asset)
    }

    pub fn assets(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, f64)> {
        self.entries.iter().map(|(a, &w)| (a, w))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when at least one entry is a usable number.
    pub fn has_defined(&self) -> bool {
        self.entries.values().any(|w| w.is_finite())
    }

    pub fn sum(&self) -> f64 {
        self.entries.values().sum()
    }

    /// Sorted union of the assets of both vectors.
    pub fn union_assets<'a>(&'a self, other: &'a Weights) -> BTreeSet<&'a str> {
        self.entries
            .keys()
            .chain(other.entries.keys())
            .map(String::as_str)
            .collect()
    }

    /// Replace the weights with `terminal`. Assets already tracked but absent
    /// from `terminal` stay in the key set at 0.
    pub fn carry_forward(&mut self, terminal: &Weights) {
        for weight in self.entries.values_mut() {
            *weight = 0.0;
        }
        for (asset, &weight) in &terminal.entries {
            self.entries.insert(asset.clone(), weight);
        }
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Weights {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(a, w)| (a.into(), w)).collect(),
        }
    }
}

/// Target weights taking effect on one rebalance date. `None` marks an asset
/// that is not held.
#[derive(Debug, Clone, PartialEq)]
pub struct Rebalance {
    pub date: NaiveDate,
    pub targets: BTreeMap<String, Option<f64>>,
}

impl Rebalance {
    pub fn new(date: NaiveDate, targets: BTreeMap<String, Option<f64>>) -> Self {
        Self { date, targets }
    }

    /// Held weights: entries that are undefined or `NaN` are dropped.
    pub fn held(&self) -> Weights {
        self.targets
            .iter()
            .filter_map(|(asset, w)| match w {
                Some(w) if !w.is_nan() => Some((asset.clone(), *w)),
                _ => None,
            })
            .collect()
    }
}

/// Rebalances ordered by strictly increasing date. Weights are finite or
/// undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    rebalances: Vec<Rebalance>,
}

impl WeightMatrix {
    pub fn new(rebalances: Vec<Rebalance>) -> Result<Self, RebalsimError> {
        if rebalances.is_empty() {
            return Err(RebalsimError::alignment("weight matrix has no rebalance dates"));
        }
        for pair in rebalances.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(RebalsimError::alignment(format!(
                    "rebalance dates not strictly increasing: {} after {}",
                    pair[1].date, pair[0].date
                )));
            }
        }
        for rebalance in &rebalances {
            for (asset, w) in &rebalance.targets {
                if let Some(w) = w.filter(|w| w.is_infinite()) {
                    return Err(RebalsimError::data(format!(
                        "weight {w} for {asset} on {} is not finite",
                        rebalance.date
                    )));
                }
            }
        }
        Ok(Self { rebalances })
    }

    pub fn rebalances(&self) -> &[Rebalance] {
        &self.rebalances
    }

    pub fn len(&self) -> usize {
        self.rebalances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rebalances.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rebalances.iter().map(|r| r.date).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rebalances.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rebalances.last().map(|r| r.date)
    }

    pub fn held_weights(&self, index: usize) -> Weights {
        self.rebalances
            .get(index)
            .map(Rebalance::held)
            .unwrap_or_default()
    }

    /// Every asset that carries a defined weight on some rebalance date.
    pub fn held_assets(&self) -> BTreeSet<String> {
        self.rebalances
            .iter()
            .flat_map(|r| r.held().assets().cloned().collect::<Vec<_>>())
            .collect()
    }
}

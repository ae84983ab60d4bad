//! Additive stacking of stat contributions.
//!
//! Every source contributes to one of three categories per key; contributions of the same
//! category are summed, never multiplied, and the final value is
//! `base * (1 + ratio) + flat`.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackCategory {
    /// Unbuffed stat value (levels, equipment base, monster definition).
    Base,
    /// Percentage boost applied to the base.
    Ratio,
    /// Absolute boost added after the ratio.
    Flat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackContribution<K> {
    pub key: K,
    pub category: StackCategory,
    pub value: f64,
}

impl<K> StackContribution<K> {
    pub fn base(key: K, value: f64) -> Self {
        Self {
            key,
            category: StackCategory::Base,
            value,
        }
    }

    pub fn ratio(key: K, value: f64) -> Self {
        Self {
            key,
            category: StackCategory::Ratio,
            value,
        }
    }

    pub fn flat(key: K, value: f64) -> Self {
        Self {
            key,
            category: StackCategory::Flat,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CategoryTotals {
    pub base: f64,
    pub ratio: f64,
    pub flat: f64,
}

impl CategoryTotals {
    pub fn apply(&mut self, category: StackCategory, value: f64) {
        match category {
            StackCategory::Base => self.base += value,
            StackCategory::Ratio => self.ratio += value,
            StackCategory::Flat => self.flat += value,
        }
    }

    pub fn add_from(&mut self, other: &CategoryTotals) {
        self.base += other.base;
        self.ratio += other.ratio;
        self.flat += other.flat;
    }

    /// Composes onto an externally supplied base (the stat block), ignoring `self.base`.
    pub fn compose_onto(&self, base: f64) -> f64 {
        base * (1.0 + self.ratio) + self.flat
    }

    pub fn compose(self) -> f64 {
        self.compose_onto(self.base)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatStacking<K: Ord> {
    totals: BTreeMap<K, CategoryTotals>,
}

impl<K: Ord> Default for StatStacking<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord> StatStacking<K> {
    pub fn new() -> Self {
        Self {
            totals: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, contribution: StackContribution<K>) {
        self.totals
            .entry(contribution.key)
            .or_default()
            .apply(contribution.category, contribution.value);
    }

    pub fn add_many<I>(&mut self, contributions: I)
    where
        I: IntoIterator<Item = StackContribution<K>>,
    {
        for contribution in contributions {
            self.add(contribution);
        }
    }

    pub fn totals_for(&self, key: &K) -> CategoryTotals {
        self.totals.get(key).copied().unwrap_or_default()
    }

    pub fn composed_for(&self, key: &K) -> f64 {
        self.totals_for(key).compose()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &CategoryTotals)> {
        self.totals.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Adds every total of `other` into self. Used to layer timed buffs over the static set.
    pub fn merge_from(&mut self, other: &StatStacking<K>)
    where
        K: Clone,
    {
        for (key, totals) in &other.totals {
            self.totals
                .entry(key.clone())
                .or_default()
                .add_from(totals);
        }
    }
}

use std::collections::BTreeMap;

use formats::{RiskCategory, RiskDataset, RiskFeature};
use serde::Serialize;

pub const SQM_PER_HECTARE: f64 = 10_000.0;

pub fn hectares(sqm: f64) -> f64 {
    sqm / SQM_PER_HECTARE
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryTotals {
    pub count: usize,
    /// Square meters.
    pub area: f64,
    susceptibility_sum: f64,
}

impl CategoryTotals {
    fn add(&mut self, feature: &RiskFeature) {
        self.count += 1;
        self.area += feature.area_or_zero();
        self.susceptibility_sum += feature.susceptibility;
    }

    fn merge(&mut self, other: &CategoryTotals) {
        self.count += other.count;
        self.area += other.area;
        self.susceptibility_sum += other.susceptibility_sum;
    }

    pub fn mean_susceptibility(&self) -> Option<f64> {
        (self.count > 0).then(|| self.susceptibility_sum / self.count as f64)
    }
}

/// Counts and areas of a dataset, overall and per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total: CategoryTotals,
    pub per_category: BTreeMap<RiskCategory, CategoryTotals>,
}

impl SummaryStats {
    pub fn total_count(&self) -> usize {
        self.total.count
    }

    pub fn total_area(&self) -> f64 {
        self.total.area
    }

    pub fn category(&self, category: RiskCategory) -> CategoryTotals {
        self.per_category.get(&category).copied().unwrap_or_default()
    }

    /// Percentage of the total area covered by `category`; 0 when the
    /// dataset has no area at all.
    pub fn area_share(&self, category: RiskCategory) -> f64 {
        if self.total.area <= 0.0 {
            return 0.0;
        }
        self.category(category).area / self.total.area * 100.0
    }

    /// Categories with at least one feature, in taxonomy order.
    pub fn categories_present(&self) -> Vec<RiskCategory> {
        RiskCategory::ALL
            .into_iter()
            .filter(|c| self.category(*c).count > 0)
            .collect()
    }

    /// Combines two summaries, e.g. of two halves of a dataset.
    pub fn merge(&mut self, other: &SummaryStats) {
        self.total.merge(&other.total);
        for (category, totals) in &other.per_category {
            self.per_category.entry(*category).or_default().merge(totals);
        }
    }
}

pub fn summarize(dataset: &RiskDataset) -> SummaryStats {
    summarize_features(&dataset.features)
}

pub fn summarize_features<'a>(features: impl IntoIterator<Item = &'a RiskFeature>) -> SummaryStats {
    let mut stats = SummaryStats::default();
    for f in features {
        stats.total.add(f);
        stats.per_category.entry(f.category).or_default().add(f);
    }
    stats
}

use std::collections::BTreeMap;

use formats::{RiskCategory, RiskDataset, RiskFeature};
use tracing::debug;

/// Holds the single live dataset and its per-category partition.
#[derive(Debug, Default)]
pub struct FeatureStore {
    dataset: Option<RiskDataset>,
    /// Feature indices per category, in input order.
    partition: BTreeMap<RiskCategory, Vec<usize>>,
    revision: u64,
}

impl FeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps in a new dataset. The previous one is dropped.
    pub fn replace(&mut self, dataset: RiskDataset) {
        let mut partition: BTreeMap<RiskCategory, Vec<usize>> =
            RiskCategory::ALL.into_iter().map(|c| (c, Vec::new())).collect();
        for (i, f) in dataset.features.iter().enumerate() {
            partition.entry(f.category).or_default().push(i);
        }
        self.partition = partition;
        self.dataset = Some(dataset);
        self.revision += 1;
        debug!(revision = self.revision, features = self.len(), "feature store replaced");
    }

    pub fn clear(&mut self) {
        self.dataset = None;
        self.partition.clear();
        self.revision += 1;
    }

    pub fn dataset(&self) -> Option<&RiskDataset> {
        self.dataset.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.is_some()
    }

    pub fn len(&self) -> usize {
        self.dataset.as_ref().map_or(0, RiskDataset::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bumped on every replace or clear.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Every category mapped to its features in input order. Categories
    /// without features map to an empty list.
    pub fn partition_by_category(&self) -> BTreeMap<RiskCategory, Vec<&RiskFeature>> {
        RiskCategory::ALL
            .into_iter()
            .map(|c| (c, self.features_in(c)))
            .collect()
    }

    pub fn features_in(&self, category: RiskCategory) -> Vec<&RiskFeature> {
        let (Some(ds), Some(indices)) = (&self.dataset, self.partition.get(&category)) else {
            return Vec::new();
        };
        indices.iter().map(|&i| &ds.features[i]).collect()
    }

    pub fn category_count(&self, category: RiskCategory) -> usize {
        self.partition.get(&category).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use formats::{RiskCategory, RiskDataset, sample_dataset};
    use pretty_assertions::assert_eq;

    use super::FeatureStore;

    #[test]
    fn partition_covers_every_category() {
        let mut store = FeatureStore::new();
        store.replace(sample_dataset());
        let p = store.partition_by_category();
        assert_eq!(p.len(), RiskCategory::ALL.len());
        assert!(p[&RiskCategory::Extreme].is_empty());
        assert!(p[&RiskCategory::None].is_empty());
        assert_eq!(p[&RiskCategory::High][0].zone_id.as_deref(), Some("zone_001"));
        let total: usize = p.values().map(Vec::len).sum();
        assert_eq!(total, store.len());
    }

    #[test]
    fn partition_keeps_input_order() {
        let mut ds = sample_dataset();
        let mut extra = ds.features[2].clone();
        extra.zone_id = Some("zone_004".to_string());
        ds.features.push(extra);
        let mut store = FeatureStore::new();
        store.replace(ds);
        let ids: Vec<_> = store
            .features_in(RiskCategory::Low)
            .iter()
            .map(|f| f.zone_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["zone_003", "zone_004"]);
        assert_eq!(store.category_count(RiskCategory::Low), 2);
    }

    #[test]
    fn replace_drops_old_dataset() {
        let mut store = FeatureStore::new();
        store.replace(sample_dataset());
        let r = store.revision();
        store.replace(RiskDataset::default());
        assert_eq!(store.revision(), r + 1);
        assert!(store.is_loaded());
        assert!(store.is_empty());
        assert_eq!(store.category_count(RiskCategory::High), 0);
    }

    #[test]
    fn clear_unloads() {
        let mut store = FeatureStore::new();
        store.replace(sample_dataset());
        store.clear();
        assert!(!store.is_loaded());
        assert!(store.partition_by_category().values().all(Vec::is_empty));
    }
}

use serde::Serialize;

use crate::config::LabelStrategy;
use crate::error::{EtlError, Result};

/// Semantic category per cluster id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterLabelMap {
    labels: Vec<String>,
}

impl ClusterLabelMap {
    /// Cluster id `i` takes `labels[i]`.
    pub fn positional(labels: &[String], clusters: usize) -> Result<Self> {
        ensure_enough_labels(labels, clusters)?;
        Ok(Self {
            labels: labels[..clusters].to_vec(),
        })
    }

    /// Rank clusters by `rank_means` ascending (ties by cluster id) and hand
    /// out `labels` in that order.
    ///
    /// With fewer clusters than labels the ranks are spread across the label
    /// list so the lowest and highest clusters keep the first and last label.
    pub fn by_rank(rank_means: &[f64], labels: &[String]) -> Result<Self> {
        let clusters = rank_means.len();
        ensure_enough_labels(labels, clusters)?;

        let mut order: Vec<usize> = (0..clusters).collect();
        order.sort_by(|&a, &b| rank_means[a].total_cmp(&rank_means[b]).then(a.cmp(&b)));

        let mut assigned = vec![String::new(); clusters];
        for (rank, &cluster_id) in order.iter().enumerate() {
            assigned[cluster_id] = labels[label_index(rank, clusters, labels.len())].clone();
        }
        Ok(Self { labels: assigned })
    }

    pub fn build(strategy: LabelStrategy, rank_means: &[f64], labels: &[String]) -> Result<Self> {
        match strategy {
            LabelStrategy::CalorieRank => Self::by_rank(rank_means, labels),
            LabelStrategy::Positional => Self::positional(labels, rank_means.len()),
        }
    }

    pub fn label(&self, cluster_id: usize) -> Option<&str> {
        self.labels.get(cluster_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn ensure_enough_labels(labels: &[String], clusters: usize) -> Result<()> {
    if labels.len() < clusters {
        return Err(EtlError::Config(format!(
            "{} clusters need at least as many labels, got {}",
            clusters,
            labels.len()
        )));
    }
    Ok(())
}

fn label_index(rank: usize, clusters: usize, labels: usize) -> usize {
    if clusters == labels || clusters <= 1 {
        return rank;
    }
    let scaled = rank as f64 * (labels - 1) as f64 / (clusters - 1) as f64;
    scaled.round() as usize
}

/// Mean of `values` per cluster id. Clusters without members rank last.
pub fn cluster_means(values: &[f64], assignments: &[usize], clusters: usize) -> Vec<f64> {
    let mut sums = vec![0.0; clusters];
    let mut counts = vec![0usize; clusters];
    for (value, &cluster_id) in values.iter().zip(assignments) {
        sums[cluster_id] += value;
        counts[cluster_id] += 1;
    }
    sums.into_iter()
        .zip(counts)
        .map(|(sum, count)| if count > 0 { sum / count as f64 } else { f64::INFINITY })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["Side".to_string(), "Dessert".to_string(), "Main".to_string()]
    }

    #[test]
    fn test_rank_follows_calories_not_cluster_id() {
        // cluster 0 is heaviest, cluster 2 lightest
        let map = ClusterLabelMap::by_rank(&[900.0, 450.0, 200.0], &labels()).unwrap();
        assert_eq!(map.label(0), Some("Main"));
        assert_eq!(map.label(1), Some("Dessert"));
        assert_eq!(map.label(2), Some("Side"));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_rank_ties_use_cluster_id() {
        let map = ClusterLabelMap::by_rank(&[300.0, 300.0, 100.0], &labels()).unwrap();
        assert_eq!(map.label(2), Some("Side"));
        assert_eq!(map.label(0), Some("Dessert"));
        assert_eq!(map.label(1), Some("Main"));
    }

    #[test]
    fn test_fewer_clusters_spread_labels() {
        let map = ClusterLabelMap::by_rank(&[800.0, 150.0], &labels()).unwrap();
        assert_eq!(map.label(1), Some("Side"));
        assert_eq!(map.label(0), Some("Main"));

        let single = ClusterLabelMap::by_rank(&[500.0], &labels()).unwrap();
        assert_eq!(single.label(0), Some("Side"));
    }

    #[test]
    fn test_positional_reference_table() {
        let map = ClusterLabelMap::positional(&labels(), 3).unwrap();
        assert_eq!(map.label(0), Some("Side"));
        assert_eq!(map.label(1), Some("Dessert"));
        assert_eq!(map.label(2), Some("Main"));
        assert_eq!(map.label(3), None);
    }

    #[test]
    fn test_too_many_clusters() {
        assert!(ClusterLabelMap::by_rank(&[1.0, 2.0, 3.0, 4.0], &labels()).is_err());
        assert!(ClusterLabelMap::positional(&labels(), 4).is_err());
    }

    #[test]
    fn test_cluster_means() {
        let means = cluster_means(&[100.0, 300.0, 50.0], &[0, 0, 2], 3);
        assert_eq!(means[0], 200.0);
        assert!(means[1].is_infinite());
        assert_eq!(means[2], 50.0);
    }
}

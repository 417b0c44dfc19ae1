use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Outcome of one k-means run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KMeansResult {
    /// Cluster id per input row
    pub assignments: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    pub iterations: usize,
    /// False when the iteration cap stopped the run
    pub converged: bool,
}

impl KMeansResult {
    pub fn cluster_count(&self) -> usize {
        self.centroids.len()
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Index of the closest centroid; ties go to the lowest index.
fn nearest(row: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(row, centroid);
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}

/// k-means++ seeding driven by a seeded generator.
fn initial_centroids(rows: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut chosen = vec![rng.gen_range(0..rows.len())];

    while chosen.len() < k {
        let weights: Vec<f64> = rows
            .iter()
            .map(|row| {
                chosen
                    .iter()
                    .map(|&c| squared_distance(row, &rows[c]))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = weights.iter().sum();

        let next = if total > 0.0 && total.is_finite() {
            let mut target = rng.gen::<f64>() * total;
            let mut pick = None;
            for (index, weight) in weights.iter().enumerate() {
                if *weight <= 0.0 {
                    continue;
                }
                pick = Some(index);
                target -= weight;
                if target < 0.0 {
                    break;
                }
            }
            pick
        } else {
            None
        };

        // All rows coincide with a centroid already; take the first unused row
        let next = next.or_else(|| (0..rows.len()).find(|i| !chosen.contains(i)));
        match next {
            Some(index) => chosen.push(index),
            None => break,
        }
    }

    chosen.into_iter().map(|i| rows[i].clone()).collect()
}

/// Partition `rows` into at most `k` clusters.
///
/// Identical rows, `k` and `seed` always give identical assignments. When
/// fewer rows than `k` exist, each row can form its own cluster and the
/// result holds `rows.len()` centroids.
pub fn cluster(rows: &[Vec<f64>], k: usize, seed: u64, max_iterations: usize) -> KMeansResult {
    if rows.is_empty() || k == 0 {
        return KMeansResult {
            assignments: Vec::new(),
            centroids: Vec::new(),
            iterations: 0,
            converged: true,
        };
    }

    let k = k.min(rows.len());
    let width = rows[0].len();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = initial_centroids(rows, k, &mut rng);

    let mut assignments: Vec<usize> = Vec::new();
    let mut iterations = 0;
    let mut converged = false;

    for iteration in 1..=max_iterations.max(1) {
        iterations = iteration;
        let next: Vec<usize> = rows.iter().map(|row| nearest(row, &centroids)).collect();
        if next == assignments {
            converged = true;
            break;
        }
        assignments = next;

        let mut sums = vec![vec![0.0; width]; centroids.len()];
        let mut counts = vec![0usize; centroids.len()];
        for (row, &cluster_id) in rows.iter().zip(&assignments) {
            counts[cluster_id] += 1;
            for (sum, value) in sums[cluster_id].iter_mut().zip(row) {
                *sum += value;
            }
        }
        for (cluster_id, sum) in sums.into_iter().enumerate() {
            // Empty clusters keep their previous centroid
            if counts[cluster_id] > 0 {
                let n = counts[cluster_id] as f64;
                centroids[cluster_id] = sum.into_iter().map(|s| s / n).collect();
            }
        }
    }

    KMeansResult {
        assignments,
        centroids,
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.1],
            vec![0.2, 0.0],
            vec![0.1, 0.2],
            vec![10.0, 10.1],
            vec![10.2, 9.9],
            vec![9.9, 10.0],
            vec![-10.0, 5.0],
            vec![-10.1, 5.2],
            vec![-9.8, 4.9],
        ]
    }

    #[test]
    fn test_separates_obvious_blobs() {
        let result = cluster(&blobs(), 3, 0, 100);

        assert!(result.converged);
        assert_eq!(result.cluster_count(), 3);
        let a = &result.assignments;
        assert_eq!(a[0], a[1]);
        assert_eq!(a[1], a[2]);
        assert_eq!(a[3], a[4]);
        assert_eq!(a[4], a[5]);
        assert_eq!(a[6], a[7]);
        assert_eq!(a[7], a[8]);
        assert_ne!(a[0], a[3]);
        assert_ne!(a[0], a[6]);
        assert_ne!(a[3], a[6]);
    }

    #[test]
    fn test_same_seed_same_assignments() {
        let rows: Vec<Vec<f64>> = (0..60)
            .map(|i| {
                let x = i as f64;
                vec![(x * 7.3) % 11.0, (x * 3.1) % 5.0, (x * 1.7) % 13.0]
            })
            .collect();

        let first = cluster(&rows, 3, 42, 300);
        for _ in 0..5 {
            let again = cluster(&rows, 3, 42, 300);
            assert_eq!(again.assignments, first.assignments);
            assert_eq!(again.centroids, first.centroids);
        }
    }

    #[test]
    fn test_fewer_rows_than_clusters() {
        let rows = vec![vec![1.0, 1.0], vec![5.0, 5.0]];
        let result = cluster(&rows, 3, 0, 10);
        assert_eq!(result.cluster_count(), 2);
        assert_ne!(result.assignments[0], result.assignments[1]);
    }

    #[test]
    fn test_identical_rows() {
        let rows = vec![vec![2.0, 2.0]; 4];
        let result = cluster(&rows, 3, 7, 10);
        assert_eq!(result.cluster_count(), 3);
        // Ties go to the lowest cluster id
        assert!(result.assignments.iter().all(|&c| c == 0));
    }

    #[test]
    fn test_empty_input() {
        let result = cluster(&[], 3, 0, 10);
        assert!(result.assignments.is_empty());
        assert_eq!(result.cluster_count(), 0);
    }

    #[test]
    fn test_iteration_cap() {
        let result = cluster(&blobs(), 3, 1, 1);
        assert_eq!(result.iterations, 1);
        assert!(!result.converged);
        assert_eq!(result.assignments.len(), 9);
    }
}

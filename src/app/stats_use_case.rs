use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::app::ports::StoragePort;
use crate::constants::{CALORIES, TOTAL_CARB};
use crate::domain::Record;
use crate::error::Result;

/// Calorie and carbohydrate summary for one restaurant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionStats {
    pub restaurant: String,
    pub items: usize,
    pub avg_calories: Option<f64>,
    pub min_calories: Option<f64>,
    pub max_calories: Option<f64>,
    pub avg_total_carb: Option<f64>,
}

#[derive(Default)]
struct Accumulator {
    items: usize,
    calories: Vec<f64>,
    carbs: Vec<f64>,
}

fn numeric(record: &Record, field: &str) -> Option<f64> {
    record
        .nutrition
        .get(field)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Per-restaurant stats, highest average carbohydrates first.
///
/// Each aggregate skips rows whose value is missing or does not parse.
pub fn nutrition_stats(records: &[Record]) -> Vec<NutritionStats> {
    let mut by_restaurant: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for record in records {
        let acc = by_restaurant.entry(record.restaurant.as_str()).or_default();
        acc.items += 1;
        acc.calories.extend(numeric(record, CALORIES));
        acc.carbs.extend(numeric(record, TOTAL_CARB));
    }

    let mut stats: Vec<NutritionStats> = by_restaurant
        .into_iter()
        .map(|(restaurant, acc)| NutritionStats {
            restaurant: restaurant.to_string(),
            items: acc.items,
            avg_calories: mean(&acc.calories),
            min_calories: acc.calories.iter().copied().reduce(f64::min),
            max_calories: acc.calories.iter().copied().reduce(f64::max),
            avg_total_carb: mean(&acc.carbs),
        })
        .collect();

    // Restaurants without carbohydrate data go last
    stats.sort_by(|a, b| {
        let carb = |s: &NutritionStats| s.avg_total_carb.unwrap_or(f64::NEG_INFINITY);
        carb(b).total_cmp(&carb(a)).then_with(|| a.restaurant.cmp(&b.restaurant))
    });
    stats
}

pub struct StatsUseCase {
    storage: Arc<dyn StoragePort>,
}

impl StatsUseCase {
    pub fn new(storage: Arc<dyn StoragePort>) -> Self {
        Self { storage }
    }

    pub async fn nutrition_stats(&self) -> Result<Vec<NutritionStats>> {
        let records = self.storage.query_all().await?;
        Ok(nutrition_stats(&records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewRecord, Nutrition};
    use crate::pipeline::storage::InMemoryStorage;

    fn record(restaurant: &str, calories: &str, carbs: &str) -> NewRecord {
        let mut nutrition = Nutrition::new();
        if !calories.is_empty() {
            nutrition.insert(CALORIES.to_string(), calories.to_string());
        }
        if !carbs.is_empty() {
            nutrition.insert(TOTAL_CARB.to_string(), carbs.to_string());
        }
        NewRecord {
            restaurant: restaurant.to_string(),
            item: "Item".to_string(),
            nutrition,
        }
    }

    #[tokio::test]
    async fn test_stats_ordered_by_average_carbs() {
        let storage = Arc::new(InMemoryStorage::new());
        storage
            .append(&[
                record("Sonic", "300", "30"),
                record("Sonic", "500", "50"),
                record("Arbys", "800", "90"),
                record("Arbys", "", "70"),
                record("Subway", "200", ""),
            ])
            .await
            .unwrap();

        let stats = StatsUseCase::new(storage).nutrition_stats().await.unwrap();

        let order: Vec<&str> = stats.iter().map(|s| s.restaurant.as_str()).collect();
        assert_eq!(order, vec!["Arbys", "Sonic", "Subway"]);
        assert_eq!(stats[0].avg_total_carb, Some(80.0));
        assert_eq!(stats[0].avg_calories, Some(800.0));
        assert_eq!(stats[0].items, 2);
        assert_eq!(stats[1].min_calories, Some(300.0));
        assert_eq!(stats[1].max_calories, Some(500.0));
        assert_eq!(stats[2].avg_total_carb, None);
    }
}

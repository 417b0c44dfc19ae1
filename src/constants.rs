/// Column names shared by the source file, storage and export.
/// These mirror the nutrition table layout so a source header maps onto storage 1:1.

pub const RESTAURANT_COLUMN: &str = "restaurant";
pub const ITEM_COLUMN: &str = "item";
pub const TRANSLATED_ITEM_COLUMN: &str = "translated_item";
pub const CATEGORY_COLUMN: &str = "category";

/// Numeric nutrition columns, in storage order.
pub const NUMERIC_NUTRITION_COLUMNS: [&str; 14] = [
    "calories",
    "cal_fat",
    "total_fat",
    "sat_fat",
    "trans_fat",
    "cholesterol",
    "sodium",
    "total_carb",
    "fiber",
    "sugar",
    "protein",
    "vit_a",
    "vit_c",
    "calcium",
];

/// Free-text nutrition columns.
pub const TEXT_NUTRITION_COLUMNS: [&str; 1] = ["salad"];

pub const CALORIES: &str = "calories";
pub const TOTAL_CARB: &str = "total_carb";

/// Features used for clustering unless configured otherwise.
pub const DEFAULT_FEATURES: [&str; 7] = [
    "calories",
    "total_fat",
    "sugar",
    "total_carb",
    "protein",
    "calcium",
    "fiber",
];

/// Category names ordered from the lowest to the highest calorie cluster.
pub const DEFAULT_LABELS: [&str; 3] = ["Side", "Dessert", "Main"];

pub const DEFAULT_CLUSTERS: usize = 3;
pub const DEFAULT_SEED: u64 = 0;
pub const DEFAULT_MAX_ITERATIONS: usize = 300;
pub const DEFAULT_MEMORY_FRACTION: f64 = 0.5;
pub const DEFAULT_TARGET_LANGUAGE: &str = "el";

/// Header written to the export artifact.
pub const EXPORT_HEADER: [&str; 3] = [ITEM_COLUMN, TRANSLATED_ITEM_COLUMN, CATEGORY_COLUMN];

/// True for every nutrition column storage knows about.
pub fn is_nutrition_column(name: &str) -> bool {
    NUMERIC_NUTRITION_COLUMNS.contains(&name) || TEXT_NUTRITION_COLUMNS.contains(&name)
}

/// All nutrition columns, numeric first.
pub fn nutrition_columns() -> impl Iterator<Item = &'static str> {
    NUMERIC_NUTRITION_COLUMNS
        .iter()
        .chain(TEXT_NUTRITION_COLUMNS.iter())
        .copied()
}

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::tempdir;

use nutrition_etl::app::ports::{StoragePort, TranslatorPort};
use nutrition_etl::config::Config;
use nutrition_etl::error::TranslationError;
use nutrition_etl::infra::FixedCapacity;
use nutrition_etl::pipeline::orchestrator::Pipeline;
use nutrition_etl::pipeline::storage::SqliteStorage;

/// Upper-cases each word and counts calls.
#[derive(Default)]
struct ShoutingTranslator {
    calls: AtomicUsize,
}

#[async_trait]
impl TranslatorPort for ShoutingTranslator {
    async fn translate_word(&self, word: &str, _target_language: &str) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(word.to_uppercase())
    }
}

const SOURCE: &str = "\
restaurant,item,calories,cal_fat,total_fat,sat_fat,trans_fat,cholesterol,sodium,total_carb,fiber,sugar,protein,vit_a,vit_c,calcium,salad
Mcdonalds,\"\"\"Big Mac®\"\"\",540,250,28,10,1,80,950,46,3,9,25,6,2,25,Other
Mcdonalds,Chicken Nuggets *,440,240,27,4.5,0,65,900,27,1,0,24,0,2,2,Other
Sonic,6\"\" Hot Dog,310,160,18,7,0,35,,25,1,4,11,4,0,8,Other
";

const DICTIONARY: &str = "item,item_gr\nBig Mac,Μπιγκ Μακ\n";

#[tokio::test]
async fn test_full_run_ingests_translates_classifies_and_exports() -> Result<()> {
    let dir = tempdir()?;
    let source_path = dir.path().join("fastfood.csv");
    let dictionary_path = dir.path().join("curated_translations.csv");
    let export_path = dir.path().join("out").join("food_categories.csv");
    fs::write(&source_path, SOURCE)?;
    fs::write(&dictionary_path, DICTIONARY)?;

    let mut config = Config::default();
    config.source.path = source_path;
    config.translation.dictionary_path = dictionary_path;
    config.export.path = export_path.clone();

    let storage = Arc::new(SqliteStorage::open(dir.path().join("nutrition.db"))?);
    let translator = Arc::new(ShoutingTranslator::default());
    let pipeline = Pipeline::new(
        config,
        storage.clone(),
        Arc::new(FixedCapacity(64 * 1024 * 1024)),
        translator.clone(),
    );

    let report = pipeline.run(false).await?;

    assert_eq!(report.ingest.rows_read, 3);
    assert_eq!(report.ingest.rows_kept, 2);
    assert_eq!(report.ingest.rows_dropped, 1);
    assert_eq!(report.enrich.rows_translated, 2);
    assert_eq!(report.enrich.dictionary_hits, 1);
    assert_eq!(report.classify.rows_classified, 2);
    assert_eq!(report.export.rows_written, 2);
    // "Chicken Nuggets" goes to the translator word by word
    assert_eq!(translator.calls.load(Ordering::SeqCst), 2);

    let records = storage.query_all().await?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].item, "Big Mac");
    assert_eq!(records[0].translated_item.as_deref(), Some("Μπιγκ Μακ"));
    assert_eq!(records[1].item, "Chicken Nuggets");
    assert_eq!(records[1].translated_item.as_deref(), Some("CHICKEN NUGGETS"));
    // Higher-calorie item ranks above the lighter one
    assert_eq!(records[0].category.as_deref(), Some("Main"));
    assert_eq!(records[1].category.as_deref(), Some("Side"));

    let exported = fs::read_to_string(&export_path)?;
    let lines: Vec<&str> = exported.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "item,translated_item,category");
    assert_eq!(lines[1], "Big Mac,Μπιγκ Μακ,Main");
    assert_eq!(lines[2], "Chicken Nuggets,CHICKEN NUGGETS,Side");
    Ok(())
}

#[tokio::test]
async fn test_rerun_with_existing_storage_skips_known_source() -> Result<()> {
    let dir = tempdir()?;
    let source_path = dir.path().join("fastfood.csv");
    let dictionary_path = dir.path().join("curated_translations.csv");
    fs::write(&source_path, SOURCE)?;
    fs::write(&dictionary_path, DICTIONARY)?;

    let mut config = Config::default();
    config.source.path = source_path;
    config.translation.dictionary_path = dictionary_path;
    config.export.path = dir.path().join("food_categories.csv");

    let storage = Arc::new(SqliteStorage::open(dir.path().join("nutrition.db"))?);
    let pipeline = Pipeline::new(
        config,
        storage.clone(),
        Arc::new(FixedCapacity(64 * 1024 * 1024)),
        Arc::new(ShoutingTranslator::default()),
    );

    pipeline.run(false).await?;
    let second = pipeline.run(true).await?;

    assert!(second.ingest.skipped);
    assert_eq!(storage.count().await?, 2);

    let stats = pipeline.stats().await?;
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].restaurant, "Mcdonalds");
    assert_eq!(stats[0].max_calories, Some(540.0));
    Ok(())
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::mem::size_of;

/// Raw nutrition values keyed by column name. Absent keys are missing values.
pub type Nutrition = BTreeMap<String, String>;

/// A stored restaurant menu item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub restaurant: String,
    pub item: String,
    /// Filled in by enrichment
    pub translated_item: Option<String>,
    pub nutrition: Nutrition,
    /// Filled in by classification
    pub category: Option<String>,
}

/// A record that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub restaurant: String,
    pub item: String,
    pub nutrition: Nutrition,
}

/// One data line of a source file, values aligned with the source header.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    /// 1-based data line number, header excluded
    pub line: u64,
    /// `None` for empty or whitespace-only fields
    pub values: Vec<Option<String>>,
}

impl SourceRow {
    pub fn new(line: u64, fields: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let values = fields
            .into_iter()
            .map(|field| {
                let field = field.as_ref();
                if field.trim().is_empty() {
                    None
                } else {
                    Some(field.to_string())
                }
            })
            .collect();
        Self { line, values }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }
}

/// Rows that know whether they carry every value they need.
pub trait Completeness {
    fn is_complete(&self) -> bool;
}

impl Completeness for SourceRow {
    fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }
}

/// Fields the engines are allowed to write back after ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    TranslatedItem,
    Category,
}

impl RecordField {
    pub fn column(&self) -> &'static str {
        match self {
            RecordField::TranslatedItem => crate::constants::TRANSLATED_ITEM_COLUMN,
            RecordField::Category => crate::constants::CATEGORY_COLUMN,
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// Rough in-memory size of one row, used to size processing chunks.
pub trait Footprint {
    fn estimated_bytes(&self) -> usize;
}

fn string_bytes(s: &str) -> usize {
    size_of::<String>() + s.len()
}

impl Footprint for Record {
    fn estimated_bytes(&self) -> usize {
        let nutrition: usize = self
            .nutrition
            .iter()
            .map(|(k, v)| string_bytes(k) + string_bytes(v))
            .sum();
        size_of::<Self>()
            + self.restaurant.len()
            + self.item.len()
            + self.translated_item.as_deref().map_or(0, str::len)
            + self.category.as_deref().map_or(0, str::len)
            + nutrition
    }
}

impl Footprint for SourceRow {
    fn estimated_bytes(&self) -> usize {
        let values: usize = self
            .values
            .iter()
            .map(|v| size_of::<Option<String>>() + v.as_deref().map_or(0, str::len))
            .sum();
        size_of::<Self>() + values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprint_grows_with_content() {
        let mut record = Record {
            id: 1,
            restaurant: "Sonic".to_string(),
            item: "Tots".to_string(),
            translated_item: None,
            nutrition: Nutrition::new(),
            category: None,
        };
        let empty = record.estimated_bytes();
        assert!(empty > 0);

        record.nutrition.insert("calories".to_string(), "320".to_string());
        record.translated_item = Some("Ταρτάκια".to_string());
        assert!(record.estimated_bytes() > empty);
    }

    #[test]
    fn test_record_field_columns() {
        assert_eq!(RecordField::TranslatedItem.column(), "translated_item");
        assert_eq!(RecordField::Category.to_string(), "category");
    }
}

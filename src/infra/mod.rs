pub mod capacity;
pub mod csv_source;
pub mod google_translate;
pub mod resilient_translator;

pub use capacity::{FixedCapacity, SystemMemoryEstimator};
pub use csv_source::CsvSource;
pub use google_translate::GoogleTranslateClient;
pub use resilient_translator::{ResilientTranslator, RetryPolicy};

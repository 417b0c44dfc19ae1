// Pipeline processing: cleaning, dictionary lookup, feature extraction and clustering

pub mod cleaning;
pub mod dictionary;
pub mod features;
pub mod kmeans;
pub mod labels;

pub use cleaning::{clean_identifier, filter_complete};
pub use dictionary::TranslationDictionary;
pub use labels::ClusterLabelMap;

pub mod classify_use_case;
pub mod enrich_use_case;
pub mod export_use_case;
pub mod ingest_use_case;
pub mod ports;
pub mod stats_use_case;

#[cfg(test)]
pub(crate) mod test_support;

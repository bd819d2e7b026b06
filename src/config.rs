use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::Serialize;

pub const DEFAULT_XML_NAME: &str = "bioasq_qa.xml";
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_RETRIEVAL_LIMIT: usize = 5;
pub const DEFAULT_SNIPPET_LIMIT: usize = 5;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetVariant {
    /// BioASQ training set as distributed.
    Training,
    /// Training set enriched with human concepts, abstracts and titles.
    GoldenEnriched,
}

impl DatasetVariant {
    pub fn default_gold_path(self) -> PathBuf {
        match self {
            Self::Training => PathBuf::from("testing_datasets/BioASQ-training8b/training8b.json"),
            Self::GoldenEnriched => {
                PathBuf::from("testing_datasets/augmented_concepts_abstracts_titles.json")
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::GoldenEnriched => "golden_enriched",
        }
    }
}

/// Settings shared by every evaluation and pipeline entry point.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationConfig {
    pub verbose: bool,
    pub dataset_variant: DatasetVariant,
    pub gold_path: PathBuf,
    pub xml_name: String,
    pub results_dir: PathBuf,
    #[serde(rename = "stage_timeout_secs", serialize_with = "serialize_secs")]
    pub stage_timeout: Duration,
    #[serde(rename = "poll_interval_ms", serialize_with = "serialize_millis")]
    pub poll_interval: Duration,
    pub retrieval_limit: usize,
    pub snippet_limit: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        let dataset_variant = DatasetVariant::GoldenEnriched;
        Self {
            verbose: false,
            dataset_variant,
            gold_path: dataset_variant.default_gold_path(),
            xml_name: DEFAULT_XML_NAME.to_string(),
            results_dir: PathBuf::from("."),
            stage_timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            retrieval_limit: DEFAULT_RETRIEVAL_LIMIT,
            snippet_limit: DEFAULT_SNIPPET_LIMIT,
        }
    }
}

fn serialize_secs<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_secs())
}

fn serialize_millis<S: serde::Serializer>(
    value: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

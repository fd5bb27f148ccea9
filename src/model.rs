use serde::{Deserialize, Serialize};

use crate::structure::{ExtractStats, IndexRecord};

/// Batch configuration. Document paths and the image map resolve relative to
/// the config file's directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub documents: Vec<BatchDocument>,
    #[serde(default)]
    pub image_map: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDocument {
    pub path: String,
    pub act_name: String,
    /// `YYYY-MM-DD`
    pub compilation_date: String,
    #[serde(default)]
    pub act_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub doc_id: String,
    pub path: String,
    pub act_name: String,
    pub compilation_date: String,
    pub status: OutcomeStatus,
    pub source_sha256: Option<String>,
    pub sections_path: Option<String>,
    pub records_path: Option<String>,
    pub section_count: usize,
    pub record_count: usize,
    pub stats: Option<ExtractStats>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchCounts {
    pub document_count: usize,
    pub succeeded_count: usize,
    pub failed_count: usize,
    pub section_count: usize,
    pub record_count: usize,
    pub citation_count: usize,
    pub recovered_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub config_path: String,
    pub output_dir: String,
    pub depth_rule: String,
    pub counts: BatchCounts,
    pub documents: Vec<DocumentOutcome>,
    pub warnings: Vec<String>,
}

/// Index record tagged with the act it was extracted from.
#[derive(Debug, Clone, Serialize)]
pub struct ActIndexRecord<'a> {
    pub act_name: &'a str,
    pub compilation_date: &'a str,
    pub source_sha256: &'a str,
    #[serde(flatten)]
    pub record: &'a IndexRecord,
}

mod builder;
mod citation;
mod classify;
mod depth;
mod document;
mod error;
mod inline;
mod markup;
mod section;
mod serialize;
mod walker;


use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::DepthRuleMode;

pub use builder::ExtractStats;
pub use citation::{
    CitationConfig, CitationKind, CitationMatch, CitationRecognizer, DEFAULT_CITATION_BASE_URL,
    DEFAULT_JURISDICTION,
};
pub use classify::{
    BoldRunClassifier, DEFAULT_TERMINAL_PUNCTUATION, RunClassifier, leading_bold_span,
    parse_terminal_punctuation,
};
pub use depth::{DepthRule, FlatDepthRule, HeadingHistory, HeadingWeight, WeightedDepthRule};
pub use document::{Block, Cell, Document, ImageMarker, Inline, Paragraph, Row, Run, Table};
pub use error::ExtractError;
pub use inline::ImageCatalog;
pub use markup::{image_identifier, parse_markup};
pub use section::{ContentItem, ROOT_LEVEL, Section};
pub use serialize::{DocumentRecord, IndexRecord, index_records, parse_record, render_json};
pub use walker::{BlockRef, WalkEvent, walk};

use builder::{ExtractContext, Scope, assemble};

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub terminal_punctuation: Vec<char>,
    pub depth_rule: DepthRuleMode,
    pub citation: CitationConfig,
    pub images: ImageCatalog,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            terminal_punctuation: DEFAULT_TERMINAL_PUNCTUATION.to_vec(),
            depth_rule: DepthRuleMode::Weighted,
            citation: CitationConfig::default(),
            images: ImageCatalog::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: DocumentRecord,
    pub stats: ExtractStats,
}

/// Holds the compiled collaborators of one configuration. Shared by reference
/// across documents; every extraction owns its builders.
pub struct Extractor {
    classifier: BoldRunClassifier,
    depth_rule: Box<dyn DepthRule>,
    citations: CitationRecognizer,
    images: ImageCatalog,
}

impl Extractor {
    pub fn new(config: ExtractConfig) -> Result<Self> {
        let depth_rule: Box<dyn DepthRule> = match config.depth_rule {
            DepthRuleMode::Weighted => Box::new(WeightedDepthRule::new()?),
            DepthRuleMode::Flat => Box::new(FlatDepthRule),
        };

        Ok(Self {
            classifier: BoldRunClassifier::new(config.terminal_punctuation),
            depth_rule,
            citations: CitationRecognizer::new(config.citation)?,
            images: config.images,
        })
    }

    pub fn extract(&self, doc_id: &str, document: &Document) -> Extraction {
        let ctx = ExtractContext {
            classifier: &self.classifier,
            depth_rule: self.depth_rule.as_ref(),
            citations: &self.citations,
            images: &self.images,
        };

        let mut stats = ExtractStats::default();
        for warning in &document.warnings {
            stats.recover(warning.clone());
        }
        let mut events = walk(document);
        let root = assemble(&mut events, &ctx, &mut stats, Scope::Document);

        let mut sections = Vec::with_capacity(root.children.len() + 1);
        if !root.content.is_empty() {
            debug!(doc_id, items = root.content.len(), "content before first heading");
            let mut preamble = Section::new("", 0);
            preamble.content = root.content;
            preamble.citations = root.citations;
            sections.push(preamble);
        }
        sections.extend(root.children);

        for section in &mut sections {
            section.finalize_char_counts();
        }

        info!(
            doc_id,
            sections = sections.len(),
            headings = stats.headings,
            tables = stats.tables,
            citations = stats.citations,
            recovered = stats.recovered,
            "extracted document structure"
        );

        Extraction {
            record: DocumentRecord { sections },
            stats,
        }
    }

    /// Entry point for callers whose converter may not have produced a tree.
    pub fn extract_tree(
        &self,
        doc_id: &str,
        document: Option<&Document>,
    ) -> Result<Extraction, ExtractError> {
        let document = document.ok_or_else(|| ExtractError::MissingTree {
            doc_id: doc_id.to_string(),
        })?;
        Ok(self.extract(doc_id, document))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Markup,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Self {
        let is_markup = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                ["html", "htm", "xhtml"]
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false);

        if is_markup { Self::Markup } else { Self::Json }
    }
}

pub fn load_document(doc_id: &str, path: &Path) -> Result<Document> {
    let raw =
        fs::read(path).with_context(|| format!("failed to read document: {}", path.display()))?;

    let document = match InputFormat::from_path(path) {
        InputFormat::Json => Document::from_json(doc_id, &raw)?,
        InputFormat::Markup => {
            let markup = String::from_utf8(raw)
                .with_context(|| format!("document is not valid UTF-8: {}", path.display()))?;
            parse_markup(doc_id, &markup)?
        }
    };

    Ok(document)
}

/// Document ids default to the input's file stem.
pub fn doc_id_for(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| path.display().to_string())
}

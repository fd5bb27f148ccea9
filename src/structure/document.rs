use serde::{Deserialize, Serialize};

use super::error::ExtractError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default)]
    pub is_bold: bool,
    #[serde(default)]
    pub is_italic: bool,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_bold: false,
            is_italic: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_bold: true,
            is_italic: false,
        }
    }
}

/// Inline image marker left behind by the markup converter. The identifier is
/// the key the external image transcoder uses for the converted bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMarker {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inline {
    Run(Run),
    Image(ImageMarker),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub inlines: Vec<Inline>,
}

impl Paragraph {
    pub fn from_runs(runs: Vec<Run>) -> Self {
        Self {
            inlines: runs.into_iter().map(Inline::Run).collect(),
        }
    }

    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.inlines.iter().filter_map(|inline| match inline {
            Inline::Run(run) => Some(run),
            Inline::Image(_) => None,
        })
    }

    pub fn plain_text(&self) -> String {
        self.runs().map(|run| run.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub blocks: Vec<Block>,
    /// Problems a reader recovered from while building the tree.
    #[serde(skip)]
    pub warnings: Vec<String>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            warnings: Vec::new(),
        }
    }

    /// Parses a JSON document tree. A literal `null` is the converter's way of
    /// saying it produced nothing, which is reported instead of yielding an
    /// empty record.
    pub fn from_json(doc_id: &str, raw: &[u8]) -> Result<Self, ExtractError> {
        let parsed: Option<Document> =
            serde_json::from_slice(raw).map_err(|source| ExtractError::InvalidTree {
                doc_id: doc_id.to_string(),
                source,
            })?;

        parsed.ok_or_else(|| ExtractError::MissingTree {
            doc_id: doc_id.to_string(),
        })
    }
}

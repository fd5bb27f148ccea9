use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::section::{ContentItem, Section, TableCell};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub sections: Vec<Section>,
}

pub fn render_json(record: &DocumentRecord) -> Result<Vec<u8>> {
    let mut data =
        serde_json::to_vec_pretty(record).context("failed to serialize section record")?;
    data.push(b'\n');
    Ok(data)
}

pub fn parse_record(raw: &[u8]) -> Result<DocumentRecord> {
    serde_json::from_slice(raw).context("failed to parse section record")
}

/// One row per section for the search index, keyed by document and path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub doc_id: String,
    pub section_path: String,
    pub heading: String,
    pub level: i32,
    pub text: String,
    pub char_count: usize,
    pub citations: Vec<String>,
}

pub fn index_records(doc_id: &str, record: &DocumentRecord) -> Vec<IndexRecord> {
    let mut out = Vec::new();
    for (index, section) in record.sections.iter().enumerate() {
        collect_index_records(doc_id, section, None, index, &mut out);
    }
    out
}

fn collect_index_records(
    doc_id: &str,
    section: &Section,
    parent_path: Option<&str>,
    index: usize,
    out: &mut Vec<IndexRecord>,
) {
    let label = path_label(&section.heading, index);
    let section_path = match parent_path {
        Some(parent) => format!("{parent} > {label}"),
        None => label,
    };

    out.push(IndexRecord {
        doc_id: doc_id.to_string(),
        section_path: section_path.clone(),
        heading: section.heading.clone(),
        level: section.level,
        text: embedding_text(&section.content),
        char_count: section.char_count,
        citations: section.citations.clone(),
    });

    for (child_index, child) in section.children.iter().enumerate() {
        collect_index_records(doc_id, child, Some(&section_path), child_index, out);
    }
}

fn path_label(heading: &str, index: usize) -> String {
    let condensed = heading.split_whitespace().collect::<Vec<&str>>().join(" ");
    if condensed.is_empty() {
        format!("#{}", index + 1)
    } else {
        condensed
    }
}

/// Plain text for embedding: images dropped, tables linearised one line per row.
pub fn embedding_text(content: &[ContentItem]) -> String {
    let mut lines = Vec::<String>::new();
    for item in content {
        match item {
            ContentItem::Text { value } => {
                if !value.is_empty() {
                    lines.push(value.clone());
                }
            }
            ContentItem::Table { rows } => {
                for row in rows {
                    let cells = row.iter().map(cell_text).collect::<Vec<String>>();
                    lines.push(format!("Table Row: {}", cells.join(" | ")));
                }
            }
            ContentItem::Image { .. } => {}
        }
    }
    lines.join("\n")
}

fn cell_text(cell: &TableCell) -> String {
    let mut parts = vec![embedding_text(&cell.content)];
    for section in &cell.sections {
        section.walk(&mut |nested| {
            parts.push(nested.heading.clone());
            parts.push(embedding_text(&nested.content));
        });
    }

    parts
        .iter()
        .flat_map(|part| part.split_whitespace())
        .collect::<Vec<&str>>()
        .join(" ")
}

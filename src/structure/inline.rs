use std::collections::BTreeMap;

use super::builder::{ExtractContext, ExtractStats, Scope, assemble};
use super::document::{ImageMarker, Table};
use super::section::{ContentItem, Section, TableCell};
use super::walker::WalkEvent;

/// Display names for converted images, keyed by the identifier the markup
/// carried. Produced outside this crate by the image transcoder.
#[derive(Debug, Clone, Default)]
pub struct ImageCatalog {
    names: BTreeMap<String, String>,
}

impl ImageCatalog {
    pub fn new(names: BTreeMap<String, String>) -> Self {
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn resolve(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }
}

pub fn image_item(
    marker: &ImageMarker,
    catalog: &ImageCatalog,
    stats: &mut ExtractStats,
) -> ContentItem {
    let id = marker
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let Some(id) = id else {
        stats.recover("image marker without an identifier".to_string());
        return ContentItem::text("");
    };

    stats.images += 1;
    let name = catalog
        .resolve(id)
        .map(ToOwned::to_owned)
        .or_else(|| marker.name.clone().filter(|name| !name.trim().is_empty()));

    ContentItem::Image {
        id: id.to_string(),
        name,
    }
}

/// Consumes the events of `table` up to its `TableEnd`. Every cell is extracted
/// by its own builder; text the cell holds before any heading stays in the
/// cell's content and its citations are handed back for the enclosing section.
pub fn inline_table<'d, I>(
    table: &Table,
    events: &mut I,
    ctx: &ExtractContext<'_>,
    stats: &mut ExtractStats,
) -> (ContentItem, Vec<String>)
where
    I: Iterator<Item = WalkEvent<'d>>,
{
    stats.tables += 1;
    let mut rows = Vec::<Vec<TableCell>>::with_capacity(table.rows.len());
    let mut citations = Vec::<String>::new();

    while let Some(event) = events.next() {
        match event {
            WalkEvent::RowStart => rows.push(Vec::new()),
            WalkEvent::CellStart => {
                let root = assemble(events, ctx, stats, Scope::Cell);
                let (cell, cell_citations) = cell_from_root(root, stats);
                citations.extend(cell_citations);
                match rows.last_mut() {
                    Some(row) => row.push(cell),
                    None => rows.push(vec![cell]),
                }
            }
            WalkEvent::RowEnd => {}
            WalkEvent::TableEnd => break,
            other => stats.recover(format!("unexpected {other:?} between table cells")),
        }
    }

    if rows.is_empty() {
        stats.recover("table without rows".to_string());
    }

    (ContentItem::Table { rows }, citations)
}

fn cell_from_root(root: Section, stats: &mut ExtractStats) -> (TableCell, Vec<String>) {
    stats.cells += 1;
    stats.cell_sections += count_sections(&root.children);

    let mut cell = TableCell {
        content: root.content,
        sections: root.children,
    };

    if cell.content.is_empty() && cell.sections.is_empty() {
        stats.recover("table cell without content".to_string());
        cell.content.push(ContentItem::text(""));
    }

    (cell, root.citations)
}

fn count_sections(sections: &[Section]) -> usize {
    let mut count = 0usize;
    for section in sections {
        section.walk(&mut |_| count += 1);
    }
    count
}

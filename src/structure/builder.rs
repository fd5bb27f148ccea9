use serde::Serialize;
use tracing::debug;

use super::citation::CitationRecognizer;
use super::classify::{RunClassifier, leading_bold_span};
use super::depth::{DepthRule, HeadingHistory};
use super::document::{Inline, Paragraph};
use super::inline::{ImageCatalog, image_item, inline_table};
use super::section::{ContentItem, Section};
use super::walker::WalkEvent;

/// Collaborators shared, read-only, by every builder of one extraction.
pub struct ExtractContext<'a> {
    pub classifier: &'a dyn RunClassifier,
    pub depth_rule: &'a dyn DepthRule,
    pub citations: &'a CitationRecognizer,
    pub images: &'a ImageCatalog,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractStats {
    pub paragraphs: usize,
    pub headings: usize,
    pub tables: usize,
    pub cells: usize,
    pub cell_sections: usize,
    pub images: usize,
    pub citations: usize,
    pub recovered: usize,
    pub warnings: Vec<String>,
}

impl ExtractStats {
    pub(super) fn recover(&mut self, warning: String) {
        debug!(warning = %warning, "recovered malformed input");
        self.recovered += 1;
        self.warnings.push(warning);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Document,
    Cell,
}

/// The open-section stack. Index 0 is always the synthetic root.
struct SectionBuilder<'c, 'a> {
    ctx: &'c ExtractContext<'a>,
    stack: Vec<Section>,
    history: HeadingHistory,
}

impl<'c, 'a> SectionBuilder<'c, 'a> {
    fn new(ctx: &'c ExtractContext<'a>) -> Self {
        Self {
            ctx,
            stack: vec![Section::root()],
            history: HeadingHistory::default(),
        }
    }

    fn open_level(&self) -> i32 {
        self.stack.last().map(|section| section.level).unwrap_or(-1)
    }

    fn top(&mut self) -> &mut Section {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn paragraph(&mut self, paragraph: &Paragraph, stats: &mut ExtractStats) {
        stats.paragraphs += 1;

        if let Some((span, rest)) = leading_bold_span(paragraph) {
            if self.ctx.classifier.is_heading_run(&span) {
                self.open_heading(span.text.trim().to_string());
                stats.headings += 1;
                self.push_inlines(&paragraph.inlines[rest..], stats);
                return;
            }
        }

        self.push_inlines(&paragraph.inlines, stats);
    }

    fn open_heading(&mut self, heading: String) {
        let weight = self.ctx.depth_rule.weigh(&heading);
        let level = self
            .ctx
            .depth_rule
            .assign(weight, &self.history, self.open_level());
        self.history.record(weight, level);

        self.close_to(level);
        debug!(heading = %heading, level, ?weight, "opened section");
        self.stack.push(Section::new(heading, level));
    }

    /// Closes every open section at `level` or deeper into its parent.
    fn close_to(&mut self, level: i32) {
        while self.stack.len() > 1 && self.open_level() >= level {
            if let Some(closed) = self.stack.pop() {
                self.top().children.push(closed);
            }
        }
    }

    fn push_inlines(&mut self, inlines: &[Inline], stats: &mut ExtractStats) {
        let mut text = String::new();
        for inline in inlines {
            match inline {
                Inline::Run(run) => text.push_str(&run.text),
                Inline::Image(marker) => {
                    self.push_text(&text, stats);
                    text.clear();
                    let item = image_item(marker, self.ctx.images, stats);
                    self.top().content.push(item);
                }
            }
        }
        self.push_text(&text, stats);
    }

    fn push_text(&mut self, text: &str, stats: &mut ExtractStats) {
        let value = text.trim();
        if value.is_empty() {
            return;
        }

        let urls = self
            .ctx
            .citations
            .recognize(value)
            .into_iter()
            .map(|found| found.url)
            .collect::<Vec<String>>();
        stats.citations += urls.len();

        let top = self.top();
        top.citations.extend(urls);
        top.content.push(ContentItem::text(value));
    }

    fn push_table(&mut self, table: ContentItem, citations: Vec<String>) {
        let top = self.top();
        top.citations.extend(citations);
        top.content.push(table);
    }

    fn finish(mut self) -> Section {
        self.close_to(0);
        self.stack.pop().unwrap_or_else(Section::root)
    }
}

/// Runs one builder over `events` and returns its synthetic root. A cell-scoped
/// run stops at the cell's closing event so the caller keeps the stream.
pub fn assemble<'d, I>(
    events: &mut I,
    ctx: &ExtractContext<'_>,
    stats: &mut ExtractStats,
    scope: Scope,
) -> Section
where
    I: Iterator<Item = WalkEvent<'d>>,
{
    let mut builder = SectionBuilder::new(ctx);

    while let Some(event) = events.next() {
        match event {
            WalkEvent::Paragraph(paragraph) => builder.paragraph(paragraph, stats),
            WalkEvent::TableStart(table) => {
                let (item, citations) = inline_table(table, events, ctx, stats);
                builder.push_table(item, citations);
            }
            WalkEvent::CellEnd if scope == Scope::Cell => break,
            other => stats.recover(format!("unexpected {other:?} outside a table")),
        }
    }

    builder.finish()
}

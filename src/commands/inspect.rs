use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InspectArgs;
use crate::structure::{
    BlockRef, BoldRunClassifier, DepthRule, Document, Inline, RunClassifier, WeightedDepthRule,
    doc_id_for, leading_bold_span, load_document, parse_terminal_punctuation, walk,
};

#[derive(Debug, Clone, Default, Serialize)]
pub struct FormattingReport {
    pub doc_id: String,
    pub paragraphs: usize,
    pub empty_paragraphs: usize,
    pub tables: usize,
    pub max_table_depth: usize,
    pub runs: usize,
    pub bold_runs: usize,
    pub italic_runs: usize,
    pub images: usize,
    pub images_without_id: usize,
    pub bold_led_paragraphs: usize,
    pub heading_candidates: Vec<HeadingCandidate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeadingCandidate {
    pub text: String,
    pub weight: String,
    pub table_depth: usize,
}

pub fn run(args: InspectArgs) -> Result<()> {
    let doc_id = doc_id_for(&args.input);
    let document = load_document(&doc_id, &args.input)?;
    let classifier = BoldRunClassifier::new(parse_terminal_punctuation(
        &args.options.terminal_punctuation,
    ));
    let depth_rule = WeightedDepthRule::new()?;

    let report = inspect_document(&doc_id, &document, &classifier, &depth_rule);

    if args.json {
        let mut data =
            serde_json::to_vec_pretty(&report).context("failed to serialize formatting report")?;
        data.push(b'\n');
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(&data)
            .context("failed to write formatting report to stdout")?;
        return Ok(());
    }

    for candidate in &report.heading_candidates {
        info!(
            heading = %candidate.text,
            weight = %candidate.weight,
            table_depth = candidate.table_depth,
            "heading candidate"
        );
    }

    info!(
        doc_id = %report.doc_id,
        paragraphs = report.paragraphs,
        empty_paragraphs = report.empty_paragraphs,
        tables = report.tables,
        max_table_depth = report.max_table_depth,
        runs = report.runs,
        bold_runs = report.bold_runs,
        italic_runs = report.italic_runs,
        images = report.images,
        images_without_id = report.images_without_id,
        bold_led_paragraphs = report.bold_led_paragraphs,
        heading_candidates = report.heading_candidates.len(),
        "inspect completed"
    );

    Ok(())
}

pub fn inspect_document(
    doc_id: &str,
    document: &Document,
    classifier: &dyn RunClassifier,
    depth_rule: &dyn DepthRule,
) -> FormattingReport {
    let mut report = FormattingReport {
        doc_id: doc_id.to_string(),
        ..FormattingReport::default()
    };

    for visit in walk(document).blocks() {
        let paragraph = match visit.block {
            BlockRef::Table(_) => {
                report.tables += 1;
                report.max_table_depth = report.max_table_depth.max(visit.depth + 1);
                continue;
            }
            BlockRef::Paragraph(paragraph) => paragraph,
        };

        report.paragraphs += 1;
        if paragraph.plain_text().trim().is_empty() {
            report.empty_paragraphs += 1;
        }

        for inline in &paragraph.inlines {
            match inline {
                Inline::Run(run) => {
                    report.runs += 1;
                    report.bold_runs += usize::from(run.is_bold);
                    report.italic_runs += usize::from(run.is_italic);
                }
                Inline::Image(marker) => {
                    report.images += 1;
                    if marker.id.as_deref().map(str::trim).unwrap_or_default().is_empty() {
                        report.images_without_id += 1;
                    }
                }
            }
        }

        let Some((span, _)) = leading_bold_span(paragraph) else {
            continue;
        };
        report.bold_led_paragraphs += 1;

        if classifier.is_heading_run(&span) {
            let text = span.text.trim().to_string();
            report.heading_candidates.push(HeadingCandidate {
                weight: format!("{:?}", depth_rule.weigh(&text)),
                text,
                table_depth: visit.depth,
            });
        }
    }

    report
}

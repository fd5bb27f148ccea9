use std::fs;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::ValidateArgs;
use crate::structure::{ContentItem, DocumentRecord, ROOT_LEVEL, Section, parse_record};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let raw = fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let record = parse_record(&raw)
        .with_context(|| format!("failed to load record: {}", args.input.display()))?;

    let issues = validate_record(&record, &args.url_prefix);
    for issue in &issues {
        warn!(path = %issue.path, message = %issue.message, "record violation");
    }

    let mut sections = 0usize;
    for section in &record.sections {
        section.walk(&mut |_| sections += 1);
    }
    info!(
        input = %args.input.display(),
        top_level = record.sections.len(),
        sections,
        issues = issues.len(),
        "validate completed"
    );

    if !issues.is_empty() {
        bail!(
            "{} failed validation with {} issue(s)",
            args.input.display(),
            issues.len()
        );
    }

    Ok(())
}

pub fn validate_record(record: &DocumentRecord, url_prefix: &str) -> Vec<ValidationIssue> {
    let mut checker = Checker {
        url_prefix,
        issues: Vec::new(),
    };
    checker.sections(&record.sections, ROOT_LEVEL, "", true);
    checker.issues
}

struct Checker<'a> {
    url_prefix: &'a str,
    issues: Vec<ValidationIssue>,
}

impl Checker<'_> {
    fn issue(&mut self, path: &str, message: String) {
        self.issues.push(ValidationIssue {
            path: path.to_string(),
            message,
        });
    }

    /// `document_level` marks the record's top-level list, the only place an
    /// untitled section may appear, and only first.
    fn sections(
        &mut self,
        sections: &[Section],
        parent_level: i32,
        parent: &str,
        document_level: bool,
    ) {
        for (index, section) in sections.iter().enumerate() {
            let path = format!("{parent}/{index}");

            if section.level != parent_level + 1 {
                self.issue(
                    &path,
                    format!(
                        "level {} under level {} (expected {})",
                        section.level,
                        parent_level,
                        parent_level + 1
                    ),
                );
            }

            if section.heading.trim().is_empty() && !(document_level && index == 0) {
                self.issue(&path, "untitled section after the first".to_string());
            }

            let expected = section
                .content
                .iter()
                .map(ContentItem::own_char_count)
                .sum::<usize>();
            if section.char_count != expected {
                self.issue(
                    &path,
                    format!(
                        "char_count {} does not match own content ({expected})",
                        section.char_count
                    ),
                );
            }

            for url in &section.citations {
                if !url.starts_with(self.url_prefix) || !url.ends_with(".html") {
                    self.issue(&path, format!("malformed citation url: {url}"));
                }
            }

            self.content(&section.content, &path);
            self.sections(&section.children, section.level, &path, false);
        }
    }

    fn content(&mut self, content: &[ContentItem], parent: &str) {
        for (index, item) in content.iter().enumerate() {
            let ContentItem::Table { rows } = item else {
                continue;
            };

            for (row_index, row) in rows.iter().enumerate() {
                for (cell_index, cell) in row.iter().enumerate() {
                    let path = format!("{parent}/content/{index}/{row_index}/{cell_index}");
                    if cell.content.is_empty() && cell.sections.is_empty() {
                        self.issue(&path, "empty table cell".to_string());
                    }
                    self.content(&cell.content, &path);
                    self.sections(&cell.sections, ROOT_LEVEL, &path, false);
                }
            }
        }
    }
}

use std::fs;
use std::path::Path;

use serde_json::Value;

use super::*;
use crate::cli::{BatchArgs, DepthRuleMode, ExtractArgs, ValidateArgs};
use crate::structure::{
    BoldRunClassifier, ContentItem, DEFAULT_CITATION_BASE_URL, DocumentRecord, Extractor, Section,
    WeightedDepthRule, parse_markup, parse_record,
};

const ACT_TREE: &str = r#"{
    "blocks": [
        {"type": "paragraph", "inlines": [{"type": "run", "text": "Part 1 Preliminary", "is_bold": true}]},
        {"type": "paragraph", "inlines": [{"type": "run", "text": "See the Crimes Act 1900 s 61 and section 6-5."}]},
        {"type": "paragraph", "inlines": [{"type": "run", "text": "Division 1 Definitions", "is_bold": true}]},
        {"type": "table", "rows": [{"cells": [
            {"blocks": [{"type": "paragraph", "inlines": [{"type": "run", "text": "term"}]}]},
            {"blocks": [{"type": "paragraph", "inlines": [{"type": "run", "text": "meaning"}]}]}
        ]}]}
    ]
}"#;

fn default_options() -> ExtractionOptions {
    ExtractionOptions {
        terminal_punctuation: ".,;:!?".to_string(),
        depth_rule: DepthRuleMode::Weighted,
        citation_base_url: DEFAULT_CITATION_BASE_URL.to_string(),
        default_jurisdiction: "cth".to_string(),
        act_url: None,
    }
}

fn write_file(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write fixture");
}

fn read_lines(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .expect("read jsonl")
        .lines()
        .map(|line| serde_json::from_str(line).expect("jsonl line"))
        .collect()
}

#[test]
fn extract_writes_record_and_index_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("crimes.json");
    let output = dir.path().join("out").join("crimes.sections.json");
    let records = dir.path().join("out").join("crimes.records.jsonl");
    write_file(&input, ACT_TREE);

    extract::run(ExtractArgs {
        input,
        output: Some(output.clone()),
        records: Some(records.clone()),
        image_map: None,
        doc_id: None,
        options: default_options(),
    })
    .expect("extract");

    let record = parse_record(&fs::read(&output).expect("read record")).expect("parse record");
    assert_eq!(record.sections.len(), 1);
    assert_eq!(record.sections[0].heading, "Part 1 Preliminary");
    assert_eq!(record.sections[0].children[0].heading, "Division 1 Definitions");
    assert_eq!(record.sections[0].citations.len(), 1);

    let lines = read_lines(&records);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["doc_id"], "crimes");
    assert_eq!(
        lines[1]["section_path"],
        "Part 1 Preliminary > Division 1 Definitions"
    );
    assert_eq!(lines[1]["text"], "Table Row: term | meaning");
}

#[test]
fn extract_reads_markup_and_applies_image_map() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("act.html");
    let image_map = dir.path().join("images.json");
    let output = dir.path().join("act.sections.json");
    write_file(
        &input,
        r#"<p><b>Schedule 1</b></p><p><img src="media/image1.emf" alt="Diagram" /></p>"#,
    );
    write_file(&image_map, r#"{"media/image1.emf": "image1.png"}"#);

    extract::run(ExtractArgs {
        input,
        output: Some(output.clone()),
        records: None,
        image_map: Some(image_map),
        doc_id: Some("schedule".to_string()),
        options: default_options(),
    })
    .expect("extract");

    let record = parse_record(&fs::read(&output).expect("read record")).expect("parse record");
    assert_eq!(
        record.sections[0].content,
        vec![ContentItem::Image {
            id: "media/image1.emf".to_string(),
            name: Some("image1.png".to_string()),
        }]
    );
}

#[test]
fn batch_records_failures_and_keeps_going() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("batch.json");
    let output_dir = dir.path().join("out");
    write_file(&dir.path().join("good.json"), ACT_TREE);
    write_file(&dir.path().join("empty.json"), "null");
    write_file(
        &config,
        r#"{
            "documents": [
                {"path": "good.json", "act_name": "Good Act", "compilation_date": "2024-01-01"},
                {"path": "empty.json", "act_name": "Empty Act", "compilation_date": "2024-02-01"}
            ]
        }"#,
    );

    let err = batch::run(BatchArgs {
        config,
        output_dir: output_dir.clone(),
        manifest_path: None,
        options: default_options(),
    })
    .expect_err("one document fails");
    assert!(err.to_string().contains("1 of 2 documents failed"));

    let manifest: Value = crate::util::read_json(&output_dir.join("batch_manifest.json"))
        .expect("manifest");
    assert_eq!(manifest["status"], "completed_with_failures");
    assert_eq!(manifest["counts"]["succeeded_count"], 1);
    assert_eq!(manifest["counts"]["failed_count"], 1);
    assert_eq!(manifest["documents"][0]["status"], "succeeded");
    assert_eq!(manifest["documents"][1]["status"], "failed");
    assert!(
        manifest["documents"][1]["error"]
            .as_str()
            .expect("error text")
            .contains("empty")
    );
    assert!(manifest["documents"][1]["source_sha256"].is_string());

    assert!(output_dir.join("good.sections.json").exists());
    assert!(!output_dir.join("empty.sections.json").exists());

    let lines = read_lines(&output_dir.join("good.records.jsonl"));
    assert_eq!(lines[0]["act_name"], "Good Act");
    assert_eq!(lines[0]["compilation_date"], "2024-01-01");
    assert_eq!(lines[0]["doc_id"], "good");
}

#[test]
fn batch_uses_document_act_url_for_internal_references() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("batch.json");
    let output_dir = dir.path().join("out");
    let manifest_path = dir.path().join("manifests").join("run.json");
    write_file(&dir.path().join("itaa.json"), ACT_TREE);
    write_file(
        &config,
        r#"{
            "documents": [{
                "path": "itaa.json",
                "act_name": "Income Tax Assessment Act 1997",
                "compilation_date": "2024-07-01",
                "act_url": "https://classic.austlii.edu.au/au/legis/cth/consol_act/itaa1997240/"
            }]
        }"#,
    );

    batch::run(BatchArgs {
        config,
        output_dir: output_dir.clone(),
        manifest_path: Some(manifest_path.clone()),
        options: default_options(),
    })
    .expect("batch");

    let manifest: Value = crate::util::read_json(&manifest_path).expect("manifest");
    assert_eq!(manifest["status"], "completed");
    assert_eq!(manifest["counts"]["citation_count"], 2);

    let record = parse_record(&fs::read(output_dir.join("itaa.sections.json")).expect("record"))
        .expect("parse record");
    assert_eq!(
        record.sections[0].citations[1],
        "https://classic.austlii.edu.au/au/legis/cth/consol_act/itaa1997240/s6.5.html"
    );
}

#[test]
fn batch_rejects_malformed_compilation_date() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("batch.json");
    write_file(&dir.path().join("act.json"), ACT_TREE);
    write_file(
        &config,
        r#"{"documents": [{"path": "act.json", "act_name": "Act", "compilation_date": "01/02/2024"}]}"#,
    );

    let err = batch::run(BatchArgs {
        config,
        output_dir: dir.path().join("out"),
        manifest_path: None,
        options: default_options(),
    })
    .expect_err("bad date");

    assert!(format!("{err:#}").contains("compilation_date"));
}

#[test]
fn extract_config_prefers_document_act_url() {
    let mut options = default_options();
    options.act_url = Some("https://example.test/global/".to_string());

    let config = extract_config(
        &options,
        ImageCatalog::default(),
        Some("https://example.test/act/".to_string()),
    );
    assert_eq!(
        config.citation.act_url.as_deref(),
        Some("https://example.test/act/")
    );

    let config = extract_config(&options, ImageCatalog::default(), None);
    assert_eq!(
        config.citation.act_url.as_deref(),
        Some("https://example.test/global/")
    );
}

#[test]
fn validate_accepts_extracted_records() {
    let extractor = Extractor::new(extract_config(&default_options(), ImageCatalog::default(), None))
        .expect("extractor");
    let document = parse_markup(
        "valid",
        "<p>Preamble</p><p><b>Part 1</b></p><p><b>Division 1</b></p>\
         <table><tr><td><p><b>Note</b></p><p>Crimes Act 1900 s 61</p></td></tr></table>",
    )
    .expect("markup");

    let extraction = extractor.extract("valid", &document);
    assert!(validate::validate_record(&extraction.record, "https://").is_empty());
}

#[test]
fn validate_reports_level_count_and_url_problems() {
    let mut child = Section::new("Deep", 2);
    child.char_count = 0;

    let mut parent = Section::new("Top", 0);
    parent.content.push(ContentItem::text("four"));
    parent.char_count = 7;
    parent.citations.push("ftp://example.test/s1".to_string());
    parent.children.push(child);

    let untitled = Section::new("", 0);
    let record = DocumentRecord {
        sections: vec![parent, untitled],
    };

    let issues = validate::validate_record(&record, "https://");
    let messages = issues
        .iter()
        .map(|issue| format!("{} {}", issue.path, issue.message))
        .collect::<Vec<String>>();

    assert_eq!(issues.len(), 4, "{messages:?}");
    assert!(messages.iter().any(|message| message.starts_with("/0 char_count 7")));
    assert!(messages.iter().any(|message| message.contains("malformed citation url")));
    assert!(messages.iter().any(|message| message.starts_with("/0/0 level 2 under level 0")));
    assert!(messages.iter().any(|message| message.starts_with("/1 untitled")));
}

#[test]
fn validate_command_fails_on_violations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("bad.sections.json");
    write_file(
        &input,
        r#"{"sections": [{"heading": "A", "level": 3, "content": [], "char_count": 0, "citations": [], "children": []}]}"#,
    );

    let err = validate::run(ValidateArgs {
        input,
        url_prefix: "https://".to_string(),
    })
    .expect_err("violations");
    assert!(err.to_string().contains("1 issue"));
}

#[test]
fn inspect_reports_formatting_inventory() {
    let document = parse_markup(
        "inventory",
        "<p><strong>Part 1 Preliminary</strong></p>\
         <p><strong>Emphasis.</strong> then prose</p>\
         <p><img alt=\"no source\" /></p>\
         <table><tr><td><p><b>6-23 Meaning</b></p><table><tr><td>x</td></tr></table></td></tr></table>",
    )
    .expect("markup");

    let report = inspect::inspect_document(
        "inventory",
        &document,
        &BoldRunClassifier::default(),
        &WeightedDepthRule::new().expect("depth rule"),
    );

    assert_eq!(report.tables, 2);
    assert_eq!(report.max_table_depth, 2);
    assert_eq!(report.images, 1);
    assert_eq!(report.images_without_id, 1);
    assert_eq!(report.bold_led_paragraphs, 3);
    assert_eq!(report.heading_candidates.len(), 2);
    assert_eq!(report.heading_candidates[0].weight, "Keyword(2)");
    assert_eq!(report.heading_candidates[1].text, "6-23 Meaning");
    assert_eq!(report.heading_candidates[1].table_depth, 1);
}

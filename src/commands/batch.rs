use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, SecondsFormat, Utc};
use rayon::prelude::*;
use tracing::{info, warn};

use super::{extract_config, load_image_catalog};
use crate::cli::BatchArgs;
use crate::model::{
    ActIndexRecord, BatchConfig, BatchCounts, BatchDocument, BatchRunManifest, DocumentOutcome,
    OutcomeStatus,
};
use crate::structure::{
    Extractor, ImageCatalog, doc_id_for, index_records, load_document, render_json,
};
use crate::util::{
    ensure_directory, now_utc_string, read_json, sha256_file, utc_compact_string, write_bytes,
    write_json_lines, write_json_pretty,
};

const MANIFEST_VERSION: u32 = 1;

pub fn run(args: BatchArgs) -> Result<()> {
    let started_at = Utc::now();
    let run_id = format!("batch-{}", utc_compact_string(started_at));

    let config: BatchConfig = read_json(&args.config)?;
    let config_dir = args
        .config
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    validate_config(&config, &args.config)?;

    let image_map = config.image_map.as_ref().map(|path| config_dir.join(path));
    let images = load_image_catalog(image_map.as_deref())?;
    let extractors = build_extractors(&args, &config, &images)?;

    ensure_directory(&args.output_dir)?;
    info!(
        run_id = %run_id,
        documents = config.documents.len(),
        output_dir = %args.output_dir.display(),
        depth_rule = args.options.depth_rule.as_str(),
        "batch started"
    );

    let outcomes = config
        .documents
        .par_iter()
        .map(|document| {
            let act_url = document.act_url.clone().or_else(|| args.options.act_url.clone());
            match extractors.get(&act_url) {
                Some(extractor) => {
                    process_document(document, &config_dir, &args.output_dir, extractor)
                }
                None => failed_outcome(
                    document,
                    &config_dir,
                    None,
                    "no extractor configured for act url".to_string(),
                ),
            }
        })
        .collect::<Vec<DocumentOutcome>>();

    let counts = summarize(&outcomes);
    let warnings = outcomes
        .iter()
        .flat_map(|outcome| {
            outcome
                .stats
                .iter()
                .flat_map(|stats| stats.warnings.iter())
                .map(move |warning| format!("{}: {warning}", outcome.doc_id))
        })
        .collect::<Vec<String>>();

    let status = if counts.failed_count == 0 {
        "completed"
    } else {
        "completed_with_failures"
    };

    let manifest = BatchRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id: run_id.clone(),
        status: status.to_string(),
        started_at: started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        updated_at: now_utc_string(),
        command: "batch".to_string(),
        config_path: args.config.display().to_string(),
        output_dir: args.output_dir.display().to_string(),
        depth_rule: args.options.depth_rule.as_str().to_string(),
        counts,
        documents: outcomes,
        warnings,
    };

    let manifest_path = args
        .manifest_path
        .clone()
        .unwrap_or_else(|| args.output_dir.join("batch_manifest.json"));
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote batch manifest");

    info!(
        run_id = %run_id,
        succeeded = manifest.counts.succeeded_count,
        failed = manifest.counts.failed_count,
        sections = manifest.counts.section_count,
        citations = manifest.counts.citation_count,
        "batch completed"
    );

    if manifest.counts.failed_count > 0 {
        bail!(
            "{} of {} documents failed; see {}",
            manifest.counts.failed_count,
            manifest.counts.document_count,
            manifest_path.display()
        );
    }

    Ok(())
}

fn validate_config(config: &BatchConfig, config_path: &Path) -> Result<()> {
    if config.documents.is_empty() {
        bail!("batch config lists no documents: {}", config_path.display());
    }

    let mut doc_ids = BTreeSet::new();
    for document in &config.documents {
        if document.path.trim().is_empty() {
            bail!("batch config entry for {} has an empty path", document.act_name);
        }
        if document.act_name.trim().is_empty() {
            bail!("batch config entry {} has an empty act_name", document.path);
        }

        NaiveDate::parse_from_str(&document.compilation_date, "%Y-%m-%d").with_context(|| {
            format!(
                "invalid compilation_date for {} (use YYYY-MM-DD): {}",
                document.path, document.compilation_date
            )
        })?;

        let doc_id = doc_id_for(Path::new(&document.path));
        if !doc_ids.insert(doc_id.clone()) {
            bail!("batch config lists two documents with output name {doc_id}");
        }
    }

    Ok(())
}

/// One extractor per distinct act URL; everything else in the configuration is
/// shared by the whole batch.
fn build_extractors(
    args: &BatchArgs,
    config: &BatchConfig,
    images: &ImageCatalog,
) -> Result<BTreeMap<Option<String>, Extractor>> {
    let mut extractors = BTreeMap::new();
    for document in &config.documents {
        let act_url = document.act_url.clone().or_else(|| args.options.act_url.clone());
        if extractors.contains_key(&act_url) {
            continue;
        }

        let config = extract_config(&args.options, images.clone(), act_url.clone());
        let extractor = Extractor::new(config)?;
        extractors.insert(act_url, extractor);
    }
    Ok(extractors)
}

fn process_document(
    document: &BatchDocument,
    config_dir: &Path,
    output_dir: &Path,
    extractor: &Extractor,
) -> DocumentOutcome {
    let source_path = config_dir.join(&document.path);
    let doc_id = doc_id_for(&source_path);

    match extract_document(document, &source_path, &doc_id, output_dir, extractor) {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(doc_id = %doc_id, error = %err, "document failed");
            for cause in err.chain().skip(1) {
                warn!(doc_id = %doc_id, cause = %cause, "caused by");
            }
            let source_sha256 = sha256_file(&source_path).ok();
            failed_outcome(document, config_dir, source_sha256, format!("{err:#}"))
        }
    }
}

fn extract_document(
    document: &BatchDocument,
    source_path: &Path,
    doc_id: &str,
    output_dir: &Path,
    extractor: &Extractor,
) -> Result<DocumentOutcome> {
    let source_sha256 = sha256_file(source_path)?;
    let tree = load_document(doc_id, source_path)?;
    let extraction = extractor.extract(doc_id, &tree);

    let sections_path = output_dir.join(format!("{doc_id}.sections.json"));
    write_bytes(&sections_path, &render_json(&extraction.record)?)?;

    let records = index_records(doc_id, &extraction.record);
    let tagged = records
        .iter()
        .map(|record| ActIndexRecord {
            act_name: &document.act_name,
            compilation_date: &document.compilation_date,
            source_sha256: &source_sha256,
            record,
        })
        .collect::<Vec<ActIndexRecord<'_>>>();
    let records_path = output_dir.join(format!("{doc_id}.records.jsonl"));
    write_json_lines(&records_path, &tagged)?;

    info!(
        doc_id = %doc_id,
        act_name = %document.act_name,
        sections = extraction.record.sections.len(),
        records = records.len(),
        recovered = extraction.stats.recovered,
        "document extracted"
    );

    Ok(DocumentOutcome {
        doc_id: doc_id.to_string(),
        path: source_path.display().to_string(),
        act_name: document.act_name.clone(),
        compilation_date: document.compilation_date.clone(),
        status: OutcomeStatus::Succeeded,
        source_sha256: Some(source_sha256),
        sections_path: Some(sections_path.display().to_string()),
        records_path: Some(records_path.display().to_string()),
        section_count: extraction.record.sections.len(),
        record_count: records.len(),
        stats: Some(extraction.stats),
        error: None,
    })
}

fn failed_outcome(
    document: &BatchDocument,
    config_dir: &Path,
    source_sha256: Option<String>,
    error: String,
) -> DocumentOutcome {
    let source_path = config_dir.join(&document.path);
    DocumentOutcome {
        doc_id: doc_id_for(&source_path),
        path: source_path.display().to_string(),
        act_name: document.act_name.clone(),
        compilation_date: document.compilation_date.clone(),
        status: OutcomeStatus::Failed,
        source_sha256,
        sections_path: None,
        records_path: None,
        section_count: 0,
        record_count: 0,
        stats: None,
        error: Some(error),
    }
}

fn summarize(outcomes: &[DocumentOutcome]) -> BatchCounts {
    let succeeded = outcomes
        .iter()
        .filter(|outcome| outcome.status == OutcomeStatus::Succeeded)
        .count();

    BatchCounts {
        document_count: outcomes.len(),
        succeeded_count: succeeded,
        failed_count: outcomes.len() - succeeded,
        section_count: outcomes.iter().map(|outcome| outcome.section_count).sum(),
        record_count: outcomes.iter().map(|outcome| outcome.record_count).sum(),
        citation_count: outcomes
            .iter()
            .filter_map(|outcome| outcome.stats.as_ref())
            .map(|stats| stats.citations)
            .sum(),
        recovered_count: outcomes
            .iter()
            .filter_map(|outcome| outcome.stats.as_ref())
            .map(|stats| stats.recovered)
            .sum(),
    }
}

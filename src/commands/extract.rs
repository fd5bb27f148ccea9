use std::io::Write;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::{extract_config, load_image_catalog};
use crate::cli::ExtractArgs;
use crate::structure::{Extractor, doc_id_for, index_records, load_document, render_json};
use crate::util::{write_bytes, write_json_lines};

pub fn run(args: ExtractArgs) -> Result<()> {
    let doc_id = args
        .doc_id
        .clone()
        .unwrap_or_else(|| doc_id_for(&args.input));

    let images = load_image_catalog(args.image_map.as_deref())?;
    let extractor = Extractor::new(extract_config(&args.options, images, None))?;

    info!(
        doc_id = %doc_id,
        input = %args.input.display(),
        depth_rule = args.options.depth_rule.as_str(),
        "extract started"
    );

    let document = load_document(&doc_id, &args.input)?;
    let extraction = extractor.extract(&doc_id, &document);

    for warning in &extraction.stats.warnings {
        warn!(doc_id = %doc_id, warning = %warning, "recovered malformed input");
    }

    let rendered = render_json(&extraction.record)?;
    match &args.output {
        Some(path) => {
            write_bytes(path, &rendered)?;
            info!(path = %path.display(), "wrote section record");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&rendered)
                .context("failed to write section record to stdout")?;
            stdout.flush().context("failed to flush stdout")?;
        }
    }

    if let Some(path) = &args.records {
        let records = index_records(&doc_id, &extraction.record);
        write_json_lines(path, &records)?;
        info!(path = %path.display(), records = records.len(), "wrote index records");
    }

    info!(
        doc_id = %doc_id,
        sections = extraction.record.sections.len(),
        headings = extraction.stats.headings,
        citations = extraction.stats.citations,
        recovered = extraction.stats.recovered,
        "extract completed"
    );

    Ok(())
}

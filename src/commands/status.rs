use std::fs;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::ExtractRunManifest;
use crate::store::{ResumeStore, Table};

pub fn run(args: StatusArgs) -> Result<()> {
    if args.manifest_path.exists() {
        let raw = fs::read(&args.manifest_path)
            .with_context(|| format!("failed to read {}", args.manifest_path.display()))?;
        let manifest: ExtractRunManifest = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", args.manifest_path.display()))?;

        info!(
            run_id = %manifest.run_id,
            started_at = %manifest.started_at,
            updated_at = %manifest.updated_at,
            ocr_mode = %manifest.ocr_mode,
            pdf_count = manifest.counts.pdf_count,
            processed = manifest.counts.processed_pdf_count,
            skipped = manifest.counts.skipped_pdf_count,
            text_layer_pages = manifest.counts.text_layer_page_count,
            ocr_pages = manifest.counts.ocr_page_count,
            empty_pages = manifest.counts.empty_page_count,
            warnings = manifest.warnings.len(),
            "loaded extract run manifest"
        );
    } else {
        warn!(path = %args.manifest_path.display(), "extract manifest missing");
    }

    if args.db_path.exists() {
        let store = ResumeStore::new(args.db_path.clone());
        let resumes = store.count_rows(Table::Resumes).unwrap_or(0);
        let skills = store.count_rows(Table::Skills).unwrap_or(0);

        info!(
            path = %args.db_path.display(),
            resumes,
            skills,
            "database status"
        );
    } else {
        warn!(path = %args.db_path.display(), "database file missing");
    }

    Ok(())
}

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::StoreArgs;
use crate::store::ResumeStore;
use crate::util::{file_stem_string, list_files_with_extension};

pub fn run(args: StoreArgs) -> Result<()> {
    let store = ResumeStore::new(args.db_path.clone());
    store
        .initialize()
        .with_context(|| format!("failed to initialize store at {}", args.db_path.display()))?;

    let json_paths = list_files_with_extension(&args.input_dir, "json")?;
    info!(
        json_count = json_paths.len(),
        db_path = %args.db_path.display(),
        "starting store"
    );

    let mut stored = 0usize;
    let mut failed = 0usize;

    for json_path in &json_paths {
        match store_document(&store, json_path) {
            Ok(resume_id) => {
                stored += 1;
                info!(path = %json_path.display(), resume_id, "stored resume");
            }
            Err(err) => {
                failed += 1;
                warn!(path = %json_path.display(), error = %err, "skipping structured file");
            }
        }
    }

    info!(stored, failed, "store completed");
    Ok(())
}

fn store_document(store: &ResumeStore, json_path: &Path) -> Result<i64> {
    let Some(stem) = file_stem_string(json_path) else {
        bail!("could not derive a file stem for {}", json_path.display());
    };

    let raw = fs::read_to_string(json_path)
        .with_context(|| format!("failed to read {}", json_path.display()))?;
    let payload: Value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", json_path.display()))?;

    let resume_id = store.insert_resume(&stem, &payload)?;
    Ok(resume_id)
}

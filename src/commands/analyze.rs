use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::{AnalyzeArgs, AnalyzeEngine};
use crate::heuristics;
use crate::inference::{InferenceConfig, SkillClient};
use crate::model::SkillExtraction;
use crate::util::{ensure_directory, file_stem_string, list_files_with_extension, write_json_pretty};

const API_KEY_ENV: &str = "RESUMATCH_API_KEY";

pub fn run(args: AnalyzeArgs) -> Result<()> {
    ensure_directory(&args.output_dir)?;

    let text_paths = list_files_with_extension(&args.input_dir, "txt")?;
    info!(
        text_count = text_paths.len(),
        engine = args.engine.as_str(),
        "starting analyze"
    );

    let client = match args.engine {
        AnalyzeEngine::Inference => {
            let api_key = resolve_api_key(args.api_key.clone())?;
            let config = InferenceConfig {
                api_endpoint: args.api_endpoint.clone(),
                api_key,
                model_id: args.model_id.clone(),
                temperature: args.temperature,
            };
            Some(SkillClient::new(config).context("failed to build inference client")?)
        }
        AnalyzeEngine::Heuristic => None,
    };

    let mut processed = 0usize;
    let mut failed = 0usize;

    for text_path in &text_paths {
        match analyze_document(text_path, &args.output_dir, client.as_ref()) {
            Ok(skill_count) => {
                processed += 1;
                info!(path = %text_path.display(), skills = skill_count, "analyzed resume text");
            }
            Err(err) => {
                failed += 1;
                warn!(path = %text_path.display(), error = %err, "skipping resume text");
            }
        }
    }

    info!(processed, failed, "analyze completed");
    Ok(())
}

fn analyze_document(
    text_path: &Path,
    output_dir: &Path,
    client: Option<&SkillClient>,
) -> Result<usize> {
    let Some(stem) = file_stem_string(text_path) else {
        bail!("could not derive a file stem for {}", text_path.display());
    };

    let text = fs::read_to_string(text_path)
        .with_context(|| format!("failed to read {}", text_path.display()))?;

    let extraction: SkillExtraction = match client {
        Some(client) => client.extract_skills(&text)?,
        None => heuristics::extract_skills(&text),
    };

    if extraction.skills.is_empty() {
        warn!(path = %text_path.display(), "no skills found for resume");
    }

    let output_path = output_dir.join(format!("{stem}.json"));
    write_json_pretty(&output_path, &extraction)?;

    Ok(extraction.skills.len())
}

fn resolve_api_key(cli_value: Option<String>) -> Result<String> {
    if let Some(key) = cli_value {
        return Ok(key);
    }

    match env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => bail!("no API key provided; pass --api-key or set {API_KEY_ENV}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn heuristic_args(input_dir: PathBuf, output_dir: PathBuf) -> AnalyzeArgs {
        AnalyzeArgs {
            input_dir,
            output_dir,
            engine: AnalyzeEngine::Heuristic,
            api_endpoint: "http://localhost/unused".to_string(),
            api_key: None,
            model_id: "unused".to_string(),
            temperature: 0.1,
        }
    }

    #[test]
    fn heuristic_engine_writes_structured_output() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let input_dir = dir.path().join("texts");
        let output_dir = dir.path().join("structured");
        fs::create_dir_all(&input_dir).expect("input dir");

        fs::write(
            input_dir.join("jane_doe.txt"),
            "Skills:\nPython, Docker\nEducation:\nSomewhere\n",
        )
        .expect("write resume text");

        run(heuristic_args(input_dir, output_dir.clone())).expect("analyze run");

        let raw = fs::read_to_string(output_dir.join("jane_doe.json")).expect("read output");
        let extraction: SkillExtraction = serde_json::from_str(&raw).expect("parse output");
        let names: Vec<_> = extraction
            .skills
            .iter()
            .map(|skill| skill.name.as_str())
            .collect();
        assert!(names.contains(&"python"));
        assert!(names.contains(&"docker"));
    }

    #[test]
    fn non_text_files_are_ignored() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let input_dir = dir.path().join("texts");
        let output_dir = dir.path().join("structured");
        fs::create_dir_all(&input_dir).expect("input dir");
        fs::write(input_dir.join("resume.pdf"), b"%PDF-1.4").expect("write pdf");

        run(heuristic_args(input_dir, output_dir.clone())).expect("analyze run");

        let outputs: Vec<_> = fs::read_dir(&output_dir)
            .expect("read output dir")
            .collect();
        assert!(outputs.is_empty());
    }

    #[test]
    fn api_key_argument_wins_over_environment() {
        let key = resolve_api_key(Some("from-cli".to_string())).expect("resolve");
        assert_eq!(key, "from-cli");
    }
}

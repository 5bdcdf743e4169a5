use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::{ExtractArgs, OcrMode};
use crate::model::{DocumentEntry, ExtractCounts, ExtractRunManifest, ExtractToolVersions};
use crate::util::{
    ensure_directory, file_stem_string, list_files_with_extension, now_utc_string, sha256_file,
    utc_compact_string, write_json_pretty, write_text,
};

const MANIFEST_VERSION: u32 = 1;

/// Tool locations and OCR policy for one extraction run, resolved from the
/// CLI once and passed down explicitly.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub pdftotext_bin: String,
    pub pdftoppm_bin: String,
    pub tesseract_bin: String,
    pub ocr_mode: OcrMode,
    pub ocr_lang: String,
    pub ocr_min_text_chars: usize,
}

impl ExtractionConfig {
    fn from_args(args: &ExtractArgs) -> Self {
        Self {
            pdftotext_bin: args.pdftotext_bin.clone(),
            pdftoppm_bin: args.pdftoppm_bin.clone(),
            tesseract_bin: args.tesseract_bin.clone(),
            ocr_mode: args.ocr_mode,
            ocr_lang: args.ocr_lang.clone(),
            ocr_min_text_chars: args.ocr_min_text_chars,
        }
    }
}

pub fn run(args: ExtractArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let config = ExtractionConfig::from_args(&args);
    let manifest_path = args
        .manifest_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("data/extract_manifest.json"));

    ensure_directory(&args.output_dir)?;

    info!(
        input_dir = %args.input_dir.display(),
        output_dir = %args.output_dir.display(),
        ocr_mode = config.ocr_mode.as_str(),
        run_id = %run_id,
        "starting extract"
    );

    let tool_versions = collect_tool_versions(&config);
    if tool_versions.pdftotext.is_none() {
        bail!("pdftotext is not available (tried `{}`)", config.pdftotext_bin);
    }
    let ocr_available = tool_versions.pdftoppm.is_some() && tool_versions.tesseract.is_some();

    let mut warnings: Vec<String> = Vec::new();
    if config.ocr_mode == OcrMode::Auto && !ocr_available {
        let message = format!(
            "ocr tools unavailable (`{}`, `{}`), sparse pages keep their text layer",
            config.pdftoppm_bin, config.tesseract_bin
        );
        warn!("{message}");
        warnings.push(message);
    }

    let pdf_paths = list_files_with_extension(&args.input_dir, "pdf")?;
    info!(pdf_count = pdf_paths.len(), "found resume PDFs");

    let mut counts = ExtractCounts {
        pdf_count: pdf_paths.len(),
        ..Default::default()
    };
    let mut documents = Vec::new();

    for pdf_path in &pdf_paths {
        match process_document(pdf_path, &args.output_dir, &config, ocr_available, &mut counts) {
            Ok(document) => {
                counts.processed_pdf_count += 1;
                documents.push(document);
            }
            Err(err) => {
                counts.skipped_pdf_count += 1;
                warn!(path = %pdf_path.display(), error = %err, "skipping resume document");
                warnings.push(format!("{}: {err:#}", pdf_path.display()));
            }
        }
    }

    let manifest = ExtractRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id,
        started_at,
        updated_at: now_utc_string(),
        input_dir: args.input_dir.display().to_string(),
        output_dir: args.output_dir.display().to_string(),
        ocr_mode: config.ocr_mode.as_str().to_string(),
        tool_versions,
        counts,
        documents,
        warnings,
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote extract run manifest");
    info!(
        processed = manifest.counts.processed_pdf_count,
        skipped = manifest.counts.skipped_pdf_count,
        ocr_pages = manifest.counts.ocr_page_count,
        "extract completed"
    );

    Ok(())
}

fn process_document(
    pdf_path: &Path,
    output_dir: &Path,
    config: &ExtractionConfig,
    ocr_available: bool,
    counts: &mut ExtractCounts,
) -> Result<DocumentEntry> {
    let Some(stem) = file_stem_string(pdf_path) else {
        bail!("could not derive a file stem for {}", pdf_path.display());
    };

    if config.ocr_mode == OcrMode::Force && !ocr_available {
        bail!(
            "ocr mode is force but `{}` or `{}` is unavailable",
            config.pdftoppm_bin,
            config.tesseract_bin
        );
    }

    let pages = extract_pages_with_pdftotext(&config.pdftotext_bin, pdf_path)?;

    let mut page_texts = Vec::with_capacity(pages.len());
    for (index, page) in pages.iter().enumerate() {
        let page_number = index + 1;
        let native = page.trim();

        let wants_ocr = match config.ocr_mode {
            OcrMode::Off => false,
            OcrMode::Auto => non_whitespace_char_count(native) < config.ocr_min_text_chars,
            OcrMode::Force => true,
        };

        let mut text = native.to_string();
        if wants_ocr && ocr_available {
            let ocr_text = extract_page_with_ocr(config, pdf_path, page_number)?;
            if !ocr_text.is_empty() {
                if text.is_empty() {
                    text = ocr_text;
                } else {
                    text.push('\n');
                    text.push_str(&ocr_text);
                }
            }
            counts.ocr_page_count += 1;
        } else {
            counts.text_layer_page_count += 1;
        }

        if text.trim().is_empty() {
            counts.empty_page_count += 1;
        }
        page_texts.push(text);
    }

    let mut body = page_texts.join("\n\n");
    body.push('\n');

    let output_path = output_dir.join(format!("{stem}.txt"));
    write_text(&output_path, &body)?;

    let sha256 = sha256_file(pdf_path)?;
    let filename = pdf_path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or(&stem)
        .to_string();

    info!(
        path = %output_path.display(),
        pages = pages.len(),
        "extracted resume text"
    );

    Ok(DocumentEntry { filename, sha256 })
}

fn extract_pages_with_pdftotext(pdftotext_bin: &str, pdf_path: &Path) -> Result<Vec<String>> {
    let output = Command::new(pdftotext_bin)
        .arg("-enc")
        .arg("UTF-8")
        .arg(pdf_path)
        .arg("-")
        .output()
        .with_context(|| {
            format!(
                "failed to execute {} for {}",
                pdftotext_bin,
                pdf_path.display()
            )
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{} returned non-zero exit status for {}: {}",
            pdftotext_bin,
            pdf_path.display(),
            stderr.trim()
        );
    }

    Ok(split_raw_pages(&String::from_utf8_lossy(&output.stdout)))
}

/// Pages arrive on stdout separated by form feeds; trailing empty pages are
/// dropped and NUL bytes stripped.
fn split_raw_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while let Some(last_page) = pages.last() {
        if last_page.trim().is_empty() {
            pages.pop();
            continue;
        }
        break;
    }

    pages
}

fn non_whitespace_char_count(text: &str) -> usize {
    text.chars()
        .filter(|character| !character.is_whitespace())
        .count()
}

fn extract_page_with_ocr(
    config: &ExtractionConfig,
    pdf_path: &Path,
    page_number: usize,
) -> Result<String> {
    let pdf_stem = pdf_path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("pdf");
    let safe_stem = pdf_stem
        .chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() {
                character
            } else {
                '_'
            }
        })
        .collect::<String>();

    let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let output_root = std::env::temp_dir().join(format!(
        "resumatch_ocr_{}_{}_{}_{}",
        safe_stem,
        std::process::id(),
        page_number,
        stamp
    ));
    let png_path = PathBuf::from(format!("{}.png", output_root.display()));

    let pdftoppm_output = Command::new(&config.pdftoppm_bin)
        .arg("-f")
        .arg(page_number.to_string())
        .arg("-l")
        .arg(page_number.to_string())
        .arg("-singlefile")
        .arg("-png")
        .arg(pdf_path)
        .arg(&output_root)
        .output()
        .with_context(|| {
            format!(
                "failed to execute {} for {}",
                config.pdftoppm_bin,
                pdf_path.display()
            )
        })?;

    if !pdftoppm_output.status.success() {
        let stderr = String::from_utf8_lossy(&pdftoppm_output.stderr);
        bail!(
            "{} returned non-zero exit status for {} page {}: {}",
            config.pdftoppm_bin,
            pdf_path.display(),
            page_number,
            stderr.trim()
        );
    }

    if !png_path.exists() {
        bail!(
            "{} did not produce expected image for {} page {}",
            config.pdftoppm_bin,
            pdf_path.display(),
            page_number
        );
    }

    let tesseract_output = Command::new(&config.tesseract_bin)
        .arg(&png_path)
        .arg("stdout")
        .arg("-l")
        .arg(&config.ocr_lang)
        .output()
        .with_context(|| {
            format!(
                "failed to execute {} for {}",
                config.tesseract_bin,
                png_path.display()
            )
        })?;

    let _ = fs::remove_file(&png_path);

    if !tesseract_output.status.success() {
        let stderr = String::from_utf8_lossy(&tesseract_output.stderr);
        bail!(
            "{} returned non-zero exit status for {} page {}: {}",
            config.tesseract_bin,
            pdf_path.display(),
            page_number,
            stderr.trim()
        );
    }

    Ok(String::from_utf8_lossy(&tesseract_output.stdout)
        .replace('\u{0000}', "")
        .trim()
        .to_string())
}

fn collect_tool_versions(config: &ExtractionConfig) -> ExtractToolVersions {
    ExtractToolVersions {
        pdftotext: command_version_optional(&config.pdftotext_bin, &["-v"]),
        pdftoppm: command_version_optional(&config.pdftoppm_bin, &["-v"]),
        tesseract: command_version_optional(&config.tesseract_bin, &["--version"]),
    }
}

fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_pages_on_form_feed_and_drops_trailing_empties() {
        let raw = "page one\u{000C}page two\u{000C}\n  \u{000C}";
        let pages = split_raw_pages(raw);
        assert_eq!(pages, vec!["page one".to_string(), "page two".to_string()]);
    }

    #[test]
    fn strips_nul_bytes_from_pages() {
        let raw = "he\u{0000}llo\u{000C}";
        let pages = split_raw_pages(raw);
        assert_eq!(pages, vec!["hello".to_string()]);
    }

    #[test]
    fn keeps_interior_empty_pages() {
        let raw = "first\u{000C}\u{000C}third";
        let pages = split_raw_pages(raw);
        assert_eq!(pages.len(), 3);
        assert!(pages[1].trim().is_empty());
    }

    #[test]
    fn counts_non_whitespace_characters() {
        assert_eq!(non_whitespace_char_count(""), 0);
        assert_eq!(non_whitespace_char_count("  \n\t "), 0);
        assert_eq!(non_whitespace_char_count("a b c"), 3);
    }
}

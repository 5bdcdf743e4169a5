use serde::{Deserialize, Serialize};

/// One `{type, name}` pair produced by skill extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEntry {
    #[serde(rename = "type")]
    pub skill_type: String,
    pub name: String,
}

/// Structured payload written per resume by the analyze stage, shape
/// `{"skills": [{"type": ..., "name": ...}, ...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillExtraction {
    #[serde(default)]
    pub skills: Vec<SkillEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub filename: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractToolVersions {
    pub pdftotext: Option<String>,
    pub pdftoppm: Option<String>,
    pub tesseract: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractCounts {
    pub pdf_count: usize,
    pub processed_pdf_count: usize,
    pub skipped_pdf_count: usize,
    pub text_layer_page_count: usize,
    pub ocr_page_count: usize,
    pub empty_page_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub updated_at: String,
    pub input_dir: String,
    pub output_dir: String,
    pub ocr_mode: String,
    pub tool_versions: ExtractToolVersions,
    pub counts: ExtractCounts,
    pub documents: Vec<DocumentEntry>,
    pub warnings: Vec<String>,
}

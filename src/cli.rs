use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "resumatch",
    version,
    about = "Resume skill extraction and job-match feedback pipeline"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract plain text from resume PDFs, with OCR fallback for sparse pages
    Extract(ExtractArgs),
    /// Turn extracted text into structured skill lists
    Analyze(AnalyzeArgs),
    /// Load structured skill files into the resume store
    Store(StoreArgs),
    /// Generate job-match feedback and rankings from the store
    Feedback(FeedbackArgs),
    /// Report pipeline artifact and store state
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long, default_value = "data/resumes")]
    pub input_dir: PathBuf,

    #[arg(long, default_value = "data/texts")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OcrMode::Auto)]
    pub ocr_mode: OcrMode,

    #[arg(long, default_value = "eng")]
    pub ocr_lang: String,

    #[arg(long, default_value_t = 120)]
    pub ocr_min_text_chars: usize,

    #[arg(long, default_value = "pdftotext")]
    pub pdftotext_bin: String,

    #[arg(long, default_value = "pdftoppm")]
    pub pdftoppm_bin: String,

    #[arg(long, default_value = "tesseract")]
    pub tesseract_bin: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OcrMode {
    Off,
    Auto,
    Force,
}

impl OcrMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Auto => "auto",
            Self::Force => "force",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum AnalyzeEngine {
    Inference,
    Heuristic,
}

impl AnalyzeEngine {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inference => "inference",
            Self::Heuristic => "heuristic",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(long, default_value = "data/texts")]
    pub input_dir: PathBuf,

    #[arg(long, default_value = "data/structured")]
    pub output_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = AnalyzeEngine::Inference)]
    pub engine: AnalyzeEngine,

    #[arg(long, default_value = "https://api.groq.com/openai/v1/chat/completions")]
    pub api_endpoint: String,

    /// API key for the inference endpoint; falls back to RESUMATCH_API_KEY
    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long, default_value = "llama3-8b-8192")]
    pub model_id: String,

    #[arg(long, default_value_t = 0.1)]
    pub temperature: f32,
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, default_value = "data/structured")]
    pub input_dir: PathBuf,

    #[arg(long, default_value = "data/resumatch.sqlite")]
    pub db_path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct FeedbackArgs {
    #[arg(long, default_value = "data/resumatch.sqlite")]
    pub db_path: PathBuf,

    #[arg(long, default_value = "data/job_description.txt")]
    pub job_description: PathBuf,

    #[arg(long, default_value = "data/feedback")]
    pub output_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "data/resumatch.sqlite")]
    pub db_path: PathBuf,

    #[arg(long, default_value = "data/extract_manifest.json")]
    pub manifest_path: PathBuf,
}

use std::cmp::Ordering;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::warn;

/// Job keywords loaded from the job-description file: one phrase per line,
/// lower-cased and trimmed, empty lines dropped, duplicates collapsed to the
/// first occurrence. Matching treats the set as unordered; first-occurrence
/// order is kept so reports stay deterministic.
#[derive(Debug, Clone, Default)]
pub struct JobKeywords {
    keywords: Vec<String>,
}

impl JobKeywords {
    /// Reads the keyword file. An unreadable file yields an empty keyword
    /// set (every ranking becomes 0) rather than aborting the run.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_lines(&content),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "job description unreadable; rankings will be 0"
                );
                Self::default()
            }
        }
    }

    pub fn from_lines(content: &str) -> Self {
        let mut keywords: Vec<String> = Vec::new();

        for line in content.lines() {
            let keyword = line.trim().to_lowercase();
            if keyword.is_empty() || keywords.iter().any(|existing| existing == &keyword) {
                continue;
            }
            keywords.push(keyword);
        }

        Self { keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }
}

/// Result of matching one resume's skills against the job keywords.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub skills: Vec<String>,
    pub matched_skills: Vec<String>,
    pub matched_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub ranking: f64,
}

/// Matching direction: a skill matches a keyword iff the lower-cased skill
/// name contains the keyword as a substring. A skill short-circuits on its
/// first matching keyword; a keyword counts as matched if any skill contains
/// it. Ranking is distinct matched keywords over distinct keywords, or 0
/// when no keywords were provided.
pub fn evaluate(keywords: &JobKeywords, skills: &[String]) -> MatchOutcome {
    let lowered: Vec<String> = skills.iter().map(|skill| skill.to_lowercase()).collect();

    let mut matched_skills = Vec::new();
    for (skill, lower) in skills.iter().zip(&lowered) {
        if keywords
            .keywords
            .iter()
            .any(|keyword| lower.contains(keyword.as_str()))
        {
            matched_skills.push(skill.clone());
        }
    }

    let mut matched_keywords = Vec::new();
    let mut missing_keywords = Vec::new();
    for keyword in &keywords.keywords {
        if lowered.iter().any(|lower| lower.contains(keyword.as_str())) {
            matched_keywords.push(keyword.clone());
        } else {
            missing_keywords.push(keyword.clone());
        }
    }

    let ranking = if keywords.keywords.is_empty() {
        0.0
    } else {
        matched_keywords.len() as f64 / keywords.keywords.len() as f64 * 100.0
    };

    MatchOutcome {
        skills: skills.to_vec(),
        matched_skills,
        matched_keywords,
        missing_keywords,
        ranking,
    }
}

/// Renders the per-resume feedback report. The output is fully determined
/// by its inputs so reruns over unchanged data are byte-identical.
pub fn render_report(resume_name: &str, keywords: &JobKeywords, outcome: &MatchOutcome) -> String {
    let mut report = String::new();

    let _ = writeln!(report, "Resume Feedback for {resume_name}");
    let _ = writeln!(report, "{}", "=".repeat(50));
    report.push('\n');

    let _ = writeln!(report, "Skills Analysis");
    let _ = writeln!(report, "{}", "-".repeat(20));
    let _ = writeln!(report, "Total skills found: {}", outcome.skills.len());
    let _ = writeln!(report, "Skills: {}", outcome.skills.join(", "));
    report.push('\n');

    let _ = writeln!(report, "Job Match Analysis");
    let _ = writeln!(report, "{}", "-".repeat(20));
    if keywords.is_empty() {
        let _ = writeln!(report, "No job keywords provided for ranking.");
    }
    let _ = writeln!(
        report,
        "Matched job skills ({}):",
        outcome.matched_skills.len()
    );
    let _ = writeln!(report, "{}", join_or_none(&outcome.matched_skills));
    report.push('\n');

    let _ = writeln!(report, "Missing Critical Skills:");
    let _ = writeln!(report, "{}", join_or_none(&outcome.missing_keywords));
    report.push('\n');

    let _ = writeln!(report, "Recommendations:");
    let _ = writeln!(report, "{}", "-".repeat(20));
    if !outcome.missing_keywords.is_empty() {
        let _ = writeln!(
            report,
            "1. Consider adding these relevant skills if you have experience with them:"
        );
        let _ = writeln!(report, "   {}", outcome.missing_keywords.join(", "));
    }
    let _ = writeln!(
        report,
        "2. Make sure your skills are clearly stated in your resume"
    );
    let _ = writeln!(
        report,
        "3. Use industry-standard terminology for technical skills"
    );
    report.push('\n');

    let _ = writeln!(report, "Overall Match Score: {:.2}%", outcome.ranking);

    report
}

#[derive(Debug, Clone)]
pub struct RankingEntry {
    pub resume_name: String,
    pub ranking: f64,
}

/// Sorts rankings descending. The sort is stable, so resumes with equal
/// rankings keep their fetch order.
pub fn sort_rankings(entries: &mut [RankingEntry]) {
    entries.sort_by(|a, b| {
        b.ranking
            .partial_cmp(&a.ranking)
            .unwrap_or(Ordering::Equal)
    });
}

pub fn render_summary(entries: &[RankingEntry]) -> String {
    let mut summary = String::new();

    let _ = writeln!(summary, "Resume Rankings:");
    let _ = writeln!(summary, "{}", "-".repeat(50));
    for entry in entries {
        let _ = writeln!(summary, "{}: {:.2}%", entry.resume_name, entry.ranking);
    }

    summary
}

fn join_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "None".to_string()
    } else {
        values.join(", ")
    }
}

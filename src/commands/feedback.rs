use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::FeedbackArgs;
use crate::matching::{self, JobKeywords, RankingEntry};
use crate::store::ResumeStore;
use crate::util::{ensure_directory, write_text};

pub fn run(args: FeedbackArgs) -> Result<()> {
    let store = ResumeStore::new(args.db_path.clone());
    store
        .initialize()
        .with_context(|| format!("failed to open store at {}", args.db_path.display()))?;

    let keywords = JobKeywords::load(&args.job_description);
    ensure_directory(&args.output_dir)?;

    let resume_ids = store
        .fetch_all_ids()
        .context("failed to list stored resumes")?;
    info!(
        resume_count = resume_ids.len(),
        keyword_count = keywords.len(),
        "starting feedback"
    );

    let mut rankings: Vec<RankingEntry> = Vec::with_capacity(resume_ids.len());

    for resume_id in resume_ids {
        let resume = match store.fetch_resume(resume_id) {
            Ok(resume) => resume,
            Err(err) => {
                warn!(resume_id, error = %err, "failed to load resume, recording zero ranking");
                rankings.push(RankingEntry {
                    resume_name: format!("resume-{resume_id}"),
                    ranking: 0.0,
                });
                continue;
            }
        };

        let outcome = matching::evaluate(&keywords, &resume.skill_names());
        let report = matching::render_report(&resume.resume_name, &keywords, &outcome);

        if let Err(err) = store.update_feedback(resume_id, &report) {
            warn!(resume_id, error = %err, "failed to persist feedback to store");
        }

        let report_path = args
            .output_dir
            .join(format!("{}_feedback.txt", resume.resume_name));
        write_text(&report_path, &report)?;

        info!(
            resume = %resume.resume_name,
            ranking = outcome.ranking,
            "generated feedback"
        );

        rankings.push(RankingEntry {
            resume_name: resume.resume_name,
            ranking: outcome.ranking,
        });
    }

    matching::sort_rankings(&mut rankings);
    let summary = matching::render_summary(&rankings);
    let summary_path = args.output_dir.join("summary_rankings.txt");
    write_text(&summary_path, &summary)?;

    info!(path = %summary_path.display(), "wrote ranking summary");
    Ok(())
}

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{SkillEntry, SkillExtraction};

/// Resume section headings that introduce a block of skill listings.
const SECTION_HEADERS: &[&str] = &[
    "skills",
    "technical skills",
    "core competencies",
    "technologies",
    "technical expertise",
    "competencies",
    "programming",
    "languages",
    "tools",
    "software",
];

/// Terms that count as skills even when they appear outside a skills section,
/// and that classify as `technical` when extracted.
const COMMON_SKILLS: &[&str] = &[
    "python",
    "java",
    "javascript",
    "html",
    "css",
    "sql",
    "react",
    "angular",
    "node",
    "docker",
    "aws",
    "azure",
    "git",
    "linux",
    "agile",
    "scrum",
    "ci/cd",
];

fn separator_regex() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"[,|•\t;]|\s+").expect("valid separator regex"))
}

/// Offline skill scanner used when no inference endpoint is available.
///
/// Walks the text line by line tracking whether the cursor is inside a skills
/// section. Tokens are harvested from section lines and from any line that
/// mentions a known common-skill term, split on list separators, deduplicated
/// case-insensitively in first-seen order.
pub fn extract_skills(content: &str) -> SkillExtraction {
    let mut seen: Vec<String> = Vec::new();
    let mut in_skills_section = false;

    for raw_line in content.lines() {
        let line = raw_line.trim();
        let lowered = line.to_lowercase();

        if SECTION_HEADERS
            .iter()
            .any(|header| lowered.contains(header))
        {
            in_skills_section = true;
            continue;
        }

        // A heading for some other section ends the skills block.
        if in_skills_section && !line.is_empty() && line.ends_with(':') {
            in_skills_section = false;
        }

        let mentions_common_skill = COMMON_SKILLS.iter().any(|skill| lowered.contains(skill));
        if !in_skills_section && !mentions_common_skill {
            continue;
        }

        for token in separator_regex().split(&lowered) {
            let token = token.trim();
            if token.len() <= 1 {
                continue;
            }
            if !seen.iter().any(|existing| existing == token) {
                seen.push(token.to_owned());
            }
        }
    }

    let skills = seen
        .into_iter()
        .map(|name| {
            let skill_type = if COMMON_SKILLS.contains(&name.as_str()) {
                "technical"
            } else {
                "general"
            };
            SkillEntry {
                skill_type: skill_type.to_owned(),
                name,
            }
        })
        .collect();

    SkillExtraction { skills }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(extraction: &SkillExtraction) -> Vec<&str> {
        extraction
            .skills
            .iter()
            .map(|skill| skill.name.as_str())
            .collect()
    }

    #[test]
    fn harvests_tokens_inside_a_skills_section() {
        let resume = "Experience\nBuilt things.\n\nTechnical Skills:\nPython, Rust, Kubernetes\n";
        let extraction = extract_skills(resume);
        assert_eq!(names(&extraction), vec!["python", "rust", "kubernetes"]);
    }

    #[test]
    fn section_ends_at_next_heading() {
        let resume = "Skills:\nPython, Docker\nEducation:\nSome University\n";
        let extraction = extract_skills(resume);
        let found = names(&extraction);
        assert!(found.contains(&"python"));
        assert!(found.contains(&"docker"));
        assert!(!found.contains(&"some"));
        assert!(!found.contains(&"university"));
    }

    #[test]
    fn common_skill_mentions_count_outside_sections() {
        let resume = "Summary\nShipped a Docker based deployment pipeline.\n";
        let extraction = extract_skills(resume);
        let found = names(&extraction);
        assert!(found.contains(&"docker"));
        assert!(found.contains(&"deployment"));
    }

    #[test]
    fn plain_prose_yields_nothing() {
        let resume = "Objective\nSeeking a challenging role.\n";
        let extraction = extract_skills(resume);
        assert!(extraction.skills.is_empty());
    }

    #[test]
    fn tokens_are_deduplicated_case_insensitively() {
        let resume = "Skills:\nPython, python, PYTHON\n";
        let extraction = extract_skills(resume);
        assert_eq!(names(&extraction), vec!["python"]);
    }

    #[test]
    fn single_character_tokens_are_dropped() {
        let resume = "Skills:\nC, Go, R\n";
        let extraction = extract_skills(resume);
        assert_eq!(names(&extraction), vec!["go"]);
    }

    #[test]
    fn splits_on_bullets_pipes_and_semicolons() {
        let resume = "Skills:\nreact | angular • node; sql\n";
        let extraction = extract_skills(resume);
        assert_eq!(names(&extraction), vec!["react", "angular", "node", "sql"]);
    }

    #[test]
    fn classifies_known_terms_as_technical_and_rest_as_general() {
        let resume = "Skills:\nPython, Negotiation\n";
        let extraction = extract_skills(resume);
        assert_eq!(extraction.skills.len(), 2);
        assert_eq!(extraction.skills[0].name, "python");
        assert_eq!(extraction.skills[0].skill_type, "technical");
        assert_eq!(extraction.skills[1].name, "negotiation");
        assert_eq!(extraction.skills[1].skill_type, "general");
    }

    #[test]
    fn header_detection_is_case_insensitive() {
        let resume = "CORE COMPETENCIES\nleadership, mentoring\n";
        let extraction = extract_skills(resume);
        assert_eq!(names(&extraction), vec!["leadership", "mentoring"]);
    }
}

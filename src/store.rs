use std::collections::BTreeMap;
use std::path::PathBuf;

use rusqlite::{Connection, params};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to prepare database directory {path}: {source}")]
    DatabaseDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("resume id {0} not found")]
    ResumeNotFound(i64),
}

/// SQLite-backed store for resumes and their extracted skills. Every
/// operation opens its own connection; the store assumes a single writer
/// per run.
pub struct ResumeStore {
    db_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SkillRecord {
    pub skill_type: String,
    pub skill_name: String,
}

#[derive(Debug, Clone)]
pub struct StoredResume {
    pub id: i64,
    pub resume_name: String,
    pub structured_data: String,
    pub feedback: String,
    /// Skills in insertion order.
    pub skills: Vec<SkillRecord>,
}

impl StoredResume {
    pub fn skill_names(&self) -> Vec<String> {
        self.skills
            .iter()
            .map(|skill| skill.skill_name.clone())
            .collect()
    }

    pub fn skills_by_type(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for skill in &self.skills {
            grouped
                .entry(skill.skill_type.clone())
                .or_default()
                .push(skill.skill_name.clone());
        }
        grouped
    }
}

impl ResumeStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let connection = Connection::open(&self.db_path)?;
        connection.pragma_update(None, "journal_mode", "WAL")?;
        connection.pragma_update(None, "synchronous", "NORMAL")?;
        connection.pragma_update(None, "foreign_keys", "ON")?;
        Ok(connection)
    }

    /// Idempotently creates both tables and the skills index. Never drops
    /// or alters existing tables.
    pub fn initialize(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::DatabaseDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let connection = self.connect()?;
        connection.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS resumes (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              resume_name TEXT NOT NULL,
              structured_data TEXT NOT NULL,
              feedback TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS skills (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              resume_id INTEGER NOT NULL REFERENCES resumes(id),
              skill_type TEXT NOT NULL,
              skill_name TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_skills_resume ON skills(resume_id);
            ",
        )?;

        Ok(())
    }

    /// Inserts one resume and every valid skill entry of its structured
    /// payload in a single transaction. Prior rows with the same display
    /// name are replaced, so re-running the store stage does not accumulate
    /// duplicate skill rows. A skill entry missing `type` or `name` is
    /// skipped with a warning; sibling entries are still inserted.
    pub fn insert_resume(&self, resume_name: &str, payload: &Value) -> Result<i64, StoreError> {
        let structured_data = payload.to_string();
        let empty = Vec::new();
        let skill_entries = payload
            .get("skills")
            .and_then(Value::as_array)
            .unwrap_or(&empty);

        let mut connection = self.connect()?;
        let tx = connection.transaction()?;

        tx.execute(
            "DELETE FROM skills WHERE resume_id IN (SELECT id FROM resumes WHERE resume_name = ?1)",
            params![resume_name],
        )?;
        let replaced = tx.execute(
            "DELETE FROM resumes WHERE resume_name = ?1",
            params![resume_name],
        )?;
        if replaced > 0 {
            info!(resume = resume_name, "replacing previously stored resume");
        }

        tx.execute(
            "INSERT INTO resumes(resume_name, structured_data, feedback) VALUES(?1, ?2, ?3)",
            params![resume_name, structured_data, ""],
        )?;
        let resume_id = tx.last_insert_rowid();

        {
            let mut statement = tx.prepare(
                "INSERT INTO skills(resume_id, skill_type, skill_name) VALUES(?1, ?2, ?3)",
            )?;

            for entry in skill_entries {
                match parse_skill_fields(entry) {
                    Some((skill_type, skill_name)) => {
                        statement.execute(params![resume_id, skill_type, skill_name])?;
                    }
                    None => {
                        warn!(
                            resume = resume_name,
                            entry = %entry,
                            "skipping skill entry without type and name"
                        );
                    }
                }
            }
        }

        tx.commit()?;
        Ok(resume_id)
    }

    pub fn fetch_all_ids(&self) -> Result<Vec<i64>, StoreError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare("SELECT id FROM resumes ORDER BY id")?;
        let ids = statement
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    pub fn fetch_resume(&self, resume_id: i64) -> Result<StoredResume, StoreError> {
        let connection = self.connect()?;

        let (resume_name, structured_data, feedback) = connection
            .query_row(
                "SELECT resume_name, structured_data, feedback FROM resumes WHERE id = ?1",
                params![resume_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .map_err(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => StoreError::ResumeNotFound(resume_id),
                other => StoreError::Sqlite(other),
            })?;

        let mut statement = connection.prepare(
            "SELECT skill_type, skill_name FROM skills WHERE resume_id = ?1 ORDER BY id",
        )?;
        let skills = statement
            .query_map(params![resume_id], |row| {
                Ok(SkillRecord {
                    skill_type: row.get(0)?,
                    skill_name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StoredResume {
            id: resume_id,
            resume_name,
            structured_data,
            feedback,
            skills,
        })
    }

    /// Persists the rendered feedback report onto the resume row; the text
    /// file written by the feedback stage is a derived export of this value.
    pub fn update_feedback(&self, resume_id: i64, feedback: &str) -> Result<(), StoreError> {
        let connection = self.connect()?;
        let updated = connection.execute(
            "UPDATE resumes SET feedback = ?1 WHERE id = ?2",
            params![feedback, resume_id],
        )?;

        if updated == 0 {
            return Err(StoreError::ResumeNotFound(resume_id));
        }
        Ok(())
    }

    pub fn count_rows(&self, table: Table) -> Result<i64, StoreError> {
        let connection = self.connect()?;
        let count = connection.query_row(table.count_sql(), [], |row| row.get(0))?;
        Ok(count)
    }
}

#[derive(Copy, Clone, Debug)]
pub enum Table {
    Resumes,
    Skills,
}

impl Table {
    fn count_sql(self) -> &'static str {
        match self {
            Self::Resumes => "SELECT COUNT(*) FROM resumes",
            Self::Skills => "SELECT COUNT(*) FROM skills",
        }
    }
}

fn parse_skill_fields(entry: &Value) -> Option<(&str, &str)> {
    let skill_type = entry.get("type")?.as_str()?;
    let skill_name = entry.get("name")?.as_str()?;
    Some((skill_type, skill_name))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn test_store(dir: &TempDir) -> ResumeStore {
        let store = ResumeStore::new(dir.path().join("resumatch.sqlite"));
        store.initialize().expect("initialize store");
        store
    }

    #[test]
    fn initialize_is_idempotent_and_preserves_rows() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let payload = json!({"skills": [{"type": "technical", "name": "Rust"}]});
        store.insert_resume("jane", &payload).unwrap();

        store.initialize().unwrap();
        assert_eq!(store.count_rows(Table::Resumes).unwrap(), 1);
        assert_eq!(store.count_rows(Table::Skills).unwrap(), 1);
    }

    #[test]
    fn insert_and_fetch_round_trips_skills_in_order() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let payload = json!({"skills": [
            {"type": "technical", "name": "Python"},
            {"type": "soft", "name": "Leadership"},
            {"type": "technical", "name": "Docker"},
        ]});
        let id = store.insert_resume("jane_doe", &payload).unwrap();

        let resume = store.fetch_resume(id).unwrap();
        assert_eq!(resume.resume_name, "jane_doe");
        assert_eq!(resume.skill_names(), vec!["Python", "Leadership", "Docker"]);
        assert_eq!(resume.feedback, "");

        let grouped = resume.skills_by_type();
        assert_eq!(grouped["technical"], vec!["Python", "Docker"]);
        assert_eq!(grouped["soft"], vec!["Leadership"]);
    }

    #[test]
    fn skill_entry_missing_name_is_skipped_but_siblings_survive() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let payload = json!({"skills": [
            {"type": "technical"},
            {"type": "technical", "name": "Python"},
            {"name": "Orphan"},
            "not-an-object",
        ]});
        let id = store.insert_resume("partial", &payload).unwrap();

        let resume = store.fetch_resume(id).unwrap();
        assert_eq!(resume.skill_names(), vec!["Python"]);
    }

    #[test]
    fn payload_without_skills_key_inserts_resume_with_no_skills() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let id = store.insert_resume("bare", &json!({})).unwrap();
        let resume = store.fetch_resume(id).unwrap();
        assert!(resume.skills.is_empty());
    }

    #[test]
    fn reinserting_same_name_replaces_rather_than_duplicates() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let first = json!({"skills": [{"type": "technical", "name": "Python"}]});
        let second = json!({"skills": [{"type": "technical", "name": "Rust"}]});
        store.insert_resume("jane", &first).unwrap();
        let id = store.insert_resume("jane", &second).unwrap();

        assert_eq!(store.fetch_all_ids().unwrap(), vec![id]);
        assert_eq!(store.count_rows(Table::Skills).unwrap(), 1);
        assert_eq!(store.fetch_resume(id).unwrap().skill_names(), vec!["Rust"]);
    }

    #[test]
    fn update_feedback_persists_report_text() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let id = store.insert_resume("jane", &json!({"skills": []})).unwrap();
        store.update_feedback(id, "Overall Match Score: 50.00%").unwrap();

        let resume = store.fetch_resume(id).unwrap();
        assert_eq!(resume.feedback, "Overall Match Score: 50.00%");
    }

    #[test]
    fn missing_resume_id_yields_typed_not_found() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        match store.fetch_resume(42) {
            Err(StoreError::ResumeNotFound(42)) => {}
            other => panic!("expected ResumeNotFound, got {other:?}"),
        }
        match store.update_feedback(42, "x") {
            Err(StoreError::ResumeNotFound(42)) => {}
            other => panic!("expected ResumeNotFound, got {other:?}"),
        }
    }
}

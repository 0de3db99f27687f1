//! SQLite-based completion storage and statistics.
//!
//! Provides persistent storage for:
//! - Finished exercise sessions (completion records)
//! - Aggregate statistics per exercise or overall

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, DatabaseError};
use crate::report::{accuracy_percentage, CompletionReport, CompletionSink, ExerciseCompletionRecord};
use crate::trial::ExerciseKind;

use super::data_dir;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CompletionStats {
    pub sessions: u64,
    pub total_score: u64,
    pub total_questions: u64,
    pub average_accuracy: f64,
    pub best_score: u32,
    pub last_played: Option<DateTime<Utc>>,
}

/// SQLite database for completion records.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/neurotrial/neurotrial.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("neurotrial.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS completions (
                    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                    exercise_id         TEXT NOT NULL,
                    exercise_type       TEXT NOT NULL,
                    section_id          TEXT,
                    score               INTEGER NOT NULL,
                    total_questions     INTEGER NOT NULL,
                    duration_seconds    INTEGER NOT NULL,
                    accuracy_percentage REAL NOT NULL,
                    notes               TEXT,
                    created_at          TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_completions_exercise ON completions(exercise_id);
                CREATE INDEX IF NOT EXISTS idx_completions_created_at ON completions(created_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Store a finished session. Accuracy and timestamp are filled in here.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_completion(
        &self,
        report: &CompletionReport,
    ) -> Result<ExerciseCompletionRecord, rusqlite::Error> {
        let accuracy = accuracy_percentage(report.score, report.total_questions);
        let timestamp = Utc::now();
        self.conn.execute(
            "INSERT INTO completions (exercise_id, exercise_type, section_id, score,
                total_questions, duration_seconds, accuracy_percentage, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                report.exercise_id,
                report.exercise_type,
                report.section_id,
                report.score,
                report.total_questions,
                report.duration_seconds as i64,
                accuracy,
                report.notes,
                timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;

        Ok(ExerciseCompletionRecord {
            id: self.conn.last_insert_rowid(),
            exercise_id: report.exercise_id.clone(),
            exercise_type: report.exercise_type.clone(),
            section_id: report.section_id.clone(),
            score: report.score,
            total_questions: report.total_questions,
            duration_seconds: report.duration_seconds,
            accuracy_percentage: accuracy,
            notes: report.notes.clone(),
            timestamp,
        })
    }

    /// Newest first.
    pub fn list_completions(
        &self,
        exercise: Option<ExerciseKind>,
        limit: usize,
    ) -> Result<Vec<ExerciseCompletionRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, exercise_id, exercise_type, section_id, score, total_questions,
                    duration_seconds, accuracy_percentage, notes, created_at
             FROM completions
             WHERE ?1 IS NULL OR exercise_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(
            params![exercise.map(|k| k.id()), limit as i64],
            row_to_record,
        )?;
        rows.collect()
    }

    pub fn stats(&self, exercise: Option<ExerciseKind>) -> Result<CompletionStats, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT COUNT(*), COALESCE(SUM(score), 0), COALESCE(SUM(total_questions), 0),
                    COALESCE(AVG(accuracy_percentage), 0.0), COALESCE(MAX(score), 0),
                    MAX(created_at)
             FROM completions
             WHERE ?1 IS NULL OR exercise_id = ?1",
        )?;
        stmt.query_row(params![exercise.map(|k| k.id())], |row| {
            let last_played: Option<String> = row.get(5)?;
            Ok(CompletionStats {
                sessions: row.get::<_, i64>(0)? as u64,
                total_score: row.get::<_, i64>(1)? as u64,
                total_questions: row.get::<_, i64>(2)? as u64,
                average_accuracy: row.get(3)?,
                best_score: row.get(4)?,
                last_played: last_played
                    .map(|s| parse_timestamp(5, &s))
                    .transpose()?,
            })
        })
    }
}

impl CompletionSink for Database {
    fn save_completion(&self, report: &CompletionReport) -> Result<ExerciseCompletionRecord, CoreError> {
        Ok(self.record_completion(report).map_err(DatabaseError::from)?)
    }
}

fn row_to_record(row: &Row<'_>) -> Result<ExerciseCompletionRecord, rusqlite::Error> {
    let created_at: String = row.get(9)?;
    Ok(ExerciseCompletionRecord {
        id: row.get(0)?,
        exercise_id: row.get(1)?,
        exercise_type: row.get(2)?,
        section_id: row.get(3)?,
        score: row.get(4)?,
        total_questions: row.get(5)?,
        duration_seconds: row.get::<_, i64>(6)? as u64,
        accuracy_percentage: row.get(7)?,
        notes: row.get(8)?,
        timestamp: parse_timestamp(9, &created_at)?,
    })
}

fn parse_timestamp(column: usize, value: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        })
}

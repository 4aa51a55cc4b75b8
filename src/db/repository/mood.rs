use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::MoodEntry;

use super::{parse_ts, ts};

const MOOD_COLUMNS: &str =
    "id, patient_id, mood, score, emoji, note, triggers, activities, created_at";

pub fn insert_mood(conn: &Connection, entry: &MoodEntry) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO moods (id, patient_id, mood, score, emoji, note, triggers, activities, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            entry.id.to_string(),
            entry.patient_id.to_string(),
            entry.mood,
            entry.score,
            entry.emoji,
            entry.note,
            json_list(&entry.triggers),
            json_list(&entry.activities),
            ts(entry.created_at),
        ],
    )?;
    Ok(())
}

/// Newest entries first, capped at `limit`.
pub fn list_moods_for_patient(
    conn: &Connection,
    patient_id: Uuid,
    limit: u32,
) -> Result<Vec<MoodEntry>, DatabaseError> {
    let sql = format!(
        "SELECT {MOOD_COLUMNS} FROM moods
         WHERE patient_id = ?1
         ORDER BY created_at DESC, rowid DESC
         LIMIT {limit}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_id.to_string()], read_mood_row)?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row_to_mood(row?)?);
    }
    Ok(entries)
}

fn json_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".into())
}

struct MoodRow {
    id: String,
    patient_id: String,
    mood: String,
    score: Option<i64>,
    emoji: Option<String>,
    note: Option<String>,
    triggers: Option<String>,
    activities: Option<String>,
    created_at: String,
}

fn read_mood_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MoodRow> {
    Ok(MoodRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        mood: row.get(2)?,
        score: row.get(3)?,
        emoji: row.get(4)?,
        note: row.get(5)?,
        triggers: row.get(6)?,
        activities: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn row_to_mood(row: MoodRow) -> Result<MoodEntry, DatabaseError> {
    let parse_id = |s: &str| {
        Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
    };
    Ok(MoodEntry {
        id: parse_id(&row.id)?,
        patient_id: parse_id(&row.patient_id)?,
        mood: row.mood,
        score: row.score,
        emoji: row.emoji,
        note: row.note,
        triggers: row
            .triggers
            .map(|s| serde_json::from_str(&s).unwrap_or_default())
            .unwrap_or_default(),
        activities: row
            .activities
            .map(|s| serde_json::from_str(&s).unwrap_or_default())
            .unwrap_or_default(),
        created_at: parse_ts(&row.created_at)?,
    })
}

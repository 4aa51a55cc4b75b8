use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A patient-authored self-report. Append-only: entries are never
/// mutated or deleted after creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub id: Uuid,
    #[serde(rename = "patient")]
    pub patient_id: Uuid,
    pub mood: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub activities: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Mean score over the entries from the trailing 7 days before `now`,
/// rounded to one decimal. Unset scores count as 5. None if no entry
/// falls in the window. Computed at read time, never persisted.
pub fn weekly_average(entries: &[MoodEntry], now: DateTime<Utc>) -> Option<f64> {
    let week_ago = now - Duration::days(7);
    let recent: Vec<i64> = entries
        .iter()
        .filter(|e| e.created_at >= week_ago)
        .map(|e| e.score.unwrap_or(5))
        .collect();
    if recent.is_empty() {
        return None;
    }
    let mean = recent.iter().sum::<i64>() as f64 / recent.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

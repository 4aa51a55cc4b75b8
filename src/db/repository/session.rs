use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{
    RiskLevel, Session, SessionNotes, SessionStatus, SessionType, SessionView,
};

use super::assignment::cached_user;
use super::{parse_ts, ts};

const SESSION_COLUMNS: &str = "id, patient_id, therapist_id, assignment_id, date, duration, \
     session_type, therapy, module, status, location, \
     notes_summary, notes_mood, notes_next_steps, notes_homework, notes_risk_level, \
     rating, created_at, updated_at";

pub fn insert_session(conn: &Connection, session: &Session) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO sessions (id, patient_id, therapist_id, assignment_id, date, duration,
            session_type, therapy, module, status, location,
            notes_summary, notes_mood, notes_next_steps, notes_homework, notes_risk_level,
            rating, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                 ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            session.id.to_string(),
            session.patient_id.to_string(),
            session.therapist_id.to_string(),
            session.assignment_id.map(|a| a.to_string()),
            ts(session.date),
            session.duration,
            session.session_type.as_str(),
            session.therapy,
            session.module,
            session.status.as_str(),
            session.location,
            session.notes.summary,
            session.notes.mood,
            session.notes.next_steps,
            session.notes.homework,
            session.notes.risk_level.as_str(),
            session.rating,
            ts(session.created_at),
            ts(session.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_session(conn: &Connection, id: Uuid) -> Result<Option<Session>, DatabaseError> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row(params![id.to_string()], read_session_row) {
        Ok(row) => Ok(Some(row_to_session(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Composable listing filter. `until` is exclusive so a day window is
/// `[start, start + 86_399_999ms)`; stored timestamps are fixed-width
/// RFC 3339, which makes string comparison chronological.
#[derive(Debug, Default)]
pub struct SessionFilter {
    pub patient_id: Option<Uuid>,
    pub therapist_id: Option<Uuid>,
    pub status: Option<SessionStatus>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub newest_first: bool,
    pub limit: Option<u32>,
}

fn filter_sql(filter: &SessionFilter) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
    let mut sql = String::from(" WHERE 1=1");
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(id) = filter.patient_id {
        params_vec.push(Box::new(id.to_string()));
        sql.push_str(&format!(" AND patient_id = ?{}", params_vec.len()));
    }
    if let Some(id) = filter.therapist_id {
        params_vec.push(Box::new(id.to_string()));
        sql.push_str(&format!(" AND therapist_id = ?{}", params_vec.len()));
    }
    if let Some(status) = filter.status {
        params_vec.push(Box::new(status.as_str()));
        sql.push_str(&format!(" AND status = ?{}", params_vec.len()));
    }
    if let Some(from) = filter.from {
        params_vec.push(Box::new(ts(from)));
        sql.push_str(&format!(" AND date >= ?{}", params_vec.len()));
    }
    if let Some(until) = filter.until {
        params_vec.push(Box::new(ts(until)));
        sql.push_str(&format!(" AND date < ?{}", params_vec.len()));
    }

    (sql, params_vec)
}

pub fn list_sessions(
    conn: &Connection,
    filter: &SessionFilter,
) -> Result<Vec<Session>, DatabaseError> {
    let (where_sql, params_vec) = filter_sql(filter);
    let mut sql = format!("SELECT {SESSION_COLUMNS} FROM sessions{where_sql}");
    sql.push_str(if filter.newest_first {
        " ORDER BY date DESC, rowid DESC"
    } else {
        " ORDER BY date ASC, rowid ASC"
    });
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(param_refs.as_slice(), read_session_row)?;

    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(row_to_session(row?)?);
    }
    Ok(sessions)
}

pub fn count_sessions(conn: &Connection, filter: &SessionFilter) -> Result<i64, DatabaseError> {
    let (where_sql, params_vec) = filter_sql(filter);
    let sql = format!("SELECT COUNT(*) FROM sessions{where_sql}");
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let count = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
    Ok(count)
}

/// Mean of the ratings patients have left for this therapist, or None
/// when nothing has been rated yet.
pub fn avg_rating_for_therapist(
    conn: &Connection,
    therapist_id: Uuid,
) -> Result<Option<f64>, DatabaseError> {
    let avg = conn.query_row(
        "SELECT AVG(rating) FROM sessions WHERE therapist_id = ?1 AND rating IS NOT NULL",
        params![therapist_id.to_string()],
        |row| row.get::<_, Option<f64>>(0),
    )?;
    Ok(avg)
}

/// Mutable subset of a session. Notes replace the whole block when
/// present; status and rating update independently.
#[derive(Debug, Default)]
pub struct SessionPatch {
    pub status: Option<SessionStatus>,
    pub notes: Option<SessionNotes>,
    pub rating: Option<i64>,
}

pub fn update_session(
    conn: &Connection,
    id: Uuid,
    patch: &SessionPatch,
) -> Result<Option<Session>, DatabaseError> {
    let notes = patch.notes.as_ref();
    let changed = conn.execute(
        "UPDATE sessions SET
            status = COALESCE(?2, status),
            rating = COALESCE(?3, rating),
            notes_summary = CASE WHEN ?4 THEN ?5 ELSE notes_summary END,
            notes_mood = CASE WHEN ?4 THEN ?6 ELSE notes_mood END,
            notes_next_steps = CASE WHEN ?4 THEN ?7 ELSE notes_next_steps END,
            notes_homework = CASE WHEN ?4 THEN ?8 ELSE notes_homework END,
            notes_risk_level = CASE WHEN ?4 THEN ?9 ELSE notes_risk_level END,
            updated_at = ?10
         WHERE id = ?1",
        params![
            id.to_string(),
            patch.status.map(|s| s.as_str()),
            patch.rating,
            notes.is_some(),
            notes.and_then(|n| n.summary.clone()),
            notes.and_then(|n| n.mood.clone()),
            notes.and_then(|n| n.next_steps.clone()),
            notes.and_then(|n| n.homework.clone()),
            notes.map(|n| n.risk_level.as_str()),
            ts(Utc::now()),
        ],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    get_session(conn, id)
}

pub fn session_view(conn: &Connection, id: Uuid) -> Result<Option<SessionView>, DatabaseError> {
    match get_session(conn, id)? {
        Some(session) => Ok(Some(resolve_view(conn, &mut HashMap::new(), session)?)),
        None => Ok(None),
    }
}

pub fn list_session_views(
    conn: &Connection,
    filter: &SessionFilter,
) -> Result<Vec<SessionView>, DatabaseError> {
    let sessions = list_sessions(conn, filter)?;
    let mut cache = HashMap::new();
    let mut views = Vec::with_capacity(sessions.len());
    for session in sessions {
        views.push(resolve_view(conn, &mut cache, session)?);
    }
    Ok(views)
}

fn resolve_view(
    conn: &Connection,
    cache: &mut HashMap<Uuid, crate::models::User>,
    session: Session,
) -> Result<SessionView, DatabaseError> {
    let patient = cached_user(conn, cache, session.patient_id)?.person_ref();
    let therapist = cached_user(conn, cache, session.therapist_id)?.person_ref();
    Ok(SessionView::new(session, patient, therapist))
}

struct SessionRow {
    id: String,
    patient_id: String,
    therapist_id: String,
    assignment_id: Option<String>,
    date: String,
    duration: i64,
    session_type: String,
    therapy: Option<String>,
    module: Option<String>,
    status: String,
    location: Option<String>,
    notes_summary: Option<String>,
    notes_mood: Option<String>,
    notes_next_steps: Option<String>,
    notes_homework: Option<String>,
    notes_risk_level: String,
    rating: Option<i64>,
    created_at: String,
    updated_at: String,
}

fn read_session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        therapist_id: row.get(2)?,
        assignment_id: row.get(3)?,
        date: row.get(4)?,
        duration: row.get(5)?,
        session_type: row.get(6)?,
        therapy: row.get(7)?,
        module: row.get(8)?,
        status: row.get(9)?,
        location: row.get(10)?,
        notes_summary: row.get(11)?,
        notes_mood: row.get(12)?,
        notes_next_steps: row.get(13)?,
        notes_homework: row.get(14)?,
        notes_risk_level: row.get(15)?,
        rating: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

fn row_to_session(row: SessionRow) -> Result<Session, DatabaseError> {
    let parse_id = |s: &str| {
        Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
    };
    Ok(Session {
        id: parse_id(&row.id)?,
        patient_id: parse_id(&row.patient_id)?,
        therapist_id: parse_id(&row.therapist_id)?,
        assignment_id: row.assignment_id.as_deref().map(parse_id).transpose()?,
        date: parse_ts(&row.date)?,
        duration: row.duration,
        session_type: SessionType::from_str(&row.session_type)?,
        therapy: row.therapy,
        module: row.module,
        status: SessionStatus::from_str(&row.status)?,
        location: row.location,
        notes: SessionNotes {
            summary: row.notes_summary,
            mood: row.notes_mood,
            next_steps: row.notes_next_steps,
            homework: row.notes_homework,
            risk_level: RiskLevel::from_str(&row.notes_risk_level)?,
        },
        rating: row.rating,
        created_at: parse_ts(&row.created_at)?,
        updated_at: parse_ts(&row.updated_at)?,
    })
}

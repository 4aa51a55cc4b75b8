use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Assignment, AssignmentPriority, AssignmentStatus, AssignmentView, User};

use super::user::require_user;
use super::{parse_ts, ts};

const ASSIGNMENT_COLUMNS: &str = "id, patient_id, therapist_id, supervisor_id, status, priority, \
     start_date, end_date, diagnosis, treatment_plan, notes, created_at, updated_at";

/// Insert a new assignment. A partial unique index on
/// `(patient_id) WHERE status = 'active'` rejects a second active row
/// for the same patient, so callers must treat a unique violation as
/// "patient already assigned" rather than a bug.
pub fn insert_assignment(conn: &Connection, assignment: &Assignment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO assignments (id, patient_id, therapist_id, supervisor_id, status, priority,
            start_date, end_date, diagnosis, treatment_plan, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            assignment.id.to_string(),
            assignment.patient_id.to_string(),
            assignment.therapist_id.to_string(),
            assignment.supervisor_id.to_string(),
            assignment.status.as_str(),
            assignment.priority.as_str(),
            ts(assignment.start_date),
            assignment.end_date.map(ts),
            assignment.diagnosis,
            assignment.treatment_plan,
            assignment.notes,
            ts(assignment.created_at),
            ts(assignment.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_assignment(conn: &Connection, id: Uuid) -> Result<Option<Assignment>, DatabaseError> {
    let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row(params![id.to_string()], read_assignment_row) {
        Ok(row) => Ok(Some(row_to_assignment(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_active_assignment_for_patient(
    conn: &Connection,
    patient_id: Uuid,
) -> Result<Option<Assignment>, DatabaseError> {
    let sql = format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM assignments
         WHERE patient_id = ?1 AND status = 'active'"
    );
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row(params![patient_id.to_string()], read_assignment_row) {
        Ok(row) => Ok(Some(row_to_assignment(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Role scope for assignment listings.
#[derive(Debug, Clone, Copy)]
pub enum AssignmentScope {
    All,
    Therapist(Uuid),
    Patient(Uuid),
}

pub fn list_assignments(
    conn: &Connection,
    scope: AssignmentScope,
) -> Result<Vec<Assignment>, DatabaseError> {
    let mut sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments");
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    match scope {
        AssignmentScope::All => {}
        AssignmentScope::Therapist(id) => {
            sql.push_str(" WHERE therapist_id = ?1");
            params_vec.push(Box::new(id.to_string()));
        }
        AssignmentScope::Patient(id) => {
            sql.push_str(" WHERE patient_id = ?1");
            params_vec.push(Box::new(id.to_string()));
        }
    }
    sql.push_str(" ORDER BY created_at DESC, rowid DESC");

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(param_refs.as_slice(), read_assignment_row)?;

    let mut assignments = Vec::new();
    for row in rows {
        assignments.push(row_to_assignment(row?)?);
    }
    Ok(assignments)
}

pub fn count_active_for_therapist(
    conn: &Connection,
    therapist_id: Uuid,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM assignments WHERE therapist_id = ?1 AND status = 'active'",
        params![therapist_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Mutable subset of an assignment. `therapist_id` is how transfers
/// happen; setting a terminal status should come with an `end_date`.
#[derive(Debug, Default)]
pub struct AssignmentPatch {
    pub status: Option<AssignmentStatus>,
    pub therapist_id: Option<Uuid>,
    pub notes: Option<String>,
    pub end_date: Option<DateTime<Utc>>,
}

pub fn update_assignment(
    conn: &Connection,
    id: Uuid,
    patch: &AssignmentPatch,
) -> Result<Option<Assignment>, DatabaseError> {
    let changed = conn.execute(
        "UPDATE assignments SET
            status = COALESCE(?2, status),
            therapist_id = COALESCE(?3, therapist_id),
            notes = COALESCE(?4, notes),
            end_date = COALESCE(?5, end_date),
            updated_at = ?6
         WHERE id = ?1",
        params![
            id.to_string(),
            patch.status.map(|s| s.as_str()),
            patch.therapist_id.map(|t| t.to_string()),
            patch.notes,
            patch.end_date.map(ts),
            ts(Utc::now()),
        ],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    get_assignment(conn, id)
}

// View resolution: assignments embed their three participants as
// role-shaped summaries. Rows in a listing share participants, so a
// small per-call cache keeps this at one user fetch per distinct id.

pub fn assignment_view(
    conn: &Connection,
    id: Uuid,
) -> Result<Option<AssignmentView>, DatabaseError> {
    match get_assignment(conn, id)? {
        Some(assignment) => Ok(Some(resolve_view(conn, &mut HashMap::new(), assignment)?)),
        None => Ok(None),
    }
}

pub fn active_assignment_view_for_patient(
    conn: &Connection,
    patient_id: Uuid,
) -> Result<Option<AssignmentView>, DatabaseError> {
    match get_active_assignment_for_patient(conn, patient_id)? {
        Some(assignment) => Ok(Some(resolve_view(conn, &mut HashMap::new(), assignment)?)),
        None => Ok(None),
    }
}

pub fn list_assignment_views(
    conn: &Connection,
    scope: AssignmentScope,
) -> Result<Vec<AssignmentView>, DatabaseError> {
    let assignments = list_assignments(conn, scope)?;
    let mut cache = HashMap::new();
    let mut views = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        views.push(resolve_view(conn, &mut cache, assignment)?);
    }
    Ok(views)
}

fn resolve_view(
    conn: &Connection,
    cache: &mut HashMap<Uuid, User>,
    assignment: Assignment,
) -> Result<AssignmentView, DatabaseError> {
    let patient = cached_user(conn, cache, assignment.patient_id)?.summary();
    let therapist = cached_user(conn, cache, assignment.therapist_id)?.summary();
    let supervisor = cached_user(conn, cache, assignment.supervisor_id)?.summary();
    Ok(AssignmentView::new(assignment, patient, therapist, supervisor))
}

pub(crate) fn cached_user(
    conn: &Connection,
    cache: &mut HashMap<Uuid, User>,
    id: Uuid,
) -> Result<User, DatabaseError> {
    if let Some(user) = cache.get(&id) {
        return Ok(user.clone());
    }
    let user = require_user(conn, id)?;
    cache.insert(id, user.clone());
    Ok(user)
}

struct AssignmentRow {
    id: String,
    patient_id: String,
    therapist_id: String,
    supervisor_id: String,
    status: String,
    priority: String,
    start_date: String,
    end_date: Option<String>,
    diagnosis: Option<String>,
    treatment_plan: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_assignment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssignmentRow> {
    Ok(AssignmentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        therapist_id: row.get(2)?,
        supervisor_id: row.get(3)?,
        status: row.get(4)?,
        priority: row.get(5)?,
        start_date: row.get(6)?,
        end_date: row.get(7)?,
        diagnosis: row.get(8)?,
        treatment_plan: row.get(9)?,
        notes: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn row_to_assignment(row: AssignmentRow) -> Result<Assignment, DatabaseError> {
    let parse_id = |s: &str| {
        Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
    };
    Ok(Assignment {
        id: parse_id(&row.id)?,
        patient_id: parse_id(&row.patient_id)?,
        therapist_id: parse_id(&row.therapist_id)?,
        supervisor_id: parse_id(&row.supervisor_id)?,
        status: AssignmentStatus::from_str(&row.status)?,
        priority: AssignmentPriority::from_str(&row.priority)?,
        start_date: parse_ts(&row.start_date)?,
        end_date: row.end_date.as_deref().map(parse_ts).transpose()?,
        diagnosis: row.diagnosis,
        treatment_plan: row.treatment_plan,
        notes: row.notes,
        created_at: parse_ts(&row.created_at)?,
        updated_at: parse_ts(&row.updated_at)?,
    })
}

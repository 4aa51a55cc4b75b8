use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{EmergencyContact, Role, User};

use super::{parse_ts, ts};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, avatar, is_active, \
     specializations, license_number, department, extension, \
     date_of_birth, gender, blood_group, phone, address, \
     emergency_name, emergency_relationship, emergency_phone, \
     supervisor_level, created_at, updated_at";

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, role, avatar, is_active,
            specializations, license_number, department, extension,
            date_of_birth, gender, blood_group, phone, address,
            emergency_name, emergency_relationship, emergency_phone,
            supervisor_level, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                 ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
        params![
            user.id.to_string(),
            user.name,
            user.email,
            user.password_hash,
            user.role.as_str(),
            user.avatar,
            user.is_active,
            json_list(&user.specializations),
            user.license_number,
            user.department,
            user.extension,
            user.date_of_birth.map(|d| d.to_string()),
            user.gender,
            user.blood_group,
            user.phone,
            user.address,
            user.emergency_contact.name,
            user.emergency_contact.relationship,
            user.emergency_contact.phone,
            user.supervisor_level,
            ts(user.created_at),
            ts(user.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: Uuid) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row(params![id.to_string()], read_user_row) {
        Ok(row) => Ok(Some(row_to_user(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Lookup by email. The column is COLLATE NOCASE, so the match is
/// case-insensitive regardless of how the address was typed.
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row(params![email], read_user_row) {
        Ok(row) => Ok(Some(row_to_user(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Users of one role, newest first.
pub fn list_users_by_role(
    conn: &Connection,
    role: Role,
    active_only: bool,
) -> Result<Vec<User>, DatabaseError> {
    let mut sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role = ?1");
    if active_only {
        sql.push_str(" AND is_active = 1");
    }
    sql.push_str(" ORDER BY created_at DESC, rowid DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![role.as_str()], read_user_row)?;
    rows_to_users(rows)
}

pub fn count_users_by_role(
    conn: &Connection,
    role: Role,
    active_only: bool,
) -> Result<i64, DatabaseError> {
    let mut sql = String::from("SELECT COUNT(*) FROM users WHERE role = ?1");
    if active_only {
        sql.push_str(" AND is_active = 1");
    }
    let count = conn.query_row(&sql, params![role.as_str()], |row| row.get(0))?;
    Ok(count)
}

/// Patients with no assignment currently in status `active`.
pub fn list_unassigned_patients(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE role = 'patient'
           AND id NOT IN (SELECT patient_id FROM assignments WHERE status = 'active')
         ORDER BY created_at DESC, rowid DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], read_user_row)?;
    rows_to_users(rows)
}

pub fn count_unassigned_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM users
         WHERE role = 'patient'
           AND id NOT IN (SELECT patient_id FROM assignments WHERE status = 'active')",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Patients bound to the therapist through an active assignment.
pub fn list_patients_of_therapist(
    conn: &Connection,
    therapist_id: Uuid,
) -> Result<Vec<User>, DatabaseError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE id IN (SELECT patient_id FROM assignments
                      WHERE therapist_id = ?1 AND status = 'active')
         ORDER BY created_at DESC, rowid DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![therapist_id.to_string()], read_user_row)?;
    rows_to_users(rows)
}

/// Whitelisted profile mutation: name, phone, address, emergency
/// contact. Role and credential are untouchable through this path.
#[derive(Debug, Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
}

pub fn update_user_profile(
    conn: &Connection,
    id: Uuid,
    patch: &ProfilePatch,
) -> Result<Option<User>, DatabaseError> {
    let emergency = patch.emergency_contact.as_ref();
    let changed = conn.execute(
        "UPDATE users SET
            name = COALESCE(?2, name),
            phone = COALESCE(?3, phone),
            address = COALESCE(?4, address),
            emergency_name = CASE WHEN ?5 THEN ?6 ELSE emergency_name END,
            emergency_relationship = CASE WHEN ?5 THEN ?7 ELSE emergency_relationship END,
            emergency_phone = CASE WHEN ?5 THEN ?8 ELSE emergency_phone END,
            updated_at = ?9
         WHERE id = ?1",
        params![
            id.to_string(),
            patch.name,
            patch.phone,
            patch.address,
            emergency.is_some(),
            emergency.and_then(|e| e.name.clone()),
            emergency.and_then(|e| e.relationship.clone()),
            emergency.and_then(|e| e.phone.clone()),
            ts(Utc::now()),
        ],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    get_user(conn, id)
}

/// Flip the active flag. Deactivated users fail token resolution.
pub fn set_user_active(conn: &Connection, id: Uuid, active: bool) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.to_string(), active, ts(Utc::now())],
    )?;
    Ok(changed > 0)
}

fn json_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".into())
}

struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    avatar: String,
    is_active: bool,
    specializations: Option<String>,
    license_number: Option<String>,
    department: Option<String>,
    extension: Option<String>,
    date_of_birth: Option<String>,
    gender: Option<String>,
    blood_group: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    emergency_name: Option<String>,
    emergency_relationship: Option<String>,
    emergency_phone: Option<String>,
    supervisor_level: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
        avatar: row.get(5)?,
        is_active: row.get(6)?,
        specializations: row.get(7)?,
        license_number: row.get(8)?,
        department: row.get(9)?,
        extension: row.get(10)?,
        date_of_birth: row.get(11)?,
        gender: row.get(12)?,
        blood_group: row.get(13)?,
        phone: row.get(14)?,
        address: row.get(15)?,
        emergency_name: row.get(16)?,
        emergency_relationship: row.get(17)?,
        emergency_phone: row.get(18)?,
        supervisor_level: row.get(19)?,
        created_at: row.get(20)?,
        updated_at: row.get(21)?,
    })
}

fn row_to_user(row: UserRow) -> Result<User, DatabaseError> {
    Ok(User {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        name: row.name,
        email: row.email,
        password_hash: row.password_hash,
        role: Role::from_str(&row.role)?,
        avatar: row.avatar,
        is_active: row.is_active,
        specializations: row
            .specializations
            .map(|s| serde_json::from_str(&s).unwrap_or_default())
            .unwrap_or_default(),
        license_number: row.license_number,
        department: row.department,
        extension: row.extension,
        date_of_birth: row
            .date_of_birth
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        gender: row.gender,
        blood_group: row.blood_group,
        phone: row.phone,
        address: row.address,
        emergency_contact: EmergencyContact {
            name: row.emergency_name,
            relationship: row.emergency_relationship,
            phone: row.emergency_phone,
        },
        supervisor_level: row.supervisor_level,
        created_at: parse_ts(&row.created_at)?,
        updated_at: parse_ts(&row.updated_at)?,
    })
}

fn rows_to_users(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<UserRow>>,
) -> Result<Vec<User>, DatabaseError> {
    let mut users = Vec::new();
    for row in rows {
        users.push(row_to_user(row?)?);
    }
    Ok(users)
}

/// Fetch a user that a foreign key says must exist.
pub(crate) fn require_user(conn: &Connection, id: Uuid) -> Result<User, DatabaseError> {
    get_user(conn, id)?.ok_or_else(|| {
        DatabaseError::ConstraintViolation(format!("user {id} referenced but missing"))
    })
}

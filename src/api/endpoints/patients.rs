//! Patient endpoints.
//!
//! `GET /api/patients` — supervisors see all patients, therapists see
//! their active caseload
//! `GET /api/patients/:id` — chart view: profile, current assignment,
//! recent sessions

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::middleware::auth::require_role;
use crate::api::types::{ApiContext, AuthedUser};
use crate::db::repository::{self, SessionFilter};
use crate::models::{AssignmentView, Role, SessionStatus, SessionView, User, UserProfile};

const PATIENT_MISSING: &str = "Patient not found.";

#[derive(Serialize)]
pub struct PatientListResponse {
    pub success: bool,
    pub count: usize,
    pub patients: Vec<UserProfile>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetailResponse {
    pub success: bool,
    pub patient: UserProfile,
    pub assignment: Option<AssignmentView>,
    pub sessions: Vec<SessionView>,
    pub session_count: i64,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
) -> Result<Json<PatientListResponse>, ApiError> {
    require_role(&caller, &[Role::Therapist, Role::Supervisor])?;

    let conn = ctx.open_db()?;
    let users = match caller.role {
        Role::Supervisor => repository::list_users_by_role(&conn, Role::Patient, false)?,
        _ => repository::list_patients_of_therapist(&conn, caller.id)?,
    };
    let patients: Vec<UserProfile> = users.iter().map(User::profile).collect();

    Ok(Json(PatientListResponse {
        success: true,
        count: patients.len(),
        patients,
    }))
}

/// Chart view: the profile plus the active assignment (when one
/// exists), the ten most recent sessions, and the completed-session
/// total.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(_caller): Extension<AuthedUser>,
    Path(id): Path<String>,
) -> Result<Json<PatientDetailResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let patient = super::resolve_role_user(&conn, Some(&id), Role::Patient, PATIENT_MISSING)?;

    let assignment = repository::active_assignment_view_for_patient(&conn, patient.id)?;

    let recent = SessionFilter {
        patient_id: Some(patient.id),
        newest_first: true,
        limit: Some(10),
        ..SessionFilter::default()
    };
    let sessions = repository::list_session_views(&conn, &recent)?;

    let completed = SessionFilter {
        patient_id: Some(patient.id),
        status: Some(SessionStatus::Completed),
        ..SessionFilter::default()
    };
    let session_count = repository::count_sessions(&conn, &completed)?;

    Ok(Json(PatientDetailResponse {
        success: true,
        patient: patient.profile(),
        assignment,
        sessions,
        session_count,
    }))
}

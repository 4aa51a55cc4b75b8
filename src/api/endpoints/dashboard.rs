//! Role-specific dashboard endpoints.
//!
//! Each role lands on its own aggregate view: supervisors get
//! clinic-wide figures, therapists their day plan and rating,
//! patients their care status.

use axum::extract::State;
use axum::{Extension, Json};
use chrono::Utc;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::middleware::auth::require_role;
use crate::api::types::{ApiContext, AuthedUser};
use crate::db::repository::{self, SessionFilter};
use crate::models::{AssignmentView, Role, SessionStatus, SessionView};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorStats {
    pub total_therapists: i64,
    pub total_patients: i64,
    pub total_sessions: i64,
    pub unassigned: i64,
    pub today_sessions: i64,
    pub cancelled_today: i64,
}

#[derive(Serialize)]
pub struct CaseloadEntry {
    pub name: String,
    pub caseload: i64,
}

#[derive(Serialize)]
pub struct SupervisorDashboardResponse {
    pub success: bool,
    pub stats: SupervisorStats,
    pub caseloads: Vec<CaseloadEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapistStats {
    pub active_patients: i64,
    pub completed_sessions: i64,
    pub today_count: usize,
    /// Mean patient rating to one decimal, `"N/A"` before any rating.
    pub avg_rating: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapistDashboardResponse {
    pub success: bool,
    pub stats: TherapistStats,
    pub today_sessions: Vec<SessionView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientStats {
    pub completed_sessions: i64,
}

#[derive(Serialize)]
pub struct PatientDashboardResponse {
    pub success: bool,
    pub assignment: Option<AssignmentView>,
    pub stats: PatientStats,
    pub upcoming: Vec<SessionView>,
}

pub async fn supervisor(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
) -> Result<Json<SupervisorDashboardResponse>, ApiError> {
    require_role(&caller, &[Role::Supervisor])?;

    let conn = ctx.open_db()?;
    let total_therapists = repository::count_users_by_role(&conn, Role::Therapist, true)?;
    let total_patients = repository::count_users_by_role(&conn, Role::Patient, false)?;
    let total_sessions = repository::count_sessions(&conn, &SessionFilter::default())?;
    let unassigned = repository::count_unassigned_patients(&conn)?;

    let (day_start, day_end) = repository::local_day_bounds(Utc::now());
    let today_sessions = repository::count_sessions(
        &conn,
        &SessionFilter {
            from: Some(day_start),
            until: Some(day_end),
            ..SessionFilter::default()
        },
    )?;
    let cancelled_today = repository::count_sessions(
        &conn,
        &SessionFilter {
            status: Some(SessionStatus::Cancelled),
            from: Some(day_start),
            until: Some(day_end),
            ..SessionFilter::default()
        },
    )?;

    let mut caseloads = Vec::new();
    for therapist in repository::list_users_by_role(&conn, Role::Therapist, true)? {
        caseloads.push(CaseloadEntry {
            caseload: repository::count_active_for_therapist(&conn, therapist.id)?,
            name: therapist.name,
        });
    }

    Ok(Json(SupervisorDashboardResponse {
        success: true,
        stats: SupervisorStats {
            total_therapists,
            total_patients,
            total_sessions,
            unassigned,
            today_sessions,
            cancelled_today,
        },
        caseloads,
    }))
}

pub async fn therapist(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
) -> Result<Json<TherapistDashboardResponse>, ApiError> {
    require_role(&caller, &[Role::Therapist])?;

    let conn = ctx.open_db()?;
    let active_patients = repository::count_active_for_therapist(&conn, caller.id)?;
    let completed_sessions = repository::count_sessions(
        &conn,
        &SessionFilter {
            therapist_id: Some(caller.id),
            status: Some(SessionStatus::Completed),
            ..SessionFilter::default()
        },
    )?;

    let (day_start, day_end) = repository::local_day_bounds(Utc::now());
    let today_sessions = repository::list_session_views(
        &conn,
        &SessionFilter {
            therapist_id: Some(caller.id),
            from: Some(day_start),
            until: Some(day_end),
            ..SessionFilter::default()
        },
    )?;

    let avg_rating = repository::avg_rating_for_therapist(&conn, caller.id)?
        .map_or_else(|| "N/A".to_string(), |avg| format!("{avg:.1}"));

    Ok(Json(TherapistDashboardResponse {
        success: true,
        stats: TherapistStats {
            active_patients,
            completed_sessions,
            today_count: today_sessions.len(),
            avg_rating,
        },
        today_sessions,
    }))
}

pub async fn patient(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
) -> Result<Json<PatientDashboardResponse>, ApiError> {
    require_role(&caller, &[Role::Patient])?;

    let conn = ctx.open_db()?;
    let assignment = repository::active_assignment_view_for_patient(&conn, caller.id)?;
    let completed_sessions = repository::count_sessions(
        &conn,
        &SessionFilter {
            patient_id: Some(caller.id),
            status: Some(SessionStatus::Completed),
            ..SessionFilter::default()
        },
    )?;
    let upcoming = repository::list_session_views(
        &conn,
        &SessionFilter {
            patient_id: Some(caller.id),
            status: Some(SessionStatus::Scheduled),
            from: Some(Utc::now()),
            limit: Some(3),
            ..SessionFilter::default()
        },
    )?;

    Ok(Json(PatientDashboardResponse {
        success: true,
        assignment,
        stats: PatientStats { completed_sessions },
        upcoming,
    }))
}

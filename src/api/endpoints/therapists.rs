//! Therapist endpoints.
//!
//! `GET /api/therapists` — roster with live workload figures
//! `GET /api/therapists/:id` — profile plus the active caseload

use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::Utc;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::middleware::auth::require_role;
use crate::api::types::{ApiContext, AuthedUser};
use crate::db::repository::{self, SessionFilter};
use crate::models::{Role, User, UserProfile, UserSummary};

const THERAPIST_MISSING: &str = "Therapist not found.";

/// Roster row: the full profile with workload counters alongside.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapistEntry {
    #[serde(flatten)]
    pub therapist: UserProfile,
    pub caseload: i64,
    pub today_sessions: i64,
}

#[derive(Serialize)]
pub struct TherapistListResponse {
    pub success: bool,
    pub count: usize,
    pub therapists: Vec<TherapistEntry>,
}

#[derive(Serialize)]
pub struct TherapistDetailResponse {
    pub success: bool,
    pub therapist: UserProfile,
    pub patients: Vec<UserSummary>,
    pub caseload: i64,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
) -> Result<Json<TherapistListResponse>, ApiError> {
    require_role(&caller, &[Role::Supervisor])?;

    let conn = ctx.open_db()?;
    let (day_start, day_end) = repository::local_day_bounds(Utc::now());

    let mut therapists = Vec::new();
    for user in repository::list_users_by_role(&conn, Role::Therapist, false)? {
        let caseload = repository::count_active_for_therapist(&conn, user.id)?;
        let today = SessionFilter {
            therapist_id: Some(user.id),
            from: Some(day_start),
            until: Some(day_end),
            ..SessionFilter::default()
        };
        let today_sessions = repository::count_sessions(&conn, &today)?;
        therapists.push(TherapistEntry {
            therapist: user.profile(),
            caseload,
            today_sessions,
        });
    }

    Ok(Json(TherapistListResponse {
        success: true,
        count: therapists.len(),
        therapists,
    }))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(_caller): Extension<AuthedUser>,
    Path(id): Path<String>,
) -> Result<Json<TherapistDetailResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let therapist =
        super::resolve_role_user(&conn, Some(&id), Role::Therapist, THERAPIST_MISSING)?;

    let patients: Vec<UserSummary> = repository::list_patients_of_therapist(&conn, therapist.id)?
        .iter()
        .map(User::summary)
        .collect();
    let caseload = repository::count_active_for_therapist(&conn, therapist.id)?;

    Ok(Json(TherapistDetailResponse {
        success: true,
        therapist: therapist.profile(),
        patients,
        caseload,
    }))
}

//! Assignment endpoints.
//!
//! `GET /api/assignments` — listing scoped to the caller's role
//! `GET /api/assignments/unassigned-patients` — patients awaiting a therapist
//! `POST /api/assignments` — bind a patient to a therapist
//! `PUT /api/assignments/:id` — transfer, annotate, or close an assignment
//! `GET /api/assignments/:id` — single assignment detail

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::middleware::auth::require_role;
use crate::api::types::{ApiContext, AuthedUser};
use crate::db::repository::{self, AssignmentPatch, AssignmentScope};
use crate::models::{
    Assignment, AssignmentPriority, AssignmentStatus, AssignmentView, Role, User, UserSummary,
};

const ASSIGNMENT_MISSING: &str = "Assignment not found.";

#[derive(Serialize)]
pub struct AssignmentListResponse {
    pub success: bool,
    pub count: usize,
    pub assignments: Vec<AssignmentView>,
}

#[derive(Serialize)]
pub struct AssignmentResponse {
    pub success: bool,
    pub assignment: AssignmentView,
}

#[derive(Serialize)]
pub struct UnassignedPatientsResponse {
    pub success: bool,
    pub count: usize,
    pub patients: Vec<UserSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    pub patient_id: Option<String>,
    pub therapist_id: Option<String>,
    pub priority: Option<AssignmentPriority>,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssignmentRequest {
    pub status: Option<AssignmentStatus>,
    pub therapist_id: Option<String>,
    pub notes: Option<String>,
}

/// Supervisors see every assignment, therapists their own caseload,
/// patients their own history.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
) -> Result<Json<AssignmentListResponse>, ApiError> {
    let scope = match caller.role {
        Role::Supervisor => AssignmentScope::All,
        Role::Therapist => AssignmentScope::Therapist(caller.id),
        Role::Patient => AssignmentScope::Patient(caller.id),
    };

    let conn = ctx.open_db()?;
    let assignments = repository::list_assignment_views(&conn, scope)?;

    Ok(Json(AssignmentListResponse {
        success: true,
        count: assignments.len(),
        assignments,
    }))
}

pub async fn unassigned_patients(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
) -> Result<Json<UnassignedPatientsResponse>, ApiError> {
    require_role(&caller, &[Role::Supervisor])?;

    let conn = ctx.open_db()?;
    let patients: Vec<UserSummary> = repository::list_unassigned_patients(&conn)?
        .iter()
        .map(User::summary)
        .collect();

    Ok(Json(UnassignedPatientsResponse {
        success: true,
        count: patients.len(),
        patients,
    }))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
    Json(request): Json<CreateAssignmentRequest>,
) -> Result<(StatusCode, Json<AssignmentResponse>), ApiError> {
    require_role(&caller, &[Role::Supervisor])?;

    let conn = ctx.open_db()?;
    let patient = super::resolve_role_user(
        &conn,
        request.patient_id.as_deref(),
        Role::Patient,
        "Patient not found.",
    )?;
    let therapist = super::resolve_role_user(
        &conn,
        request.therapist_id.as_deref(),
        Role::Therapist,
        "Therapist not found.",
    )?;
    let supervisor =
        repository::get_user(&conn, caller.id)?.ok_or_else(ApiError::user_gone)?;

    if repository::get_active_assignment_for_patient(&conn, patient.id)?.is_some() {
        return Err(ApiError::ConflictActiveAssignment);
    }

    let now = Utc::now();
    let assignment = Assignment {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        therapist_id: therapist.id,
        supervisor_id: supervisor.id,
        status: AssignmentStatus::Active,
        priority: request.priority.unwrap_or(AssignmentPriority::Normal),
        start_date: now,
        end_date: None,
        diagnosis: request.diagnosis,
        treatment_plan: request.treatment_plan,
        notes: request.notes,
        created_at: now,
        updated_at: now,
    };

    if let Err(err) = repository::insert_assignment(&conn, &assignment) {
        // Two concurrent creates for the same patient can both pass the
        // lookup above; the partial unique index decides the loser.
        if err.is_unique_violation() {
            return Err(ApiError::ConflictActiveAssignment);
        }
        return Err(err.into());
    }

    tracing::info!(
        assignment_id = %assignment.id,
        patient = %patient.name,
        therapist = %therapist.name,
        "assignment created"
    );

    let view = AssignmentView::new(
        assignment,
        patient.summary(),
        therapist.summary(),
        supervisor.summary(),
    );

    Ok((
        StatusCode::CREATED,
        Json(AssignmentResponse {
            success: true,
            assignment: view,
        }),
    ))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthedUser>,
    Path(id): Path<String>,
    Json(request): Json<UpdateAssignmentRequest>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    require_role(&caller, &[Role::Supervisor])?;

    let conn = ctx.open_db()?;
    let assignment_id = Uuid::parse_str(id.trim())
        .map_err(|_| ApiError::NotFound(ASSIGNMENT_MISSING.to_string()))?;

    let therapist_id = match request.therapist_id.as_deref() {
        Some(raw) => Some(
            super::resolve_role_user(&conn, Some(raw), Role::Therapist, "Therapist not found.")?
                .id,
        ),
        None => None,
    };

    // Closing an assignment stamps its end date; a transfer leaves the
    // assignment open under the new therapist.
    let end_date = matches!(
        request.status,
        Some(AssignmentStatus::Completed | AssignmentStatus::Cancelled)
    )
    .then(Utc::now);

    let patch = AssignmentPatch {
        status: request.status,
        therapist_id,
        notes: request.notes,
        end_date,
    };

    match repository::update_assignment(&conn, assignment_id, &patch) {
        Ok(Some(_)) => {}
        Ok(None) => return Err(ApiError::NotFound(ASSIGNMENT_MISSING.to_string())),
        // Reactivating a closed assignment while the patient already has
        // an active one trips the same index as a duplicate create.
        Err(err) if err.is_unique_violation() => {
            return Err(ApiError::ConflictActiveAssignment)
        }
        Err(err) => return Err(err.into()),
    }

    let view = repository::assignment_view(&conn, assignment_id)?
        .ok_or_else(|| ApiError::NotFound(ASSIGNMENT_MISSING.to_string()))?;

    Ok(Json(AssignmentResponse {
        success: true,
        assignment: view,
    }))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(_caller): Extension<AuthedUser>,
    Path(id): Path<String>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let assignment_id = Uuid::parse_str(id.trim())
        .map_err(|_| ApiError::NotFound(ASSIGNMENT_MISSING.to_string()))?;

    let view = repository::assignment_view(&conn, assignment_id)?
        .ok_or_else(|| ApiError::NotFound(ASSIGNMENT_MISSING.to_string()))?;

    Ok(Json(AssignmentResponse {
        success: true,
        assignment: view,
    }))
}

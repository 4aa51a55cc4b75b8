//! HTTP router.
//!
//! All routes live under `/api`. Registration, login, and the health
//! probe are open; everything else sits behind the bearer-token
//! middleware. Handlers receive `ApiContext` through axum state, the
//! middleware reaches it through an outermost `Extension` layer.

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the full application router.
pub fn api_router(ctx: ApiContext) -> Router {
    // Layers run bottom-up: Extension must be outermost so the auth
    // middleware can reach the config and database.
    let protected = Router::new()
        .route("/auth/me", get(endpoints::auth::me))
        .route("/auth/updateprofile", put(endpoints::auth::update_profile))
        .route(
            "/assignments",
            get(endpoints::assignments::list).post(endpoints::assignments::create),
        )
        .route(
            "/assignments/unassigned-patients",
            get(endpoints::assignments::unassigned_patients),
        )
        .route(
            "/assignments/:id",
            get(endpoints::assignments::detail).put(endpoints::assignments::update),
        )
        .route(
            "/sessions",
            get(endpoints::sessions::list).post(endpoints::sessions::create),
        )
        .route("/sessions/today", get(endpoints::sessions::today))
        .route("/sessions/:id", put(endpoints::sessions::update))
        .route("/patients", get(endpoints::patients::list))
        .route("/patients/:id", get(endpoints::patients::detail))
        .route("/therapists", get(endpoints::therapists::list))
        .route("/therapists/:id", get(endpoints::therapists::detail))
        .route(
            "/moods",
            get(endpoints::moods::list).post(endpoints::moods::create),
        )
        .route("/dashboard/supervisor", get(endpoints::dashboard::supervisor))
        .route("/dashboard/therapist", get(endpoints::dashboard::therapist))
        .route("/dashboard/patient", get(endpoints::dashboard::patient))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::log::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::Extension(ctx.clone()));

    let open = Router::new()
        .route("/auth/register", post(endpoints::auth::register))
        .route("/auth/login", post(endpoints::auth::login))
        .route("/health", get(endpoints::health::check))
        .with_state(ctx);

    Router::new()
        .nest("/api", open)
        .nest("/api", protected)
        .fallback(unknown_route)
        .layer(CorsLayer::permissive())
}

async fn unknown_route() -> ApiError {
    ApiError::NotFound("Route not found.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use chrono::Utc;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::db::repository;
    use crate::models::Role;

    fn test_ctx() -> (ApiContext, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig {
            port: 0,
            db_path: tmp.path().join("api.db"),
            token_secret: "router-test-secret".to_string(),
            token_expiry_days: 7,
            // Full-strength hashing would dominate the test runtime.
            password_iterations: 1_000,
        };
        (ApiContext::new(config), tmp)
    }

    async fn send(
        ctx: &ApiContext,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = api_router(ctx.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Register through the API; returns (token, user id).
    async fn register(ctx: &ApiContext, role: &str, name: &str, email: &str) -> (String, String) {
        let (status, json) = send(
            ctx,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": name,
                "email": email,
                "password": "password123",
                "role": role,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {json}");
        (
            json["token"].as_str().unwrap().to_string(),
            json["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn create_assignment(
        ctx: &ApiContext,
        supervisor_token: &str,
        patient_id: &str,
        therapist_id: &str,
    ) -> (StatusCode, Value) {
        send(
            ctx,
            Method::POST,
            "/api/assignments",
            Some(supervisor_token),
            Some(json!({ "patientId": patient_id, "therapistId": therapist_id })),
        )
        .await
    }

    async fn schedule_session(
        ctx: &ApiContext,
        token: &str,
        patient_id: &str,
        therapist_id: Option<&str>,
        date: chrono::DateTime<Utc>,
    ) -> (StatusCode, Value) {
        let mut body = json!({ "patientId": patient_id, "date": date.to_rfc3339() });
        if let Some(therapist_id) = therapist_id {
            body["therapistId"] = json!(therapist_id);
        }
        send(ctx, Method::POST, "/api/sessions", Some(token), Some(body)).await
    }

    #[tokio::test]
    async fn health_is_open() {
        let (ctx, _tmp) = test_ctx();
        let (status, json) = send(&ctx, Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "Caseflow");
        assert!(json["version"].is_string());
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let (ctx, _tmp) = test_ctx();
        register(&ctx, "patient", "Aarav Sharma", "aarav@clinic.example").await;

        let (status, json) = send(
            &ctx,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "AARAV@clinic.example", "password": "password123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = json["token"].as_str().unwrap();

        let (status, json) = send(&ctx, Method::GET, "/api/auth/me", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["user"]["email"], "aarav@clinic.example");
        assert_eq!(json["user"]["role"], "patient");
        assert!(json["user"]["passwordHash"].is_null());
    }

    #[tokio::test]
    async fn protected_routes_reject_missing_and_bad_tokens() {
        let (ctx, _tmp) = test_ctx();

        let (status, json) = send(&ctx, Method::GET, "/api/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["message"], "Not authorized. Please log in.");
        assert_eq!(json["success"], false);

        let (status, json) =
            send(&ctx, Method::GET, "/api/auth/me", Some("not-a-jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["message"], "Invalid token.");
    }

    #[tokio::test]
    async fn duplicate_email_registration_rejected() {
        let (ctx, _tmp) = test_ctx();
        register(&ctx, "patient", "First", "dup@clinic.example").await;

        let (status, json) = send(
            &ctx,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Second",
                "email": "Dup@clinic.example",
                "password": "password123",
                "role": "patient",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Email already registered.");
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let (ctx, _tmp) = test_ctx();
        register(&ctx, "therapist", "Maya", "maya@clinic.example").await;

        let (status, json) = send(
            &ctx,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "maya@clinic.example", "password": "wrong-pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["message"], "Invalid email or password.");
    }

    #[tokio::test]
    async fn deactivated_account_loses_access() {
        let (ctx, _tmp) = test_ctx();
        let (token, id) = register(&ctx, "patient", "Gone Soon", "gone@clinic.example").await;

        let (status, _) = send(&ctx, Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let conn = ctx.open_db().unwrap();
        repository::set_user_active(&conn, id.parse().unwrap(), false).unwrap();

        let (status, json) = send(&ctx, Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["message"], "User not found.");
    }

    #[tokio::test]
    async fn fresh_patient_dashboard_is_empty() {
        let (ctx, _tmp) = test_ctx();
        let (token, _) = register(&ctx, "patient", "New Patient", "new@clinic.example").await;

        let (status, json) =
            send(&ctx, Method::GET, "/api/dashboard/patient", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert!(json["assignment"].is_null());
        assert_eq!(json["stats"]["completedSessions"], 0);
        assert_eq!(json["upcoming"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn dashboards_are_role_gated() {
        let (ctx, _tmp) = test_ctx();
        let (token, _) = register(&ctx, "patient", "Probe", "probe@clinic.example").await;

        let (status, json) = send(
            &ctx,
            Method::GET,
            "/api/dashboard/supervisor",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(
            json["message"],
            "Role 'patient' is not authorized for this action."
        );
    }

    #[tokio::test]
    async fn assignment_lifecycle_enforces_single_active() {
        let (ctx, _tmp) = test_ctx();
        let (sup, _) = register(&ctx, "supervisor", "Dr. S", "sup@clinic.example").await;
        let (_, t1) = register(&ctx, "therapist", "Therapist One", "t1@clinic.example").await;
        let (_, t2) = register(&ctx, "therapist", "Therapist Two", "t2@clinic.example").await;
        let (_, p1) = register(&ctx, "patient", "Patient One", "p1@clinic.example").await;

        // Unassigned until the first assignment lands.
        let (_, json) = send(
            &ctx,
            Method::GET,
            "/api/assignments/unassigned-patients",
            Some(&sup),
            None,
        )
        .await;
        assert_eq!(json["count"], 1);
        assert_eq!(json["patients"][0]["name"], "Patient One");

        let (status, json) = create_assignment(&ctx, &sup, &p1, &t1).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["assignment"]["status"], "active");
        assert_eq!(json["assignment"]["patient"]["name"], "Patient One");
        assert_eq!(json["assignment"]["therapist"]["name"], "Therapist One");
        assert_eq!(json["assignment"]["priority"], "normal");
        let assignment_id = json["assignment"]["id"].as_str().unwrap().to_string();

        let (_, json) = send(
            &ctx,
            Method::GET,
            "/api/assignments/unassigned-patients",
            Some(&sup),
            None,
        )
        .await;
        assert_eq!(json["count"], 0);

        // A second active assignment for the same patient is refused.
        let (status, json) = create_assignment(&ctx, &sup, &p1, &t2).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json["message"],
            "Patient already has an active assignment. Transfer or end current assignment first."
        );

        // Transfer keeps the assignment open under the new therapist.
        let (status, json) = send(
            &ctx,
            Method::PUT,
            &format!("/api/assignments/{assignment_id}"),
            Some(&sup),
            Some(json!({ "therapistId": t2 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["assignment"]["therapist"]["name"], "Therapist Two");
        assert_eq!(json["assignment"]["status"], "active");
        assert!(json["assignment"]["endDate"].is_null());

        // Completion stamps the end date and frees the patient.
        let (status, json) = send(
            &ctx,
            Method::PUT,
            &format!("/api/assignments/{assignment_id}"),
            Some(&sup),
            Some(json!({ "status": "completed" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["assignment"]["status"], "completed");
        assert!(json["assignment"]["endDate"].is_string());

        let (status, _) = create_assignment(&ctx, &sup, &p1, &t2).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn assignment_listing_is_scoped_by_role() {
        let (ctx, _tmp) = test_ctx();
        let (sup, _) = register(&ctx, "supervisor", "Dr. S", "sup@clinic.example").await;
        let (t1_token, t1) = register(&ctx, "therapist", "T One", "t1@clinic.example").await;
        let (_, t2) = register(&ctx, "therapist", "T Two", "t2@clinic.example").await;
        let (p1_token, p1) = register(&ctx, "patient", "P One", "p1@clinic.example").await;
        let (_, p2) = register(&ctx, "patient", "P Two", "p2@clinic.example").await;

        create_assignment(&ctx, &sup, &p1, &t1).await;
        create_assignment(&ctx, &sup, &p2, &t2).await;

        let (_, json) = send(&ctx, Method::GET, "/api/assignments", Some(&sup), None).await;
        assert_eq!(json["count"], 2);

        let (_, json) = send(&ctx, Method::GET, "/api/assignments", Some(&t1_token), None).await;
        assert_eq!(json["count"], 1);
        assert_eq!(json["assignments"][0]["patient"]["name"], "P One");

        let (_, json) = send(&ctx, Method::GET, "/api/assignments", Some(&p1_token), None).await;
        assert_eq!(json["count"], 1);
        assert_eq!(json["assignments"][0]["therapist"]["name"], "T One");
    }

    #[tokio::test]
    async fn unknown_assignment_reads_as_missing() {
        let (ctx, _tmp) = test_ctx();
        let (token, _) = register(&ctx, "supervisor", "Dr. S", "sup@clinic.example").await;

        for uri in [
            format!("/api/assignments/{}", uuid::Uuid::new_v4()),
            "/api/assignments/not-a-uuid".to_string(),
        ] {
            let (status, json) = send(&ctx, Method::GET, &uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(json["message"], "Assignment not found.");
        }
    }

    #[tokio::test]
    async fn todays_sessions_are_scoped_to_the_caller() {
        let (ctx, _tmp) = test_ctx();
        let (sup, _) = register(&ctx, "supervisor", "Dr. S", "sup@clinic.example").await;
        let (t1_token, t1) = register(&ctx, "therapist", "T One", "t1@clinic.example").await;
        let (t2_token, t2) = register(&ctx, "therapist", "T Two", "t2@clinic.example").await;
        let (_, p1) = register(&ctx, "patient", "P One", "p1@clinic.example").await;
        let (_, p2) = register(&ctx, "patient", "P Two", "p2@clinic.example").await;

        let now = Utc::now();
        let (status, _) = schedule_session(&ctx, &t1_token, &p1, None, now).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = schedule_session(&ctx, &sup, &p2, Some(&t2), now).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, json) = send(&ctx, Method::GET, "/api/sessions/today", Some(&t1_token), None).await;
        assert_eq!(json["sessions"].as_array().unwrap().len(), 1);
        assert_eq!(json["sessions"][0]["patient"]["name"], "P One");

        let (_, json) = send(&ctx, Method::GET, "/api/sessions/today", Some(&t2_token), None).await;
        assert_eq!(json["sessions"].as_array().unwrap().len(), 1);

        let (_, json) = send(&ctx, Method::GET, "/api/sessions/today", Some(&sup), None).await;
        assert_eq!(json["sessions"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn session_scheduling_validates_participants() {
        let (ctx, _tmp) = test_ctx();
        let (sup, _) = register(&ctx, "supervisor", "Dr. S", "sup@clinic.example").await;
        let (t_token, _) = register(&ctx, "therapist", "T One", "t1@clinic.example").await;
        let (_, p1) = register(&ctx, "patient", "P One", "p1@clinic.example").await;

        let (status, json) = send(
            &ctx,
            Method::POST,
            "/api/sessions",
            Some(&t_token),
            Some(json!({ "date": Utc::now().to_rfc3339() })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Patient ID is required.");

        let (status, json) = send(
            &ctx,
            Method::POST,
            "/api/sessions",
            Some(&t_token),
            Some(json!({ "patientId": p1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Session date is required.");

        // A supervisor cannot schedule without naming the therapist.
        let (status, json) = schedule_session(&ctx, &sup, &p1, None, Utc::now()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Therapist ID is required.");

        let (status, json) = schedule_session(
            &ctx,
            &t_token,
            &uuid::Uuid::new_v4().to_string(),
            None,
            Utc::now(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Patient not found.");

        // Defaults fill in when the therapist schedules for themselves.
        let (status, json) = schedule_session(&ctx, &t_token, &p1, None, Utc::now()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["session"]["duration"], 50);
        assert_eq!(json["session"]["type"], "individual");
        assert_eq!(json["session"]["status"], "scheduled");
        assert_eq!(json["session"]["therapist"]["name"], "T One");
    }

    #[tokio::test]
    async fn session_update_rules_per_role() {
        let (ctx, _tmp) = test_ctx();
        let (sup, _) = register(&ctx, "supervisor", "Dr. S", "sup@clinic.example").await;
        let (t1_token, _) = register(&ctx, "therapist", "T One", "t1@clinic.example").await;
        let (t2_token, _) = register(&ctx, "therapist", "T Two", "t2@clinic.example").await;
        let (p1_token, p1) = register(&ctx, "patient", "P One", "p1@clinic.example").await;
        let (p2_token, _) = register(&ctx, "patient", "P Two", "p2@clinic.example").await;

        let (_, json) = schedule_session(&ctx, &t1_token, &p1, None, Utc::now()).await;
        let session_id = json["session"]["id"].as_str().unwrap().to_string();
        let uri = format!("/api/sessions/{session_id}");

        // The assigned therapist completes the session with notes.
        let (status, json) = send(
            &ctx,
            Method::PUT,
            &uri,
            Some(&t1_token),
            Some(json!({
                "status": "completed",
                "notes": { "summary": "Good progress", "riskLevel": "low" },
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["session"]["status"], "completed");
        assert_eq!(json["session"]["notes"]["summary"], "Good progress");

        // Another therapist cannot even see it.
        let (status, json) = send(
            &ctx,
            Method::PUT,
            &uri,
            Some(&t2_token),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Session not found.");

        // An out-of-range rating is rejected outright.
        let (status, json) = send(
            &ctx,
            Method::PUT,
            &uri,
            Some(&p1_token),
            Some(json!({ "rating": 9 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Rating must be between 1 and 5.");

        // So is a patient update that carries no rating at all.
        let (status, json) = send(
            &ctx,
            Method::PUT,
            &uri,
            Some(&p1_token),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Rating must be between 1 and 5.");

        let (status, json) = send(
            &ctx,
            Method::PUT,
            &uri,
            Some(&p1_token),
            Some(json!({ "rating": 5, "status": "cancelled" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["session"]["rating"], 5);
        // A patient's update only carries the rating.
        assert_eq!(json["session"]["status"], "completed");

        // A different patient cannot rate someone else's session.
        let (status, _) = send(
            &ctx,
            Method::PUT,
            &uri,
            Some(&p2_token),
            Some(json!({ "rating": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // The supervisor can adjust anything.
        let (status, json) = send(
            &ctx,
            Method::PUT,
            &uri,
            Some(&sup),
            Some(json!({ "status": "no-show" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["session"]["status"], "no-show");
    }

    #[tokio::test]
    async fn session_list_filters_by_day() {
        let (ctx, _tmp) = test_ctx();
        let (_, _) = register(&ctx, "supervisor", "Dr. S", "sup@clinic.example").await;
        let (t_token, _) = register(&ctx, "therapist", "T One", "t1@clinic.example").await;
        let (_, p1) = register(&ctx, "patient", "P One", "p1@clinic.example").await;

        let now = Utc::now();
        schedule_session(&ctx, &t_token, &p1, None, now).await;
        schedule_session(&ctx, &t_token, &p1, None, now + chrono::Duration::days(3)).await;

        let today = now
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d")
            .to_string();
        let (status, json) = send(
            &ctx,
            Method::GET,
            &format!("/api/sessions?date={today}"),
            Some(&t_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 1);

        let (status, json) = send(
            &ctx,
            Method::GET,
            "/api/sessions?date=03-02-2026",
            Some(&t_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Invalid date filter.");
    }

    #[tokio::test]
    async fn mood_log_flow() {
        let (ctx, _tmp) = test_ctx();
        let (p_token, p_id) = register(&ctx, "patient", "P One", "p1@clinic.example").await;
        let (t_token, _) = register(&ctx, "therapist", "T One", "t1@clinic.example").await;

        let (status, json) = send(
            &ctx,
            Method::POST,
            "/api/moods",
            Some(&p_token),
            Some(json!({ "score": 7 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Mood is required.");

        let (status, json) = send(
            &ctx,
            Method::POST,
            "/api/moods",
            Some(&p_token),
            Some(json!({ "mood": "Anxious", "score": 11 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Score must be between 1 and 10.");

        let (status, json) = send(
            &ctx,
            Method::POST,
            "/api/moods",
            Some(&p_token),
            Some(json!({ "mood": "Calm", "score": 8, "triggers": ["sleep"] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["entry"]["mood"], "Calm");

        // Therapists cannot log moods.
        let (status, _) = send(
            &ctx,
            Method::POST,
            "/api/moods",
            Some(&t_token),
            Some(json!({ "mood": "Calm" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Patients read their own history; staff must name the patient.
        let (status, json) = send(&ctx, Method::GET, "/api/moods", Some(&p_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["moods"].as_array().unwrap().len(), 1);
        assert_eq!(json["weeklyAvg"], 8.0);

        let (status, json) = send(&ctx, Method::GET, "/api/moods", Some(&t_token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Patient ID required.");

        let (status, json) = send(
            &ctx,
            Method::GET,
            &format!("/api/moods?patientId={p_id}"),
            Some(&t_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["moods"][0]["mood"], "Calm");
    }

    #[tokio::test]
    async fn patient_detail_aggregates_chart_data() {
        let (ctx, _tmp) = test_ctx();
        let (sup, _) = register(&ctx, "supervisor", "Dr. S", "sup@clinic.example").await;
        let (t_token, t1) = register(&ctx, "therapist", "T One", "t1@clinic.example").await;
        let (_, p1) = register(&ctx, "patient", "P One", "p1@clinic.example").await;

        create_assignment(&ctx, &sup, &p1, &t1).await;
        let (_, json) = schedule_session(&ctx, &t_token, &p1, None, Utc::now()).await;
        let session_id = json["session"]["id"].as_str().unwrap().to_string();
        send(
            &ctx,
            Method::PUT,
            &format!("/api/sessions/{session_id}"),
            Some(&t_token),
            Some(json!({ "status": "completed" })),
        )
        .await;

        let (status, json) = send(
            &ctx,
            Method::GET,
            &format!("/api/patients/{p1}"),
            Some(&t_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["patient"]["name"], "P One");
        assert_eq!(json["assignment"]["therapist"]["name"], "T One");
        assert_eq!(json["sessions"].as_array().unwrap().len(), 1);
        assert_eq!(json["sessionCount"], 1);

        // Therapist ids do not resolve as patients.
        let (status, json) = send(
            &ctx,
            Method::GET,
            &format!("/api/patients/{t1}"),
            Some(&sup),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Patient not found.");
    }

    #[tokio::test]
    async fn therapist_roster_reports_workload() {
        let (ctx, _tmp) = test_ctx();
        let (sup, _) = register(&ctx, "supervisor", "Dr. S", "sup@clinic.example").await;
        let (t_token, t1) = register(&ctx, "therapist", "T One", "t1@clinic.example").await;
        let (_, p1) = register(&ctx, "patient", "P One", "p1@clinic.example").await;
        let (_, p2) = register(&ctx, "patient", "P Two", "p2@clinic.example").await;

        create_assignment(&ctx, &sup, &p1, &t1).await;
        create_assignment(&ctx, &sup, &p2, &t1).await;
        schedule_session(&ctx, &t_token, &p1, None, Utc::now()).await;

        let (status, json) = send(&ctx, Method::GET, "/api/therapists", Some(&sup), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 1);
        assert_eq!(json["therapists"][0]["name"], "T One");
        assert_eq!(json["therapists"][0]["caseload"], 2);
        assert_eq!(json["therapists"][0]["todaySessions"], 1);

        // The roster is supervisor-only.
        let (status, _) = send(&ctx, Method::GET, "/api/therapists", Some(&t_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = send(
            &ctx,
            Method::GET,
            &format!("/api/therapists/{t1}"),
            Some(&t_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["caseload"], 2);
        assert_eq!(json["patients"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn dashboards_aggregate_clinic_state() {
        let (ctx, _tmp) = test_ctx();
        let (sup, _) = register(&ctx, "supervisor", "Dr. S", "sup@clinic.example").await;
        let (t_token, t1) = register(&ctx, "therapist", "T One", "t1@clinic.example").await;
        let (p_token, p1) = register(&ctx, "patient", "P One", "p1@clinic.example").await;
        let (_, _p2) = register(&ctx, "patient", "P Two", "p2@clinic.example").await;

        create_assignment(&ctx, &sup, &p1, &t1).await;
        let (_, json) = schedule_session(&ctx, &t_token, &p1, None, Utc::now()).await;
        let session_id = json["session"]["id"].as_str().unwrap().to_string();
        send(
            &ctx,
            Method::PUT,
            &format!("/api/sessions/{session_id}"),
            Some(&t_token),
            Some(json!({ "status": "completed" })),
        )
        .await;
        send(
            &ctx,
            Method::PUT,
            &format!("/api/sessions/{session_id}"),
            Some(&p_token),
            Some(json!({ "rating": 4 })),
        )
        .await;
        schedule_session(
            &ctx,
            &t_token,
            &p1,
            None,
            Utc::now() + chrono::Duration::days(1),
        )
        .await;

        let (status, json) =
            send(&ctx, Method::GET, "/api/dashboard/supervisor", Some(&sup), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["stats"]["totalTherapists"], 1);
        assert_eq!(json["stats"]["totalPatients"], 2);
        assert_eq!(json["stats"]["totalSessions"], 2);
        assert_eq!(json["stats"]["unassigned"], 1);
        assert_eq!(json["stats"]["todaySessions"], 1);
        assert_eq!(json["stats"]["cancelledToday"], 0);
        assert_eq!(json["caseloads"][0]["name"], "T One");
        assert_eq!(json["caseloads"][0]["caseload"], 1);

        let (status, json) =
            send(&ctx, Method::GET, "/api/dashboard/therapist", Some(&t_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["stats"]["activePatients"], 1);
        assert_eq!(json["stats"]["completedSessions"], 1);
        assert_eq!(json["stats"]["avgRating"], "4.0");
        assert_eq!(json["stats"]["todayCount"], 1);

        let (status, json) =
            send(&ctx, Method::GET, "/api/dashboard/patient", Some(&p_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["assignment"]["therapist"]["name"], "T One");
        assert_eq!(json["stats"]["completedSessions"], 1);
        assert_eq!(json["upcoming"].as_array().unwrap().len(), 1);
        assert_eq!(json["upcoming"][0]["status"], "scheduled");
    }

    #[tokio::test]
    async fn profile_updates_whitelisted_fields() {
        let (ctx, _tmp) = test_ctx();
        let (token, _) = register(&ctx, "patient", "Old Name", "profile@clinic.example").await;

        let (status, json) = send(
            &ctx,
            Method::PUT,
            "/api/auth/updateprofile",
            Some(&token),
            Some(json!({
                "name": "New Name",
                "phone": "9998887776",
                "emergencyContact": { "name": "Kin", "phone": "1112223334" },
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["user"]["name"], "New Name");
        assert_eq!(json["user"]["phone"], "9998887776");
        assert_eq!(json["user"]["emergencyContact"]["name"], "Kin");
        assert_eq!(json["user"]["email"], "profile@clinic.example");
    }

    #[tokio::test]
    async fn unknown_route_returns_envelope_404() {
        let (ctx, _tmp) = test_ctx();
        let (status, json) = send(&ctx, Method::GET, "/api/nonexistent", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Route not found.");
    }

    #[tokio::test]
    async fn registration_validates_in_order() {
        let (ctx, _tmp) = test_ctx();

        let cases = [
            (json!({ "email": "a@b.example", "password": "password123", "role": "patient" }), "Name is required"),
            (json!({ "name": "A", "email": "nope", "password": "password123", "role": "patient" }), "Valid email required"),
            (json!({ "name": "A", "email": "a@b.example", "password": "short", "role": "patient" }), "Password must be at least 6 chars"),
            (json!({ "name": "A", "email": "a@b.example", "password": "password123", "role": "admin" }), "Invalid role"),
        ];
        for (body, message) in cases {
            let (status, json) =
                send(&ctx, Method::POST, "/api/auth/register", None, Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["message"], message);
        }
    }

    #[tokio::test]
    async fn patient_list_scopes_to_active_caseload() {
        let (ctx, _tmp) = test_ctx();
        let (sup, _) = register(&ctx, "supervisor", "Dr. S", "sup@clinic.example").await;
        let (t1_token, t1) = register(&ctx, "therapist", "T One", "t1@clinic.example").await;
        let (p1_token, p1) = register(&ctx, "patient", "P One", "p1@clinic.example").await;
        register(&ctx, "patient", "P Two", "p2@clinic.example").await;

        create_assignment(&ctx, &sup, &p1, &t1).await;

        let (_, json) = send(&ctx, Method::GET, "/api/patients", Some(&sup), None).await;
        assert_eq!(json["count"], 2);

        let (_, json) = send(&ctx, Method::GET, "/api/patients", Some(&t1_token), None).await;
        assert_eq!(json["count"], 1);
        assert_eq!(json["patients"][0]["name"], "P One");

        let (status, _) = send(&ctx, Method::GET, "/api/patients", Some(&p1_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

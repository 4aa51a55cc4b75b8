//! Demo dataset.
//!
//! `--seed` wipes the database and repopulates it with a small clinic
//! roster so every role has something to look at right away.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::{
    Assignment, AssignmentPriority, AssignmentStatus, EmergencyContact, MoodEntry, RiskLevel,
    Role, Session, SessionNotes, SessionStatus, SessionType, User,
};

pub const DEMO_PASSWORD: &str = "password123";

/// Wipe everything and repopulate with the demo clinic.
pub fn seed_demo_data(conn: &Connection, password_iterations: u32) -> Result<(), DatabaseError> {
    // Children before parents to stay ahead of the foreign keys.
    for table in ["moods", "sessions", "assignments", "users"] {
        conn.execute(&format!("DELETE FROM {table}"), [])?;
    }

    let now = Utc::now();
    let day = |n: i64| now + Duration::days(n);
    // Every demo account shares one credential, so hash it once.
    let credential = hash_password(DEMO_PASSWORD, password_iterations);

    let mut supervisor = base_user(
        "Dr. S. Malhotra",
        "supervisor@mgmhospital.in",
        Role::Supervisor,
        &credential,
        now,
    );
    supervisor.department = Some("Mental Health Division".into());
    supervisor.supervisor_level = Some("Head of Department".into());
    repository::insert_user(conn, &supervisor)?;

    let therapist_rows: [(&str, &str, &[&str], &str, &str); 5] = [
        ("Dr. Riya Mehta", "riya.mehta@mgmhospital.in", &["CBT", "Anxiety", "Depression"], "2045", "OPD Block"),
        ("Dr. Arjun Kapoor", "arjun.kapoor@mgmhospital.in", &["Trauma", "PTSD", "EMDR"], "2046", "IPD Block"),
        ("Dr. Fatima Sheikh", "fatima.sheikh@mgmhospital.in", &["DBT", "BPD", "Group Therapy"], "2047", "OPD Block"),
        ("Dr. Vimal Singh", "vimal.singh@mgmhospital.in", &["OCD", "CBT", "ERP"], "2048", "OPD Block"),
        ("Dr. Lakshmi Iyer", "lakshmi.iyer@mgmhospital.in", &["Child Therapy", "Play Therapy"], "2049", "Pediatrics"),
    ];
    let mut therapists = Vec::new();
    for (name, email, specializations, extension, department) in therapist_rows {
        let mut user = base_user(name, email, Role::Therapist, &credential, now);
        user.specializations = specializations.iter().map(|s| s.to_string()).collect();
        user.extension = Some(extension.into());
        user.department = Some(department.into());
        repository::insert_user(conn, &user)?;
        therapists.push(user);
    }

    let patient_rows = [
        ("Aarav Sharma", "aarav.sharma@gmail.com", "Male", (1997, 3, 14), "9876543210"),
        ("Priya Nair", "priya.nair@gmail.com", "Female", (1991, 7, 22), "9876543211"),
        ("Karan Patel", "karan.patel@gmail.com", "Male", (2003, 11, 5), "9876543212"),
        ("Sunita Rao", "sunita.rao@gmail.com", "Female", (1980, 2, 18), "9876543213"),
        ("Rajan Iyer", "rajan.iyer@gmail.com", "Male", (1970, 9, 1), "9876543214"),
        ("Meena Das", "meena.das@gmail.com", "Female", (1994, 5, 30), "9876543215"),
        ("Meera Joshi", "meera.joshi@gmail.com", "Female", (1999, 1, 12), "9876543216"),
        ("Rohan Kulkarni", "rohan.k@gmail.com", "Male", (1988, 6, 25), "9876543217"),
    ];
    let mut patients = Vec::new();
    for (name, email, gender, (y, m, d), phone) in patient_rows {
        let mut user = base_user(name, email, Role::Patient, &credential, now);
        user.gender = Some(gender.into());
        user.date_of_birth = NaiveDate::from_ymd_opt(y, m, d);
        user.phone = Some(phone.into());
        repository::insert_user(conn, &user)?;
        patients.push(user);
    }

    // The last two patients stay unassigned so the intake queue is not
    // empty.
    let assignment_rows = [
        (0, 0, "Major Depressive Disorder", AssignmentPriority::Normal),
        (1, 0, "Generalized Anxiety Disorder", AssignmentPriority::Normal),
        (2, 1, "PTSD", AssignmentPriority::Urgent),
        (3, 2, "Borderline Personality Disorder", AssignmentPriority::Normal),
        (4, 3, "OCD", AssignmentPriority::Normal),
        (5, 0, "Depression", AssignmentPriority::Normal),
    ];
    let mut assignments = Vec::new();
    for (p, t, diagnosis, priority) in assignment_rows {
        let assignment = Assignment {
            id: Uuid::new_v4(),
            patient_id: patients[p].id,
            therapist_id: therapists[t].id,
            supervisor_id: supervisor.id,
            status: AssignmentStatus::Active,
            priority,
            start_date: now,
            end_date: None,
            diagnosis: Some(diagnosis.into()),
            treatment_plan: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        repository::insert_assignment(conn, &assignment)?;
        assignments.push(assignment);
    }

    let base_session = |patient: &User, therapist: &User, date: DateTime<Utc>| Session {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        therapist_id: therapist.id,
        assignment_id: assignments
            .iter()
            .find(|a| a.patient_id == patient.id)
            .map(|a| a.id),
        date,
        duration: 50,
        session_type: SessionType::Individual,
        therapy: None,
        module: None,
        status: SessionStatus::Scheduled,
        location: None,
        notes: SessionNotes::default(),
        rating: None,
        created_at: now,
        updated_at: now,
    };

    let mut session = base_session(&patients[0], &therapists[0], day(-7));
    session.status = SessionStatus::Completed;
    session.therapy = Some("CBT".into());
    session.module = Some("Module 1".into());
    session.notes = SessionNotes {
        summary: Some("Initial assessment, mood low".into()),
        next_steps: Some("Daily journaling".into()),
        ..SessionNotes::default()
    };
    session.rating = Some(5);
    repository::insert_session(conn, &session)?;

    let mut session = base_session(&patients[0], &therapists[0], day(-3));
    session.status = SessionStatus::Completed;
    session.therapy = Some("CBT".into());
    session.module = Some("Module 2".into());
    session.notes = SessionNotes {
        summary: Some("Improved mood, thought records".into()),
        next_steps: Some("Practice ABC model".into()),
        ..SessionNotes::default()
    };
    session.rating = Some(5);
    repository::insert_session(conn, &session)?;

    let mut session = base_session(&patients[0], &therapists[0], day(2));
    session.therapy = Some("CBT".into());
    session.module = Some("Module 3".into());
    session.location = Some("Room 204 OPD".into());
    repository::insert_session(conn, &session)?;

    let mut session = base_session(&patients[1], &therapists[0], day(-5));
    session.status = SessionStatus::Completed;
    session.therapy = Some("CBT".into());
    session.notes = SessionNotes {
        summary: Some("High anxiety, breathing exercises".into()),
        risk_level: RiskLevel::Medium,
        ..SessionNotes::default()
    };
    session.rating = Some(4);
    repository::insert_session(conn, &session)?;

    let mut session = base_session(&patients[1], &therapists[0], day(1));
    session.therapy = Some("CBT".into());
    session.location = Some("Room 204 OPD".into());
    repository::insert_session(conn, &session)?;

    let mut session = base_session(&patients[2], &therapists[1], day(-2));
    session.status = SessionStatus::Completed;
    session.therapy = Some("EMDR".into());
    session.duration = 60;
    session.notes = SessionNotes {
        summary: Some("Processing trauma memory".into()),
        risk_level: RiskLevel::High,
        ..SessionNotes::default()
    };
    session.rating = Some(4);
    repository::insert_session(conn, &session)?;

    let mut session = base_session(&patients[3], &therapists[2], day(-1));
    session.status = SessionStatus::Completed;
    session.session_type = SessionType::Group;
    session.therapy = Some("DBT".into());
    session.duration = 90;
    session.notes = SessionNotes {
        summary: Some("Group session, good participation".into()),
        ..SessionNotes::default()
    };
    session.rating = Some(5);
    repository::insert_session(conn, &session)?;

    let mood_rows = [
        ("Calm", 7, "😌", "Had a good morning", -6),
        ("Anxious", 4, "😟", "Work stress", -5),
        ("Happy", 8, "😊", "Session helped a lot", -3),
        ("Motivated", 9, "🔥", "Completed homework", -1),
    ];
    for (mood, score, emoji, note, offset) in mood_rows {
        let entry = MoodEntry {
            id: Uuid::new_v4(),
            patient_id: patients[0].id,
            mood: mood.into(),
            score: Some(score),
            emoji: Some(emoji.into()),
            note: Some(note.into()),
            triggers: Vec::new(),
            activities: Vec::new(),
            created_at: day(offset),
        };
        repository::insert_mood(conn, &entry)?;
    }

    tracing::info!("demo data seeded");
    tracing::info!("supervisor login: supervisor@mgmhospital.in / {DEMO_PASSWORD}");
    tracing::info!("therapist login:  riya.mehta@mgmhospital.in / {DEMO_PASSWORD}");
    tracing::info!("patient login:    aarav.sharma@gmail.com / {DEMO_PASSWORD}");

    Ok(())
}

fn base_user(
    name: &str,
    email: &str,
    role: Role,
    credential: &str,
    now: DateTime<Utc>,
) -> User {
    User {
        id: Uuid::new_v4(),
        name: name.into(),
        email: email.into(),
        password_hash: credential.into(),
        role,
        avatar: String::new(),
        is_active: true,
        specializations: Vec::new(),
        license_number: None,
        department: None,
        extension: None,
        date_of_birth: None,
        gender: None,
        blood_group: None,
        phone: None,
        address: None,
        emergency_contact: EmergencyContact::default(),
        supervisor_level: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::db::sqlite::open_memory_database;

    const TEST_ITERATIONS: u32 = 1_000;

    #[test]
    fn seed_populates_a_consistent_clinic() {
        let conn = open_memory_database().unwrap();
        seed_demo_data(&conn, TEST_ITERATIONS).unwrap();

        assert_eq!(
            repository::count_users_by_role(&conn, Role::Supervisor, false).unwrap(),
            1
        );
        assert_eq!(
            repository::count_users_by_role(&conn, Role::Therapist, false).unwrap(),
            5
        );
        assert_eq!(
            repository::count_users_by_role(&conn, Role::Patient, false).unwrap(),
            8
        );
        assert_eq!(repository::count_unassigned_patients(&conn).unwrap(), 2);
        assert_eq!(
            repository::count_sessions(&conn, &Default::default()).unwrap(),
            7
        );

        let riya = repository::get_user_by_email(&conn, "riya.mehta@mgmhospital.in")
            .unwrap()
            .unwrap();
        assert!(verify_password(DEMO_PASSWORD, &riya.password_hash));
        assert_eq!(
            repository::count_active_for_therapist(&conn, riya.id).unwrap(),
            3
        );

        let aarav = repository::get_user_by_email(&conn, "aarav.sharma@gmail.com")
            .unwrap()
            .unwrap();
        let moods = repository::list_moods_for_patient(&conn, aarav.id, 30).unwrap();
        assert_eq!(moods.len(), 4);
        assert_eq!(moods[0].mood, "Motivated");

        // Seeded sessions carry their patient's assignment.
        let sessions = repository::list_sessions(
            &conn,
            &repository::SessionFilter {
                patient_id: Some(aarav.id),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(sessions.len(), 3);
        assert!(sessions.iter().all(|s| s.assignment_id.is_some()));
    }

    #[test]
    fn seeding_twice_replaces_rather_than_duplicates() {
        let conn = open_memory_database().unwrap();
        seed_demo_data(&conn, TEST_ITERATIONS).unwrap();
        seed_demo_data(&conn, TEST_ITERATIONS).unwrap();

        assert_eq!(
            repository::count_users_by_role(&conn, Role::Patient, false).unwrap(),
            8
        );
        assert_eq!(
            repository::count_sessions(&conn, &Default::default()).unwrap(),
            7
        );
    }
}

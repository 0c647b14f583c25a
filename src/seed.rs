//! Sample data for demos and local development. Rows go through `CrudService` and
//! `AuthService`, so they obey the same validation and constraints as API writes.

use crate::auth::SignupRequest;
use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::service::CrudService;
use crate::state::AppState;
use crate::store::Row;
use serde_json::{json, Value};
use tracing::info;

pub const TEST_EMAIL: &str = "test@example.com";
pub const TEST_PASSWORD: &str = "password123";

const SPECIALTIES: [&str; 5] = ["Mathematics", "Physics", "Chemistry", "Biology", "Computer Science"];
const COURSE_CODES: [&str; 5] = ["MTH101", "PHY101", "CHM101", "BIO101", "CSC101"];
const INSTRUCTORS: [(&str, &str); 5] = [
    ("mhopper", "Margaret Hopper"),
    ("rfeynman", "Richard Feynman"),
    ("mcurie", "Marie Curie"),
    ("rfranklin", "Rosalind Franklin"),
    ("aturing", "Alan Turing"),
];
const STUDENTS: [&str; 20] = [
    "aaliyah", "bruno", "chen", "dara", "elif", "farid", "greta", "hiro", "ines", "jonas",
    "kemi", "liam", "maya", "nils", "oona", "pavel", "quinn", "rosa", "sami", "tomas",
];
const SEMESTERS: [&str; 3] = ["phase1", "phase2", "phase3"];
const STATUSES: [&str; 3] = ["enrolled", "completed", "dropped"];
const GRADES: [&str; 5] = ["A", "B", "C", "D", "F"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub instructors: usize,
    pub courses: usize,
    pub students: usize,
    pub enrollments: usize,
}

/// Fill the store with sample rows and the test account. Returns `None` without writing when
/// the test account already exists.
pub async fn seed(state: &AppState) -> Result<Option<SeedSummary>, AppError> {
    if state.store.find_user_by_email(TEST_EMAIL).await?.is_some() {
        info!("sample data already present; skipping seed");
        return Ok(None);
    }
    let mut summary = SeedSummary::default();

    let mut instructor_ids = Vec::new();
    for (i, (username, name)) in INSTRUCTORS.iter().enumerate() {
        let row = insert(
            state,
            "instructors",
            json!({
                "username": username,
                "email": format!("{}@coursehub.edu", username),
                "name": name,
                "specialty": SPECIALTIES[i],
            }),
        )
        .await?;
        instructor_ids.push(row_id(&row)?);
    }
    summary.instructors = instructor_ids.len();

    let mut course_ids = Vec::new();
    for (i, (title, code)) in SPECIALTIES.iter().zip(COURSE_CODES).enumerate() {
        let row = insert(
            state,
            "courses",
            json!({
                "title": title,
                "course_code": code,
                "description": format!("Introduction to {}", title),
                "credit_hours": 3,
                "max_capacity": 30,
                "instructor_id": instructor_ids[i],
            }),
        )
        .await?;
        course_ids.push(row_id(&row)?);
    }
    summary.courses = course_ids.len();

    for (i, username) in STUDENTS.iter().enumerate() {
        let student = insert(
            state,
            "students",
            json!({
                "username": username,
                "email": format!("{}@students.coursehub.edu", username),
                "student_id": format!("S{:03}", i + 1),
                "major": SPECIALTIES[i % SPECIALTIES.len()],
                "enrollment_year": 2020 + (i % 4) as i64,
            }),
        )
        .await?;
        let student_id = row_id(&student)?;
        summary.students += 1;

        let count = 3 + i % 3;
        for k in 0..count {
            let status = STATUSES[(i + 2 * k) % STATUSES.len()];
            let grade = (status == "completed").then(|| GRADES[(i + k) % GRADES.len()]);
            insert(
                state,
                "enrollments",
                json!({
                    "student_id": student_id,
                    "course_id": course_ids[(i + k) % course_ids.len()],
                    "semester": SEMESTERS[(i + k) % SEMESTERS.len()],
                    "status": status,
                    "grade": grade,
                }),
            )
            .await?;
            summary.enrollments += 1;
        }
    }

    state
        .auth
        .signup(SignupRequest {
            name: Some("testuser".into()),
            email: Some(TEST_EMAIL.into()),
            password: Some(TEST_PASSWORD.into()),
        })
        .await?;

    info!(
        instructors = summary.instructors,
        courses = summary.courses,
        students = summary.students,
        enrollments = summary.enrollments,
        "sample data seeded"
    );
    Ok(Some(summary))
}

async fn insert(state: &AppState, path: &str, body: Value) -> Result<Row, AppError> {
    CrudService::create(state.store.as_ref(), entity(state, path)?, &body).await
}

fn entity<'a>(state: &'a AppState, path: &str) -> Result<&'a ResolvedEntity, AppError> {
    state
        .model
        .entity_by_path(path)
        .ok_or_else(|| AppError::Internal(format!("sample data needs the {} resource", path)))
}

fn row_id(row: &Row) -> Result<i64, AppError> {
    row.get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| AppError::Internal("created row has no id".into()))
}

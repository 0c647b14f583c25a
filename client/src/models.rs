//! Wire types for the four resources and the auth endpoints.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A resource served under `/api/{PATH}`.
pub trait Resource: DeserializeOwned {
    const PATH: &'static str;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: User,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct MessageBody {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Instructor {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub course_code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub credit_hours: Option<i32>,
    #[serde(default)]
    pub max_capacity: Option<i32>,
    #[serde(default)]
    pub instructor_id: Option<i64>,
    /// Present on list/read responses.
    #[serde(default)]
    pub instructor: Option<Instructor>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Student {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub student_id: String,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub enrollment_year: Option<i32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub semester: String,
    pub status: String,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub student: Option<Student>,
    #[serde(default)]
    pub course: Option<Course>,
    #[serde(default)]
    pub enrolled_at: Option<DateTime<Utc>>,
}

impl Resource for Instructor {
    const PATH: &'static str = "instructors";
}

impl Resource for Course {
    const PATH: &'static str = "courses";
}

impl Resource for Student {
    const PATH: &'static str = "students";
}

impl Resource for Enrollment {
    const PATH: &'static str = "enrollments";
}

/// Create or patch body. Unset fields are omitted, so the same type serves both.
#[derive(Clone, Debug, Default, Serialize)]
pub struct InstructorInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CourseInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_hours: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_id: Option<i64>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct StudentInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_year: Option<i32>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct EnrollmentInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
}

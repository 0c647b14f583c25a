//! Client data layer for the CourseHub API.
//!
//! [`ApiClient`] attaches the bearer token from its [`Session`] slot, sends JSON, and applies one
//! policy to every call: a 401 outside `/auth/` clears the session and surfaces
//! [`ClientError::AuthenticationRequired`]. [`search`] filters already-fetched lists.

pub mod client;
pub mod error;
pub mod models;
pub mod search;
pub mod session;

pub use client::ApiClient;
pub use error::ClientError;
pub use models::{
    AuthResponse, Course, CourseInput, Enrollment, EnrollmentInput, Instructor, InstructorInput,
    Resource, Student, StudentInput, User,
};
pub use search::{SearchQuery, SearchScope, Searchable};
pub use session::{Session, SessionSlot};

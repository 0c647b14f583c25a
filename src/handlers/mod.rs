//! HTTP handlers for entity CRUD, authentication and users.

pub mod auth;
pub mod entity;
pub mod users;

//! OpenAPI document for the API, with the bearer security scheme.

use crate::auth::{AuthResponse, LoginRequest, SignupRequest};
use crate::handlers::{auth, entity, users};
use crate::response::MessageBody;
use crate::store::PublicUser;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup,
        auth::login,
        auth::logout,
        users::list_users,
        users::get_user,
        entity::list,
        entity::create,
        entity::read,
        entity::update,
        entity::replace,
        entity::delete,
        entity::children
    ),
    components(schemas(SignupRequest, LoginRequest, AuthResponse, PublicUser, MessageBody)),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Signup, login and logout"),
        (name = "Users", description = "Registered accounts"),
        (name = "Resources", description = "Courses, students, instructors and enrollments"),
    ),
    info(
        title = "CourseHub API",
        version = "0.1.0",
        description = "Course administration API"
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_resource_paths_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/{entity}/{id}"));
        assert!(doc.paths.paths.contains_key("/api/auth/signup"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("jwt"));
    }
}

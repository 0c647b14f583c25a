//! End-to-end behaviour of the HTTP API over the in-memory store.

use argon2::Params;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use coursehub::auth::{AuthService, Passwords, TokenIssuer};
use coursehub::{build_app, builtin_config, resolve, AppState, FullConfig, MemoryStore, Store};
use rstest::rstest;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
}

impl TestApp {
    fn with_config(config: FullConfig) -> Self {
        let model = resolve(&config).expect("model");
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let auth = AuthService::new(
            store.clone(),
            Passwords::with_params(Params::new(1024, 1, 1, None).expect("params")),
            TokenIssuer::new(b"integration-secret", Duration::hours(1)),
        );
        TestApp {
            router: build_app(AppState::new(store, model, auth), 64 * 1024),
        }
    }

    fn new() -> Self {
        Self::with_config(builtin_config().expect("builtin"))
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send_raw(method, uri, token, body.map(|v| v.to_string())).await
    }

    /// Like `send` with the body passed through verbatim, so it need not be valid JSON.
    async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
        }
        let body = match body {
            Some(raw) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(raw)
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn token(&self) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/signup",
                None,
                Some(json!({ "name": "Admin", "email": "admin@uni.edu", "password": "s3cret!" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().expect("token").to_string()
    }

    async fn create(&self, token: &str, path: &str, body: Value) -> Value {
        let (status, row) = self
            .send(Method::POST, &format!("/api/{}", path), Some(token), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{row}");
        row
    }
}

fn id(row: &Value) -> i64 {
    row["id"].as_i64().expect("id")
}

/// A student, a course and an enrollment joining them.
async fn enrolled(app: &TestApp, token: &str) -> (Value, Value, Value) {
    let student = app
        .create(token, "students", json!({ "username": "jdoe", "email": "j@example.com", "student_id": "S001" }))
        .await;
    let course = app
        .create(token, "courses", json!({ "title": "Databases", "course_code": "CS340" }))
        .await;
    let enrollment = app
        .create(
            token,
            "enrollments",
            json!({ "student_id": id(&student), "course_id": id(&course), "semester": "Fall 2024" }),
        )
        .await;
    (student, course, enrollment)
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/api/courses", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access token required");

    let (status, body) = app.send(Method::GET, "/api/courses", Some("forged.token.value"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn signup_login_and_logout() {
    let app = TestApp::new();
    let signup = json!({ "name": "Ada", "email": "ada@uni.edu", "password": "pw-1234" });
    let (status, body) = app.send(Method::POST, "/api/auth/signup", None, Some(signup.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User created successfully");
    assert_eq!(body["user"], json!({ "id": 1, "name": "Ada", "email": "ada@uni.edu" }));

    let (status, body) = app.send(Method::POST, "/api/auth/signup", None, Some(signup)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already exists");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@uni.edu", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@uni.edu", "password": "pw-1234" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    let token = body["token"].as_str().expect("token");
    let (status, _) = app.send(Method::GET, "/api/students", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(Method::POST, "/api/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logout successful");
}

#[tokio::test]
async fn signup_requires_every_field() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::POST, "/api/auth/signup", None, Some(json!({ "email": "a@b.co" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn users_never_expose_password_hashes() {
    let app = TestApp::new();
    let token = app.token().await;
    let (status, body) = app.send(Method::GET, "/api/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "id": 1, "name": "Admin", "email": "admin@uni.edu" }]));
    let (status, _) = app.send(Method::GET, "/api/users/42", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn created_student_reads_back() {
    let app = TestApp::new();
    let token = app.token().await;
    let input = json!({
        "username": "jdoe",
        "email": "j@example.com",
        "student_id": "S001",
        "major": "Computer Science"
    });
    let created = app.create(&token, "students", input.clone()).await;
    for key in ["username", "email", "student_id", "major"] {
        assert_eq!(created[key], input[key]);
    }
    let (status, fetched) = app
        .send(Method::GET, &format!("/api/students/{}", id(&created)), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[rstest]
#[case("instructors", json!({ "username": "grace", "email": "g@uni.edu", "name": "Grace" }), json!({ "specialty": "Compilers" }))]
#[case("courses", json!({ "title": "Algebra", "course_code": "MTH101", "credit_hours": "3" }), json!({ "max_capacity": 30 }))]
#[case("students", json!({ "username": "ada", "email": "ada@uni.edu", "student_id": "S002" }), json!({ "enrollment_year": 2024 }))]
#[tokio::test]
async fn crud_lifecycle(#[case] path: &str, #[case] body: Value, #[case] patch: Value) {
    let app = TestApp::new();
    let token = app.token().await;
    let created = app.create(&token, path, body).await;
    let row_id = id(&created);
    let item = format!("/api/{}/{}", path, row_id);

    let (_, list) = app.send(Method::GET, &format!("/api/{}", path), Some(&token), None).await;
    assert!(list.as_array().expect("array").iter().any(|r| r["id"] == created["id"]));

    let (status, updated) = app.send(Method::PATCH, &item, Some(&token), Some(patch.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (_, fetched) = app.send(Method::GET, &item, Some(&token), None).await;
    for (key, value) in created.as_object().expect("object") {
        match patch.get(key) {
            Some(changed) => assert_eq!(&fetched[key], changed),
            None if key == "instructor" => {}
            None => assert_eq!(&fetched[key], value, "{key} changed"),
        }
    }
    assert_eq!(updated["id"], created["id"]);

    let (status, body) = app.send(Method::DELETE, &item, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().expect("message").ends_with("deleted successfully"));

    let (_, list) = app.send(Method::GET, &format!("/api/{}", path), Some(&token), None).await;
    assert!(!list.as_array().expect("array").iter().any(|r| r["id"] == created["id"]));
    let (status, _) = app.send(Method::PATCH, &item, Some(&token), Some(patch)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send(Method::DELETE, &item, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn enrollment_references_must_exist() {
    let app = TestApp::new();
    let token = app.token().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/enrollments",
            Some(&token),
            Some(json!({ "student_id": 9, "course_id": 9, "semester": "Fall 2024" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "reference_error");
}

#[rstest]
#[case(Method::PATCH, json!({ "course_id": 99 }))]
#[case(Method::PUT, json!({ "student_id": 1, "course_id": 99, "semester": "Fall 2024" }))]
#[case(Method::PATCH, json!({ "student_id": "42" }))]
#[tokio::test]
async fn updates_check_references(#[case] method: Method, #[case] body: Value) {
    let app = TestApp::new();
    let token = app.token().await;
    let (_, course, enrollment) = enrolled(&app, &token).await;
    let item = format!("/api/enrollments/{}", id(&enrollment));

    let (status, response) = app.send(method, &item, Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{response}");
    assert_eq!(response["code"], "reference_error");

    let (_, row) = app.send(Method::GET, &item, Some(&token), None).await;
    assert_eq!(row["course_id"], course["id"]);
    assert_eq!(row["student_id"], json!(1));
}

#[tokio::test]
async fn null_on_not_null_column_is_rejected() {
    let app = TestApp::new();
    let token = app.token().await;
    let (student, course, enrollment) = enrolled(&app, &token).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/enrollments",
            Some(&token),
            Some(json!({ "student_id": id(&student), "course_id": id(&course), "semester": "F24", "status": null })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body, json!({ "message": "status cannot be null", "code": "validation_error" }));

    let item = format!("/api/enrollments/{}", id(&enrollment));
    let (status, body) = app
        .send(Method::PATCH, &item, Some(&token), Some(json!({ "status": null })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["message"], "status cannot be null");

    let (_, row) = app.send(Method::GET, &item, Some(&token), None).await;
    assert_eq!(row["status"], "enrolled");
    let (_, list) = app.send(Method::GET, "/api/enrollments", Some(&token), None).await;
    assert_eq!(list.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn malformed_bodies_use_the_error_shape() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({ "name": 123, "email": "n@uni.edu", "password": "pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert!(body["message"].as_str().is_some_and(|m| m.starts_with("Invalid request body")));

    let (status, body) = app
        .send_raw(Method::POST, "/api/auth/login", None, Some("{not json".into()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "Request body is not valid JSON", "code": "validation_error" }));

    let token = app.token().await;
    let (status, body) = app
        .send_raw(Method::POST, "/api/courses", Some(&token), Some("[1,".into()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn enrollments_embed_and_restrict() {
    let app = TestApp::new();
    let token = app.token().await;
    let student = app
        .create(&token, "students", json!({ "username": "jdoe", "email": "j@example.com", "student_id": "S001" }))
        .await;
    let course = app
        .create(&token, "courses", json!({ "title": "Databases", "course_code": "CS340" }))
        .await;
    let other = app
        .create(&token, "courses", json!({ "title": "Networks", "course_code": "CS350" }))
        .await;
    let enrollment = app
        .create(
            &token,
            "enrollments",
            json!({ "student_id": id(&student).to_string(), "course_id": id(&course), "semester": "Fall 2024" }),
        )
        .await;
    assert_eq!(enrollment["status"], "enrolled");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/enrollments",
            Some(&token),
            Some(json!({ "student_id": id(&student), "course_id": id(&course), "semester": "Fall 2024" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (_, list) = app.send(Method::GET, "/api/enrollments", Some(&token), None).await;
    assert_eq!(list[0]["student"]["username"], "jdoe");
    assert_eq!(list[0]["course"]["title"], "Databases");

    let (_, children) = app
        .send(Method::GET, &format!("/api/courses/{}/enrollments", id(&course)), Some(&token), None)
        .await;
    assert_eq!(children.as_array().expect("array").len(), 1);
    let (_, children) = app
        .send(Method::GET, &format!("/api/courses/{}/enrollments", id(&other)), Some(&token), None)
        .await;
    assert_eq!(children, json!([]));

    let (status, body) = app
        .send(Method::DELETE, &format!("/api/students/{}", id(&student)), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn duplicate_course_code_conflicts() {
    let app = TestApp::new();
    let token = app.token().await;
    app.create(&token, "courses", json!({ "title": "Algebra", "course_code": "MTH101" })).await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/courses",
            Some(&token),
            Some(json!({ "title": "Algebra II", "course_code": "MTH101" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "course_code already exists");
}

#[rstest]
#[case(json!({ "username": "jdoe", "email": "j@example.com", "student_id": "001" }))]
#[case(json!({ "username": "jdoe", "email": "nope", "student_id": "S001" }))]
#[case(json!({ "email": "j@example.com", "student_id": "S001" }))]
#[tokio::test]
async fn invalid_students_are_rejected(#[case] body: Value) {
    let app = TestApp::new();
    let token = app.token().await;
    let (status, response) = app.send(Method::POST, "/api/students", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "validation_error");
    let (_, list) = app.send(Method::GET, "/api/students", Some(&token), None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn put_requires_required_fields() {
    let app = TestApp::new();
    let token = app.token().await;
    let course = app
        .create(&token, "courses", json!({ "title": "Algebra", "course_code": "MTH101" }))
        .await;
    let item = format!("/api/courses/{}", id(&course));
    let (status, _) = app
        .send(Method::PUT, &item, Some(&token), Some(json!({ "title": "Algebra I" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, row) = app
        .send(
            Method::PUT,
            &item,
            Some(&token),
            Some(json!({ "title": "Algebra I", "course_code": "MTH101" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(row["title"], "Algebra I");
}

#[tokio::test]
async fn put_replaces_every_column() {
    let app = TestApp::new();
    let token = app.token().await;
    let course = app
        .create(
            &token,
            "courses",
            json!({ "title": "D1", "course_code": "C1", "description": "old", "credit_hours": 3 }),
        )
        .await;
    let item = format!("/api/courses/{}", id(&course));
    let (status, row) = app
        .send(Method::PUT, &item, Some(&token), Some(json!({ "title": "D2", "course_code": "C1" })))
        .await;
    assert_eq!(status, StatusCode::OK, "{row}");
    assert_eq!(row["title"], "D2");
    assert_eq!(row["description"], Value::Null);
    assert_eq!(row["credit_hours"], Value::Null);

    let (_, row) = app
        .send(Method::PATCH, &item, Some(&token), Some(json!({ "description": "new" })))
        .await;
    assert_eq!(row["title"], "D2");
    assert_eq!(row["description"], "new");
}

#[tokio::test]
async fn unknown_resources_and_ids() {
    let app = TestApp::new();
    let token = app.token().await;
    let (status, _) = app.send(Method::GET, "/api/teachers", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = app.send(Method::GET, "/api/courses/77", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Course not found");
    let (status, _) = app.send(Method::GET, "/api/courses/abc", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn disabled_operations_are_not_allowed() {
    let mut config = builtin_config().expect("builtin");
    let courses = config
        .entities
        .iter_mut()
        .find(|e| e.path_segment == "courses")
        .expect("courses");
    courses.operations = vec!["list".into(), "read".into()];
    let app = TestApp::with_config(config);
    let token = app.token().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/courses",
            Some(&token),
            Some(json!({ "title": "Algebra", "course_code": "MTH101" })),
        )
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["code"], "method_not_allowed");
}

#[tokio::test]
async fn public_endpoints() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    let (status, body) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], "ok");
    let (status, body) = app.send(Method::GET, "/api/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/auth/login"].is_object());
}

//! Signup, login and token verification over the store.

use crate::auth::{AuthUser, Passwords, TokenIssuer};
use crate::error::AppError;
use crate::store::{NewUser, PublicUser, Store, UserRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: PublicUser,
}

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    passwords: Passwords,
    tokens: TokenIssuer,
}

fn present(field: &str, value: Option<&str>) -> Result<String, AppError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::Validation(format!("{} is required", field))),
    }
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, passwords: Passwords, tokens: TokenIssuer) -> Self {
        AuthService {
            store,
            passwords,
            tokens,
        }
    }

    #[instrument(name = "auth::signup", skip_all, err(Display))]
    pub async fn signup(&self, req: SignupRequest) -> Result<AuthResponse, AppError> {
        let name = present("name", req.name.as_deref())?;
        let email = present("email", req.email.as_deref())?;
        let password = req
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::Validation("password is required".into()))?;

        let password_hash = self.hash_blocking(password).await?;
        let user = self
            .store
            .insert_user(NewUser {
                name,
                email,
                password_hash,
            })
            .await?;
        info!(user_id = user.id, "user registered");
        self.respond("User created successfully", &user)
    }

    #[instrument(name = "auth::login", skip_all, err(Display))]
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AppError> {
        let email = present("email", req.email.as_deref())?;
        let password = req
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::Validation("password is required".into()))?;

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            return Err(AppError::Auth(INVALID_CREDENTIALS.into()));
        };
        let passwords = self.passwords.clone();
        let stored = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || passwords.verify(&stored, &password))
            .await
            .map_err(|e| AppError::Internal(format!("password task: {}", e)))??;
        if !matches {
            return Err(AppError::Auth(INVALID_CREDENTIALS.into()));
        }
        self.respond("Login successful", &user)
    }

    /// Gate for protected endpoints. `None` means no bearer token was supplied.
    pub fn verify(&self, token: Option<&str>) -> Result<AuthUser, AppError> {
        match token {
            Some(t) => self.tokens.verify(t),
            None => Err(AppError::Auth("Access token required".into())),
        }
    }

    async fn hash_blocking(&self, password: String) -> Result<String, AppError> {
        let passwords = self.passwords.clone();
        tokio::task::spawn_blocking(move || passwords.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("password task: {}", e)))?
    }

    fn respond(&self, message: &str, user: &UserRecord) -> Result<AuthResponse, AppError> {
        let token = self.tokens.issue(&AuthUser {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        })?;
        Ok(AuthResponse {
            message: message.into(),
            token,
            user: PublicUser::from(user),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use argon2::Params;
    use chrono::Duration;
    use rstest::{fixture, rstest};

    #[fixture]
    fn auth() -> AuthService {
        AuthService::new(
            Arc::new(MemoryStore::new()),
            Passwords::with_params(Params::new(1024, 1, 1, None).expect("params")),
            TokenIssuer::new(b"test-secret", Duration::hours(1)),
        )
    }

    fn signup(name: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: Some(name.into()),
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn signup_then_login_yields_verifiable_token(auth: AuthService) {
        let created = auth.signup(signup("Ada", "ada@uni.edu", "pw123456")).await.expect("signup");
        assert_eq!(created.message, "User created successfully");
        assert_eq!(created.user.email, "ada@uni.edu");

        let login = auth
            .login(LoginRequest {
                email: Some("ada@uni.edu".into()),
                password: Some("pw123456".into()),
            })
            .await
            .expect("login");
        let identity = auth.verify(Some(&login.token)).expect("verify");
        assert_eq!(identity.id, created.user.id);
        assert_eq!(identity.name, "Ada");
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_email_conflicts(auth: AuthService) {
        auth.signup(signup("Ada", "ada@uni.edu", "pw")).await.expect("first");
        let err = auth.signup(signup("Other", "ada@uni.edu", "pw2")).await.expect_err("dup");
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[rstest]
    #[case(signup("", "a@b.c", "pw"), "name is required")]
    #[case(signup("Ada", "  ", "pw"), "email is required")]
    #[case(signup("Ada", "a@b.c", ""), "password is required")]
    #[tokio::test]
    async fn signup_requires_every_field(
        auth: AuthService,
        #[case] req: SignupRequest,
        #[case] message: &str,
    ) {
        let err = auth.signup(req).await.expect_err("missing field");
        assert_eq!(err.to_string(), message);
    }

    #[rstest]
    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same(auth: AuthService) {
        auth.signup(signup("Ada", "ada@uni.edu", "right")).await.expect("signup");
        for (email, password) in [("ada@uni.edu", "wrong"), ("nobody@uni.edu", "right")] {
            let err = auth
                .login(LoginRequest {
                    email: Some(email.into()),
                    password: Some(password.into()),
                })
                .await
                .expect_err("rejected");
            assert!(matches!(err, AppError::Auth(ref m) if m == INVALID_CREDENTIALS));
        }
    }

    #[rstest]
    fn missing_token_is_auth_error(auth: AuthService) {
        assert!(matches!(auth.verify(None), Err(AppError::Auth(_))));
        assert!(matches!(auth.verify(Some("bogus")), Err(AppError::Forbidden(_))));
    }
}

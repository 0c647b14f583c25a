//! HTTP wrapper around the API.

use crate::error::ClientError;
use crate::models::{AuthResponse, MessageBody, Resource};
use crate::session::{Session, SessionSlot};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: SessionSlot,
}

impl ApiClient {
    /// `base_url` includes the API prefix, e.g. `http://localhost:5001/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        ApiClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: SessionSlot::default(),
        }
    }

    pub fn session(&self) -> &SessionSlot {
        &self.session
    }

    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ClientError> {
        let body = json!({ "name": name, "email": email, "password": password });
        let res: AuthResponse = self.request(Method::POST, "/auth/signup", Some(&body)).await?;
        self.remember(&res);
        Ok(res)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body = json!({ "email": email, "password": password });
        let res: AuthResponse = self.request(Method::POST, "/auth/login", Some(&body)).await?;
        self.remember(&res);
        Ok(res)
    }

    /// Clears the local session; the server call only acknowledges.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self
            .request::<MessageBody>(Method::POST, "/auth/logout", None)
            .await;
        self.session.clear();
        result.map(|_| ())
    }

    pub async fn list<R: Resource>(&self) -> Result<Vec<R>, ClientError> {
        self.request(Method::GET, &format!("/{}", R::PATH), None).await
    }

    pub async fn get<R: Resource>(&self, id: i64) -> Result<R, ClientError> {
        self.request(Method::GET, &format!("/{}/{}", R::PATH, id), None)
            .await
    }

    pub async fn create<R: Resource, B: Serialize>(&self, body: &B) -> Result<R, ClientError> {
        let body = to_value(body)?;
        self.request(Method::POST, &format!("/{}", R::PATH), Some(&body))
            .await
    }

    /// PATCH: only the fields present in `body` change.
    pub async fn update<R: Resource, B: Serialize>(
        &self,
        id: i64,
        body: &B,
    ) -> Result<R, ClientError> {
        let body = to_value(body)?;
        self.request(Method::PATCH, &format!("/{}/{}", R::PATH, id), Some(&body))
            .await
    }

    /// Returns the server's confirmation message.
    pub async fn delete<R: Resource>(&self, id: i64) -> Result<String, ClientError> {
        let res: MessageBody = self
            .request(Method::DELETE, &format!("/{}/{}", R::PATH, id), None)
            .await?;
        Ok(res.message)
    }

    /// The single request helper every call goes through.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut req = self.http.request(method.clone(), &url);
        if let Some(token) = self.session.token() {
            req = req.bearer_auth(token);
        }
        if let Some(b) = body {
            req = req.json(b);
        }
        let response = req.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED && !endpoint.starts_with("/auth/") {
                tracing::warn!(%method, endpoint, "session rejected; clearing credentials");
                self.session.clear();
                return Err(ClientError::AuthenticationRequired);
            }
            return Err(api_error(status, &bytes));
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::Decode(format!("{} {}: {}", method, endpoint, e)))
    }

    fn remember(&self, res: &AuthResponse) {
        self.session.set(Session {
            token: res.token.clone(),
            user: res.user.clone(),
        });
    }
}

fn to_value<B: Serialize>(body: &B) -> Result<Value, ClientError> {
    serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))
}

fn api_error(status: StatusCode, body: &[u8]) -> ClientError {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

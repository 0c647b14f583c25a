use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// A protected call came back 401; the session has been cleared and the caller should
    /// send the user to its login view.
    #[error("Authentication required")]
    AuthenticationRequired,
    /// Non-2xx response. `message` is the server's text, or `HTTP error! status: N`.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("decode: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::AuthenticationRequired => Some(401),
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

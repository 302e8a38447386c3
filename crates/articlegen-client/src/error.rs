use crate::gateway::GatewayError;

pub const DEFAULT_LOGIN_FAILURE_MESSAGE: &str = "Invalid username or password";
pub const DEFAULT_GENERATION_FAILURE_MESSAGE: &str =
    "Failed to generate article. Please try again.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Rejected locally; nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Credentials were rejected at login.
    #[error("authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },
    /// An authenticated call was rejected; the session has been cleared.
    #[error("session expired: {message}")]
    SessionExpired { message: String },
    #[error("remote error ({status}): {message}")]
    Remote { status: u16, message: String },
    #[error("network error: {message}")]
    Network { message: String },
    /// The credential store could not be written.
    #[error("credential storage failed: {message}")]
    Storage { message: String },
}

impl ClientError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Auth { .. } => "auth",
            Self::SessionExpired { .. } => "session_expired",
            Self::Remote { .. } => "remote",
            Self::Network { .. } => "network",
            Self::Storage { .. } => "storage",
        }
    }

    /// Views should send the user back to login instead of showing an error.
    #[must_use]
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Text suitable for showing to the person at the keyboard.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRequest(message) => message.clone(),
            Self::Auth { .. } => DEFAULT_LOGIN_FAILURE_MESSAGE.to_string(),
            Self::SessionExpired { .. } => SESSION_EXPIRED_MESSAGE.to_string(),
            Self::Remote { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Remote { .. } => DEFAULT_GENERATION_FAILURE_MESSAGE.to_string(),
            Self::Network { message } => format!("Could not reach the server: {message}"),
            Self::Storage { message } => format!("Could not save your credentials: {message}"),
        }
    }
}

/// Classification for calls made on behalf of an established session:
/// 401/403 means the session is gone.
pub(crate) fn classify_authenticated(error: GatewayError) -> ClientError {
    match error {
        GatewayError::Http { status, message } if matches!(status, 401 | 403) => {
            ClientError::SessionExpired { message }
        }
        other => classify_common(other),
    }
}

/// Classification for the login exchange: 401/403 means bad credentials.
pub(crate) fn classify_login(error: GatewayError) -> ClientError {
    match error {
        GatewayError::Http { status, message } if matches!(status, 401 | 403) => {
            ClientError::Auth { status, message }
        }
        other => classify_common(other),
    }
}

fn classify_common(error: GatewayError) -> ClientError {
    match error {
        GatewayError::Network { message } => ClientError::Network { message },
        GatewayError::Http { status, message } | GatewayError::Decode { status, message } => {
            ClientError::Remote { status, message }
        }
        GatewayError::InvalidPath => {
            ClientError::InvalidRequest("invalid request path".to_string())
        }
        GatewayError::Encode { message } => ClientError::InvalidRequest(message),
    }
}

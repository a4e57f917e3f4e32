use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Account credentials, as typed at the prompt.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginReply {
    pub(crate) token: String,
}

/// Bearer token for the duration of one run. Never persisted or refreshed.
#[derive(Clone)]
pub struct Session {
    token: String,
}

impl Session {
    pub(crate) fn new(token: String) -> Self {
        Self { token }
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Session(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserInfo {
    #[serde(default)]
    pub(crate) id: Option<Value>,
}

impl UserInfo {
    /// The account id as text; numeric ids are rendered as-is.
    pub(crate) fn id(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A weather station registered to the account.
///
/// Built from the device listing with every other provider field dropped;
/// `historical_data` is attached once its history has been fetched and is
/// serialized verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub location: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_data: Option<Value>,
}

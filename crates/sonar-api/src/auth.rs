//! Credentials sent with every API request.

use std::fmt;

/// How requests authenticate against the server.
///
/// Both variants travel as HTTP basic auth; a token is sent as the user name
/// with an empty password.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { login: String, password: String },
    Token(String),
}

impl Credentials {
    pub fn basic(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            login: login.into(),
            password: password.into(),
        }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(token.into())
    }

    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::Basic { login, password } => request.basic_auth(login, Some(password)),
            Self::Token(token) => request.basic_auth(token, None::<&str>),
        }
    }
}

// Secrets never reach logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { login, .. } => f
                .debug_struct("Basic")
                .field("login", login)
                .field("password", &"***")
                .finish(),
            Self::Token(_) => f.debug_tuple("Token").field(&"***").finish(),
        }
    }
}

//! Authenticated session and the `auth` pass-through.

use serde::{Deserialize, Serialize};

/// The signed-in user on whose behalf REST requests are made.
///
/// Its `user_id` scopes every HTTP request to one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Bearer token forwarded to the API, when the host app has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            access_token: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

/// The user part of a session, as returned by [`Auth::get_user`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
}

/// Read-only view of the session a [`Db`](crate::Db) was built with.
#[derive(Debug, Clone, Copy)]
pub struct Auth<'a> {
    session: Option<&'a Session>,
}

impl<'a> Auth<'a> {
    pub(crate) fn new(session: Option<&'a Session>) -> Self {
        Self { session }
    }

    /// The current session, if any.
    pub fn get_session(&self) -> Option<&'a Session> {
        self.session
    }

    /// The current user, if any.
    pub fn get_user(&self) -> Option<User> {
        self.session.map(|s| User {
            id: s.user_id.clone(),
            email: s.email.clone(),
        })
    }
}

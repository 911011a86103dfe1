//! Login, logout and the current user.

use serde::Deserialize;

use waiterdesk_core::prelude::*;
use waiterdesk_core::{Credentials, Session, User};

use crate::http::{ApiClient, HttpBackend, ReqwestBackend};

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    user: User,
}

pub struct AuthService<B = ReqwestBackend> {
    api: ApiClient<B>,
}

impl<B: HttpBackend + Sync> AuthService<B> {
    pub fn new(api: ApiClient<B>) -> Self {
        Self { api }
    }

    /// Exchange credentials for a token and persist the session.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        credentials.validate()?;
        let response: LoginResponse = self
            .api
            .post("auth/login", credentials)
            .await
            .with_context(|| format!("Login failed for {}", credentials.email))?;

        let session = Session {
            token: response.token,
            user: response.user,
        };
        self.api.session().save(&session)?;
        info!("Logged in as {} ({:?})", session.user.email, session.user.role);
        Ok(session)
    }

    /// Forget the stored session. Purely local.
    pub fn logout(&self) -> Result<()> {
        self.api.session().clear().context("Failed to clear session")?;
        info!("Logged out");
        Ok(())
    }

    /// Profile of the authenticated user, as the server sees it.
    pub async fn current_user(&self) -> Result<User> {
        self.api
            .get("auth/me")
            .await
            .context("Failed to load current user")
    }

    /// The locally stored session, without contacting the server.
    pub fn stored_session(&self) -> Result<Option<Session>> {
        self.api.session().load()
    }
}

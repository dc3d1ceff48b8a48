//! Email/password authentication against `/auth/v1`.

use reqwest::Method;
use tracing::info;

use super::SupabaseClient;
use crate::error::{Error, Result};
use crate::models::{Credentials, RefreshRequest, Session, SignUpResponse, User};

impl SupabaseClient {
    /// Register a new account. When the project confirms sign-ups
    /// automatically the returned session is stored as well.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User> {
        let _loading = self.loading.begin("Creating account");
        let url = self.endpoint(&["auth", "v1", "signup"])?;

        let response: SignUpResponse = self
            .send_json(self.request(Method::POST, url).json(&Credentials { email, password }))
            .await?;

        match response {
            SignUpResponse::Session(session) => {
                let user = session.user.clone();
                self.set_session(Some(session));
                Ok(user)
            }
            SignUpResponse::User(user) => Ok(user),
        }
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let _loading = self.loading.begin("Signing in");
        let mut url = self.endpoint(&["auth", "v1", "token"])?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let session: Session = self
            .send_json(self.request(Method::POST, url).json(&Credentials { email, password }))
            .await?;

        info!(user = %session.user.id, "signed in");
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    pub async fn refresh_session(&self) -> Result<Session> {
        let refresh_token = self
            .session()
            .map(|s| s.refresh_token)
            .ok_or(Error::NotAuthenticated)?;

        let _loading = self.loading.begin("Refreshing session");
        let mut url = self.endpoint(&["auth", "v1", "token"])?;
        url.query_pairs_mut().append_pair("grant_type", "refresh_token");

        let session: Session = self
            .send_json(self.request(Method::POST, url).json(&RefreshRequest {
                refresh_token: &refresh_token,
            }))
            .await?;

        self.set_session(Some(session.clone()));
        Ok(session)
    }

    /// Revoke the current session. The local session is dropped even when
    /// the backend call fails.
    pub async fn sign_out(&self) -> Result<()> {
        if self.session().is_none() {
            return Ok(());
        }

        let _loading = self.loading.begin("Signing out");
        let url = self.endpoint(&["auth", "v1", "logout"])?;
        let result = self.send(self.request(Method::POST, url)).await;

        self.set_session(None);
        info!("signed out");
        result.map(|_| ())
    }

    pub async fn get_user(&self) -> Result<User> {
        if self.session().is_none() {
            return Err(Error::NotAuthenticated);
        }

        let _loading = self.loading.begin("Loading user");
        let url = self.endpoint(&["auth", "v1", "user"])?;
        self.send_json(self.request(Method::GET, url)).await
    }
}

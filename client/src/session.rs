//! In-memory session state, the client-side authority on "who is logged
//! in". Holds the identity for the lifetime of the process only; the
//! HTTP-only cookie itself lives in the `ApiClient` cookie store.

use crate::types::User;
use crate::{ApiClient, ClientError};

#[derive(Default)]
pub struct Session {
    current: Option<User>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.current.as_ref().map(|u| u.is_admin).unwrap_or(false)
    }

    pub async fn login(
        &mut self,
        api: &ApiClient,
        username: &str,
        password: &str,
    ) -> Result<&User, ClientError> {
        let user = api.login(username, password).await?;
        self.current = Some(user);
        Ok(self.current.as_ref().unwrap())
    }

    /// Re-fetch the identity behind the stored cookie. A rejected credential
    /// drops the cached identity so the embedding UI lands on its login
    /// view.
    pub async fn refresh(&mut self, api: &ApiClient) -> Result<&User, ClientError> {
        match api.me().await {
            Ok(user) => {
                self.current = Some(user);
                Ok(self.current.as_ref().unwrap())
            }
            Err(e) => {
                if matches!(e, ClientError::AuthRequired) {
                    self.current = None;
                }
                Err(e)
            }
        }
    }

    /// Clears local state even if the server call fails; the cookie is gone
    /// either way from the user's point of view.
    pub async fn logout(&mut self, api: &ApiClient) -> Result<(), ClientError> {
        let result = api.logout().await;
        self.current = None;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_signed_out() {
        let session = Session::new();
        assert!(!session.is_authenticated());
        assert!(!session.is_admin());
        assert!(session.user().is_none());
    }
}

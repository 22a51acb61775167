//! Signup and login endpoints.

use tracing::instrument;

use super::{BackendClient, BackendError, LoginRequest, LoginResponse, SignupRequest, SignupResponse};

impl BackendClient {
    /// `POST /auth/signup`
    ///
    /// A response without `userId` is not an error here; the caller decides
    /// based on the body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend answers non-2xx.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: &SignupRequest<'_>) -> Result<SignupResponse, BackendError> {
        let url = self.endpoint(&["auth", "signup"])?;
        self.execute(self.post(url).json(request)).await
    }

    /// `POST /auth/login`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend answers non-2xx.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest<'_>) -> Result<LoginResponse, BackendError> {
        let url = self.endpoint(&["auth", "login"])?;
        self.execute(self.post(url).json(request)).await
    }
}

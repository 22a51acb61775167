//! Authentication route handlers.
//!
//! Login and signup go straight to the marketplace backend. On login the
//! user, user id, and bearer token are kept in the server-side session.

use agromat_core::{Email, UserRole};
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::{
    BackendError, LOGIN_SUCCESS_MESSAGE, LoginRequest, LoginResponse, SignupRequest, UserAuth,
};
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, Notice};
use crate::routes::local_path;
use crate::routes::views::Layout;
use crate::state::AppState;

const MIN_PASSWORD_LENGTH: usize = 6;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Local path to return to after login.
    pub next: Option<String>,
}

/// Signup form data.
#[derive(Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("next", &self.next)
            .finish()
    }
}

impl std::fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub email: String,
    pub next: Option<String>,
    pub error: Option<String>,
}

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub layout: Layout,
    pub name: String,
    pub email: String,
    pub error: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Build the session identity from a login response.
///
/// Returns `None` unless the backend confirmed the login and sent both a
/// user id and a token.
fn current_user_from(response: LoginResponse, email: &str) -> Option<CurrentUser> {
    if response.message.as_deref() != Some(LOGIN_SUCCESS_MESSAGE) {
        return None;
    }

    let profile = response.user.unwrap_or_default();
    let user_id = response.user_id.or_else(|| profile.id.clone())?;
    let token = response.token?;

    let name = profile.display_name();
    Some(CurrentUser {
        auth: UserAuth { user_id, token },
        name: if name.is_empty() {
            email.to_string()
        } else {
            name
        },
        email: profile.email.clone().unwrap_or_else(|| email.to_string()),
        role: profile.user_type.unwrap_or(UserRole::Buyer),
    })
}

fn failure_message(error: &BackendError, fallback: &str) -> String {
    error
        .user_message()
        .map_or_else(|| fallback.to_string(), str::to_string)
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip(layout))]
pub async fn login_page(layout: Layout, Query(query): Query<LoginQuery>) -> impl IntoResponse {
    LoginTemplate {
        layout,
        email: String::new(),
        next: query.next.as_deref().and_then(local_path).map(str::to_string),
        error: None,
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, layout))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = form.next.as_deref().and_then(local_path).map(str::to_string);
    let rejected = |layout: Layout, error: String| {
        (
            StatusCode::UNAUTHORIZED,
            LoginTemplate {
                layout,
                email: form.email.trim().to_string(),
                next: next.clone(),
                error: Some(error),
            },
        )
            .into_response()
    };

    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => return Ok(rejected(layout, format!("Please check your email: {e}."))),
    };
    if form.password.is_empty() {
        return Ok(rejected(layout, "Please enter your password.".to_string()));
    }

    let request = LoginRequest {
        email: email.as_str(),
        password: &form.password,
    };
    let response = match state.backend().login(&request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            let message = failure_message(&e, "Invalid email or password.");
            return Ok(rejected(layout, message));
        }
    };

    let backend_message = response.message.clone();
    let Some(user) = current_user_from(response, email.as_str()) else {
        tracing::warn!(message = ?backend_message, "Login response was not a success");
        let message = backend_message.unwrap_or_else(|| "Invalid email or password.".to_string());
        return Ok(rejected(layout, message));
    };

    set_current_user(&session, &user).await?;
    set_sentry_user(user.id(), Some(&user.email));
    tracing::info!(user_id = %user.id(), role = %user.role, "User logged in");

    Notice::success(format!("Welcome back, {}!", user.first_name()))
        .flash(&session)
        .await;
    Ok(Redirect::to(next.as_deref().unwrap_or("/")).into_response())
}

// =============================================================================
// Signup Routes
// =============================================================================

/// Display the signup page.
#[instrument(skip(layout))]
pub async fn signup_page(layout: Layout) -> impl IntoResponse {
    SignupTemplate {
        layout,
        name: String::new(),
        email: String::new(),
        error: None,
    }
}

/// Handle signup form submission.
#[instrument(skip(state, session, layout))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Form(form): Form<SignupForm>,
) -> Response {
    let name = form.name.trim();
    let rejected = |layout: Layout, error: String| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            SignupTemplate {
                layout,
                name: name.to_string(),
                email: form.email.trim().to_string(),
                error: Some(error),
            },
        )
            .into_response()
    };

    if name.is_empty() {
        return rejected(layout, "Please enter your name.".to_string());
    }
    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => return rejected(layout, format!("Please check your email: {e}.")),
    };
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return rejected(
            layout,
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters."),
        );
    }
    if form.password != form.password_confirm {
        return rejected(layout, "Passwords do not match.".to_string());
    }

    let request = SignupRequest {
        name,
        email: email.as_str(),
        password: &form.password,
    };
    match state.backend().signup(&request).await {
        Ok(response) if response.user_id.is_some() => {
            tracing::info!(user_id = ?response.user_id, "Account created");
            Notice::success("Account created. Please log in.")
                .flash(&session)
                .await;
            Redirect::to("/auth/login").into_response()
        }
        Ok(response) => {
            let message = response
                .message
                .unwrap_or_else(|| "We couldn't create your account.".to_string());
            rejected(layout, message)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Signup failed");
            rejected(
                layout,
                failure_message(&e, "We couldn't create your account. Please try again."),
            )
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Response> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Notice::info("You have been logged out.").flash(&session).await;
    Ok(Redirect::to("/").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn response(json: &str) -> LoginResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_successful_login_builds_user() {
        let user = current_user_from(
            response(
                r#"{"message": "Login successful", "userId": "u1", "token": "tok",
                    "user": {"_id": "u1", "name": "Ada Obi", "email": "ada@farm.ng", "userType": "seller"}}"#,
            ),
            "ADA@farm.ng",
        )
        .unwrap();

        assert_eq!(user.id().as_str(), "u1");
        assert_eq!(user.name, "Ada Obi");
        assert_eq!(user.email, "ada@farm.ng");
        assert_eq!(user.role, UserRole::Seller);
        assert_eq!(user.auth.token.expose(), "tok");
    }

    #[test]
    fn test_user_id_falls_back_to_profile() {
        let user = current_user_from(
            response(r#"{"message": "Login successful", "token": "tok", "user": {"_id": "u9"}}"#),
            "ada@farm.ng",
        )
        .unwrap();

        assert_eq!(user.id().as_str(), "u9");
        assert_eq!(user.name, "ada@farm.ng");
        assert_eq!(user.role, UserRole::Buyer);
    }

    #[test]
    fn test_other_messages_are_failures() {
        assert!(
            current_user_from(
                response(r#"{"message": "Invalid credentials", "userId": "u1", "token": "tok"}"#),
                "ada@farm.ng",
            )
            .is_none()
        );
        assert!(
            current_user_from(
                response(r#"{"message": "Login successful", "userId": "u1"}"#),
                "ada@farm.ng",
            )
            .is_none()
        );
    }
}

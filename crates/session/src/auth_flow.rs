use crate::state::{AuthState, SessionState, UserMessage};
use auth::{AuthService, AuthenticatedUser};

/// The fields of the registration form.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

impl SessionState {
    /// Attempts a login. On failure the reason is kept in `login_error`.
    pub async fn login(&mut self, service: &AuthService, username: &str, password: &str) -> bool {
        match service.authenticate(username, password).await {
            Ok(Some(user)) => {
                tracing::info!(username = %user.username, "User logged in successfully.");
                self.sign_in(user);
                true
            }
            Ok(None) => {
                tracing::warn!(username, "Login failed.");
                self.login_error = Some("Invalid username or password.".to_string());
                false
            }
            Err(e) => {
                tracing::error!(username, error = %e, "Login failed on a store error.");
                self.login_error =
                    Some("Login is unavailable right now. Please try again later.".to_string());
                false
            }
        }
    }

    /// Marks the session as belonging to `user`.
    pub fn sign_in(&mut self, user: AuthenticatedUser) {
        self.auth = AuthState::Authenticated {
            username: user.username,
        };
        self.login_error = None;
        self.registration_message = None;
    }

    /// Submits the registration form. The outcome is kept in
    /// `registration_message`; on success the login form is shown again.
    pub async fn register(&mut self, service: &AuthService, form: &RegistrationForm) -> bool {
        if form.username.trim().is_empty() || form.password.is_empty() {
            self.registration_message = Some(UserMessage::error("Username and password are required."));
            return false;
        }
        if form.password != form.confirm_password {
            self.registration_message = Some(UserMessage::error("Passwords do not match."));
            return false;
        }

        let result = service
            .create_user(
                &form.username,
                &form.password,
                form.email.as_deref(),
                form.full_name.as_deref(),
            )
            .await;
        match result {
            Ok(created) => {
                self.registration_message = Some(UserMessage::success(created.message));
                self.show_registration_form = false;
                true
            }
            Err(e) => {
                self.registration_message = Some(UserMessage::error(e.to_string()));
                false
            }
        }
    }

    /// Switches between the login and registration forms, clearing the
    /// other form's message.
    pub fn show_registration(&mut self, show: bool) {
        self.show_registration_form = show;
        if show {
            self.login_error = None;
        } else {
            self.registration_message = None;
        }
    }

    /// Ends the session and drops the user's data.
    pub fn logout(&mut self) {
        if let Some(username) = self.auth.username() {
            tracing::info!(username, "User logged out.");
        }
        self.auth = AuthState::Unauthenticated;
        self.login_error = None;
        self.registration_message = None;
        self.reset_data();
    }
}

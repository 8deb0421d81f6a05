use crate::api::ChatBackend;
use crate::api::models::{AuthResponse, LoginRequest, RegisterRequest, User};
use crate::error::{Error, Result};
use crate::session::SessionStore;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("static regex"));

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(Error::validation("Username is required"));
        }
        if self.password.is_empty() {
            return Err(Error::validation("Password is required"));
        }
        if self.password.chars().count() < 6 {
            return Err(Error::validation("Password should be at least 6 characters"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<()> {
        if self.email.is_empty() {
            return Err(Error::validation("Email is required"));
        }
        if !EMAIL_RE.is_match(&self.email) {
            return Err(Error::validation("Please enter a valid email address"));
        }
        if self.username.chars().count() < 3 {
            return Err(Error::validation("Username must be at least 3 characters"));
        }
        if self.password.chars().count() < 8 {
            return Err(Error::validation("Password must be at least 8 characters"));
        }
        if self.password != self.confirm_password {
            return Err(Error::validation("Passwords do not match"));
        }
        Ok(())
    }
}

fn accept(resp: AuthResponse, session: &SessionStore) -> Result<User> {
    if !resp.status {
        return Err(Error::Rejected(resp.msg.unwrap_or_else(|| "Request was rejected".into())));
    }
    let user = resp.user.ok_or_else(|| Error::Protocol("auth response without a user".into()))?;
    session.save(&user)?;
    Ok(user)
}

/// Validates, calls the backend and stores the returned user as the session.
pub async fn login(backend: &dyn ChatBackend, session: &SessionStore, form: &LoginForm) -> Result<User> {
    form.validate()?;
    let req = LoginRequest { username: form.username.clone(), password: form.password.clone() };
    let user = accept(backend.login(&req).await?, session)?;
    log::info!("logged in as {}", user.username);
    Ok(user)
}

pub async fn register(backend: &dyn ChatBackend, session: &SessionStore, form: &RegisterForm) -> Result<User> {
    form.validate()?;
    let req = RegisterRequest {
        username: form.username.clone(),
        email: form.email.clone(),
        password: form.password.clone(),
    };
    let user = accept(backend.register(&req).await?, session)?;
    log::info!("registered {}", user.username);
    Ok(user)
}

/// Tells the backend when there is a session, then wipes local storage either way.
pub async fn logout(backend: &dyn ChatBackend, session: &SessionStore) -> Result<()> {
    if let Some(user) = session.load()? {
        if let Err(e) = backend.logout(&user.id).await {
            log::error!("logout call failed: {e}");
        }
    }
    session.clear()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn login_form(username: &str, password: &str) -> LoginForm {
        LoginForm { username: username.into(), password: password.into() }
    }

    fn register_form(username: &str, email: &str, password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[rstest]
    #[case("", "secret1", "Username is required")]
    #[case("ana", "", "Password is required")]
    #[case("ana", "abc", "Password should be at least 6 characters")]
    fn login_form_rejects(#[case] username: &str, #[case] password: &str, #[case] expected: &str) {
        let err = login_form(username, password).validate().unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn login_form_accepts_six_chars() {
        assert!(login_form("ana", "abcdef").validate().is_ok());
    }

    #[rstest]
    #[case("ana", "", "password1", "password1", "Email is required")]
    #[case("ana", "ana@example", "password1", "password1", "Please enter a valid email address")]
    #[case("ana", "ana @x.io", "password1", "password1", "Please enter a valid email address")]
    #[case("an", "ana@x.io", "password1", "password1", "Username must be at least 3 characters")]
    #[case("ana", "ana@x.io", "short", "short", "Password must be at least 8 characters")]
    #[case("ana", "ana@x.io", "password1", "password2", "Passwords do not match")]
    fn register_form_rejects(
        #[case] username: &str,
        #[case] email: &str,
        #[case] password: &str,
        #[case] confirm: &str,
        #[case] expected: &str,
    ) {
        let err = register_form(username, email, password, confirm).validate().unwrap_err();
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn register_form_accepts_valid_input() {
        assert!(register_form("ana", "ana@x.io", "password1", "password1").validate().is_ok());
    }
}

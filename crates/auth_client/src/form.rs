use std::{collections::HashMap, sync::Arc, sync::LazyLock, time::Duration};

use regex::Regex;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use shared::{
    domain::{Operation, Role},
    error::{user_message, TransportError},
    protocol::{extract_identifier, LoginRequest},
    session::SessionRepository,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    endpoints::{profile_path, routes_for},
    resolver::resolve,
    transport::Transport,
    Router,
};

/// How long a successful registration lingers before redirecting to sign-in.
const REDIRECT_DELAY: Duration = Duration::from_millis(2000);

/// Local-part, `@`, domain, `.`, tld. No internationalized-domain support.
static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

/// Registration fields in declaration order, per role. The multipart body
/// appends text parts in exactly this order.
pub fn declared_fields(role: Role) -> &'static [&'static str] {
    match role {
        Role::Student => &[
            "studentId",
            "username",
            "password",
            "email",
            "studName",
            "studFatherName",
            "studLastName",
            "studentAge",
            "studentDob",
            "studCaste",
            "studCategory",
            "studRollNo",
            "year",
            "studPhoneNumber",
            "major",
        ],
        Role::Professor => &[
            "professorId",
            "name",
            "departmentName",
            "subject",
            "username",
            "password",
            "email",
            "phone",
            "subjects",
        ],
        Role::Hod => &["name", "department", "username", "password", "email", "phone"],
    }
}

/// Required-field list, iterated in this order for fail-fast validation.
pub fn required_fields(role: Role) -> &'static [&'static str] {
    match role {
        Role::Student => &[
            "studentId",
            "username",
            "password",
            "email",
            "studName",
            "major",
            "year",
            "studRollNo",
        ],
        Role::Professor => &[
            "professorId",
            "name",
            "departmentName",
            "subject",
            "username",
            "password",
            "email",
            "phone",
        ],
        Role::Hod => &["name", "department", "username", "password", "email", "phone"],
    }
}

/// `studRollNo` → `Stud Roll No`: a space before every interior capital,
/// first letter capitalized. Used to name the missing field in messages.
pub fn humanize_field(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if i == 0 {
            out.extend(ch.to_uppercase());
            continue;
        }
        if ch.is_ascii_uppercase() {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub first_error: Option<String>,
}

impl ValidationResult {
    fn ok() -> Self {
        Self {
            is_valid: true,
            first_error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            first_error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Idle,
    Validating,
    Submitting,
    Success,
    Error,
}

/// Optional profile photo attached to a registration form.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Collaborators and budgets shared by every form a client hands out.
#[derive(Clone)]
pub struct FormDeps {
    pub transport: Arc<Transport>,
    pub sessions: Arc<dyn SessionRepository>,
    pub router: Arc<dyn Router>,
    pub login_timeout: Duration,
    pub register_timeout: Duration,
}

/// Owns one role's sign-in or registration form: field state, validation,
/// and the submission lifecycle (idle → validating → submitting →
/// success/error). At most one submission is in flight per instance; a
/// submit while submitting is a no-op.
pub struct FormController {
    role: Role,
    op: Operation,
    values: HashMap<String, String>,
    image: Option<ImageAttachment>,
    remember: bool,
    phase: FormPhase,
    error: Option<String>,
    notice: Option<String>,
    deps: FormDeps,
    redirect_task: Option<JoinHandle<()>>,
}

impl FormController {
    pub fn sign_in(role: Role, deps: FormDeps) -> Self {
        let mut values = HashMap::new();
        values.insert("username".to_string(), String::new());
        values.insert("password".to_string(), String::new());
        Self {
            role,
            op: Operation::SignIn,
            values,
            image: None,
            remember: false,
            phase: FormPhase::Idle,
            error: None,
            notice: None,
            deps,
            redirect_task: None,
        }
    }

    pub fn registration(role: Role, deps: FormDeps) -> Self {
        let values = declared_fields(role)
            .iter()
            .map(|field| (field.to_string(), String::new()))
            .collect();
        Self {
            role,
            op: Operation::Register,
            values,
            image: None,
            remember: false,
            phase: FormPhase::Idle,
            error: None,
            notice: None,
            deps,
            redirect_task: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn operation(&self) -> Operation {
        self.op
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn value(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    /// Stores the value verbatim, no coercion. Always succeeds.
    pub fn update_field(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }

    pub fn attach_image(&mut self, filename: impl Into<String>, bytes: Vec<u8>) {
        self.image = Some(ImageAttachment {
            filename: filename.into(),
            bytes,
        });
    }

    pub fn set_remember(&mut self, remember: bool) {
        self.remember = remember;
    }

    /// Fail-fast validation: the first broken rule names the error, later
    /// rules are not evaluated. Check order is significant — required
    /// fields in declaration order, then email shape, then password length.
    pub fn validate(&self) -> ValidationResult {
        match self.op {
            Operation::SignIn => {
                if self.value("username").trim().is_empty() {
                    return ValidationResult::err("Username is required");
                }
                if self.value("password").is_empty() {
                    return ValidationResult::err("Password is required");
                }
                ValidationResult::ok()
            }
            Operation::Register => {
                for field in required_fields(self.role) {
                    if self.value(field).trim().is_empty() {
                        return ValidationResult::err(format!(
                            "{} is required",
                            humanize_field(field)
                        ));
                    }
                }
                if !EMAIL_SHAPE.is_match(self.value("email")) {
                    return ValidationResult::err("Please enter a valid email address");
                }
                if self.value("password").chars().count() < 6 {
                    return ValidationResult::err(
                        "Password must be at least 6 characters long",
                    );
                }
                ValidationResult::ok()
            }
        }
    }

    /// Drives one full submission. On completion the phase is `Success` or
    /// `Error`; inspect `error()` / `notice()` for the user-facing outcome.
    /// Re-entrant calls while a submission is in flight are ignored.
    pub async fn submit(&mut self) {
        if self.phase == FormPhase::Submitting {
            warn!(
                role = self.role.as_str(),
                "submit ignored: a submission is already in flight"
            );
            return;
        }

        self.error = None;
        self.notice = None;
        self.phase = FormPhase::Validating;

        let validation = self.validate();
        if !validation.is_valid {
            self.phase = FormPhase::Error;
            self.error = validation.first_error;
            return;
        }

        self.phase = FormPhase::Submitting;
        match self.op {
            Operation::SignIn => self.submit_sign_in().await,
            Operation::Register => self.submit_registration().await,
        }
    }

    async fn submit_sign_in(&mut self) {
        let body = LoginRequest {
            username: self.value("username").trim().to_string(),
            password: self.value("password").to_string(),
        };
        let routes = routes_for(self.role, Operation::SignIn);
        let transport = Arc::clone(&self.deps.transport);
        let timeout = self.deps.login_timeout;

        let resolved = resolve(routes.primary, routes.fallbacks, move |path| {
            let transport = Arc::clone(&transport);
            let body = body.clone();
            async move { transport.post_json(&path, &body, timeout).await }
        })
        .await;

        let payload = match resolved {
            Ok(resolved) => resolved.value,
            Err(err) => {
                self.fail(user_message(self.role, Operation::SignIn, &err));
                return;
            }
        };

        let Some(id) = extract_identifier(self.role, &payload) else {
            let err = TransportError::UnexpectedShape(
                "login response contains no identifier".to_string(),
            );
            self.fail(user_message(self.role, Operation::SignIn, &err));
            return;
        };

        if let Err(err) = self.deps.sessions.save_identifier(self.role, &id).await {
            warn!(role = self.role.as_str(), %err, "failed to persist login identifier");
            self.fail("Login failed".to_string());
            return;
        }

        // Profile fetch failure is non-fatal: the session is usable with
        // the identifier alone.
        match self
            .deps
            .transport
            .get_json(&profile_path(self.role, &id), self.deps.login_timeout)
            .await
        {
            Ok(profile) if profile != Value::Null => {
                if let Err(err) = self.deps.sessions.save_profile(self.role, &profile).await {
                    warn!(role = self.role.as_str(), %err, "failed to persist profile blob");
                }
            }
            Ok(_) => {}
            Err(err) => {
                warn!(role = self.role.as_str(), %err, "profile fetch failed after login");
            }
        }

        if self.remember {
            if let Err(err) = self.deps.sessions.set_remember(self.role).await {
                warn!(role = self.role.as_str(), %err, "failed to persist remember-me flag");
            }
        }

        info!(role = self.role.as_str(), id, "login succeeded");
        self.phase = FormPhase::Success;
        self.deps.router.navigate(&self.role.dashboard_path());
    }

    async fn submit_registration(&mut self) {
        let parts = self.registration_parts();
        let image = self.image.clone();
        let routes = routes_for(self.role, Operation::Register);
        let transport = Arc::clone(&self.deps.transport);
        let timeout = self.deps.register_timeout;

        let resolved = resolve(routes.primary, routes.fallbacks, move |path| {
            let transport = Arc::clone(&transport);
            let parts = parts.clone();
            let image = image.clone();
            async move {
                transport
                    .post_multipart(&path, build_multipart(parts, image), timeout)
                    .await
            }
        })
        .await;

        if let Err(err) = resolved {
            self.fail(user_message(self.role, Operation::Register, &err));
            return;
        }

        info!(role = self.role.as_str(), "registration succeeded");
        self.notice = Some(format!(
            "{} registered successfully! Redirecting to login...",
            self.role.display_name()
        ));
        for value in self.values.values_mut() {
            value.clear();
        }
        self.image = None;
        self.phase = FormPhase::Success;
        self.schedule_sign_in_redirect();
    }

    /// Field values in declaration order, with the professor `subjects`
    /// comma list re-joined from trimmed entries.
    fn registration_parts(&self) -> Vec<(String, String)> {
        declared_fields(self.role)
            .iter()
            .map(|field| {
                let value = self.value(field);
                let value = if self.role == Role::Professor && *field == "subjects" {
                    value
                        .split(',')
                        .map(str::trim)
                        .collect::<Vec<_>>()
                        .join(",")
                } else {
                    value.to_string()
                };
                (field.to_string(), value)
            })
            .collect()
    }

    fn schedule_sign_in_redirect(&mut self) {
        if let Some(task) = self.redirect_task.take() {
            task.abort();
        }
        let router = Arc::clone(&self.deps.router);
        let destination = self.role.sign_in_path();
        self.redirect_task = Some(tokio::spawn(async move {
            tokio::time::sleep(REDIRECT_DELAY).await;
            router.navigate(&destination);
        }));
    }

    fn fail(&mut self, message: String) {
        self.phase = FormPhase::Error;
        self.error = Some(message);
    }
}

impl Drop for FormController {
    fn drop(&mut self) {
        if let Some(task) = self.redirect_task.take() {
            task.abort();
        }
    }
}

/// The backend contract requires the `file` part even when no image was
/// chosen: a zero-length placeholder named `empty.png` stands in.
fn build_multipart(parts: Vec<(String, String)>, image: Option<ImageAttachment>) -> Form {
    let mut form = Form::new();
    for (name, value) in parts {
        form = form.text(name, value);
    }
    let file_part = match image {
        Some(image) => Part::bytes(image.bytes).file_name(image.filename),
        None => Part::bytes(Vec::new()).file_name("empty.png"),
    };
    form.part("file", file_part)
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;

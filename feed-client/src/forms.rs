use chrono::NaiveDate;
use tracing::{debug, warn};
use validator::{Validate, ValidationErrors};

use crate::FeedClient;
use crate::error::{FeedClientError, FeedClientResult};
use crate::graphql::{FieldError, STATUS_BAD_REQUEST, STATUS_UNAUTHORIZED};
use crate::models::{SignUpInput, User};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Ошибки формы, сгруппированные по `code` поля.
///
/// Пустой `code` означает общую ошибку формы.
pub struct FormErrors(Vec<FieldError>);

impl FormErrors {
    /// Пустой список.
    pub fn new() -> Self {
        Self::default()
    }

    /// Первая ошибка поля `code`.
    pub fn get(&self, code: &str) -> Option<&FieldError> {
        self.0.iter().find(|err| err.code == code)
    }

    /// Сообщение первой ошибки поля `code`.
    pub fn message(&self, code: &str) -> Option<&str> {
        self.get(code).and_then(|err| err.message.as_deref())
    }

    /// Есть ли ошибка у поля `code`.
    pub fn has(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// Нет ни одной ошибки.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Все ошибки в порядке поступления.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Убирает ошибки поля `code`.
    pub fn clear_field(&mut self, code: &str) {
        self.0.retain(|err| err.code != code);
    }

    /// Убирает все ошибки.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Заменяет ошибку поля новой.
    pub fn set(&mut self, error: FieldError) {
        self.clear_field(&error.code);
        self.0.push(error);
    }

    pub(crate) fn replace(&mut self, errors: Vec<FieldError>) {
        self.0 = errors;
    }

    fn from_validation(report: &ValidationErrors) -> Vec<FieldError> {
        let mut errors: Vec<FieldError> = report
            .field_errors()
            .into_iter()
            .filter_map(|(field, errs)| {
                let first = errs.first()?;
                let message = first
                    .message
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| first.code.to_string());
                Some(FieldError::new(field.to_string(), message))
            })
            .collect();
        errors.sort_by(|a, b| a.code.cmp(&b.code));
        errors
    }
}

/// Кладёт ошибки ответа в форму, если статус из `statuses`.
/// Возвращает `true`, если ошибки были приняты.
fn absorb_errors(errors: &mut FormErrors, err: &FeedClientError, statuses: &[u16]) -> bool {
    match err.status() {
        Some(status) if statuses.contains(&status) => {
            errors.replace(err.field_errors());
            true
        }
        _ => false,
    }
}

#[derive(Debug, Clone, Default)]
/// Форма входа.
pub struct SignInForm {
    email: String,
    password: String,
    errors: FormErrors,
}

impl SignInForm {
    /// Пустая форма.
    pub fn new() -> Self {
        Self::default()
    }

    /// Email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Пароль.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Ошибки формы.
    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    /// Меняет email и снимает ошибку этого поля.
    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
        self.errors.clear_field("email");
    }

    /// Меняет пароль и снимает ошибку этого поля.
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
        self.errors.clear_field("password");
    }

    /// Обе части заполнены.
    pub fn can_submit(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }

    /// Отправляет `SignIn`; при успехе сессия клиента становится активной.
    ///
    /// На 400/401 пароль очищается, а ошибки полей сохраняются в форме.
    pub async fn submit(&mut self, client: &FeedClient) -> FeedClientResult<User> {
        if !self.can_submit() {
            return Err(FeedClientError::InvalidInput(
                "email and password are required".to_string(),
            ));
        }

        match client.sign_in(self.email.trim(), &self.password).await {
            Ok(auth) => {
                self.errors.clear();
                self.password.clear();
                Ok(auth.user)
            }
            Err(err) => {
                if absorb_errors(
                    &mut self.errors,
                    &err,
                    &[STATUS_BAD_REQUEST, STATUS_UNAUTHORIZED],
                ) {
                    self.password.clear();
                }
                debug!(error = %err, "sign in rejected");
                Err(err)
            }
        }
    }
}

#[derive(Debug, Clone, Default, Validate)]
/// Форма регистрации.
///
/// Email и логин приводятся к нижнему регистру, из пароля удаляются пробелы.
pub struct SignUpForm {
    #[validate(length(min = 1, max = 50, message = "name must be 1 to 50 characters"))]
    name: String,
    #[validate(email(message = "email is invalid"))]
    email: String,
    #[validate(length(min = 3, message = "username must be at least 3 characters"))]
    username: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    password: String,
    #[validate(required(message = "birthday is required"))]
    birthday: Option<NaiveDate>,
    errors: FormErrors,
}

impl SignUpForm {
    /// Пустая форма.
    pub fn new() -> Self {
        Self::default()
    }

    /// Имя.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Email (в нижнем регистре).
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Логин (в нижнем регистре).
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Пароль (без пробелов).
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Дата рождения.
    pub fn birthday(&self) -> Option<NaiveDate> {
        self.birthday
    }

    /// Ошибки формы.
    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    /// Меняет имя.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.errors.clear_field("name");
    }

    /// Меняет email.
    pub fn set_email(&mut self, email: &str) {
        self.email = email.trim().to_lowercase();
        self.errors.clear_field("email");
    }

    /// Меняет логин.
    pub fn set_username(&mut self, username: &str) {
        self.username = username.trim().to_lowercase();
        self.errors.clear_field("username");
    }

    /// Меняет пароль.
    pub fn set_password(&mut self, password: &str) {
        self.password = password.chars().filter(|c| !c.is_whitespace()).collect();
        self.errors.clear_field("password");
    }

    /// Меняет дату рождения.
    pub fn set_birthday(&mut self, birthday: NaiveDate) {
        self.birthday = Some(birthday);
        self.errors.clear_field("birthday");
    }

    /// Локальная проверка полей; найденные ошибки записываются в форму.
    pub fn check(&mut self) -> bool {
        let mut found = match self.validate() {
            Ok(()) => Vec::new(),
            Err(report) => FormErrors::from_validation(&report),
        };

        if !self.username.is_empty()
            && !found.iter().any(|err| err.code == "username")
            && !self
                .username
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            found.push(FieldError::new(
                "username",
                "username may contain only letters, digits and underscores",
            ));
        }

        if !found.iter().any(|err| err.code == "password") && !is_strong_password(&self.password)
        {
            found.push(FieldError::new(
                "password",
                "password must contain a digit, a lowercase and an uppercase letter",
            ));
        }

        let valid = found.is_empty();
        for error in found {
            self.errors.set(error);
        }
        valid
    }

    /// Проверяет, не занят ли email. Некорректный email не проверяется.
    pub async fn check_email(&mut self, client: &FeedClient) -> FeedClientResult<bool> {
        if self.validate().is_err_and(|report| report.field_errors().contains_key("email")) {
            return Ok(false);
        }

        let taken = client.is_email_taken(&self.email).await?;
        if taken {
            self.errors
                .set(FieldError::new("email", "email is already in use"));
        } else {
            self.errors.clear_field("email");
        }
        Ok(taken)
    }

    /// Проверяет, не занят ли логин.
    pub async fn check_username(&mut self, client: &FeedClient) -> FeedClientResult<bool> {
        if self.username.is_empty() {
            return Ok(false);
        }

        let taken = client.is_username_taken(&self.username).await?;
        if taken {
            self.errors
                .set(FieldError::new("username", "username is already in use"));
        } else {
            self.errors.clear_field("username");
        }
        Ok(taken)
    }

    /// Отправляет `SignUp`; при успехе сессия клиента становится активной.
    ///
    /// На 400 пароль очищается, а ошибки полей сохраняются в форме.
    pub async fn submit(&mut self, client: &FeedClient) -> FeedClientResult<User> {
        if !self.check() {
            return Err(FeedClientError::InvalidInput(
                "sign up form has invalid fields".to_string(),
            ));
        }
        let Some(birthday) = self.birthday else {
            return Err(FeedClientError::InvalidInput("birthday is required".to_string()));
        };

        let input = SignUpInput {
            name: self.name.trim().to_string(),
            email: self.email.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            birthday,
        };

        match client.sign_up(&input).await {
            Ok(auth) => {
                self.errors.clear();
                self.password.clear();
                Ok(auth.user)
            }
            Err(err) => {
                if absorb_errors(&mut self.errors, &err, &[STATUS_BAD_REQUEST]) {
                    self.password.clear();
                } else {
                    warn!(error = %err, "sign up failed");
                }
                Err(err)
            }
        }
    }
}

fn is_strong_password(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{ScriptedTransport, client_with, user};

    fn auth_json(id: &str, username: &str) -> serde_json::Value {
        json!({
            "accessToken": "a2",
            "refreshToken": "r2",
            "user": serde_json::to_value(user(id, username)).expect("user must serialize"),
        })
    }

    fn filled_sign_up() -> SignUpForm {
        let mut form = SignUpForm::new();
        form.set_name("Neo");
        form.set_email(" Neo@Example.COM ");
        form.set_username("Neo_1");
        form.set_password("Pass word1 ");
        form.set_birthday(NaiveDate::from_ymd_opt(1999, 3, 31).expect("valid date"));
        form
    }

    #[test]
    fn form_errors_replace_by_code() {
        let mut errors = FormErrors::new();
        errors.set(FieldError::new("email", "first"));
        errors.set(FieldError::new("email", "second"));
        errors.set(FieldError::new("", "general"));

        assert_eq!(errors.iter().count(), 2);
        assert_eq!(errors.message("email"), Some("second"));
        errors.clear_field("email");
        assert!(!errors.has("email"));
        assert!(errors.has(""));
    }

    #[tokio::test]
    async fn sign_in_rejection_clears_password_and_keeps_field_errors() {
        let transport = ScriptedTransport::new();
        transport.push_field_errors(401, &[("password", "wrong password")]);
        let client = client_with(transport);
        client.logout().expect("logout");

        let mut form = SignInForm::new();
        form.set_email("neo@example.com");
        form.set_password("secret");

        let err = form.submit(&client).await.expect_err("must be rejected");
        assert!(err.is_unauthorized());
        assert_eq!(form.password(), "");
        assert_eq!(form.email(), "neo@example.com");
        assert_eq!(form.errors().message("password"), Some("wrong password"));

        form.set_password("again");
        assert!(!form.errors().has("password"));
    }

    #[tokio::test]
    async fn sign_in_string_error_becomes_general_error() {
        let transport = ScriptedTransport::new();
        transport.push_error(400, "Invalid credentials");
        let client = client_with(transport);

        let mut form = SignInForm::new();
        form.set_email("neo@example.com");
        form.set_password("secret");

        form.submit(&client).await.expect_err("must be rejected");
        assert_eq!(form.errors().message(""), Some("Invalid credentials"));
    }

    #[tokio::test]
    async fn sign_in_success_activates_session() {
        let transport = ScriptedTransport::new();
        transport.push_data(json!({ "SignIn": auth_json("u9", "neo") }));
        let client = client_with(transport);
        client.logout().expect("logout");

        let mut form = SignInForm::new();
        form.set_email("neo@example.com");
        form.set_password("secret");

        let me = form.submit(&client).await.expect("sign in");
        assert_eq!(me.id, "u9");
        assert_eq!(client.session().refresh_token().as_deref(), Some("r2"));
        assert!(form.errors().is_empty());
    }

    #[test]
    fn sign_up_normalizes_input() {
        let form = filled_sign_up();
        assert_eq!(form.email(), "neo@example.com");
        assert_eq!(form.username(), "neo_1");
        assert_eq!(form.password(), "Password1");
    }

    #[test]
    fn sign_up_check_reports_invalid_fields() {
        let mut form = filled_sign_up();
        form.set_email("not-an-email");
        form.set_password("password");
        form.set_username("bad-name");

        assert!(!form.check());
        assert!(form.errors().has("email"));
        assert!(form.errors().has("password"));
        assert!(form.errors().has("username"));
        assert!(!form.errors().has("name"));
    }

    #[tokio::test]
    async fn invalid_sign_up_is_not_sent() {
        let transport = ScriptedTransport::new();
        let client = client_with(transport.clone());
        let mut form = SignUpForm::new();

        let err = form.submit(&client).await.expect_err("must be invalid");
        assert!(matches!(err, FeedClientError::InvalidInput(_)));
        assert!(form.errors().has("birthday"));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn uniqueness_checks_add_and_remove_errors() {
        let transport = ScriptedTransport::new();
        transport.push_data(json!({ "FindOneUser": { "id": "u1" } }));
        transport.push_data(json!({ "FindOneUser": null }));
        transport.push_data(json!({ "FindOneUser": { "id": "u1" } }));
        let client = client_with(transport.clone());
        let mut form = filled_sign_up();

        assert!(form.check_email(&client).await.expect("check"));
        assert!(form.errors().has("email"));
        assert!(!form.check_email(&client).await.expect("check"));
        assert!(!form.errors().has("email"));

        assert!(form.check_username(&client).await.expect("check"));
        assert!(form.errors().has("username"));

        let calls = transport.calls();
        assert_eq!(calls[0].variables["input"], json!({ "email": "neo@example.com" }));
        assert_eq!(calls[2].variables["input"], json!({ "username": "neo_1" }));
    }

    #[tokio::test]
    async fn sign_up_validation_error_clears_password() {
        let transport = ScriptedTransport::new();
        transport.push_field_errors(400, &[("username", "username is already in use")]);
        let client = client_with(transport.clone());
        let mut form = filled_sign_up();

        form.submit(&client).await.expect_err("must be rejected");
        assert_eq!(form.password(), "");
        assert_eq!(form.name(), "Neo");
        assert_eq!(
            form.errors().message("username"),
            Some("username is already in use")
        );

        let input = &transport.calls()[0].variables["input"];
        assert_eq!(input["birthday"], "1999-03-31");
        assert_eq!(input["password"], "Password1");
    }

    #[tokio::test]
    async fn sign_up_success_activates_session() {
        let transport = ScriptedTransport::new();
        transport.push_data(json!({ "SignUp": auth_json("u9", "neo_1") }));
        let client = client_with(transport);
        client.logout().expect("logout");
        let mut form = filled_sign_up();

        let me = form.submit(&client).await.expect("sign up");
        assert_eq!(me.username, "neo_1");
        assert_eq!(client.session().current_user_id().as_deref(), Some("u9"));
    }
}

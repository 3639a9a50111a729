use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(crate) const STATUS_BAD_REQUEST: u16 = 400;
pub(crate) const STATUS_UNAUTHORIZED: u16 = 401;

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Тело запроса к GraphQL-эндпоинту.
pub struct GraphqlRequest {
    /// Текст запроса.
    pub query: String,
    /// Именованные переменные.
    pub variables: Value,
}

impl GraphqlRequest {
    /// Создаёт запрос с переменными.
    pub fn new(query: impl Into<String>, variables: Value) -> Self {
        Self {
            query: query.into(),
            variables,
        }
    }

    /// Создаёт запрос без переменных.
    pub fn without_variables(query: impl Into<String>) -> Self {
        Self::new(query, Value::Object(Default::default()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
/// Ответ GraphQL-эндпоинта: `{ data, errors }`.
pub struct GraphqlResponse {
    /// Полезная нагрузка.
    #[serde(default)]
    pub data: Option<Value>,
    /// Ошибки.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphqlError>>,
}

impl GraphqlResponse {
    /// Статус первой ошибки ответа, если ошибки есть.
    pub fn first_status(&self) -> Option<u16> {
        self.errors
            .as_ref()
            .and_then(|errors| errors.first())
            .and_then(|err| err.status_code)
    }

    /// Ответ считается «неавторизованным» по статусу первой ошибки.
    pub fn is_unauthorized(&self) -> bool {
        self.first_status() == Some(STATUS_UNAUTHORIZED)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
/// Ошибка конкретного поля формы.
pub struct FieldError {
    /// Имя поля (`text`, `email`, `password`, ...). Пустая строка означает ошибку без поля.
    #[serde(default)]
    pub code: String,
    /// Сообщение для пользователя.
    #[serde(default)]
    pub message: Option<String>,
}

impl FieldError {
    /// Создаёт ошибку поля.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
/// `message` ошибки: строка или список ошибок полей.
pub enum ErrorMessage {
    /// Общее сообщение.
    Text(String),
    /// Ошибки валидации по полям.
    Fields(Vec<FieldError>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
/// Объект ошибки в ответе API.
pub struct GraphqlError {
    /// Числовой HTTP-подобный статус.
    #[serde(default)]
    pub status_code: Option<u16>,
    /// Сообщение.
    pub message: ErrorMessage,
    /// Краткое имя ошибки (`Bad Request`, `Unauthorized`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GraphqlError {
    /// Ошибки полей; строковое сообщение превращается в ошибку без поля.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match &self.message {
            ErrorMessage::Fields(fields) => fields.clone(),
            ErrorMessage::Text(text) => vec![FieldError::new("", text.clone())],
        }
    }
}

impl fmt::Display for GraphqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(status) = self.status_code {
            write!(f, "[{status}] ")?;
        }
        match &self.message {
            ErrorMessage::Text(text) => write!(f, "{text}"),
            ErrorMessage::Fields(fields) => {
                let joined = fields
                    .iter()
                    .map(|field| match &field.message {
                        Some(message) if field.code.is_empty() => message.clone(),
                        Some(message) => format!("{}: {message}", field.code),
                        None => field.code.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "{joined}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Список ошибок API в том виде, в каком его вернул сервер.
pub struct ApiErrors(pub Vec<GraphqlError>);

impl ApiErrors {
    /// Статус первой ошибки.
    pub fn status(&self) -> Option<u16> {
        self.0.first().and_then(|err| err.status_code)
    }

    /// Ошибки полей первой ошибки.
    pub fn field_errors(&self) -> Vec<FieldError> {
        self.0
            .first()
            .map(GraphqlError::field_errors)
            .unwrap_or_default()
    }
}

impl fmt::Display for ApiErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{joined}")
    }
}

impl std::error::Error for ApiErrors {}

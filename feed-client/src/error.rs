use thiserror::Error;

use crate::graphql::{ApiErrors, FieldError, STATUS_BAD_REQUEST, STATUS_UNAUTHORIZED};

#[derive(Debug, Error)]
/// Ошибки клиентской библиотеки `feed-client`.
pub enum FeedClientError {
    /// Ошибка HTTP-транспорта (`reqwest`).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Сервер ответил не-2xx без разборчивого тела.
    #[error("http status {0}")]
    HttpStatus(u16),

    /// Ошибки, которые вернул API (в исходном виде).
    #[error("api error: {0}")]
    Api(#[from] ApiErrors),

    /// Запрос отменён (смена фильтра, уход со страницы).
    #[error("request cancelled")]
    Cancelled,

    /// Ответ не содержит ни `data`, ни `errors`, либо нет ожидаемого поля.
    #[error("missing data: {0}")]
    MissingData(&'static str),

    /// Не удалось разобрать полезную нагрузку.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Ошибка хранилища токенов.
    #[error("token storage error: {0}")]
    Storage(String),

    /// Операция требует активной сессии.
    #[error("not signed in")]
    NotSignedIn,

    /// Действие запрещено локальной проверкой (например, удаление чужого твита).
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    /// Данные формы не прошли локальную проверку.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Результат операций `feed-client`.
pub type FeedClientResult<T> = Result<T, FeedClientError>;

impl FeedClientError {
    /// Статус первой ошибки API либо HTTP-статус.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(errors) => errors.status(),
            Self::HttpStatus(status) => Some(*status),
            Self::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// 401 от сервера.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(STATUS_UNAUTHORIZED)
    }

    /// 400 от сервера.
    pub fn is_validation(&self) -> bool {
        self.status() == Some(STATUS_BAD_REQUEST)
    }

    /// Запрос был отменён и не должен считаться ошибкой.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Ошибки полей, если это ошибка API.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            Self::Api(errors) => errors.field_errors(),
            Self::InvalidInput(message) => vec![FieldError::new("", message.clone())],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::{ErrorMessage, GraphqlError};

    fn api_error(status: u16) -> FeedClientError {
        FeedClientError::Api(ApiErrors(vec![GraphqlError {
            status_code: Some(status),
            message: ErrorMessage::Text("boom".to_string()),
            error: None,
        }]))
    }

    #[test]
    fn status_is_read_from_first_api_error() {
        assert!(api_error(401).is_unauthorized());
        assert!(api_error(400).is_validation());
        assert_eq!(api_error(500).status(), Some(500));
    }

    #[test]
    fn cancelled_has_no_status() {
        let err = FeedClientError::Cancelled;
        assert!(err.is_cancelled());
        assert_eq!(err.status(), None);
        assert!(err.field_errors().is_empty());
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Ссылка на пользователя в составе другого объекта.
///
/// API возвращает только запрошенные поля, поэтому всё, кроме `id`,
/// может отсутствовать.
pub struct UserRef {
    /// Идентификатор пользователя.
    pub id: String,
    /// Логин, если был запрошен.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Отображаемое имя, если было запрошено.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UserRef {
    /// Создаёт ссылку только с идентификатором.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Публичная модель пользователя.
pub struct User {
    /// Идентификатор пользователя.
    pub id: String,
    /// Уникальный логин.
    pub username: String,
    /// Отображаемое имя.
    pub name: String,
    /// Email (приходит только для собственного профиля).
    #[serde(default)]
    pub email: Option<String>,
    /// Дата рождения.
    #[serde(default)]
    pub birthday: Option<DateTime<Utc>>,
    /// Дата и время регистрации (UTC).
    pub created_at: DateTime<Utc>,
    /// На кого подписан пользователь.
    #[serde(default)]
    pub following: Vec<UserRef>,
    /// Кто подписан на пользователя.
    #[serde(default)]
    pub followers: Vec<UserRef>,
}

impl User {
    /// Подписан ли пользователь на `user_id`.
    pub fn follows(&self, user_id: &str) -> bool {
        self.following.iter().any(|f| f.id == user_id)
    }

    /// Есть ли `user_id` среди подписчиков.
    pub fn is_followed_by(&self, user_id: &str) -> bool {
        self.followers.iter().any(|f| f.id == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Родительский твит, встроенный в ответ.
pub struct TweetRef {
    /// Идентификатор родительского твита.
    pub id: String,
    /// Автор родительского твита.
    #[serde(default)]
    pub user: Option<UserRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Публичная модель твита.
pub struct Tweet {
    /// Идентификатор твита.
    pub id: String,
    /// Текст (до 280 символов).
    pub text: String,
    /// Дата и время создания (UTC).
    pub created_at: DateTime<Utc>,
    /// Автор.
    pub user: UserRef,
    /// Твит, на который это ответ.
    #[serde(default)]
    pub reply_to: Option<TweetRef>,
    /// Количество ответов.
    #[serde(default)]
    pub replies_count: u64,
    /// Кто лайкнул.
    #[serde(default)]
    pub likes: Vec<UserRef>,
    /// Кто ретвитнул.
    #[serde(default)]
    pub retweets: Vec<UserRef>,
}

impl Tweet {
    /// Является ли `user_id` автором твита.
    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.user.id == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Страница ленты.
pub struct TweetPage {
    /// Общее количество твитов под фильтром.
    pub total_count: u64,
    /// Твиты текущей страницы.
    pub nodes: Vec<Tweet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Пара токенов доступа.
pub struct AuthTokens {
    /// Короткоживущий access token.
    pub access_token: String,
    /// Refresh token для `RefreshTokens`.
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Ответ после успешной регистрации или входа.
pub struct AuthResponse {
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Данные пользователя.
    pub user: User,
}

impl AuthResponse {
    /// Пара токенов из ответа.
    pub fn tokens(&self) -> AuthTokens {
        AuthTokens {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Данные для регистрации.
pub struct SignUpInput {
    /// Отображаемое имя.
    pub name: String,
    /// Email.
    pub email: String,
    /// Логин.
    pub username: String,
    /// Пароль.
    pub password: String,
    /// Дата рождения.
    pub birthday: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Критерий поиска пользователя: по логину или по email.
pub enum FindUserInput {
    /// Поиск по логину.
    Username(String),
    /// Поиск по email.
    Email(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Ссылка на пользователя в фильтре ленты.
pub enum UserFilter {
    /// По идентификатору.
    Id(String),
    /// По логину.
    Username(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Один предикат `PaginationTweetWhere`. Несколько предикатов объединяются по «или».
pub struct TweetWhere {
    /// Автор твита.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserFilter>,
    /// Кто ретвитнул.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retweeted_by: Option<UserFilter>,
    /// Идентификатор родительского твита.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    /// Верхняя граница даты создания (включительно).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

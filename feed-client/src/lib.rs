//! Клиентская библиотека социальной ленты поверх GraphQL API.
//!
//! Предоставляет:
//! - `FeedClient`: типизированные операции API (вход, твиты, лайки, подписки);
//! - `GraphqlClient`: слой авторизованных запросов с однократным обновлением токенов;
//! - `FeedPaginator`: постраничную загрузку ленты с отменой устаревших загрузок;
//! - `TweetInteraction`: локальное состояние лайков/ретвитов одного твита;
//! - `Composer`, `SignInForm`, `SignUpForm`: состояние форм.
//!
//! Сессия (`Session`) передаётся явно и хранит токены в `TokenStore`
//! под ключами `accessToken` / `refreshToken`.
#![warn(missing_docs)]

mod composer;
mod error;
mod forms;
mod graphql;
mod interaction;
mod models;
mod paginator;
mod queries;
mod request;
mod session;
mod storage;
mod transport;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;

pub use composer::{ComposeTarget, Composer, MAX_TWEET_LENGTH};
pub use error::{FeedClientError, FeedClientResult};
pub use forms::{FormErrors, SignInForm, SignUpForm};
pub use graphql::{ApiErrors, ErrorMessage, FieldError, GraphqlError, GraphqlRequest, GraphqlResponse};
pub use interaction::TweetInteraction;
pub use models::{
    AuthResponse, AuthTokens, FindUserInput, SignUpInput, Tweet, TweetPage, TweetRef, TweetWhere,
    User, UserFilter, UserRef,
};
pub use paginator::{
    DEFAULT_PAGE_SIZE, FeedFilter, FeedPaginator, LoadOutcome, LoadStatus, PendingLoad,
    ScrollPosition,
};
pub use request::GraphqlClient;
pub use session::Session;
pub use storage::{
    ACCESS_TOKEN_KEY, FileTokenStore, MemoryTokenStore, REFRESH_TOKEN_KEY, TokenStore,
};
pub use transport::{GraphqlTransport, HttpTransport};

const STATUS_NOT_FOUND: u16 = 404;

#[derive(Debug, Clone)]
/// Клиент API социальной ленты.
///
/// Клоны разделяют транспорт и сессию.
pub struct FeedClient {
    graphql: GraphqlClient,
}

impl FeedClient {
    /// Создаёт клиент поверх произвольного транспорта.
    pub fn new(transport: Arc<dyn GraphqlTransport>, session: Session) -> Self {
        Self {
            graphql: GraphqlClient::new(transport, session),
        }
    }

    /// Создаёт клиент с HTTP-транспортом и новой сессией поверх `store`.
    pub fn http(
        endpoint: impl Into<String>,
        timeout: Duration,
        store: Arc<dyn TokenStore>,
    ) -> FeedClientResult<Self> {
        let transport = HttpTransport::with_timeout(endpoint, timeout)?;
        Ok(Self::new(Arc::new(transport), Session::new(store)))
    }

    /// Сессия клиента.
    pub fn session(&self) -> &Session {
        self.graphql.session()
    }

    /// Слой запросов (для собственных операций).
    pub fn graphql(&self) -> &GraphqlClient {
        &self.graphql
    }

    /// Вход по email и паролю. Сохраняет пользователя и токены в сессии.
    pub async fn sign_in(&self, email: &str, password: &str) -> FeedClientResult<AuthResponse> {
        let request = GraphqlRequest::new(
            queries::sign_in(),
            json!({ "email": email, "password": password }),
        );
        let auth: AuthResponse = self.graphql.require_field(&request, "SignIn").await?;
        self.session().sign_in(&auth)?;
        Ok(auth)
    }

    /// Регистрация. Сохраняет пользователя и токены в сессии.
    pub async fn sign_up(&self, input: &SignUpInput) -> FeedClientResult<AuthResponse> {
        let request = GraphqlRequest::new(queries::sign_up(), json!({ "input": input }));
        let auth: AuthResponse = self.graphql.require_field(&request, "SignUp").await?;
        self.session().sign_in(&auth)?;
        Ok(auth)
    }

    /// Загружает профиль по текущему токену и делает его пользователем сессии.
    pub async fn authenticate(&self) -> FeedClientResult<User> {
        let request = GraphqlRequest::without_variables(queries::profile());
        let user: User = self.graphql.require_field(&request, "Profile").await?;
        self.session().set_user(user.clone());
        Ok(user)
    }

    /// Восстанавливает сессию при старте: если токены сохранены, запрашивает профиль.
    pub async fn restore_session(&self) -> FeedClientResult<Option<User>> {
        if self.session().tokens().is_none() {
            return Ok(None);
        }
        match self.authenticate().await {
            Ok(user) => Ok(Some(user)),
            Err(err) if err.is_unauthorized() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Выход: очищает пользователя и токены.
    pub fn logout(&self) -> FeedClientResult<()> {
        self.session().logout()
    }

    /// Публикует твит.
    pub async fn create_tweet(&self, text: &str) -> FeedClientResult<Tweet> {
        let request = GraphqlRequest::new(
            queries::create_tweet(),
            json!({ "input": { "text": text } }),
        );
        self.graphql.require_field(&request, "CreateTweet").await
    }

    /// Отвечает на твит `tweet_id`.
    pub async fn reply_tweet(&self, tweet_id: &str, text: &str) -> FeedClientResult<Tweet> {
        let request = GraphqlRequest::new(
            queries::reply_tweet(),
            json!({ "input": { "id": tweet_id, "text": text } }),
        );
        self.graphql.require_field(&request, "ReplyTweet").await
    }

    /// Ставит или снимает лайк (сервер переключает состояние).
    pub async fn like_tweet(&self, tweet_id: &str) -> FeedClientResult<()> {
        self.acknowledge(queries::LIKE_TWEET, tweet_id, "LikeTweet").await
    }

    /// Делает или отменяет ретвит.
    pub async fn retweet_tweet(&self, tweet_id: &str) -> FeedClientResult<()> {
        self.acknowledge(queries::RETWEET, tweet_id, "Retweet").await
    }

    /// Удаляет твит.
    pub async fn delete_tweet(&self, tweet_id: &str) -> FeedClientResult<()> {
        let request = GraphqlRequest::new(queries::DELETE_TWEET, json!({ "id": tweet_id }));
        let deleted: bool = self.graphql.require_field(&request, "DeleteTweet").await?;
        if !deleted {
            return Err(FeedClientError::MissingData("DeleteTweet"));
        }
        Ok(())
    }

    /// Подписывается на пользователя или отписывается от него.
    ///
    /// Возвращает обновлённого пользователя; список подписок пользователя
    /// сессии синхронизируется по его `followers`.
    pub async fn follow_user(&self, user_id: &str) -> FeedClientResult<User> {
        let request = GraphqlRequest::new(queries::follow_user(), json!({ "id": user_id }));
        let target: User = self.graphql.require_field(&request, "FollowUser").await?;

        if let Some(me) = self.session().current_user_id() {
            let followed = target.is_followed_by(&me);
            self.session().set_following(&target, followed);
        }
        Ok(target)
    }

    /// Страница ленты, отсортированная по дате создания по убыванию.
    pub async fn paginate_tweets(
        &self,
        skip: u32,
        take: u32,
        filter: &[TweetWhere],
    ) -> FeedClientResult<TweetPage> {
        let request = GraphqlRequest::new(
            queries::pagination_tweet(),
            json!({
                "skip": skip,
                "take": take,
                "sortBy": { "createdAt": "DESC" },
                "where": filter,
            }),
        );
        debug!(skip, take, "loading tweet page");
        self.graphql.require_field(&request, "PaginationTweet").await
    }

    /// Твит по идентификатору; `None`, если не найден.
    pub async fn find_tweet(&self, tweet_id: &str) -> FeedClientResult<Option<Tweet>> {
        let request = GraphqlRequest::new(queries::find_tweet(), json!({ "id": tweet_id }));
        not_found_as_none(self.graphql.query_field(&request, "FindOneTweet").await)
    }

    /// Пользователь по логину или email; `None`, если не найден.
    pub async fn find_user(&self, input: &FindUserInput) -> FeedClientResult<Option<User>> {
        let request = GraphqlRequest::new(queries::find_user(), json!({ "input": input }));
        not_found_as_none(self.graphql.query_field(&request, "FindOneUser").await)
    }

    /// Занят ли логин (проверка перед регистрацией).
    pub async fn is_username_taken(&self, username: &str) -> FeedClientResult<bool> {
        self.user_exists(FindUserInput::Username(username.to_lowercase()))
            .await
    }

    /// Занят ли email (проверка перед регистрацией).
    pub async fn is_email_taken(&self, email: &str) -> FeedClientResult<bool> {
        self.user_exists(FindUserInput::Email(email.to_lowercase())).await
    }

    async fn user_exists(&self, input: FindUserInput) -> FeedClientResult<bool> {
        let request = GraphqlRequest::new(queries::USER_EXISTS, json!({ "input": input }));
        let found: Option<UserRef> =
            not_found_as_none(self.graphql.query_field(&request, "FindOneUser").await)?;
        Ok(found.is_some())
    }

    async fn acknowledge(
        &self,
        query: &str,
        tweet_id: &str,
        field: &'static str,
    ) -> FeedClientResult<()> {
        let request = GraphqlRequest::new(query, json!({ "id": tweet_id }));
        let _: Value = self.graphql.require_field(&request, field).await?;
        Ok(())
    }
}

fn not_found_as_none<T>(result: FeedClientResult<Option<T>>) -> FeedClientResult<Option<T>> {
    match result {
        Err(err) if err.status() == Some(STATUS_NOT_FOUND) => Ok(None),
        other => other,
    }
}

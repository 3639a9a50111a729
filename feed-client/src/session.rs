use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::error::FeedClientResult;
use crate::models::{AuthResponse, AuthTokens, User, UserRef};
use crate::storage::{self, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TokenStore};

#[derive(Clone)]
/// Сессия: текущий пользователь и хранилище токенов.
///
/// Клоны разделяют одно состояние. Подписчики (`subscribe`) получают
/// уведомление при входе, выходе и изменении списка подписок.
pub struct Session {
    user: Arc<watch::Sender<Option<User>>>,
    store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &*self.user.borrow())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Создаёт пустую сессию поверх хранилища токенов.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            user: Arc::new(watch::Sender::new(None)),
            store,
        }
    }

    /// Текущий пользователь.
    pub fn current_user(&self) -> Option<User> {
        self.user.borrow().clone()
    }

    /// Идентификатор текущего пользователя.
    pub fn current_user_id(&self) -> Option<String> {
        self.user.borrow().as_ref().map(|user| user.id.clone())
    }

    /// Есть ли активный пользователь.
    pub fn is_authenticated(&self) -> bool {
        self.user.borrow().is_some()
    }

    /// Подписка на изменения пользователя.
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.user.subscribe()
    }

    /// Устанавливает пользователя (например, после `Profile`).
    pub fn set_user(&self, user: User) {
        self.user.send_replace(Some(user));
    }

    /// Вход: сохраняет пользователя и пару токенов.
    pub fn sign_in(&self, auth: &AuthResponse) -> FeedClientResult<()> {
        self.store_tokens(&auth.tokens())?;
        info!(user_id = %auth.user.id, username = %auth.user.username, "signed in");
        self.set_user(auth.user.clone());
        Ok(())
    }

    /// Выход: очищает пользователя и удаляет токены.
    pub fn logout(&self) -> FeedClientResult<()> {
        let previous = self.user.send_replace(None);
        if let Some(user) = previous {
            info!(user_id = %user.id, "signed out");
        }
        storage::clear_tokens(self.store.as_ref())
    }

    /// Access token из хранилища.
    pub fn access_token(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    /// Refresh token из хранилища.
    pub fn refresh_token(&self) -> Option<String> {
        self.store.get(REFRESH_TOKEN_KEY)
    }

    /// Пара токенов, если обе части есть.
    pub fn tokens(&self) -> Option<AuthTokens> {
        storage::load_tokens(self.store.as_ref())
    }

    pub(crate) fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Сохраняет новую пару токенов.
    pub fn store_tokens(&self, tokens: &AuthTokens) -> FeedClientResult<()> {
        storage::save_tokens(self.store.as_ref(), tokens)
    }

    /// Обновляет локальный список подписок текущего пользователя.
    ///
    /// Меняется только `following` самого пользователя сессии.
    pub fn set_following(&self, target: &User, followed: bool) {
        self.user.send_if_modified(|current| {
            let Some(user) = current.as_mut() else {
                return false;
            };
            let already = user.follows(&target.id);
            match (followed, already) {
                (true, false) => {
                    user.following.push(UserRef {
                        id: target.id.clone(),
                        username: Some(target.username.clone()),
                        name: Some(target.name.clone()),
                    });
                    true
                }
                (false, true) => {
                    user.following.retain(|f| f.id != target.id);
                    true
                }
                _ => false,
            }
        });
    }
}

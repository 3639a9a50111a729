use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::FeedClient;
use crate::error::{FeedClientError, FeedClientResult};
use crate::models::{Tweet, TweetPage, TweetWhere, User, UserFilter};

/// Размер страницы по умолчанию.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Какие твиты показывает лента.
pub enum FeedFilter {
    /// Все твиты.
    Global,
    /// Твиты и ретвиты перечисленных пользователей.
    Following {
        /// Идентификаторы авторов.
        user_ids: Vec<String>,
    },
    /// Профиль: твиты пользователя и его ретвиты.
    Profile {
        /// Логин владельца профиля.
        username: String,
    },
    /// Ответы на твит.
    Replies {
        /// Родительский твит.
        tweet_id: String,
    },
}

impl FeedFilter {
    /// Лента подписок пользователя (включая его самого).
    pub fn following(user: &User) -> Self {
        let mut user_ids = vec![user.id.clone()];
        for followed in &user.following {
            if !user_ids.contains(&followed.id) {
                user_ids.push(followed.id.clone());
            }
        }
        Self::Following { user_ids }
    }

    /// Предикаты `where`, ограниченные снимком времени `snapshot`.
    pub fn to_where(&self, snapshot: DateTime<Utc>) -> Vec<TweetWhere> {
        let created_at = Some(snapshot);
        match self {
            Self::Global => vec![TweetWhere {
                created_at,
                ..Default::default()
            }],
            Self::Following { user_ids } => user_ids
                .iter()
                .flat_map(|id| {
                    [
                        TweetWhere {
                            user: Some(UserFilter::Id(id.clone())),
                            created_at,
                            ..Default::default()
                        },
                        TweetWhere {
                            retweeted_by: Some(UserFilter::Id(id.clone())),
                            created_at,
                            ..Default::default()
                        },
                    ]
                })
                .collect(),
            Self::Profile { username } => vec![
                TweetWhere {
                    user: Some(UserFilter::Username(username.clone())),
                    created_at,
                    ..Default::default()
                },
                TweetWhere {
                    retweeted_by: Some(UserFilter::Username(username.clone())),
                    created_at,
                    ..Default::default()
                },
            ],
            Self::Replies { tweet_id } => vec![TweetWhere {
                reply_to: Some(tweet_id.clone()),
                created_at,
                ..Default::default()
            }],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Положение прокрутки, о котором сообщает потребитель ленты.
pub struct ScrollPosition {
    /// Отступ прокрутки сверху.
    pub scroll_top: f64,
    /// Высота видимой области.
    pub viewport_height: f64,
    /// Полная высота содержимого.
    pub document_height: f64,
}

impl ScrollPosition {
    /// Низ видимой области дошёл до конца содержимого.
    pub fn is_at_bottom(&self) -> bool {
        self.scroll_top + self.viewport_height >= self.document_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Итог попытки загрузки.
pub enum LoadStatus {
    /// Загрузка не начиналась: уже идёт другая либо лента закончилась.
    Skipped,
    /// Страница применена.
    Loaded {
        /// Сколько твитов пришло.
        received: usize,
        /// Достигнут ли конец ленты.
        end: bool,
    },
    /// Результат отброшен: загрузка отменена или устарела.
    Discarded,
}

/// Начатая загрузка страницы, не держащая ссылку на ленту.
///
/// Выполняется отдельно (`run`) и применяется через `FeedPaginator::complete`.
#[derive(Debug)]
pub struct PendingLoad {
    generation: u64,
    skip: u32,
    take: u32,
    removed: u32,
    filter: Vec<TweetWhere>,
    token: CancellationToken,
    client: FeedClient,
}

impl PendingLoad {
    /// Поколение ленты, в котором начата загрузка.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Смещение запрашиваемой страницы.
    pub fn skip(&self) -> u32 {
        self.skip
    }

    /// Выполняет запрос; отмена токена прерывает его.
    pub async fn run(self) -> LoadOutcome {
        let result = tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(FeedClientError::Cancelled),
            page = self.client.paginate_tweets(self.skip, self.take, &self.filter) => page,
        };

        LoadOutcome {
            generation: self.generation,
            skip: self.skip,
            removed: self.removed,
            result,
        }
    }
}

/// Результат `PendingLoad::run`.
#[derive(Debug)]
pub struct LoadOutcome {
    generation: u64,
    skip: u32,
    removed: u32,
    result: FeedClientResult<TweetPage>,
}

#[derive(Debug)]
/// Постраничная лента с бесконечной прокруткой.
///
/// Все страницы запрашиваются с `createdAt <= snapshot`, где снимок времени
/// фиксируется при сбросе; новые твиты не сдвигают смещения во время прокрутки.
/// Каждый сброс или отмена начинает новое поколение: результаты загрузок
/// прошлых поколений отбрасываются.
pub struct FeedPaginator {
    client: FeedClient,
    filter: FeedFilter,
    snapshot: DateTime<Utc>,
    tweets: Vec<Tweet>,
    skip: u32,
    take: u32,
    total_count: Option<u64>,
    loading: bool,
    end: bool,
    // Удаления из списка за поколение; нужны, чтобы поправить смещение
    // страницы, которая грузилась во время удаления.
    removed: u32,
    generation: u64,
    cancel: CancellationToken,
}

impl FeedPaginator {
    /// Лента с размером страницы по умолчанию.
    pub fn new(client: FeedClient, filter: FeedFilter) -> Self {
        Self::with_page_size(client, filter, DEFAULT_PAGE_SIZE)
    }

    /// Лента с заданным размером страницы (не меньше 1).
    pub fn with_page_size(client: FeedClient, filter: FeedFilter, take: u32) -> Self {
        Self {
            client,
            filter,
            snapshot: Utc::now(),
            tweets: Vec::new(),
            skip: 0,
            take: take.max(1),
            total_count: None,
            loading: false,
            end: false,
            removed: 0,
            generation: 0,
            cancel: CancellationToken::new(),
        }
    }

    /// Загруженные твиты в порядке сервера.
    pub fn tweets(&self) -> &[Tweet] {
        &self.tweets
    }

    /// Смещение следующей страницы.
    pub fn skip(&self) -> u32 {
        self.skip
    }

    /// Размер страницы.
    pub fn take(&self) -> u32 {
        self.take
    }

    /// Общее количество по данным сервера (после первой загрузки).
    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    /// Идёт ли загрузка.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Загружено всё.
    pub fn is_end(&self) -> bool {
        self.end
    }

    /// Текущий фильтр.
    pub fn filter(&self) -> &FeedFilter {
        &self.filter
    }

    /// Снимок времени текущего поколения.
    pub fn snapshot(&self) -> DateTime<Utc> {
        self.snapshot
    }

    /// Номер текущего поколения.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Меняет фильтр и сбрасывает ленту.
    pub fn reset(&mut self, filter: FeedFilter) {
        self.filter = filter;
        self.restart();
    }

    /// Перезагрузка с тем же фильтром и свежим снимком времени.
    pub fn refresh(&mut self) {
        self.restart();
    }

    /// Отменяет текущую загрузку (уход со страницы). Накопленный список сохраняется.
    pub fn cancel(&mut self) {
        self.next_generation();
        self.loading = false;
    }

    fn restart(&mut self) {
        self.next_generation();
        self.tweets.clear();
        self.skip = 0;
        self.total_count = None;
        self.loading = false;
        self.end = false;
        self.removed = 0;
        self.snapshot = Utc::now();
        debug!(generation = self.generation, filter = ?self.filter, "feed reset");
    }

    fn next_generation(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.generation += 1;
    }

    /// Нужно ли догружать при таком положении прокрутки.
    pub fn should_load_more(&self, position: ScrollPosition) -> bool {
        position.is_at_bottom() && !self.tweets.is_empty() && !self.loading && !self.end
    }

    /// Начинает загрузку следующей страницы.
    ///
    /// `None`, если загрузка уже идёт или лента закончилась.
    pub fn begin_load(&mut self) -> Option<PendingLoad> {
        if self.loading || self.end {
            return None;
        }
        self.loading = true;

        Some(PendingLoad {
            generation: self.generation,
            skip: self.skip,
            take: self.take,
            removed: self.removed,
            filter: self.filter.to_where(self.snapshot),
            token: self.cancel.clone(),
            client: self.client.clone(),
        })
    }

    /// Начинает загрузку, если прокрутка дошла до низа.
    pub fn begin_load_on_scroll(&mut self, position: ScrollPosition) -> Option<PendingLoad> {
        if !self.should_load_more(position) {
            return None;
        }
        self.begin_load()
    }

    /// Применяет результат загрузки.
    ///
    /// Устаревшие и отменённые результаты отбрасываются без изменения состояния.
    /// Ошибка оставляет список и `skip` как были.
    pub fn complete(&mut self, outcome: LoadOutcome) -> FeedClientResult<LoadStatus> {
        if outcome.generation != self.generation {
            debug!(
                stale = outcome.generation,
                current = self.generation,
                "discarding stale page"
            );
            return Ok(LoadStatus::Discarded);
        }

        let page = match outcome.result {
            Ok(page) => page,
            Err(FeedClientError::Cancelled) => {
                self.loading = false;
                return Ok(LoadStatus::Discarded);
            }
            Err(err) => {
                self.loading = false;
                warn!(skip = outcome.skip, error = %err, "failed to load feed page");
                return Err(err);
            }
        };

        let received = page.nodes.len();
        if outcome.skip == 0 {
            self.tweets = page.nodes;
        } else {
            self.tweets.extend(page.nodes);
        }
        // Твиты, удалённые пока страница грузилась, уже сдвинули смещение на сервере.
        let removed_since = self.removed.saturating_sub(outcome.removed);
        self.skip = (outcome.skip + self.take).saturating_sub(removed_since);
        self.total_count = Some(page.total_count);
        self.end = self.tweets.len() as u64 >= page.total_count;
        self.loading = false;

        debug!(received, skip = self.skip, end = self.end, "feed page applied");
        Ok(LoadStatus::Loaded {
            received,
            end: self.end,
        })
    }

    /// Загружает следующую страницу и применяет её.
    pub async fn load(&mut self) -> FeedClientResult<LoadStatus> {
        let Some(pending) = self.begin_load() else {
            return Ok(LoadStatus::Skipped);
        };
        let outcome = pending.run().await;
        self.complete(outcome)
    }

    /// Убирает твит из списка (после удаления).
    ///
    /// Удаляется ровно одна запись; общее количество и смещение уменьшаются на 1.
    /// Если в этот момент идёт загрузка, её `complete` учтёт удаление в смещении.
    pub fn remove_tweet(&mut self, tweet_id: &str) -> bool {
        let Some(index) = self.tweets.iter().position(|t| t.id == tweet_id) else {
            return false;
        };
        self.tweets.remove(index);
        self.removed += 1;
        self.total_count = self.total_count.map(|total| total.saturating_sub(1));
        self.skip = self.skip.saturating_sub(1);
        true
    }
}

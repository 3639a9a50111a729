use tracing::warn;

use crate::FeedClient;
use crate::error::{FeedClientError, FeedClientResult};
use crate::models::{Tweet, User};
use crate::paginator::FeedPaginator;

#[derive(Debug, Clone)]
struct Viewer {
    id: String,
    username: String,
}

#[derive(Debug, Clone)]
/// Локальное состояние взаимодействий с одним твитом.
///
/// Флаги и счётчики выводятся из снимка твита и пользователя сессии.
/// После подтверждения сервером лайк/ретвит меняют счётчик ровно на единицу
/// относительно прежнего локального состояния: API не возвращает агрегаты.
pub struct TweetInteraction {
    tweet: Tweet,
    viewer: Option<Viewer>,
    is_liked: bool,
    is_retweeted: bool,
    likes_count: u64,
    retweets_count: u64,
    retweet_users: Vec<String>,
}

impl TweetInteraction {
    /// Состояние для твита с точки зрения `viewer`.
    pub fn new(tweet: Tweet, viewer: Option<&User>) -> Self {
        let mut state = Self {
            tweet,
            viewer: None,
            is_liked: false,
            is_retweeted: false,
            likes_count: 0,
            retweets_count: 0,
            retweet_users: Vec::new(),
        };
        state.sync(viewer);
        state
    }

    /// Пересчитывает производное состояние (смена пользователя сессии).
    pub fn sync(&mut self, viewer: Option<&User>) {
        self.viewer = viewer.map(|user| Viewer {
            id: user.id.clone(),
            username: user.username.clone(),
        });

        let viewer_id = viewer.map(|user| user.id.as_str());
        self.is_liked = viewer_id.is_some_and(|id| self.tweet.likes.iter().any(|u| u.id == id));
        self.is_retweeted =
            viewer_id.is_some_and(|id| self.tweet.retweets.iter().any(|u| u.id == id));
        self.likes_count = self.tweet.likes.len() as u64;
        self.retweets_count = self.tweet.retweets.len() as u64;
        self.retweet_users = retweet_display_users(&self.tweet, viewer);
    }

    /// Заменяет снимок твита и пересчитывает состояние.
    pub fn set_tweet(&mut self, tweet: Tweet, viewer: Option<&User>) {
        self.tweet = tweet;
        self.sync(viewer);
    }

    /// Снимок твита.
    pub fn tweet(&self) -> &Tweet {
        &self.tweet
    }

    /// Лайкнул ли пользователь сессии.
    pub fn is_liked(&self) -> bool {
        self.is_liked
    }

    /// Ретвитнул ли пользователь сессии.
    pub fn is_retweeted(&self) -> bool {
        self.is_retweeted
    }

    /// Отображаемое число лайков.
    pub fn likes_count(&self) -> u64 {
        self.likes_count
    }

    /// Отображаемое число ретвитов.
    pub fn retweets_count(&self) -> u64 {
        self.retweets_count
    }

    /// Кого показать в строке «ретвитнули»: сначала сам пользователь, затем его подписки.
    pub fn retweet_users(&self) -> &[String] {
        &self.retweet_users
    }

    /// Удаление доступно только автору.
    pub fn can_delete(&self) -> bool {
        self.viewer
            .as_ref()
            .is_some_and(|viewer| self.tweet.is_authored_by(&viewer.id))
    }

    /// Лайк / снятие лайка.
    pub async fn like(&mut self, client: &FeedClient) -> FeedClientResult<()> {
        let was_liked = self.is_liked;
        if let Err(err) = client.like_tweet(&self.tweet.id).await {
            warn!(tweet_id = %self.tweet.id, error = %err, "like failed");
            return Err(err);
        }

        self.is_liked = !was_liked;
        self.likes_count = step(self.likes_count, !was_liked);
        Ok(())
    }

    /// Ретвит / отмена ретвита.
    pub async fn retweet(&mut self, client: &FeedClient) -> FeedClientResult<()> {
        let was_retweeted = self.is_retweeted;
        if let Err(err) = client.retweet_tweet(&self.tweet.id).await {
            warn!(tweet_id = %self.tweet.id, error = %err, "retweet failed");
            return Err(err);
        }

        self.is_retweeted = !was_retweeted;
        self.retweets_count = step(self.retweets_count, !was_retweeted);

        if let Some(viewer) = &self.viewer {
            self.retweet_users.retain(|name| name != &viewer.username);
            if self.is_retweeted {
                self.retweet_users.insert(0, viewer.username.clone());
            }
        }
        Ok(())
    }

    /// Удаляет твит и убирает его из ленты `feed`, если она передана.
    pub async fn delete(
        &self,
        client: &FeedClient,
        feed: Option<&mut FeedPaginator>,
    ) -> FeedClientResult<()> {
        if !self.can_delete() {
            return Err(FeedClientError::Forbidden("only the author can delete a tweet"));
        }

        if let Err(err) = client.delete_tweet(&self.tweet.id).await {
            warn!(tweet_id = %self.tweet.id, error = %err, "delete failed");
            return Err(err);
        }

        if let Some(feed) = feed {
            feed.remove_tweet(&self.tweet.id);
        }
        Ok(())
    }
}

fn step(count: u64, up: bool) -> u64 {
    if up {
        count + 1
    } else {
        count.saturating_sub(1)
    }
}

fn retweet_display_users(tweet: &Tweet, viewer: Option<&User>) -> Vec<String> {
    let Some(viewer) = viewer else {
        return Vec::new();
    };

    let mut users = Vec::new();
    if tweet.retweets.iter().any(|u| u.id == viewer.id) {
        users.push(viewer.username.clone());
    }
    for retweeter in &tweet.retweets {
        if retweeter.id == viewer.id || !viewer.follows(&retweeter.id) {
            continue;
        }
        if let Some(username) = &retweeter.username
            && !users.contains(username)
        {
            users.push(username.clone());
        }
    }
    users
}

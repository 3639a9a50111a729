use tracing::{debug, info};

use crate::FeedClient;
use crate::error::{FeedClientError, FeedClientResult};
use crate::forms::FormErrors;
use crate::graphql::STATUS_BAD_REQUEST;
use crate::models::Tweet;
use crate::paginator::FeedPaginator;

/// Максимальная длина твита в символах.
pub const MAX_TWEET_LENGTH: usize = 280;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Куда публикуется текст.
pub enum ComposeTarget {
    /// Новый твит.
    Tweet,
    /// Ответ на твит.
    Reply {
        /// Идентификатор родительского твита.
        tweet_id: String,
    },
}

#[derive(Debug, Clone)]
/// Черновик твита или ответа.
pub struct Composer {
    target: ComposeTarget,
    text: String,
    errors: FormErrors,
}

impl Composer {
    /// Черновик для `target`.
    pub fn new(target: ComposeTarget) -> Self {
        Self {
            target,
            text: String::new(),
            errors: FormErrors::new(),
        }
    }

    /// Черновик нового твита.
    pub fn tweet() -> Self {
        Self::new(ComposeTarget::Tweet)
    }

    /// Черновик ответа на `tweet_id`.
    pub fn reply(tweet_id: impl Into<String>) -> Self {
        Self::new(ComposeTarget::Reply {
            tweet_id: tweet_id.into(),
        })
    }

    /// Цель публикации.
    pub fn target(&self) -> &ComposeTarget {
        &self.target
    }

    /// Текущий текст.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Ошибки последней отправки.
    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    /// Меняет текст. Текст длиннее `MAX_TWEET_LENGTH` не принимается.
    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text.chars().count() > MAX_TWEET_LENGTH {
            return false;
        }
        self.text = text;
        self.errors.clear_field("text");
        true
    }

    /// Длина текста без пробелов по краям в `1..=MAX_TWEET_LENGTH`.
    pub fn is_valid(&self) -> bool {
        let len = self.text.trim().chars().count();
        (1..=MAX_TWEET_LENGTH).contains(&len)
    }

    /// Можно ли отправить черновик.
    ///
    /// Пока идёт отправка, черновик заимствован `submit` эксклюзивно.
    pub fn can_submit(&self) -> bool {
        self.is_valid()
    }

    /// Публикует черновик.
    ///
    /// При успехе текст и ошибки очищаются, а лента `feed` перезапускается
    /// с начала. На 400 ошибки полей сохраняются, текст остаётся.
    pub async fn submit(
        &mut self,
        client: &FeedClient,
        feed: Option<&mut FeedPaginator>,
    ) -> FeedClientResult<Tweet> {
        if !self.can_submit() {
            return Err(FeedClientError::InvalidInput(format!(
                "tweet text must be 1 to {MAX_TWEET_LENGTH} characters"
            )));
        }

        let result = match &self.target {
            ComposeTarget::Tweet => client.create_tweet(&self.text).await,
            ComposeTarget::Reply { tweet_id } => client.reply_tweet(tweet_id, &self.text).await,
        };

        match result {
            Ok(tweet) => {
                info!(tweet_id = %tweet.id, "tweet published");
                self.text.clear();
                self.errors.clear();
                if let Some(feed) = feed {
                    feed.refresh();
                }
                Ok(tweet)
            }
            Err(err) => {
                if err.status() == Some(STATUS_BAD_REQUEST) {
                    self.errors.replace(err.field_errors());
                }
                debug!(error = %err, "tweet rejected");
                Err(err)
            }
        }
    }
}

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

use crate::error::{FeedClientError, FeedClientResult};
use crate::graphql::{ErrorMessage, FieldError, GraphqlError, GraphqlRequest, GraphqlResponse};
use crate::models::{AuthTokens, Tweet, User, UserRef};
use crate::session::Session;
use crate::storage::MemoryTokenStore;
use crate::FeedClient;

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub(crate) query: String,
    pub(crate) variables: Value,
    pub(crate) bearer: Option<String>,
}

/// Транспорт, отвечающий заранее записанными ответами по очереди.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<FeedClientResult<GraphqlResponse>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push(&self, response: FeedClientResult<GraphqlResponse>) {
        self.responses
            .lock()
            .expect("responses mutex poisoned")
            .push_back(response);
    }

    pub(crate) fn push_data(&self, data: Value) {
        self.push(Ok(GraphqlResponse {
            data: Some(data),
            errors: None,
        }));
    }

    pub(crate) fn push_error(&self, status: u16, message: &str) {
        self.push(Ok(GraphqlResponse {
            data: None,
            errors: Some(vec![GraphqlError {
                status_code: Some(status),
                message: ErrorMessage::Text(message.to_string()),
                error: None,
            }]),
        }));
    }

    pub(crate) fn push_field_errors(&self, status: u16, fields: &[(&str, &str)]) {
        self.push(Ok(GraphqlResponse {
            data: None,
            errors: Some(vec![GraphqlError {
                status_code: Some(status),
                message: ErrorMessage::Fields(
                    fields
                        .iter()
                        .map(|(code, message)| FieldError::new(*code, *message))
                        .collect(),
                ),
                error: Some("Bad Request".to_string()),
            }]),
        }));
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

#[async_trait]
impl crate::transport::GraphqlTransport for ScriptedTransport {
    async fn post(
        &self,
        request: &GraphqlRequest,
        bearer: Option<&str>,
    ) -> FeedClientResult<GraphqlResponse> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(RecordedCall {
                query: request.query.clone(),
                variables: request.variables.clone(),
                bearer: bearer.map(str::to_string),
            });

        self.responses
            .lock()
            .expect("responses mutex poisoned")
            .pop_front()
            .unwrap_or(Err(FeedClientError::MissingData("no scripted response")))
    }
}

pub(crate) fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().expect("valid ts")
}

pub(crate) fn user(id: &str, username: &str) -> User {
    User {
        id: id.to_string(),
        username: username.to_string(),
        name: username.to_uppercase(),
        email: None,
        birthday: None,
        created_at: ts(0),
        following: Vec::new(),
        followers: Vec::new(),
    }
}

pub(crate) fn user_ref(id: &str, username: &str) -> UserRef {
    UserRef {
        id: id.to_string(),
        username: Some(username.to_string()),
        name: None,
    }
}

pub(crate) fn tweet(id: &str, author_id: &str) -> Tweet {
    Tweet {
        id: id.to_string(),
        text: format!("tweet {id}"),
        created_at: ts(1_000),
        user: user_ref(author_id, author_id),
        reply_to: None,
        replies_count: 0,
        likes: Vec::new(),
        retweets: Vec::new(),
    }
}

pub(crate) fn tweet_json(id: &str) -> Value {
    serde_json::to_value(tweet(id, "author")).expect("tweet must serialize")
}

/// `data` ответа `PaginationTweet` с твитами `prefix0..prefixN`.
pub(crate) fn page_data(prefix: &str, range: std::ops::Range<usize>, total: u64) -> Value {
    let nodes: Vec<Value> = range.map(|i| tweet_json(&format!("{prefix}{i}"))).collect();
    json!({"PaginationTweet": {"totalCount": total, "nodes": nodes}})
}

pub(crate) fn signed_in_session(access: &str, refresh: &str) -> Session {
    let session = Session::new(Arc::new(MemoryTokenStore::new()));
    session
        .store_tokens(&AuthTokens {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        })
        .expect("tokens must be stored");
    session.set_user(user("me", "me"));
    session
}

pub(crate) fn client_with(transport: Arc<ScriptedTransport>) -> FeedClient {
    FeedClient::new(transport, signed_in_session("access", "refresh"))
}

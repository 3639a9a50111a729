use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{FeedClientError, FeedClientResult};
use crate::graphql::{GraphqlRequest, GraphqlResponse};

/// Отправка одного GraphQL-запроса.
///
/// Реализация не интерпретирует `errors`, это делает слой авторизации.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    /// POST на эндпоинт с необязательным bearer-токеном.
    async fn post(
        &self,
        request: &GraphqlRequest,
        bearer: Option<&str>,
    ) -> FeedClientResult<GraphqlResponse>;
}

#[derive(Debug, Clone)]
/// HTTP-транспорт на `reqwest`.
pub struct HttpTransport {
    endpoint: String,
    client: Client,
}

impl HttpTransport {
    /// Таймаут по умолчанию на весь запрос.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Создаёт транспорт с таймаутом по умолчанию.
    pub fn new(endpoint: impl Into<String>) -> FeedClientResult<Self> {
        Self::with_timeout(endpoint, Self::DEFAULT_TIMEOUT)
    }

    /// Создаёт транспорт с заданным таймаутом запроса.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> FeedClientResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    /// URL эндпоинта.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GraphqlTransport for HttpTransport {
    async fn post(
        &self,
        request: &GraphqlRequest,
        bearer: Option<&str>,
    ) -> FeedClientResult<GraphqlResponse> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), "graphql response received");

        let body = response.bytes().await?;
        match serde_json::from_slice::<GraphqlResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            // не-2xx без json-тела
            Err(_) if !status.is_success() => Err(FeedClientError::HttpStatus(status.as_u16())),
            Err(err) => Err(FeedClientError::Decode(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_keeps_endpoint() {
        let transport = HttpTransport::new("http://localhost:3001/graphql").expect("must build");
        assert_eq!(transport.endpoint(), "http://localhost:3001/graphql");
    }
}

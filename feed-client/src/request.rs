use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{FeedClientError, FeedClientResult};
use crate::graphql::{ApiErrors, GraphqlRequest, GraphqlResponse};
use crate::models::AuthTokens;
use crate::queries;
use crate::session::Session;
use crate::transport::GraphqlTransport;

#[derive(Clone)]
/// Слой авторизованных запросов.
///
/// Подставляет access token из сессии и при первом 401 один раз обновляет
/// пару токенов через `RefreshTokens`, после чего повторяет исходный запрос.
/// Если обновить не удалось, сессия очищается и возвращается исходная 401.
pub struct GraphqlClient {
    transport: Arc<dyn GraphqlTransport>,
    session: Session,
}

impl std::fmt::Debug for GraphqlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphqlClient")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl GraphqlClient {
    /// Создаёт клиент поверх транспорта и сессии.
    pub fn new(transport: Arc<dyn GraphqlTransport>, session: Session) -> Self {
        Self { transport, session }
    }

    /// Сессия, с которой работает клиент.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Выполняет запрос и возвращает `data` либо список ошибок API.
    pub async fn execute(&self, request: &GraphqlRequest) -> FeedClientResult<Value> {
        let response = self.send_with_refresh(request).await?;
        into_data(response)
    }

    /// Выполняет запрос и достаёт поле `field` из `data`.
    ///
    /// `null` в поле даёт `Ok(None)`.
    pub async fn query_field<T: DeserializeOwned>(
        &self,
        request: &GraphqlRequest,
        field: &'static str,
    ) -> FeedClientResult<Option<T>> {
        let data = self.execute(request).await?;
        take_field(data, field)
    }

    /// Как `query_field`, но отсутствие поля считается ошибкой.
    pub async fn require_field<T: DeserializeOwned>(
        &self,
        request: &GraphqlRequest,
        field: &'static str,
    ) -> FeedClientResult<T> {
        self.query_field(request, field)
            .await?
            .ok_or(FeedClientError::MissingData(field))
    }

    async fn send_with_refresh(&self, request: &GraphqlRequest) -> FeedClientResult<GraphqlResponse> {
        let response = self.send(request).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        debug!("access token rejected, refreshing once");
        match self.refresh_tokens().await {
            Ok(tokens) => {
                self.session.store_tokens(&tokens)?;
                // повтор ровно один раз, без повторного refresh
                self.send(request).await
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed, clearing session");
                if let Err(err) = self.session.logout() {
                    warn!(error = %err, "failed to clear stored tokens");
                }
                Ok(response)
            }
        }
    }

    async fn send(&self, request: &GraphqlRequest) -> FeedClientResult<GraphqlResponse> {
        let token = self.session.access_token();
        self.transport.post(request, token.as_deref()).await
    }

    async fn refresh_tokens(&self) -> FeedClientResult<AuthTokens> {
        let refresh_token = self
            .session
            .refresh_token()
            .ok_or(FeedClientError::NotSignedIn)?;

        let request = GraphqlRequest::without_variables(queries::REFRESH_TOKENS);
        let response = self.transport.post(&request, Some(&refresh_token)).await?;
        let data = into_data(response)?;
        take_field(data, "RefreshTokens")?.ok_or(FeedClientError::MissingData("RefreshTokens"))
    }
}

pub(crate) fn into_data(response: GraphqlResponse) -> FeedClientResult<Value> {
    if let Some(errors) = response.errors
        && !errors.is_empty()
    {
        return Err(ApiErrors(errors).into());
    }
    response.data.ok_or(FeedClientError::MissingData("data"))
}

pub(crate) fn take_field<T: DeserializeOwned>(
    mut data: Value,
    field: &'static str,
) -> FeedClientResult<Option<T>> {
    let value = data.get_mut(field).map(Value::take).unwrap_or(Value::Null);
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

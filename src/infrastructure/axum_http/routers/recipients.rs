use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{ConnectInfo, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    application::usecases::{recipient_tokens::RecipientTokenUseCase, throttle::ThrottleUseCase},
    config::config_model::{DotEnvyConfig, RateLimit},
    domain::repositories::{
        recipient_tokens::RecipientTokenRepository, throttle::ThrottleRepository,
    },
    infrastructure::{
        axum_http::error_responses::AppError,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{
                recipient_tokens::RecipientTokenPostgres, throttle::ThrottlePostgres,
            },
        },
    },
};

pub struct RecipientLookupState<T, R>
where
    T: RecipientTokenRepository + Send + Sync + 'static,
    R: ThrottleRepository + Send + Sync + 'static,
{
    pub recipient_token_usecase: Arc<RecipientTokenUseCase<T>>,
    pub throttle_usecase: Arc<ThrottleUseCase<R>>,
    pub rate_limit: RateLimit,
}

impl<T, R> Clone for RecipientLookupState<T, R>
where
    T: RecipientTokenRepository + Send + Sync + 'static,
    R: ThrottleRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            recipient_token_usecase: Arc::clone(&self.recipient_token_usecase),
            throttle_usecase: Arc::clone(&self.throttle_usecase),
            rate_limit: self.rate_limit.clone(),
        }
    }
}

pub fn routes(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Router {
    let recipient_token_repository = RecipientTokenPostgres::new(Arc::clone(&db_pool));
    let throttle_repository = ThrottlePostgres::new(Arc::clone(&db_pool));

    let state = RecipientLookupState {
        recipient_token_usecase: Arc::new(RecipientTokenUseCase::new(
            Arc::new(recipient_token_repository),
            config.recipient_token.signing_secret.clone(),
        )),
        throttle_usecase: Arc::new(ThrottleUseCase::new(Arc::new(throttle_repository))),
        rate_limit: config.rate_limit.clone(),
    };

    Router::new()
        .route("/by-token", get(find_by_token))
        .route("/by-code", get(find_by_code))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct TokenLookupQuery {
    token: String,
}

#[derive(Debug, Deserialize)]
pub struct CodeLookupQuery {
    code: String,
}

#[derive(Debug, Serialize)]
pub struct RecipientLookupResponse {
    pub recipient_id: i64,
}

pub async fn find_by_token<T, R>(
    State(state): State<RecipientLookupState<T, R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<TokenLookupQuery>,
) -> Response
where
    T: RecipientTokenRepository + Send + Sync + 'static,
    R: ThrottleRepository + Send + Sync + 'static,
{
    let token = query.token.trim();
    if token.is_empty() {
        return AppError::BadRequest("Token is required.".to_string()).into_response();
    }

    let throttle_key = format!("lookup:token:{}", addr.ip());
    if let Some(response) = enforce_lookup_limit(&state, &throttle_key).await {
        return response;
    }

    match state
        .recipient_token_usecase
        .find_recipient_by_token(token)
        .await
    {
        Ok(Some(recipient_id)) => {
            (StatusCode::OK, Json(RecipientLookupResponse { recipient_id })).into_response()
        }
        Ok(None) => AppError::NotFound("Recipient not found.".to_string()).into_response(),
        Err(err) => AppError::Internal(err).into_response(),
    }
}

pub async fn find_by_code<T, R>(
    State(state): State<RecipientLookupState<T, R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<CodeLookupQuery>,
) -> Response
where
    T: RecipientTokenRepository + Send + Sync + 'static,
    R: ThrottleRepository + Send + Sync + 'static,
{
    let code = query.code.trim();
    if code.is_empty() {
        return AppError::BadRequest("Code is required.".to_string()).into_response();
    }

    let throttle_key = format!("lookup:code:{}", addr.ip());
    if let Some(response) = enforce_lookup_limit(&state, &throttle_key).await {
        return response;
    }

    match state
        .recipient_token_usecase
        .find_recipient_by_code(code)
        .await
    {
        Ok(Some(recipient_id)) => {
            (StatusCode::OK, Json(RecipientLookupResponse { recipient_id })).into_response()
        }
        Ok(None) => AppError::NotFound("Recipient not found.".to_string()).into_response(),
        Err(err) => AppError::Internal(err).into_response(),
    }
}

async fn enforce_lookup_limit<T, R>(
    state: &RecipientLookupState<T, R>,
    throttle_key: &str,
) -> Option<Response>
where
    T: RecipientTokenRepository + Send + Sync + 'static,
    R: ThrottleRepository + Send + Sync + 'static,
{
    match state
        .throttle_usecase
        .hit(
            throttle_key,
            state.rate_limit.lookup_max,
            state.rate_limit.lookup_window,
        )
        .await
    {
        Ok(decision) if !decision.allowed => Some(
            AppError::RateLimited {
                retry_after: decision.retry_after,
            }
            .into_response(),
        ),
        Ok(_) => None,
        Err(err) => Some(AppError::Internal(err).into_response()),
    }
}

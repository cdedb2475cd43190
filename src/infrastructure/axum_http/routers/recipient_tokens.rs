use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
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

pub struct RecipientTokenState<T, R>
where
    T: RecipientTokenRepository + Send + Sync + 'static,
    R: ThrottleRepository + Send + Sync + 'static,
{
    pub recipient_token_usecase: Arc<RecipientTokenUseCase<T>>,
    pub throttle_usecase: Arc<ThrottleUseCase<R>>,
    pub rate_limit: RateLimit,
}

impl<T, R> Clone for RecipientTokenState<T, R>
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

    let state = RecipientTokenState {
        recipient_token_usecase: Arc::new(RecipientTokenUseCase::new(
            Arc::new(recipient_token_repository),
            config.recipient_token.signing_secret.clone(),
        )),
        throttle_usecase: Arc::new(ThrottleUseCase::new(Arc::new(throttle_repository))),
        rate_limit: config.rate_limit.clone(),
    };

    Router::new()
        .route("/", post(issue_token))
        .route("/rotate", post(rotate_token))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct IssueTokenModel {
    pub recipient_id: i64,
}

#[derive(Debug, Serialize)]
pub struct IssuedTokenResponse {
    pub recipient_id: i64,
    pub token: String,
    pub code_short: String,
}

/// Signup-flow issuance: creates a token without revoking anything, since
/// a brand-new recipient has no prior credentials.
pub async fn issue_token<T, R>(
    State(state): State<RecipientTokenState<T, R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(model): Json<IssueTokenModel>,
) -> Response
where
    T: RecipientTokenRepository + Send + Sync + 'static,
    R: ThrottleRepository + Send + Sync + 'static,
{
    if model.recipient_id <= 0 {
        return AppError::BadRequest("recipient_id is required.".to_string()).into_response();
    }

    let throttle_key = format!("recipient-token:issue:{}", addr.ip());
    match state
        .throttle_usecase
        .hit(
            &throttle_key,
            state.rate_limit.signup_max,
            state.rate_limit.signup_window,
        )
        .await
    {
        Ok(decision) if !decision.allowed => {
            return AppError::RateLimited {
                retry_after: decision.retry_after,
            }
            .into_response();
        }
        Ok(_) => {}
        Err(err) => return AppError::Internal(err).into_response(),
    }

    match state
        .recipient_token_usecase
        .create_for_recipient(model.recipient_id)
        .await
    {
        Ok(issued) => (
            StatusCode::CREATED,
            Json(IssuedTokenResponse {
                recipient_id: model.recipient_id,
                token: issued.token,
                code_short: issued.code_short,
            }),
        )
            .into_response(),
        Err(err) => AppError::Internal(err).into_response(),
    }
}

/// Admin rotation: revoke-then-create, leaving exactly one active token.
pub async fn rotate_token<T, R>(
    State(state): State<RecipientTokenState<T, R>>,
    Json(model): Json<IssueTokenModel>,
) -> Response
where
    T: RecipientTokenRepository + Send + Sync + 'static,
    R: ThrottleRepository + Send + Sync + 'static,
{
    if model.recipient_id <= 0 {
        return AppError::BadRequest("recipient_id is required.".to_string()).into_response();
    }

    match state
        .recipient_token_usecase
        .rotate_for_recipient(model.recipient_id)
        .await
    {
        Ok(issued) => (
            StatusCode::OK,
            Json(IssuedTokenResponse {
                recipient_id: model.recipient_id,
                token: issued.token,
                code_short: issued.code_short,
            }),
        )
            .into_response(),
        Err(err) => AppError::Internal(err).into_response(),
    }
}

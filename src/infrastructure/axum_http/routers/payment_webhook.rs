use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};

use crate::{
    application::usecases::payment_events::PaymentEventUseCase,
    config::config_model::DotEnvyConfig,
    domain::repositories::payment_events::PaymentEventRepository,
    infrastructure::{
        axum_http::error_responses::{AppError, ErrorResponse},
        postgres::{
            postgres_connection::PgPoolSquad, repositories::payment_events::PaymentEventPostgres,
        },
    },
    payments::stripe_client::{StripeWebhookVerifier, WebhookVerifier},
};

pub fn routes(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Router {
    let payment_event_repository = PaymentEventPostgres::new(Arc::clone(&db_pool));
    let webhook_verifier = StripeWebhookVerifier::new(config.stripe.webhook_secret.clone());
    let payment_event_usecase = PaymentEventUseCase::new(
        Arc::new(payment_event_repository),
        Arc::new(webhook_verifier),
    );

    Router::new()
        .route("/webhook", post(handle_stripe_webhook))
        .with_state(Arc::new(payment_event_usecase))
}

pub async fn handle_stripe_webhook<R, V>(
    State(payment_event_usecase): State<Arc<PaymentEventUseCase<R, V>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    R: PaymentEventRepository + Send + Sync + 'static,
    V: WebhookVerifier + 'static,
{
    let Some(signature_header) = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
    else {
        return AppError::BadRequest("Missing stripe-signature header.".to_string())
            .into_response();
    };

    match payment_event_usecase
        .handle_webhook(&body, signature_header)
        .await
    {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(err) => {
            let status = err.status_code();
            (
                status,
                Json(ErrorResponse {
                    code: status.as_u16(),
                    message: err.to_string(),
                    retry_after: None,
                }),
            )
                .into_response()
        }
    }
}

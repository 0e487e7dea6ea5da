//! Quote routes
//!
//! The booking form posts its full service configuration here on every
//! change; the reply mirrors the computation-channel contract (a price
//! result, or a displayable `{ "error": ... }` payload).

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::domain::pricing::{PriceResult, ServiceConfiguration};

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QuoteReply {
    Result(Box<PriceResult>),
    Error { error: String },
}

/// POST /quotes
///
/// Calculation failures are part of the payload, not an HTTP error: the
/// storefront shows them inline next to the price. A quote superseded by a
/// newer request while in flight answers 204 and the client keeps waiting
/// for the newer one.
pub async fn create_quote(
    State(state): State<Arc<AppState>>,
    Json(config): Json<ServiceConfiguration>,
) -> impl IntoResponse {
    tracing::debug!(
        rooms = config.rooms.len(),
        tier = ?config.service_tier,
        frequency = %config.frequency,
        "quote requested"
    );

    match state.pricing.quote_latest(config).await {
        Ok(Some(result)) => Json(QuoteReply::Result(Box::new(result))).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => Json(QuoteReply::Error {
            error: e.to_string(),
        })
        .into_response(),
    }
}

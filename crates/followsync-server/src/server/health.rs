//! HTTP liveness endpoints for hosting platforms.

use axum::{Router, extract::State, http::StatusCode, routing::get};
use followsync::ConnectionState;
use tokio::sync::watch;

#[derive(Clone)]
struct HealthState {
    channel: watch::Receiver<ConnectionState>,
}

/// `/` always answers; `/health` reports the cloud channel state and is
/// `503` unless connected.
pub fn router(channel: watch::Receiver<ConnectionState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .with_state(HealthState { channel })
}

async fn index() -> &'static str {
    "FollowSync running"
}

async fn health(State(state): State<HealthState>) -> (StatusCode, String) {
    let current = *state.channel.borrow();
    let status = match current {
        ConnectionState::Connected => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, current.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn index_is_static() {
        assert_eq!(index().await, "FollowSync running");
    }

    #[tokio::test]
    async fn health_follows_channel_state() {
        let (tx, rx) = watch::channel(ConnectionState::Connecting);
        let state = HealthState { channel: rx };

        let (status, body) = health(State(state.clone())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, ConnectionState::Connecting.as_str());

        tx.send(ConnectionState::Connected).unwrap();
        let (status, body) = health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, ConnectionState::Connected.as_str());
    }
}

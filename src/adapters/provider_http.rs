//! Shared HTTP plumbing for payment provider adapters.

use std::time::Duration;

use crate::ports::GatewayError;

/// Builds the client every provider adapter uses. All calls inherit `timeout`.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GatewayError::unavailable(format!("Failed to build HTTP client: {}", e)))
}

/// Maps a transport failure. Timeouts and connection errors are `Unavailable`;
/// a body that does not decode is `InvalidResponse`.
pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> GatewayError {
    if err.is_decode() {
        return GatewayError::invalid_response(format!(
            "Failed to parse {} response: {}",
            provider, err
        ));
    }
    if err.is_timeout() {
        tracing::warn!(provider, "Payment provider request timed out");
        return GatewayError::unavailable(format!("{} request timed out", provider));
    }
    tracing::warn!(provider, error = %err, "Payment provider unreachable");
    GatewayError::unavailable(format!("{} unreachable: {}", provider, err))
}

/// Reads an error body and logs it. Client errors are rejections; everything
/// else means the provider is not serving us right now.
pub(crate) async fn status_error(provider: &str, response: reqwest::Response) -> GatewayError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::error!(provider, status = %status, body = %body, "Payment provider API error");

    if status.is_client_error() {
        GatewayError::rejected(format!("{} API error ({}): {}", provider, status, body))
    } else {
        GatewayError::unavailable(format!("{} API error ({})", provider, status))
    }
}

//! HTTP status handling shared by the REST recognizers.

use evalify_core::error::RecognitionError;

/// Map a transport failure from `send()`.
pub(crate) fn send_error(e: reqwest::Error, timeout_secs: u64) -> RecognitionError {
    if e.is_timeout() {
        RecognitionError::Timeout(timeout_secs)
    } else {
        RecognitionError::NetworkError(e.to_string())
    }
}

/// Turn a non-success response into the matching `RecognitionError`.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, RecognitionError> {
    let status = response.status().as_u16();
    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5)
            .saturating_mul(1000);
        return Err(RecognitionError::RateLimited {
            retry_after_ms: retry_after,
        });
    }
    if status < 400 {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        401 | 403 => RecognitionError::AuthenticationFailed(body),
        404 => RecognitionError::ModelNotFound(body),
        _ => RecognitionError::ApiError {
            status,
            message: body,
        },
    })
}

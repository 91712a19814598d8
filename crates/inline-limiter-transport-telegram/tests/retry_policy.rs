use inline_limiter_transport_telegram::bot::resilient::retry_telegram_operation;
use inline_limiter_transport_telegram::config::TELEGRAM_API_MAX_RETRIES;
use std::sync::atomic::{AtomicUsize, Ordering};
use teloxide::types::Seconds;
use teloxide::{ApiError, RequestError};

#[tokio::test(start_paused = true)]
async fn flood_control_is_retried_until_success() {
    let attempts = AtomicUsize::new(0);
    let result = retry_telegram_operation(|| async {
        if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(RequestError::RetryAfter(Seconds::from_seconds(1)))
        } else {
            Ok(42)
        }
    })
    .await;

    assert!(matches!(result, Ok(42)));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn retries_are_bounded() {
    let attempts = AtomicUsize::new(0);
    let result: Result<(), _> = retry_telegram_operation(|| async {
        attempts.fetch_add(1, Ordering::SeqCst);
        Err(RequestError::RetryAfter(Seconds::from_seconds(1)))
    })
    .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), TELEGRAM_API_MAX_RETRIES + 1);
}

#[tokio::test(start_paused = true)]
async fn api_errors_are_not_retried() {
    let attempts = AtomicUsize::new(0);
    let result: Result<(), _> = retry_telegram_operation(|| async {
        attempts.fetch_add(1, Ordering::SeqCst);
        Err(RequestError::Api(ApiError::MessageToDeleteNotFound))
    })
    .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

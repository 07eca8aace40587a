// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn http_error(status: u16) -> PdnsError {
        PdnsError::Http {
            method: "GET".to_string(),
            url: "http://pdns:8081/api/v1/servers".to_string(),
            status,
            body: String::new(),
        }
    }

    fn quick_backoff() -> ExponentialBackoff {
        ExponentialBackoff::new(
            Duration::from_millis(1),
            Duration::from_millis(2),
            Some(Duration::from_secs(5)),
            2.0,
            0.0,
        )
    }

    /// Test that backoff configuration has expected values
    #[test]
    fn test_backoff_configuration() {
        let backoff = http_backoff();

        assert_eq!(backoff.initial_interval, Duration::from_millis(50));
        assert_eq!(backoff.max_interval, Duration::from_secs(10));
        assert_eq!(backoff.max_elapsed_time, Some(Duration::from_secs(120)));

        #[allow(clippy::float_cmp)]
        {
            assert_eq!(backoff.multiplier, 2.0);
            assert_eq!(backoff.randomization_factor, 0.1);
        }
    }

    /// Test that intervals grow and cap at the maximum
    #[test]
    fn test_backoff_caps_at_max_interval() {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_millis(100),
            Duration::from_millis(400),
            None,
            2.0,
            0.0,
        );

        let intervals: Vec<_> = (0..4).filter_map(|_| backoff.next_backoff()).collect();
        assert_eq!(
            intervals,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(400),
            ]
        );
    }

    /// Test that jitter stays within the randomization factor
    #[test]
    fn test_jitter_bounds() {
        let mut backoff = http_backoff();
        let first = backoff.next_backoff().unwrap();
        assert!(first >= Duration::from_millis(45) && first <= Duration::from_millis(55));
    }

    #[test]
    fn test_retryable_statuses() {
        for status in [429, 500, 502, 503, 504] {
            assert!(is_retryable(&http_error(status)), "status {status}");
        }
        for status in [400, 401, 404, 409, 422] {
            assert!(!is_retryable(&http_error(status)), "status {status}");
        }
    }

    #[test]
    fn test_connection_errors_are_retryable() {
        let err = PdnsError::Connection {
            url: "http://pdns:8081".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(is_retryable(&err));

        let err = PdnsError::Decode {
            url: "http://pdns:8081".to_string(),
            reason: "expected value".to_string(),
        };
        assert!(!is_retryable(&err));
    }

    #[tokio::test]
    async fn test_retry_request_recovers_from_transient_errors() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = retry_request(quick_backoff(), "GET", "http://pdns", move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(http_error(503))
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_request_fails_fast_on_client_errors() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> =
            retry_request(quick_backoff(), "GET", "http://pdns", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(http_error(422))
            })
            .await;

        assert!(matches!(result, Err(PdnsError::Http { status: 422, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

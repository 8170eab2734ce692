//! The three latency-injecting tasks the workload loop serializes each
//! iteration. Each one occupies a distinct profiler-attribution category:
//! waiting on an external I/O dependency, burning CPU, and voluntarily
//! yielding to the scheduler. Keep the mechanisms distinct; none of them
//! may be approximated by another's mechanism.

use std::time::{Duration, Instant};

use rama::{
    Service,
    error::{BoxError, ErrorContext as _, OpaqueError},
    http::{Request, Response, StatusCode, service::client::HttpClientExt as _},
    net::address::SocketAddress,
};

/// Issue a request to the sleep server and wait for its (slow) response.
///
/// The sleep server is a local harness dependency that is assumed to be
/// always reachable: a transport failure or non-success status signals a
/// broken harness, and the returned error is treated as fatal by the
/// workload loop. No retry, no timeout.
pub async fn slow_network_request<S>(
    client: &S,
    target: SocketAddress,
    delay: Duration,
) -> Result<(), OpaqueError>
where
    S: Service<Request, Output = Response>,
    S::Error: Into<BoxError>,
{
    let resp = client
        .get(format!(
            "http://{target}/?sleep={}",
            sleep_query_value(delay)
        ))
        .send()
        .await
        .map_err(|err| OpaqueError::from_boxed(err.into()))
        .context("send sleep request to sleep server")?;

    let status = resp.status();
    if status != StatusCode::OK {
        return Err(OpaqueError::from_display(format!(
            "sleep server responded with unexpected status: {status}"
        )));
    }

    Ok(())
}

/// Encode `delay` as a single-unit duration string.
///
/// humantime's display form inserts spaces between units ("1m 30s"),
/// which is not valid inside a request-target. Nanoseconds stay a single
/// unit for any delay and round-trip exactly through the server's parser.
fn sleep_query_value(delay: Duration) -> String {
    format!("{}ns", delay.as_nanos())
}

/// Burn CPU until at least `target` wall-clock time has elapsed.
///
/// Polls the clock from a hot loop; the inner arithmetic is routed through
/// `black_box` so the optimizer cannot delete it, and is cheap enough per
/// poll that overshoot stays in the microsecond range. Never suspends.
pub fn cpu_intensive_task(target: Duration) {
    let start = Instant::now();
    let mut acc: u64 = 0x9e37_79b9_7f4a_7c15;
    while start.elapsed() < target {
        // spend some time away from the clock poll to be a little more
        // realistic than spending all time in Instant::elapsed
        for i in 0u64..1_000 {
            acc = acc.wrapping_mul(6364136223846793005).wrapping_add(i);
        }
        std::hint::black_box(acc);
    }
}

/// Yield to the scheduler for exactly `target` via a suspending wait,
/// not a busy loop.
pub async fn scheduler_sleep(target: Duration) {
    tokio::time::sleep(target).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_query_value_is_uri_safe_for_compound_durations() {
        for delay in [
            Duration::from_millis(60),
            Duration::from_micros(1500),
            Duration::from_millis(1500),
            Duration::from_secs(90),
        ] {
            let value = sleep_query_value(delay);
            assert!(
                !value.contains(char::is_whitespace),
                "value for {delay:?}: {value}"
            );
            assert_eq!(delay, humantime::parse_duration(&value).unwrap());
        }
    }

    #[test]
    fn test_cpu_intensive_task_reaches_target_with_small_overshoot() {
        let target = Duration::from_millis(30);
        for _ in 0..3 {
            let start = Instant::now();
            cpu_intensive_task(target);
            let elapsed = start.elapsed();
            assert!(elapsed >= target, "elapsed: {elapsed:?}");
            assert!(
                elapsed < target + Duration::from_millis(10),
                "elapsed: {elapsed:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_scheduler_sleep_suspends_for_at_least_target() {
        let target = Duration::from_millis(10);
        let start = Instant::now();
        scheduler_sleep(target).await;
        assert!(start.elapsed() >= target, "elapsed: {:?}", start.elapsed());
    }
}

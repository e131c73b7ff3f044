//! Prometheus metrics exposition
//!
//! - `auth_callbacks_total` (counter): label `outcome`
//! - `auth_callback_duration_seconds` (histogram): label `outcome`
//! - `auth_signouts_total` (counter): label `result`

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Callback latency is dominated by the token endpoint round-trip, which is
/// bounded by the exchange timeout (seconds, not minutes).
const CALLBACK_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

fn builder() -> PrometheusBuilder {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("auth_callback_duration_seconds".to_string()),
            CALLBACK_BUCKETS,
        )
        .expect("histogram buckets are non-empty")
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> PrometheusHandle {
    builder()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a finished callback attempt.
pub fn record_callback(outcome: &'static str, duration_secs: f64) {
    metrics::counter!("auth_callbacks_total", "outcome" => outcome).increment(1);
    metrics::histogram!("auth_callback_duration_seconds", "outcome" => outcome)
        .record(duration_secs);
}

/// Record a sign-out, `result` being "ok" or "error".
pub fn record_signout(result: &'static str) {
    metrics::counter!("auth_signouts_total", "result" => result).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    /// Create an isolated recorder/handle pair for unit tests.
    /// Uses build_recorder() so no global recorder is installed.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = builder().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_callback("established", 0.05);
        record_signout("ok");
    }

    #[test]
    fn callback_outcomes_render_with_histogram_buckets() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_callback("established", 0.2);
        record_callback("exchange_failed", 5.0);

        let output = handle.render();
        assert!(output.contains("auth_callbacks_total"));
        assert!(output.contains("outcome=\"established\""));
        assert!(output.contains("outcome=\"exchange_failed\""));
        assert!(
            output.contains("auth_callback_duration_seconds_bucket"),
            "histogram must render _bucket lines"
        );
        assert!(output.contains("le=\"10\""), "10s bucket must exist");
    }

    #[test]
    fn signouts_carry_result_label() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_signout("ok");
        record_signout("error");

        let output = handle.render();
        assert!(output.contains("auth_signouts_total"));
        assert!(output.contains("result=\"ok\""));
        assert!(output.contains("result=\"error\""));
    }
}

use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Histogram, TextEncoder, register_counter, register_histogram};


lazy_static! {
    pub static ref GUARD_ACCEPTED: Counter =
        register_counter!("supabase_guard_accepted_total", "Guarded calls allowed through").unwrap();
    pub static ref GUARD_THROTTLED: Counter =
        register_counter!("supabase_guard_throttled_total", "Guarded calls rejected inside the window").unwrap();
    pub static ref GUARD_IN_FLIGHT: Counter = register_counter!(
        "supabase_guard_in_flight_rejected_total",
        "Guarded calls rejected while the same name was in flight"
    )
    .unwrap();
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("supabase_requests_total", "Total number of backend requests").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "supabase_request_latency_seconds",
        "Backend request latency in seconds"
    )
    .unwrap();
}

// Text exposition of every registered metric
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_lists_guard_counters() {
        GUARD_ACCEPTED.inc();
        let text = render();
        assert!(text.contains("supabase_guard_accepted_total"));
    }
}

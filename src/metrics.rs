/// Metrics and telemetry for the Lumen sync server
///
/// Prometheus-compatible counters for the auth and sync surfaces, exposed at
/// `/metrics`.

use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static! {
    /// Magic links issued, by outcome
    pub static ref MAGIC_LINKS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "lumen_magic_links_total",
        "Magic-link issuance attempts",
        &["outcome"]
    )
    .unwrap();

    /// Magic-link redemptions, by outcome
    pub static ref REDEMPTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "lumen_redemptions_total",
        "Magic-link redemption attempts",
        &["outcome"]
    )
    .unwrap();

    /// Session validations, by outcome
    pub static ref SESSION_VALIDATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "lumen_session_validations_total",
        "Session validation attempts",
        &["outcome"]
    )
    .unwrap();

    /// Sync operations, by direction
    pub static ref SYNC_OPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "lumen_sync_ops_total",
        "Snapshot sync operations",
        &["direction"]
    )
    .unwrap();

    /// Entitlement revocations
    pub static ref REVOCATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "lumen_revocations_total",
        "Entitlement revocation attempts",
        &["outcome"]
    )
    .unwrap();
}

/// Outcome label values
pub mod outcomes {
    pub const OK: &str = "ok";
    pub const NOT_FOUND: &str = "not_found";
    pub const FORBIDDEN: &str = "forbidden";
    pub const CONFLICT: &str = "conflict";
    pub const EXPIRED: &str = "expired";
    pub const RENEWED: &str = "renewed";
}

/// Render all registered metrics in Prometheus text format
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
    fn test_render_includes_registered_counters() {
        MAGIC_LINKS_TOTAL.with_label_values(&[outcomes::OK]).inc();
        let text = render();
        assert!(text.contains("lumen_magic_links_total"));
    }
}

use std::sync::atomic::{AtomicU64, Ordering};

use salvo::prelude::*;

use crate::web::web_state;

static WEBHOOKS_ACCEPTED: AtomicU64 = AtomicU64::new(0);
static WEBHOOKS_REJECTED: AtomicU64 = AtomicU64::new(0);
static FEED_POSTS_CREATED: AtomicU64 = AtomicU64::new(0);
static UPSTREAM_SYNCS: AtomicU64 = AtomicU64::new(0);
static UPSTREAM_FAILURES: AtomicU64 = AtomicU64::new(0);

pub struct Metrics;

impl Metrics {
    pub fn webhook_accepted() {
        WEBHOOKS_ACCEPTED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn webhook_rejected() {
        WEBHOOKS_REJECTED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn feed_post_created() {
        FEED_POSTS_CREATED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn upstream_sync() {
        UPSTREAM_SYNCS.fetch_add(1, Ordering::Relaxed);
    }

    pub fn upstream_failure() {
        UPSTREAM_FAILURES.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn format_prometheus(uptime_seconds: u64) -> String {
    format!(
        r#"# HELP hive_uptime_seconds Number of seconds the backend has been running
# TYPE hive_uptime_seconds gauge
hive_uptime_seconds {}

# HELP hive_webhooks_accepted_total Webhook deliveries with a valid signature
# TYPE hive_webhooks_accepted_total counter
hive_webhooks_accepted_total {}

# HELP hive_webhooks_rejected_total Webhook deliveries rejected at the signature check
# TYPE hive_webhooks_rejected_total counter
hive_webhooks_rejected_total {}

# HELP hive_feed_posts_created_total Feed posts created by users or webhooks
# TYPE hive_feed_posts_created_total counter
hive_feed_posts_created_total {}

# HELP hive_upstream_syncs_total Link or sync operations against external APIs
# TYPE hive_upstream_syncs_total counter
hive_upstream_syncs_total {}

# HELP hive_upstream_failures_total External API calls that surfaced an error
# TYPE hive_upstream_failures_total counter
hive_upstream_failures_total {}
"#,
        uptime_seconds,
        WEBHOOKS_ACCEPTED.load(Ordering::Relaxed),
        WEBHOOKS_REJECTED.load(Ordering::Relaxed),
        FEED_POSTS_CREATED.load(Ordering::Relaxed),
        UPSTREAM_SYNCS.load(Ordering::Relaxed),
        UPSTREAM_FAILURES.load(Ordering::Relaxed),
    )
}

#[handler]
pub async fn metrics_endpoint(res: &mut Response) {
    res.headers_mut()
        .insert("Content-Type", "text/plain; charset=utf-8".parse().unwrap());
    let uptime = web_state().started_at.elapsed().as_secs();
    res.body(format_prometheus(uptime));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        Metrics::webhook_accepted();
        Metrics::webhook_rejected();
        Metrics::feed_post_created();
        Metrics::upstream_sync();
        Metrics::upstream_failure();

        assert!(WEBHOOKS_ACCEPTED.load(Ordering::Relaxed) >= 1);
        assert!(WEBHOOKS_REJECTED.load(Ordering::Relaxed) >= 1);
        assert!(FEED_POSTS_CREATED.load(Ordering::Relaxed) >= 1);
        assert!(UPSTREAM_SYNCS.load(Ordering::Relaxed) >= 1);
        assert!(UPSTREAM_FAILURES.load(Ordering::Relaxed) >= 1);
    }

    #[test]
    fn format_includes_all_series() {
        let output = format_prometheus(12);
        assert!(output.contains("hive_uptime_seconds 12"));
        assert!(output.contains("hive_webhooks_accepted_total"));
        assert!(output.contains("hive_webhooks_rejected_total"));
        assert!(output.contains("hive_feed_posts_created_total"));
        assert!(output.contains("hive_upstream_syncs_total"));
        assert!(output.contains("hive_upstream_failures_total"));
    }
}

//! Ingress policy: request-rate blacklisting with automatic expiry.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use crate::config::DdosMitigationConfig;
use crate::domain::{ActionRequest, ActionResult, TriggerDecision};
use crate::engine::NetworkManager;
use crate::error::{Result, WardenError};
use crate::id::Clock;
use crate::runner::{EvalContext, Policy};
use crate::thresholds::Threshold;
use crate::ttl::TtlSet;

/// Blocks sources whose request rate breaches the ceiling and unblocks them
/// when their blacklist entry lapses.
///
/// The blacklist is a [`TtlSet`] owned by this policy; it is only touched
/// under the loop's cycle lock. Each cycle performs at most one firewall
/// change: lapsed entries are swept (and unblocked) before any new offender
/// is blocked. Whitelisted sources are never blocked. Both operations run
/// under the fixed subject `firewall`.
pub struct DdosMitigationPolicy {
    network: Arc<dyn NetworkManager>,
    rate_ceiling: Threshold,
    block_ttl: Duration,
    whitelist: HashSet<String>,
    blacklist: Mutex<TtlSet>,
    clock: Arc<dyn Clock>,
}

impl DdosMitigationPolicy {
    pub fn new(
        network: Arc<dyn NetworkManager>,
        config: &DdosMitigationConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            network,
            rate_ceiling: Threshold::Ceiling(config.rate_threshold),
            block_ttl: Duration::from_secs(config.block_ttl_secs),
            whitelist: config.whitelist.iter().cloned().collect(),
            blacklist: Mutex::new(TtlSet::new()),
            clock,
        }
    }

    /// Whether `source` is currently blacklisted.
    pub async fn is_blocked(&self, source: &str) -> bool {
        self.blacklist.lock().await.contains(source, self.clock.now_ms())
    }
}

#[async_trait]
impl Policy for DdosMitigationPolicy {
    async fn evaluate(&self, ctx: EvalContext<'_>) -> Result<TriggerDecision> {
        // Lapsed blocks are lifted before new ones are placed.
        {
            let blacklist = self.blacklist.lock().await;
            if !blacklist.expired(ctx.now_ms).is_empty() {
                return Ok(TriggerDecision::act("firewall", json!({ "op": "sweep" })));
            }
        }

        let rates = self.network.request_rates().await?;
        for rate in rates {
            if !self.rate_ceiling.is_breached(rate.per_second) {
                continue;
            }
            if self.whitelist.contains(&rate.source) {
                continue;
            }
            if self.blacklist.lock().await.contains(&rate.source, ctx.now_ms) {
                continue;
            }
            return Ok(TriggerDecision::act(
                "firewall",
                json!({ "op": "block", "source": rate.source, "rate": rate.per_second }),
            ));
        }
        Ok(TriggerDecision::NoAction)
    }

    async fn act(&self, request: &ActionRequest) -> Result<ActionResult> {
        match request.payload["op"].as_str() {
            Some("block") => {
                let source = request.payload["source"].as_str().ok_or_else(|| {
                    WardenError::InvalidState("block action without a source".to_string())
                })?;
                self.network.block_ip(source).await?;
                let newly = self
                    .blacklist
                    .lock()
                    .await
                    .insert(source, self.block_ttl, self.clock.now_ms());
                Ok(ActionResult::Executed(json!({
                    "blocked": source,
                    "ttl-secs": self.block_ttl.as_secs(),
                    "extended": !newly,
                })))
            }
            Some("sweep") => {
                let now_ms = self.clock.now_ms();
                let lapsed = { self.blacklist.lock().await.expired(now_ms) };
                let mut unblocked = Vec::new();
                for source in lapsed {
                    // Entry is removed only once the firewall accepted the
                    // unblock, so a failure here is retried next cycle.
                    self.network.unblock_ip(&source).await?;
                    self.blacklist.lock().await.remove(&source);
                    unblocked.push(source);
                }
                Ok(ActionResult::Executed(json!({ "unblocked": unblocked })))
            }
            other => Err(WardenError::InvalidState(format!(
                "unknown firewall op: {other:?}"
            ))),
        }
    }
}

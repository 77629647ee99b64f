//! Trigger registry with manual and real-time-clock triggers.
//!
//! - `urn:ale:trigger:manual:<name>` fires when [`TriggerHub::fire`] is called.
//! - `urn:epcglobal:ale:trigger:rtc:<period>.<offset>[.<tz>]` fires every
//!   `period` ms at `offset` ms past each period boundary, counted from
//!   midnight in the optional `±HH:MM` offset (UTC otherwise).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Utc};
use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ale_protocols::{Trigger, TriggerCallback, TriggerError, TriggerRegistry};

pub const MANUAL_TRIGGER_PREFIX: &str = "urn:ale:trigger:manual:";
pub const RTC_TRIGGER_PREFIX: &str = "urn:epcglobal:ale:trigger:rtc:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RtcSchedule {
    period_ms: i64,
    offset_ms: i64,
    tz_offset_ms: i64,
}

impl RtcSchedule {
    fn parse(uri: &str, spec: &str) -> Result<Self, TriggerError> {
        let invalid = || TriggerError::InvalidUri(uri.to_string());
        let mut parts = spec.splitn(3, '.');
        let period_ms: i64 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let offset_ms: i64 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        if period_ms <= 0 || offset_ms < 0 || offset_ms >= period_ms {
            return Err(invalid());
        }
        let tz_offset_ms = match parts.next() {
            Some(tz) => {
                let offset: FixedOffset = tz.parse().map_err(|_| invalid())?;
                i64::from(offset.local_minus_utc()) * 1000
            }
            None => 0,
        };
        Ok(Self {
            period_ms,
            offset_ms,
            tz_offset_ms,
        })
    }

    /// Delay from `now_ms` (Unix epoch ms) to the next firing.
    fn delay_from(&self, now_ms: i64) -> Duration {
        let local = now_ms + self.tz_offset_ms;
        let since_midnight = local.rem_euclid(86_400_000);
        let mut next = since_midnight - since_midnight.rem_euclid(self.period_ms) + self.offset_ms;
        if next <= since_midnight {
            next += self.period_ms;
        }
        Duration::from_millis(u64::try_from(next - since_midnight).unwrap_or(0))
    }
}

struct HubTrigger {
    id: Uuid,
    uri: String,
    owner: String,
    callback: TriggerCallback,
    disposed: AtomicBool,
    ticker: Option<CancellationToken>,
}

impl HubTrigger {
    fn fire(&self) -> bool {
        if self.disposed.load(Ordering::SeqCst) {
            return false;
        }
        (self.callback)(&self.uri)
    }
}

impl Trigger for HubTrigger {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn owner(&self) -> &str {
        &self.owner
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(ticker) = &self.ticker {
            ticker.cancel();
        }
        debug!(trigger = %self.uri, owner = %self.owner, id = %self.id, "Trigger disposed");
    }
}

/// Trigger registry built by the composition root.
pub struct TriggerHub {
    handle: Handle,
    instances: DashMap<String, Vec<Arc<HubTrigger>>>,
}

impl TriggerHub {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            instances: DashMap::new(),
        }
    }

    pub fn manual_uri(name: &str) -> String {
        format!("{}{}", MANUAL_TRIGGER_PREFIX, name)
    }

    /// Fire every live instance registered for `uri`. Returns how many
    /// receivers acted on it.
    pub fn fire(&self, uri: &str) -> usize {
        let targets: Vec<Arc<HubTrigger>> = match self.instances.get_mut(uri) {
            Some(mut list) => {
                list.retain(|t| !t.disposed.load(Ordering::SeqCst));
                list.clone()
            }
            None => Vec::new(),
        };
        let accepted = targets.iter().filter(|t| t.fire()).count();
        debug!(trigger = uri, receivers = targets.len(), accepted, "Trigger fired");
        accepted
    }

    /// Live instances registered for `uri`.
    pub fn instance_count(&self, uri: &str) -> usize {
        self.instances
            .get(uri)
            .map(|list| list.iter().filter(|t| !t.disposed.load(Ordering::SeqCst)).count())
            .unwrap_or(0)
    }

    /// Dispose every instance.
    pub fn shutdown(&self) {
        for list in self.instances.iter() {
            for trigger in list.iter() {
                trigger.dispose();
            }
        }
        self.instances.clear();
    }

    fn spawn_ticker(&self, schedule: RtcSchedule, trigger: std::sync::Weak<HubTrigger>, token: CancellationToken) {
        self.handle.spawn(async move {
            loop {
                let delay = schedule.delay_from(Utc::now().timestamp_millis());
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {
                        let Some(trigger) = trigger.upgrade() else { break };
                        let _ = tokio::task::spawn_blocking(move || trigger.fire()).await;
                    }
                }
            }
        });
    }
}

impl TriggerRegistry for TriggerHub {
    fn get_instance(
        &self,
        owner: &str,
        uri: &str,
        callback: TriggerCallback,
    ) -> Result<Arc<dyn Trigger>, TriggerError> {
        let schedule = if let Some(name) = uri.strip_prefix(MANUAL_TRIGGER_PREFIX) {
            if name.is_empty() {
                return Err(TriggerError::InvalidUri(uri.to_string()));
            }
            None
        } else if let Some(spec) = uri.strip_prefix(RTC_TRIGGER_PREFIX) {
            Some(RtcSchedule::parse(uri, spec)?)
        } else {
            warn!(trigger = uri, owner, "Unsupported trigger URI");
            return Err(TriggerError::InvalidUri(uri.to_string()));
        };

        let ticker = schedule.map(|_| CancellationToken::new());
        let trigger = Arc::new(HubTrigger {
            id: Uuid::new_v4(),
            uri: uri.to_string(),
            owner: owner.to_string(),
            callback,
            disposed: AtomicBool::new(false),
            ticker: ticker.clone(),
        });
        if let (Some(schedule), Some(token)) = (schedule, ticker) {
            self.spawn_ticker(schedule, Arc::downgrade(&trigger), token);
        }
        self.instances
            .entry(uri.to_string())
            .or_default()
            .push(trigger.clone());
        info!(trigger = uri, owner, "Trigger registered");
        Ok(trigger)
    }
}

impl Drop for TriggerHub {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "trigger_hub_tests.rs"]
mod tests;

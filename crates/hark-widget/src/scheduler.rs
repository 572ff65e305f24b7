// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Whether to offer an incoming call on this page view.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::interaction::{InteractionRecord, InteractionStore};
use crate::options::AutoIncomingCallOptions;

/// The checks applied to the interaction history. `None` disables a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPolicy {
    pub respect_user_choice: bool,
    pub cooldown: Option<Duration>,
    pub max_per_session: Option<u32>,
    pub reset_after: Option<Duration>,
    pub developer_mode: bool,
}

impl From<&AutoIncomingCallOptions> for NotificationPolicy {
    fn from(options: &AutoIncomingCallOptions) -> Self {
        let cooldown_ms = i64::try_from(options.cooldown_ms).unwrap_or(i64::MAX);
        Self {
            respect_user_choice: options.respect_user_choice,
            cooldown: (cooldown_ms > 0).then(|| Duration::milliseconds(cooldown_ms)),
            max_per_session: (options.max_notifications_per_session > 0)
                .then_some(options.max_notifications_per_session),
            reset_after: (options.reset_after_days > 0)
                .then(|| Duration::days(i64::from(options.reset_after_days))),
            developer_mode: options.developer_mode,
        }
    }
}

/// Outcome of evaluating the policy, in check order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    DeveloperMode,
    /// History is older than the reset window and should be discarded.
    Expired,
    Declined,
    Accepted,
    CoolingDown { remaining: Duration },
    SessionCapReached { count: u32 },
    Eligible,
}

impl Verdict {
    pub fn should_show(&self) -> bool {
        matches!(
            self,
            Verdict::DeveloperMode | Verdict::Expired | Verdict::Eligible
        )
    }
}

/// Pure decision over a record at `now`.
pub fn evaluate(policy: &NotificationPolicy, record: &InteractionRecord, now: DateTime<Utc>) -> Verdict {
    if policy.developer_mode {
        return Verdict::DeveloperMode;
    }
    if let Some(reset_after) = policy.reset_after
        && now - record.last_interaction_at > reset_after
    {
        return Verdict::Expired;
    }
    if policy.respect_user_choice && record.user_declined && !record.user_accepted {
        return Verdict::Declined;
    }
    if policy.respect_user_choice && record.user_accepted {
        return Verdict::Accepted;
    }
    if let Some(cooldown) = policy.cooldown {
        let since = now - record.last_notification_shown_at;
        if since < cooldown {
            return Verdict::CoolingDown {
                remaining: cooldown - since,
            };
        }
    }
    if let Some(max) = policy.max_per_session
        && record.notification_count >= max
    {
        return Verdict::SessionCapReached {
            count: record.notification_count,
        };
    }
    Verdict::Eligible
}

/// Applies a [`NotificationPolicy`] to the stored history.
#[derive(Clone)]
pub struct NotificationScheduler {
    policy: NotificationPolicy,
    store: InteractionStore,
}

impl NotificationScheduler {
    pub fn new(policy: NotificationPolicy, store: InteractionStore) -> Self {
        Self { policy, store }
    }

    pub fn policy(&self) -> &NotificationPolicy {
        &self.policy
    }

    pub fn store(&self) -> &InteractionStore {
        &self.store
    }

    /// Decide, discarding expired history as a side effect.
    pub fn should_show(&self, now: DateTime<Utc>) -> bool {
        let record = self.store.load(now);
        let verdict = evaluate(&self.policy, &record, now);
        match &verdict {
            Verdict::Expired => {
                info!("interaction history expired, resetting");
                self.store.reset();
            }
            Verdict::CoolingDown { remaining } => {
                debug!(remaining_minutes = remaining.num_minutes(), "notification cooling down");
            }
            other => debug!(verdict = ?other, "notification decision"),
        }
        verdict.should_show()
    }
}

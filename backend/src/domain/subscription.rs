//! Subscription plans and the paid-tier lifecycle.
//!
//! Paid tiers are only ever activated through a verified Pi payment; the
//! payment service owns that linkage. This module owns the plan/state rules.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::payment::PiAmount;

/// Number of days a paid tier stays active per verified payment.
pub const SUBSCRIPTION_PERIOD_DAYS: i64 = 30;

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// No paid entitlements.
    Free,
    /// Entry paid tier.
    Basic,
    /// Full paid tier.
    Premium,
}

impl Plan {
    /// Stable string form used for persistence.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Premium => "premium",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "free" => Some(Self::Free),
            "basic" => Some(Self::Basic),
            "premium" => Some(Self::Premium),
            _ => None,
        }
    }

    /// Whether this is the unpaid tier.
    pub fn is_free(self) -> bool {
        matches!(self, Self::Free)
    }

    /// Minimum payment that buys one period of this plan.
    ///
    /// `None` for the free tier, which cannot be purchased.
    pub fn minimum_amount(self) -> Option<PiAmount> {
        match self {
            Self::Free => None,
            Self::Basic => Some(PiAmount::from_micropi(1_000_000)),
            Self::Premium => Some(PiAmount::from_micropi(5_000_000)),
        }
    }
}

/// Lifecycle state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// The tier is in force.
    Active,
    /// The end date passed without renewal.
    Expired,
    /// The subscriber cancelled; access runs until the end date.
    Cancelled,
}

impl SubscriptionStatus {
    /// Stable string form used for persistence.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(Self::Active),
            "expired" => Some(Self::Expired),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Subscription state carried on every user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Current tier.
    pub plan: Plan,
    /// Lifecycle state.
    pub status: SubscriptionStatus,
    /// End of the paid period; `None` on the free tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// The default state for new accounts.
    pub fn free() -> Self {
        Self {
            plan: Plan::Free,
            status: SubscriptionStatus::Active,
            expires_at: None,
        }
    }

    /// Current tier.
    pub fn plan(&self) -> Plan {
        self.plan
    }

    /// Activate or renew a paid tier for one period from `now`.
    ///
    /// Renewing an already-active paid subscription extends from its current
    /// end date rather than from `now`, so subscribers never lose paid days.
    pub fn activate(&mut self, plan: Plan, now: DateTime<Utc>) {
        let base = match self.expires_at {
            Some(current_end)
                if self.status == SubscriptionStatus::Active
                    && self.plan == plan
                    && current_end > now =>
            {
                current_end
            }
            _ => now,
        };
        self.plan = plan;
        self.status = SubscriptionStatus::Active;
        self.expires_at = Some(base + Duration::days(SUBSCRIPTION_PERIOD_DAYS));
    }

    /// Cancel the paid tier. Access continues until the end date.
    pub fn cancel(&mut self) {
        if !self.plan.is_free() {
            self.status = SubscriptionStatus::Cancelled;
        }
    }

    /// Whether paid entitlements are currently in force.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        if self.plan.is_free() {
            return true;
        }
        match self.expires_at {
            Some(end) => {
                matches!(
                    self.status,
                    SubscriptionStatus::Active | SubscriptionStatus::Cancelled
                ) && end > now
            }
            None => false,
        }
    }

    /// Flip to `expired` when the end date has passed. Returns whether the
    /// state changed, so sweeps know which records to persist.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.plan.is_free() || self.status == SubscriptionStatus::Expired {
            return false;
        }
        match self.expires_at {
            Some(end) if end <= now => {
                self.status = SubscriptionStatus::Expired;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).expect("valid timestamp")
    }

    #[test]
    fn activation_runs_one_period() {
        let mut subscription = Subscription::free();
        let now = at(1_000_000);
        subscription.activate(Plan::Basic, now);
        assert_eq!(subscription.plan, Plan::Basic);
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert_eq!(
            subscription.expires_at,
            Some(now + Duration::days(SUBSCRIPTION_PERIOD_DAYS))
        );
    }

    #[test]
    fn renewal_extends_from_current_end_date() {
        let mut subscription = Subscription::free();
        let start = at(1_000_000);
        subscription.activate(Plan::Premium, start);
        let first_end = subscription.expires_at.expect("end date set");

        subscription.activate(Plan::Premium, start + Duration::days(10));
        assert_eq!(
            subscription.expires_at,
            Some(first_end + Duration::days(SUBSCRIPTION_PERIOD_DAYS))
        );
    }

    #[test]
    fn plan_change_restarts_from_now() {
        let mut subscription = Subscription::free();
        let start = at(1_000_000);
        subscription.activate(Plan::Basic, start);

        let upgrade_at = start + Duration::days(10);
        subscription.activate(Plan::Premium, upgrade_at);
        assert_eq!(
            subscription.expires_at,
            Some(upgrade_at + Duration::days(SUBSCRIPTION_PERIOD_DAYS))
        );
    }

    #[test]
    fn cancelled_subscription_keeps_access_until_end_date() {
        let mut subscription = Subscription::free();
        let start = at(1_000_000);
        subscription.activate(Plan::Basic, start);
        subscription.cancel();

        assert_eq!(subscription.status, SubscriptionStatus::Cancelled);
        assert!(subscription.is_active(start + Duration::days(29)));
        assert!(!subscription.is_active(start + Duration::days(31)));
    }

    #[rstest]
    #[case(29, false)]
    #[case(30, true)]
    #[case(45, true)]
    fn expiry_sweep_flips_past_due_subscriptions(#[case] days: i64, #[case] expected: bool) {
        let mut subscription = Subscription::free();
        let start = at(1_000_000);
        subscription.activate(Plan::Basic, start);

        let changed = subscription.expire_if_due(start + Duration::days(days));
        assert_eq!(changed, expected);
        if expected {
            assert_eq!(subscription.status, SubscriptionStatus::Expired);
            // A second sweep reports no change.
            assert!(!subscription.expire_if_due(start + Duration::days(days)));
        }
    }

    #[test]
    fn free_tier_is_always_active() {
        let subscription = Subscription::free();
        assert!(subscription.is_active(at(0)));
    }

    #[test]
    fn minimum_amounts_order_by_tier() {
        let basic = Plan::Basic.minimum_amount().expect("basic is purchasable");
        let premium = Plan::Premium
            .minimum_amount()
            .expect("premium is purchasable");
        assert!(premium.as_micropi() > basic.as_micropi());
        assert!(Plan::Free.minimum_amount().is_none());
    }
}

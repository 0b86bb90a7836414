// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Referral intake and bonus crediting.
//!
//! Crediting must be exactly-once per referral record even when the same
//! referee's exchange is evaluated from two overlapping pipeline runs. The
//! conditional flip of `bonus_given` in storage is the sole correctness
//! mechanism: only the caller that wins the flip credits the referrer.

use goblin_core::GoblinError;
use goblin_quota::QuotaLedger;
use goblin_storage::queries::{referrals, users};
use goblin_storage::Database;
use tracing::{debug, info};

/// Referral totals for one referrer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferralStats {
    pub total: i64,
    pub processed: i64,
}

/// Records referrals at first contact and resolves them into quota credits.
#[derive(Clone)]
pub struct ReferralBonusApplier {
    db: Database,
    ledger: QuotaLedger,
    bonus: i64,
}

impl ReferralBonusApplier {
    pub fn new(db: Database, ledger: QuotaLedger, bonus: i64) -> Self {
        Self { db, ledger, bonus }
    }

    /// Record a referral from a start parameter.
    ///
    /// `referrer_external_id` is the transport-level id carried in the deep
    /// link. Ignored (returns `false`) when the referrer is unknown or the
    /// referee referred themselves; the (referrer, referee) pair is recorded
    /// at most once.
    pub async fn record(
        &self,
        referrer_external_id: &str,
        referee_id: i64,
    ) -> Result<bool, GoblinError> {
        let Some(referrer) = users::get_by_telegram_id(&self.db, referrer_external_id).await?
        else {
            debug!(referrer_external_id, "referral ignored: unknown referrer");
            return Ok(false);
        };
        if referrer.id == referee_id {
            debug!(referee_id, "referral ignored: self-referral");
            return Ok(false);
        }

        let created = referrals::create_if_absent(&self.db, referrer.id, referee_id).await?;
        if created {
            info!(referrer_id = referrer.id, referee_id, "referral recorded");
        }
        Ok(created)
    }

    /// Credit every unresolved referral where `referee_id` is the referee.
    ///
    /// Returns how many records this call resolved. Run after the referee's
    /// exchange completed; losing the conditional flip means another run
    /// already credited that record.
    pub async fn apply_pending(&self, referee_id: i64) -> Result<u32, GoblinError> {
        let pending = referrals::pending_for_referee(&self.db, referee_id).await?;
        let mut applied = 0;
        for referral in pending {
            if referrals::mark_bonus_given(&self.db, referral.id).await? {
                self.ledger.credit(referral.referrer_id, self.bonus).await?;
                info!(
                    referral_id = referral.id,
                    referrer_id = referral.referrer_id,
                    referee_id,
                    bonus = self.bonus,
                    "referral bonus credited"
                );
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Referral totals for the given referrer.
    pub async fn stats(&self, referrer_id: i64) -> Result<ReferralStats, GoblinError> {
        let (total, processed) = referrals::stats_for_referrer(&self.db, referrer_id).await?;
        Ok(ReferralStats { total, processed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goblin_storage::queries::grants;
    use goblin_test_utils::TestHarness;

    async fn applier(harness: &TestHarness) -> ReferralBonusApplier {
        let ledger = QuotaLedger::new(harness.db.clone(), "Free".to_string());
        ReferralBonusApplier::new(harness.db.clone(), ledger, 5)
    }

    #[tokio::test]
    async fn unknown_referrer_is_ignored() {
        let harness = TestHarness::new().await.unwrap();
        let referee = harness.user("tg-new").await.unwrap();

        let applier = applier(&harness).await;
        assert!(!applier.record("tg-ghost", referee.id).await.unwrap());
    }

    #[tokio::test]
    async fn self_referral_is_ignored() {
        let harness = TestHarness::new().await.unwrap();
        let user = harness.user("tg-1").await.unwrap();

        let applier = applier(&harness).await;
        assert!(!applier.record("tg-1", user.id).await.unwrap());
    }

    #[tokio::test]
    async fn pair_is_recorded_at_most_once() {
        let harness = TestHarness::new().await.unwrap();
        harness.user("tg-ref").await.unwrap();
        let referee = harness.user("tg-new").await.unwrap();

        let applier = applier(&harness).await;
        assert!(applier.record("tg-ref", referee.id).await.unwrap());
        assert!(!applier.record("tg-ref", referee.id).await.unwrap());
    }

    #[tokio::test]
    async fn apply_pending_credits_referrer_once() {
        let harness = TestHarness::new().await.unwrap();
        let referrer = harness.user("tg-ref").await.unwrap();
        let referee = harness.user("tg-new").await.unwrap();

        let applier = applier(&harness).await;
        applier.record("tg-ref", referee.id).await.unwrap();

        // Referrer holds the 10-message free grant before the bonus.
        let ledger = QuotaLedger::new(harness.db.clone(), "Free".to_string());
        ledger.ensure_grant(referrer.id).await.unwrap();

        assert_eq!(applier.apply_pending(referee.id).await.unwrap(), 1);
        let grant = grants::get_active(&harness.db, referrer.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(grant.messages_left, 15);

        // Second evaluation finds nothing unresolved.
        assert_eq!(applier.apply_pending(referee.id).await.unwrap(), 0);
        let grant = grants::get_active(&harness.db, referrer.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(grant.messages_left, 15);
    }

    #[tokio::test]
    async fn concurrent_evaluations_credit_exactly_once() {
        let harness = TestHarness::new().await.unwrap();
        let referrer = harness.user("tg-ref").await.unwrap();
        let referee = harness.user("tg-new").await.unwrap();

        let applier = applier(&harness).await;
        applier.record("tg-ref", referee.id).await.unwrap();
        let ledger = QuotaLedger::new(harness.db.clone(), "Free".to_string());
        ledger.ensure_grant(referrer.id).await.unwrap();

        let (a, b) = tokio::join!(
            applier.apply_pending(referee.id),
            applier.apply_pending(referee.id),
        );
        assert_eq!(a.unwrap() + b.unwrap(), 1);

        let grant = grants::get_active(&harness.db, referrer.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(grant.messages_left, 15);
    }

    #[tokio::test]
    async fn stats_track_total_and_processed() {
        let harness = TestHarness::new().await.unwrap();
        let referrer = harness.user("tg-ref").await.unwrap();
        let first = harness.user("tg-a").await.unwrap();
        let second = harness.user("tg-b").await.unwrap();

        let applier = applier(&harness).await;
        applier.record("tg-ref", first.id).await.unwrap();
        applier.record("tg-ref", second.id).await.unwrap();
        applier.apply_pending(first.id).await.unwrap();

        let stats = applier.stats(referrer.id).await.unwrap();
        assert_eq!(
            stats,
            ReferralStats {
                total: 2,
                processed: 1
            }
        );
    }
}

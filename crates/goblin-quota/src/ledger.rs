// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The quota ledger over the grants and plans tables.

use goblin_core::GoblinError;
use goblin_storage::queries::{grants, plans};
use goblin_storage::{Database, Grant, Plan};
use tracing::{debug, info};

/// Plan name, balance, and expiry for user-visible notices.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanInfo {
    pub plan: String,
    pub messages_left: i64,
    pub end_at: Option<String>,
}

/// Authorizes and accounts for assistant replies per user.
#[derive(Clone)]
pub struct QuotaLedger {
    db: Database,
    default_plan: String,
}

impl QuotaLedger {
    /// Create a ledger that issues grants on `default_plan` when a user has
    /// none.
    pub fn new(db: Database, default_plan: String) -> Self {
        Self { db, default_plan }
    }

    async fn default_plan(&self) -> Result<Plan, GoblinError> {
        plans::get_by_name(&self.db, &self.default_plan)
            .await?
            .ok_or_else(|| GoblinError::not_found(format!("plan {}", self.default_plan)))
    }

    /// The user's active grant, if any.
    pub async fn active_grant(&self, user_id: i64) -> Result<Option<Grant>, GoblinError> {
        grants::get_active(&self.db, user_id).await
    }

    /// Return the active grant, creating and activating a default-plan grant
    /// seeded with that plan's allotment if none exists.
    pub async fn ensure_grant(&self, user_id: i64) -> Result<Grant, GoblinError> {
        let plan = self.default_plan().await?;
        let grant = grants::ensure_active(&self.db, user_id, plan.id, plan.messages_limit).await?;
        Ok(grant)
    }

    /// Whether the user may consume one more assistant reply.
    ///
    /// Resolves the active grant (creating the default one if absent); a
    /// grant whose `end_at` has passed is deactivated and replaced with a
    /// fresh default grant before the balance check.
    pub async fn can_consume(&self, user_id: i64) -> Result<bool, GoblinError> {
        let plan = self.default_plan().await?;
        let grant =
            grants::resolve_for_consume(&self.db, user_id, plan.id, plan.messages_limit).await?;
        debug!(user_id, messages_left = grant.messages_left, "quota check");
        Ok(grant.messages_left > 0)
    }

    /// Best-effort decrement of the active grant's balance, floored at zero.
    ///
    /// No-op when no grant is active or the balance is already zero; never
    /// drives the balance negative.
    pub async fn debit(&self, user_id: i64) -> Result<(), GoblinError> {
        grants::debit(&self.db, user_id).await
    }

    /// Credit `amount` extra messages to the user's active grant.
    pub async fn credit(&self, user_id: i64, amount: i64) -> Result<(), GoblinError> {
        grants::credit(&self.db, user_id, amount).await?;
        info!(user_id, amount, "quota credited");
        Ok(())
    }

    /// Move the user onto `plan_id`: deactivates every active grant and
    /// activates a fresh grant with the plan's allotment and duration.
    pub async fn upgrade(&self, user_id: i64, plan_id: i64) -> Result<Grant, GoblinError> {
        let plan = plans::get_by_id(&self.db, plan_id)
            .await?
            .ok_or_else(|| GoblinError::not_found(format!("plan {plan_id}")))?;

        let end_at = plan.duration_days.map(|days| {
            (chrono::Utc::now() + chrono::Duration::days(days))
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string()
        });
        let grant =
            grants::upgrade(&self.db, user_id, plan.id, plan.messages_limit, end_at).await?;

        info!(
            user_id,
            plan = plan.name.as_str(),
            messages_left = grant.messages_left,
            "plan upgraded"
        );
        Ok(grant)
    }

    /// Plan name, remaining balance, and expiry for the given user.
    ///
    /// Reports the default plan's full allotment if no grant exists yet,
    /// matching what the user would receive on first contact.
    pub async fn plan_info(&self, user_id: i64) -> Result<PlanInfo, GoblinError> {
        let Some(grant) = grants::get_active(&self.db, user_id).await? else {
            let plan = self.default_plan().await?;
            return Ok(PlanInfo {
                plan: plan.name,
                messages_left: plan.messages_limit,
                end_at: None,
            });
        };
        let plan = plans::get_by_id(&self.db, grant.plan_id)
            .await?
            .ok_or_else(|| GoblinError::not_found(format!("plan {}", grant.plan_id)))?;
        Ok(PlanInfo {
            plan: plan.name,
            messages_left: grant.messages_left,
            end_at: grant.end_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goblin_storage::queries::{grants, plans, users};

    async fn setup() -> (Database, QuotaLedger, i64) {
        let db = Database::open_in_memory().await.unwrap();
        plans::seed_defaults(&db).await.unwrap();
        let user = users::find_or_create(&db, "tg-1", None, None).await.unwrap();
        let ledger = QuotaLedger::new(db.clone(), "Free".to_string());
        (db, ledger, user.id)
    }

    #[tokio::test]
    async fn ensure_grant_seeds_default_plan_allotment() {
        let (_db, ledger, user_id) = setup().await;
        let grant = ledger.ensure_grant(user_id).await.unwrap();
        assert_eq!(grant.messages_left, 10);
        assert!(grant.is_active);
    }

    #[tokio::test]
    async fn can_consume_false_only_at_zero_balance() {
        let (_db, ledger, user_id) = setup().await;
        assert!(ledger.can_consume(user_id).await.unwrap());

        for _ in 0..10 {
            ledger.debit(user_id).await.unwrap();
        }
        assert!(!ledger.can_consume(user_id).await.unwrap());
    }

    #[tokio::test]
    async fn expired_grant_rolls_over_to_fresh_default() {
        let (db, ledger, user_id) = setup().await;
        let premium = plans::get_by_name(&db, "Premium").await.unwrap().unwrap();

        grants::upgrade(
            &db,
            user_id,
            premium.id,
            0, // exhausted balance, but expired too
            Some("2020-01-01T00:00:00.000Z".to_string()),
        )
        .await
        .unwrap();

        // Expiry replacement happens before the balance check, so the fresh
        // free grant authorizes the message.
        assert!(ledger.can_consume(user_id).await.unwrap());
        let info = ledger.plan_info(user_id).await.unwrap();
        assert_eq!(info.plan, "Free");
        assert_eq!(info.messages_left, 10);
    }

    #[tokio::test]
    async fn concurrent_ensure_grant_upholds_single_active_invariant() {
        let (db, ledger, user_id) = setup().await;

        let (a, b, c) = tokio::join!(
            ledger.ensure_grant(user_id),
            ledger.ensure_grant(user_id),
            ledger.ensure_grant(user_id),
        );
        let ids = [a.unwrap().id, b.unwrap().id, c.unwrap().id];
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(grants::active_count(&db, user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upgrade_sets_expiry_from_plan_duration() {
        let (db, ledger, user_id) = setup().await;
        let premium = plans::get_by_name(&db, "Premium").await.unwrap().unwrap();

        let grant = ledger.upgrade(user_id, premium.id).await.unwrap();
        assert_eq!(grant.messages_left, 1000);
        let end_at = grant.end_at.expect("subscription must carry an expiry");
        assert!(end_at > goblin_storage::now_timestamp());
    }

    #[tokio::test]
    async fn plan_info_without_grant_reports_default_allotment() {
        let (_db, ledger, user_id) = setup().await;
        let info = ledger.plan_info(user_id).await.unwrap();
        assert_eq!(info.plan, "Free");
        assert_eq!(info.messages_left, 10);
        assert!(info.end_at.is_none());
    }

    mod debit_floor {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(16))]

            /// For any starting balance and any number of debits, the balance
            /// never goes below zero and lands exactly at max(0, start - n).
            #[test]
            fn debit_never_goes_negative(start in 0i64..20, debits in 0usize..40) {
                let rt = tokio::runtime::Runtime::new().unwrap();
                rt.block_on(async move {
                    let db = Database::open_in_memory().await.unwrap();
                    plans::seed_defaults(&db).await.unwrap();
                    let user = users::find_or_create(&db, "tg-prop", None, None)
                        .await
                        .unwrap();
                    let free = plans::get_by_name(&db, "Free").await.unwrap().unwrap();
                    grants::ensure_active(&db, user.id, free.id, start).await.unwrap();

                    let ledger = QuotaLedger::new(db.clone(), "Free".to_string());
                    for _ in 0..debits {
                        ledger.debit(user.id).await.unwrap();
                    }

                    let grant = grants::get_active(&db, user.id).await.unwrap().unwrap();
                    prop_assert!(grant.messages_left >= 0);
                    prop_assert_eq!(grant.messages_left, (start - debits as i64).max(0));
                    Ok(())
                })?;
            }
        }
    }
}

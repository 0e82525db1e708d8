use chrono::{Duration, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    db::entities::{payments, referral_signups, users},
    error::Result,
};

/// Credits granted to a referrer when their referral makes a first purchase.
pub const REFERRAL_REWARD_CREDITS: i32 = 1;

/// A referral only sticks if it is captured this soon after signup.
const NEW_SIGNUP_WINDOW_HOURS: i64 = 24;

/// A completed checkout, as reported by the payment provider.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub user_id: Uuid,
    pub checkout_session_id: String,
    pub payment_intent_id: Option<String>,
    pub credits: i32,
    pub amount_cents: i64,
    pub currency: String,
}

/// Per-user credit balance, payments and referral attribution.
#[derive(Clone)]
pub struct LedgerService {
    db: DatabaseConnection,
}

impl LedgerService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a payment and credits the user. Returns `false` without
    /// touching anything if this checkout session was already recorded.
    pub async fn record_payment(&self, record: PaymentRecord) -> Result<bool> {
        let txn = self.db.begin().await?;

        let existing = payments::Entity::find()
            .filter(payments::Column::CheckoutSessionId.eq(&record.checkout_session_id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            tracing::info!("Payment already processed: {}", record.checkout_session_id);
            return Ok(false);
        }

        let had_prior_payment = payments::Entity::find()
            .filter(payments::Column::UserId.eq(record.user_id))
            .filter(payments::Column::Status.eq("completed"))
            .count(&txn)
            .await?
            > 0;

        add_credits(&txn, record.user_id, record.credits).await?;

        let payment = payments::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(record.user_id),
            checkout_session_id: Set(record.checkout_session_id.clone()),
            payment_intent_id: Set(record.payment_intent_id.clone()),
            credits_purchased: Set(record.credits),
            amount_cents: Set(record.amount_cents),
            currency: Set(record.currency.clone()),
            status: Set("completed".to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;

        if !had_prior_payment {
            reward_referrer(&txn, record.user_id, payment.id).await?;
        }

        txn.commit().await?;

        tracing::info!(
            "Added {} credits to user {} (payment {})",
            record.credits,
            record.user_id,
            record.checkout_session_id
        );

        Ok(true)
    }

    /// Attributes `referred_user_id` to `referrer_user_id`. Silently ignores
    /// self-referrals, existing attributions, unknown users, accounts older
    /// than the signup window, and users who already paid.
    pub async fn capture_referral_signup(
        &self,
        referred_user_id: Uuid,
        referrer_user_id: Uuid,
    ) -> Result<bool> {
        if referred_user_id == referrer_user_id {
            return Ok(false);
        }

        let existing = referral_signups::Entity::find()
            .filter(referral_signups::Column::ReferredUserId.eq(referred_user_id))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        let Some(referred) = users::Entity::find_by_id(referred_user_id).one(&self.db).await? else {
            return Ok(false);
        };
        if users::Entity::find_by_id(referrer_user_id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Ok(false);
        }

        let account_age = Utc::now() - referred.created_at.with_timezone(&Utc);
        if account_age > Duration::hours(NEW_SIGNUP_WINDOW_HOURS) {
            return Ok(false);
        }

        let completed_payments = payments::Entity::find()
            .filter(payments::Column::UserId.eq(referred_user_id))
            .filter(payments::Column::Status.eq("completed"))
            .count(&self.db)
            .await?;
        if completed_payments > 0 {
            return Ok(false);
        }

        let signup = referral_signups::ActiveModel {
            id: Set(Uuid::new_v4()),
            referrer_user_id: Set(referrer_user_id),
            referred_user_id: Set(referred_user_id),
            reward_payment_id: Set(None),
            rewarded_at: Set(None),
            created_at: Set(Utc::now().into()),
        };

        // A concurrent request may have attributed the same user first; the
        // unique index on referred_user_id turns that into an insert error.
        match signup.insert(&self.db).await {
            Ok(_) => {
                tracing::info!(
                    "Captured referral of {} by {}",
                    referred_user_id,
                    referrer_user_id
                );
                Ok(true)
            }
            Err(e) => {
                let raced = referral_signups::Entity::find()
                    .filter(referral_signups::Column::ReferredUserId.eq(referred_user_id))
                    .one(&self.db)
                    .await?
                    .is_some();
                if raced {
                    Ok(false)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    /// `(rewarded, pending)` referral counts for a referrer.
    pub async fn referral_counts(&self, referrer_user_id: Uuid) -> Result<(u64, u64)> {
        let rewarded = referral_signups::Entity::find()
            .filter(referral_signups::Column::ReferrerUserId.eq(referrer_user_id))
            .filter(referral_signups::Column::RewardedAt.is_not_null())
            .count(&self.db)
            .await?;
        let pending = referral_signups::Entity::find()
            .filter(referral_signups::Column::ReferrerUserId.eq(referrer_user_id))
            .filter(referral_signups::Column::RewardedAt.is_null())
            .count(&self.db)
            .await?;

        Ok((rewarded, pending))
    }
}

/// Takes `amount` credits from a user if the balance allows it. The check and
/// the decrement happen in one statement, so concurrent charges cannot
/// overdraw.
pub async fn deduct_credits<C: ConnectionTrait>(conn: &C, user_id: Uuid, amount: i32) -> Result<bool> {
    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    let result = users::Entity::update_many()
        .col_expr(users::Column::Credits, Expr::col(users::Column::Credits).sub(amount))
        .col_expr(users::Column::UpdatedAt, Expr::value(now))
        .filter(users::Column::Id.eq(user_id))
        .filter(users::Column::Credits.gte(amount))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

pub async fn add_credits<C: ConnectionTrait>(conn: &C, user_id: Uuid, amount: i32) -> Result<()> {
    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    users::Entity::update_many()
        .col_expr(users::Column::Credits, Expr::col(users::Column::Credits).add(amount))
        .col_expr(users::Column::UpdatedAt, Expr::value(now))
        .filter(users::Column::Id.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}

async fn reward_referrer<C: ConnectionTrait>(conn: &C, purchaser_id: Uuid, payment_id: Uuid) -> Result<()> {
    let Some(referral) = referral_signups::Entity::find()
        .filter(referral_signups::Column::ReferredUserId.eq(purchaser_id))
        .one(conn)
        .await?
    else {
        return Ok(());
    };

    if referral.rewarded_at.is_some() {
        return Ok(());
    }
    if referral.referrer_user_id == purchaser_id {
        tracing::warn!("Skipping self-referral reward for user {}", purchaser_id);
        return Ok(());
    }
    if users::Entity::find_by_id(referral.referrer_user_id)
        .one(conn)
        .await?
        .is_none()
    {
        tracing::warn!(
            "Referrer {} not found for referral signup {}",
            referral.referrer_user_id,
            referral.id
        );
        return Ok(());
    }

    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    let marked = referral_signups::Entity::update_many()
        .col_expr(referral_signups::Column::RewardPaymentId, Expr::value(payment_id))
        .col_expr(referral_signups::Column::RewardedAt, Expr::value(now))
        .filter(referral_signups::Column::Id.eq(referral.id))
        .filter(referral_signups::Column::RewardedAt.is_null())
        .exec(conn)
        .await?;
    if marked.rows_affected == 0 {
        return Ok(());
    }

    add_credits(conn, referral.referrer_user_id, REFERRAL_REWARD_CREDITS).await?;
    tracing::info!(
        "Awarded {} referral credit to {} for first purchase by {}",
        REFERRAL_REWARD_CREDITS,
        referral.referrer_user_id,
        purchaser_id
    );

    Ok(())
}

/// Accepts a referral code only if it looks like a user id.
pub fn normalize_referral_code(value: &str) -> Option<Uuid> {
    let trimmed = value.trim();
    // Uuid::parse_str also accepts braced and URN forms; referral codes are
    // always the 36-char hyphenated form.
    if trimmed.len() != 36 {
        return None;
    }
    Uuid::parse_str(trimmed).ok()
}

pub fn build_referral_link(base_url: &str, user_id: Uuid) -> String {
    format!(
        "{}/?ref={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(&user_id.to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_referral_code() {
        let id = Uuid::new_v4();
        assert_eq!(normalize_referral_code(&format!("  {id} ")), Some(id));
        assert_eq!(
            normalize_referral_code(&id.to_string().to_uppercase()),
            Some(id)
        );
        assert_eq!(normalize_referral_code("not-a-uuid"), None);
        assert_eq!(normalize_referral_code(&id.simple().to_string()), None);
    }

    #[test]
    fn test_build_referral_link_trims_slashes() {
        let id = Uuid::nil();
        assert_eq!(
            build_referral_link("https://entrain.app///", id),
            "https://entrain.app/?ref=00000000-0000-0000-0000-000000000000"
        );
    }
}

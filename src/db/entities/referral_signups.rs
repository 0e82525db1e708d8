use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Attribution of a new signup to the user whose share link brought them in.
/// `rewarded_at` is set once, when the referred user's first payment lands.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "referral_signups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub referrer_user_id: Uuid,
    #[sea_orm(unique)]
    pub referred_user_id: Uuid,
    pub reward_payment_id: Option<Uuid>,
    pub rewarded_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

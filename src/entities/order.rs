use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub status: String,
    pub order_date: DateTime<Utc>,
    pub total: Decimal,
    pub customer: String,
    pub customer_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub created_by: String,
    pub modified_by: Option<String>,
    pub original_order_id: Option<Uuid>,
    pub sales_notes: Option<String>,
    pub modified_date: Option<DateTime<Utc>>,
    pub invoice_url: Option<String>,
    pub tracking_company: Option<String>,
    pub tracking_number: Option<String>,
    pub payment_proof_file_name: Option<String>,
    pub payment_proof_url: Option<String>,
    pub payment_proof_uploaded_at: Option<DateTime<Utc>>,
    pub delivered_date: Option<DateTime<Utc>>,
    pub paid_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        active_model.updated_at = Set(Utc::now());
        Ok(active_model)
    }
}

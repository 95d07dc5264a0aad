use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Customer account. `phone` is the login identifier and is unique.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Customer name must be between 1 and 255 characters"
    ))]
    pub name: String,

    #[sea_orm(unique)]
    #[validate(length(min = 3, max = 32, message = "Phone must be between 3 and 32 characters"))]
    pub phone: String,

    /// Argon2 hash; never serialized to clients.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Blocked customers stay in the table with `is_active = false`.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale::Entity")]
    Sales,
    #[sea_orm(has_many = "super::customer_token::Entity")]
    Tokens,
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl Related<super::customer_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

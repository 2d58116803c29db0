use sea_orm::entity::prelude::*;

/// Append-only audit trail of user actions, written by the gate and by
/// business handlers. Write failures never reach callers.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "access_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// None for anonymous requests.
    pub account_id: Option<i32>,

    pub account_name: String,

    pub action: String,

    pub details: Option<String>,

    pub ip_address: String,

    pub user_agent: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;

/// Append-only record of suspicious or blocked activity per IP.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "security_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub ip_address: String,

    /// LOGIN_FAILED, RATE_LIMIT_EXCEEDED, SUSPICIOUS_ACTIVITY, BLOCKED_IP_REQUEST, ...
    pub event_type: String,

    pub details: Option<String>,

    pub user_agent: String,

    pub created_at: String,

    /// Set in bulk by the manager block-IP action; gates all future
    /// requests from this IP once any row carries it.
    pub is_blocked: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

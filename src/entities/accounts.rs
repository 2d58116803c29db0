use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    /// Argon2id password hash (PHC string)
    pub password_hash: String,

    pub display_name: String,

    /// "employee" or "manager"
    pub role: String,

    pub is_active: bool,

    /// Consecutive failed login attempts since the last success
    pub login_attempts: i32,

    /// Lock expiry (RFC3339). A value in the future refuses login outright.
    pub locked_until: Option<String>,

    pub last_login: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tasks::Entity")]
    Tasks,
    #[sea_orm(has_many = "super::trusted_devices::Entity")]
    TrustedDevices,
}

impl Related<super::tasks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tasks.def()
    }
}

impl Related<super::trusted_devices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrustedDevices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

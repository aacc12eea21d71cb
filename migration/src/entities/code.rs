use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "codes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    #[sea_orm(unique)]
    pub token: String,
    pub content_type: String,
    /// JSON payload, shape depends on `content_type`
    #[sea_orm(column_type = "Text")]
    pub content: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub destination_url: Option<String>,
    pub password_hash: Option<String>,
    pub active_from: Option<DateTimeUtc>,
    pub active_until: Option<DateTimeUtc>,
    pub expires_at: Option<DateTimeUtc>,
    pub landing_page: bool,
    pub scan_count: i64,
    pub archived: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

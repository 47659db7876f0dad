use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[sea_orm(unique)]
    pub contact_key: Option<String>,
    pub full_name: Option<String>,
    pub tracking_code: Option<String>,
    pub referrer_username: Option<String>,
    pub referrer_type: Option<String>,
    pub attribution_method: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

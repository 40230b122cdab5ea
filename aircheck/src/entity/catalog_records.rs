use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "catalog_records")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub file_name: String,
    pub date: String,
    pub description: String,
    pub download_link: Option<String>,
    pub share_hash: Option<String>,
    /// Recording length in minutes.
    pub length: f64,
    pub host: String,
    /// Dense display ordinal; always a permutation of 0..count-1.
    pub id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

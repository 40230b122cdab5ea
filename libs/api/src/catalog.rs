use serde::{Deserialize, Serialize};

/// One archived recording as the publisher hands it to the catalog.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewCatalogRecord {
    pub file_name: String,
    pub date: String,
    pub description: String,
    pub download_link: Option<String>,
    pub share_hash: Option<String>,
    pub length: f64,
    pub host: String,
}

/// Partial update for an existing record; `None` fields are left untouched.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CatalogUpdate {
    pub date: Option<String>,
    pub description: Option<String>,
    pub download_link: Option<String>,
    pub length: Option<f64>,
    pub host: Option<String>,
    pub id: Option<i32>,
}

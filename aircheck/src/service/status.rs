use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set, TransactionTrait,
};

use api::status::StatusEntry;

use crate::entity::recording_status::{self, Entity as RecordingStatus};
use crate::error::AppError;
use crate::result::Result;

/// Live-status surface consumed by the website. Every publish replaces the
/// whole table; consumers must treat each publish as authoritative.
pub struct StatusService;

impl StatusService {
    pub async fn publish(db: &DatabaseConnection, entries: &[StatusEntry]) -> Result<()> {
        let txn = db.begin().await.map_err(AppError::database)?;

        RecordingStatus::delete_many()
            .exec(&txn)
            .await
            .map_err(AppError::database)?;

        let now = chrono::DateTime::<chrono::FixedOffset>::from(Utc::now());
        for entry in entries {
            recording_status::ActiveModel {
                host: Set(entry.host.clone()),
                link: Set(entry.link.clone()),
                length: Set(entry.length.clone()),
                description: Set(entry.description.clone()),
                starting_time: Set(entry.starting_time.clone()),
                last_updated: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(AppError::database)?;
        }

        txn.commit().await.map_err(AppError::database)
    }

    pub async fn clear(db: &DatabaseConnection) -> Result<()> {
        Self::publish(db, &[]).await
    }

    pub async fn list(db: &DatabaseConnection) -> Result<Vec<recording_status::Model>> {
        RecordingStatus::find()
            .order_by_asc(recording_status::Column::Host)
            .all(db)
            .await
            .map_err(AppError::database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    fn entry(host: &str, length: &str) -> StatusEntry {
        StatusEntry {
            host: host.to_string(),
            link: format!("https://broadcasting.example.org/{host}"),
            length: length.to_string(),
            description: "Evening singing".to_string(),
            starting_time: "June 10 Tuesday 2025 07:30 PM".to_string(),
        }
    }

    #[tokio::test]
    async fn publish_replaces_the_whole_set() {
        let db = setup().await;

        StatusService::publish(&db, &[entry("pineland", "1 minute, 2 seconds")])
            .await
            .unwrap();
        StatusService::publish(
            &db,
            &[
                entry("newdale", "0 minutes, 10 seconds"),
                entry("springfield", "5 minutes, 0 seconds"),
            ],
        )
        .await
        .unwrap();

        let rows = StatusService::list(&db).await.unwrap();
        let hosts: Vec<&str> = rows.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, vec!["newdale", "springfield"]);
    }

    #[tokio::test]
    async fn republish_updates_elapsed_text() {
        let db = setup().await;

        StatusService::publish(&db, &[entry("pineland", "1 minute, 2 seconds")])
            .await
            .unwrap();
        StatusService::publish(&db, &[entry("pineland", "1 minute, 17 seconds")])
            .await
            .unwrap();

        let rows = StatusService::list(&db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].length, "1 minute, 17 seconds");
    }

    #[tokio::test]
    async fn clear_empties_the_table() {
        let db = setup().await;

        StatusService::publish(&db, &[entry("pineland", "1 minute, 2 seconds")])
            .await
            .unwrap();
        StatusService::clear(&db).await.unwrap();

        assert!(StatusService::list(&db).await.unwrap().is_empty());
    }
}

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use api::catalog::{CatalogUpdate, NewCatalogRecord};

use crate::entity::catalog_records::{self, Entity as Catalog};
use crate::error::AppError;
use crate::result::Result;

/// Permanent archive of every published recording. The `id` column is a
/// dense display ordinal: after any mutation the ids are exactly
/// `0..count-1`. All multi-step mutations run inside one transaction so
/// concurrent writers (sessions, the editor) cannot lose updates.
pub struct CatalogService;

impl CatalogService {
    pub async fn get(db: &DatabaseConnection, file_name: &str) -> Result<catalog_records::Model> {
        Catalog::find_by_id(file_name.to_owned())
            .one(db)
            .await
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(file_name))
    }

    pub async fn add(
        db: &DatabaseConnection,
        record: NewCatalogRecord,
    ) -> Result<catalog_records::Model> {
        let txn = db.begin().await.map_err(AppError::database)?;

        if Catalog::find_by_id(record.file_name.clone())
            .one(&txn)
            .await
            .map_err(AppError::database)?
            .is_some()
        {
            return Err(AppError::already_exists(&record.file_name));
        }

        let count = Catalog::find()
            .count(&txn)
            .await
            .map_err(AppError::database)?;

        let model = catalog_records::ActiveModel {
            file_name: Set(record.file_name),
            date: Set(record.date),
            description: Set(record.description),
            download_link: Set(record.download_link),
            share_hash: Set(record.share_hash),
            length: Set(record.length),
            host: Set(record.host),
            id: Set(count as i32),
        }
        .insert(&txn)
        .await
        .map_err(AppError::database)?;

        txn.commit().await.map_err(AppError::database)?;
        Ok(model)
    }

    pub async fn edit(
        db: &DatabaseConnection,
        file_name: &str,
        update: CatalogUpdate,
    ) -> Result<catalog_records::Model> {
        let existing = Self::get(db, file_name).await?;

        let CatalogUpdate {
            date,
            description,
            download_link,
            length,
            host,
            id,
        } = update;
        if date.is_none()
            && description.is_none()
            && download_link.is_none()
            && length.is_none()
            && host.is_none()
            && id.is_none()
        {
            return Ok(existing);
        }

        let mut am: catalog_records::ActiveModel = existing.into();
        if let Some(date) = date {
            am.date = Set(date);
        }
        if let Some(description) = description {
            am.description = Set(description);
        }
        if let Some(download_link) = download_link {
            am.download_link = Set(Some(download_link));
        }
        if let Some(length) = length {
            am.length = Set(length);
        }
        if let Some(host) = host {
            am.host = Set(host);
        }
        if let Some(id) = id {
            am.id = Set(id);
        }

        am.update(db).await.map_err(AppError::database)
    }

    /// Changes the primary key while preserving every other field,
    /// including the display ordinal.
    pub async fn rename(
        db: &DatabaseConnection,
        old_name: &str,
        new_name: &str,
    ) -> Result<catalog_records::Model> {
        let txn = db.begin().await.map_err(AppError::database)?;

        let existing = Catalog::find_by_id(old_name.to_owned())
            .one(&txn)
            .await
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(old_name))?;

        if Catalog::find_by_id(new_name.to_owned())
            .one(&txn)
            .await
            .map_err(AppError::database)?
            .is_some()
        {
            return Err(AppError::already_exists(new_name));
        }

        let renamed = catalog_records::ActiveModel {
            file_name: Set(new_name.to_owned()),
            date: Set(existing.date.clone()),
            description: Set(existing.description.clone()),
            download_link: Set(existing.download_link.clone()),
            share_hash: Set(existing.share_hash.clone()),
            length: Set(existing.length),
            host: Set(existing.host.clone()),
            id: Set(existing.id),
        }
        .insert(&txn)
        .await
        .map_err(AppError::database)?;

        Catalog::delete_by_id(old_name.to_owned())
            .exec(&txn)
            .await
            .map_err(AppError::database)?;

        txn.commit().await.map_err(AppError::database)?;
        Ok(renamed)
    }

    pub async fn remove(db: &DatabaseConnection, file_name: &str) -> Result<()> {
        let txn = db.begin().await.map_err(AppError::database)?;

        let deleted = Catalog::delete_by_id(file_name.to_owned())
            .exec(&txn)
            .await
            .map_err(AppError::database)?;
        if deleted.rows_affected == 0 {
            return Err(AppError::not_found(file_name));
        }

        Self::reindex_ids(&txn).await?;
        txn.commit().await.map_err(AppError::database)?;
        Ok(())
    }

    pub async fn remove_all_by_host(db: &DatabaseConnection, host: &str) -> Result<u64> {
        let txn = db.begin().await.map_err(AppError::database)?;

        let deleted = Catalog::delete_many()
            .filter(catalog_records::Column::Host.eq(host))
            .exec(&txn)
            .await
            .map_err(AppError::database)?;

        Self::reindex_ids(&txn).await?;
        txn.commit().await.map_err(AppError::database)?;
        Ok(deleted.rows_affected)
    }

    /// Renumbers ids densely, keeping the previous id order.
    pub async fn reindex_ids<C: ConnectionTrait>(db: &C) -> Result<()> {
        let records = Catalog::find()
            .order_by_asc(catalog_records::Column::Id)
            .all(db)
            .await
            .map_err(AppError::database)?;

        for (index, record) in records.into_iter().enumerate() {
            if record.id == index as i32 {
                continue;
            }
            let mut am: catalog_records::ActiveModel = record.into();
            am.id = Set(index as i32);
            am.update(db).await.map_err(AppError::database)?;
        }
        Ok(())
    }

    pub async fn list(db: &DatabaseConnection) -> Result<Vec<catalog_records::Model>> {
        Catalog::find()
            .order_by_asc(catalog_records::Column::Id)
            .all(db)
            .await
            .map_err(AppError::database)
    }

    pub async fn list_by_host(
        db: &DatabaseConnection,
        host: &str,
    ) -> Result<Vec<catalog_records::Model>> {
        Catalog::find()
            .filter(catalog_records::Column::Host.eq(host))
            .order_by_asc(catalog_records::Column::Id)
            .all(db)
            .await
            .map_err(AppError::database)
    }

    pub async fn count_by_host(db: &DatabaseConnection, host: &str) -> Result<u64> {
        Catalog::find()
            .filter(catalog_records::Column::Host.eq(host))
            .count(db)
            .await
            .map_err(AppError::database)
    }

    pub async fn get_download_link(
        db: &DatabaseConnection,
        file_name: &str,
    ) -> Result<Option<String>> {
        Ok(Self::get(db, file_name).await?.download_link)
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

    fn record(file_name: &str, host: &str) -> NewCatalogRecord {
        NewCatalogRecord {
            file_name: file_name.to_string(),
            date: "June 10 Tuesday 2025 07_30 PM".to_string(),
            description: "Evening singing".to_string(),
            download_link: Some(format!("https://archives.example.org/{file_name}")),
            share_hash: Some("abc123".to_string()),
            length: 42.5,
            host: host.to_string(),
        }
    }

    #[tokio::test]
    async fn add_assigns_dense_ids() {
        let db = setup().await;

        let first = CatalogService::add(&db, record("A", "pineland")).await.unwrap();
        let second = CatalogService::add(&db, record("B", "newdale")).await.unwrap();
        assert_eq!(first.id, 0);
        assert_eq!(second.id, 1);

        let fetched = CatalogService::get(&db, "B").await.unwrap();
        assert_eq!(fetched.id, 1);
        assert_eq!(fetched.host, "newdale");
    }

    #[tokio::test]
    async fn add_rejects_duplicate_key() {
        let db = setup().await;
        CatalogService::add(&db, record("A", "pineland")).await.unwrap();

        let err = CatalogService::add(&db, record("A", "newdale"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ResourceAlreadyExists(_)));
    }

    #[tokio::test]
    async fn remove_renumbers_ids() {
        let db = setup().await;
        CatalogService::add(&db, record("A", "pineland")).await.unwrap();
        CatalogService::add(&db, record("B", "newdale")).await.unwrap();
        CatalogService::add(&db, record("C", "pineland")).await.unwrap();

        CatalogService::remove(&db, "A").await.unwrap();

        let remaining = CatalogService::list(&db).await.unwrap();
        let ids: Vec<(String, i32)> = remaining
            .into_iter()
            .map(|r| (r.file_name, r.id))
            .collect();
        assert_eq!(ids, vec![("B".to_string(), 0), ("C".to_string(), 1)]);
    }

    #[tokio::test]
    async fn remove_missing_record_fails() {
        let db = setup().await;
        let err = CatalogService::remove(&db, "nope").await.unwrap_err();
        assert!(matches!(err, AppError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn rename_preserves_everything_but_the_key() {
        let db = setup().await;
        CatalogService::add(&db, record("A", "pineland")).await.unwrap();
        let original = CatalogService::add(&db, record("B", "newdale")).await.unwrap();

        let renamed = CatalogService::rename(&db, "B", "B2").await.unwrap();
        assert_eq!(renamed.file_name, "B2");
        assert_eq!(renamed.id, original.id);
        assert_eq!(renamed.length, original.length);
        assert_eq!(renamed.host, original.host);
        assert_eq!(renamed.description, original.description);
        assert_eq!(renamed.download_link, original.download_link);

        let err = CatalogService::get(&db, "B").await.unwrap_err();
        assert!(matches!(err, AppError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn rename_rejects_bad_keys() {
        let db = setup().await;
        CatalogService::add(&db, record("A", "pineland")).await.unwrap();
        CatalogService::add(&db, record("B", "newdale")).await.unwrap();

        let err = CatalogService::rename(&db, "missing", "X").await.unwrap_err();
        assert!(matches!(err, AppError::ResourceNotFound(_)));

        let err = CatalogService::rename(&db, "A", "B").await.unwrap_err();
        assert!(matches!(err, AppError::ResourceAlreadyExists(_)));
    }

    #[tokio::test]
    async fn edit_overwrites_supplied_fields_only() {
        let db = setup().await;
        CatalogService::add(&db, record("A", "pineland")).await.unwrap();

        let updated = CatalogService::edit(
            &db,
            "A",
            CatalogUpdate {
                description: Some("Morning service".to_string()),
                length: Some(61.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.description, "Morning service");
        assert_eq!(updated.length, 61.0);
        assert_eq!(updated.host, "pineland");
        assert_eq!(updated.id, 0);

        let err = CatalogService::edit(&db, "missing", CatalogUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn remove_all_by_host_keeps_ids_dense() {
        let db = setup().await;
        CatalogService::add(&db, record("A", "pineland")).await.unwrap();
        CatalogService::add(&db, record("B", "newdale")).await.unwrap();
        CatalogService::add(&db, record("C", "pineland")).await.unwrap();
        CatalogService::add(&db, record("D", "newdale")).await.unwrap();

        let removed = CatalogService::remove_all_by_host(&db, "pineland")
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let remaining = CatalogService::list(&db).await.unwrap();
        let ids: Vec<i32> = remaining.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert!(remaining.iter().all(|r| r.host == "newdale"));

        assert_eq!(CatalogService::count_by_host(&db, "pineland").await.unwrap(), 0);
        assert_eq!(CatalogService::count_by_host(&db, "newdale").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn download_link_round_trip() {
        let db = setup().await;
        CatalogService::add(&db, record("A", "pineland")).await.unwrap();

        let link = CatalogService::get_download_link(&db, "A").await.unwrap();
        assert_eq!(link.as_deref(), Some("https://archives.example.org/A"));
    }
}

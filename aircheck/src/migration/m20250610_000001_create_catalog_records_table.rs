use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CatalogRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CatalogRecords::FileName)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CatalogRecords::Date).string().not_null())
                    .col(
                        ColumnDef::new(CatalogRecords::Description)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CatalogRecords::DownloadLink).string().null())
                    .col(ColumnDef::new(CatalogRecords::ShareHash).string().null())
                    .col(ColumnDef::new(CatalogRecords::Length).double().not_null())
                    .col(ColumnDef::new(CatalogRecords::Host).string().not_null())
                    .col(ColumnDef::new(CatalogRecords::Id).integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_catalog_records_host")
                    .table(CatalogRecords::Table)
                    .col(CatalogRecords::Host)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_catalog_records_id")
                    .table(CatalogRecords::Table)
                    .col(CatalogRecords::Id)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CatalogRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CatalogRecords {
    Table,
    FileName,
    Date,
    Description,
    DownloadLink,
    ShareHash,
    Length,
    Host,
    Id,
}

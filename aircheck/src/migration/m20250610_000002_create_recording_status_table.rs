use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RecordingStatus::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecordingStatus::Host)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RecordingStatus::Link).string().not_null())
                    .col(ColumnDef::new(RecordingStatus::Length).string().not_null())
                    .col(
                        ColumnDef::new(RecordingStatus::Description)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecordingStatus::StartingTime)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecordingStatus::LastUpdated)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RecordingStatus::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RecordingStatus {
    Table,
    Host,
    Link,
    Length,
    Description,
    StartingTime,
    LastUpdated,
}

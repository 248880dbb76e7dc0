use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SearchCache::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SearchCache::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SearchCache::CacheKey)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(SearchCache::Query).string().not_null())
                    .col(ColumnDef::new(SearchCache::Filter).string().not_null())
                    .col(ColumnDef::new(SearchCache::ResultJson).text().not_null())
                    .col(ColumnDef::new(SearchCache::StoredAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DealsSnapshot::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DealsSnapshot::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DealsSnapshot::DealsJson).text().not_null())
                    .col(ColumnDef::new(DealsSnapshot::FetchedAt).string().not_null())
                    .col(ColumnDef::new(DealsSnapshot::ExpiresAt).string().null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DealsSnapshot::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SearchCache::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SearchCache {
    Table,
    Id,
    CacheKey,
    Query,
    Filter,
    ResultJson,
    StoredAt,
}

#[derive(DeriveIden)]
enum DealsSnapshot {
    Table,
    Id,
    DealsJson,
    FetchedAt,
    ExpiresAt,
}

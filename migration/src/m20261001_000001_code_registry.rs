use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 全局短码命名空间，主键即唯一约束
        manager
            .create_table(
                Table::create()
                    .table(CodeRegistry::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CodeRegistry::Code)
                            .string_len(30)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CodeRegistry::Kind).string_len(16).not_null())
                    .col(
                        ColumnDef::new(CodeRegistry::OwnerProfileId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CodeRegistry::ClaimedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TrackingCode::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrackingCode::ProfileId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TrackingCode::Code).string_len(30).not_null())
                    .col(
                        ColumnDef::new(TrackingCode::State)
                            .string_len(16)
                            .not_null()
                            .default("generated"),
                    )
                    .col(
                        ColumnDef::new(TrackingCode::ChangedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(TrackingCode::QrUrl).text().null())
                    .col(
                        ColumnDef::new(TrackingCode::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tracking_codes_code")
                    .table(TrackingCode::Table)
                    .col(TrackingCode::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ShortLink::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShortLink::Code)
                            .string_len(30)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ShortLink::CreatorProfileId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ShortLink::TargetUrl).text().not_null())
                    .col(ColumnDef::new(ShortLink::Title).string().null())
                    .col(
                        ColumnDef::new(ShortLink::Clicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ShortLink::UniqueClicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ShortLink::Conversions)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ShortLink::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ShortLink::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 按创建者列出短链接
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_short_links_creator")
                    .table(ShortLink::Table)
                    .col(ShortLink::CreatorProfileId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_short_links_creator").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ShortLink::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_tracking_codes_code").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TrackingCode::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(CodeRegistry::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CodeRegistry {
    #[sea_orm(iden = "code_registry")]
    Table,
    Code,
    Kind,
    OwnerProfileId,
    ClaimedAt,
}

#[derive(DeriveIden)]
enum TrackingCode {
    #[sea_orm(iden = "tracking_codes")]
    Table,
    ProfileId,
    Code,
    State,
    ChangedAt,
    QrUrl,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ShortLink {
    #[sea_orm(iden = "short_links")]
    Table,
    Code,
    CreatorProfileId,
    TargetUrl,
    Title,
    Clicks,
    UniqueClicks,
    Conversions,
    IsActive,
    CreatedAt,
}

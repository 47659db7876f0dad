use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VanitySlug::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VanitySlug::ProfileId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VanitySlug::Slug).string_len(30).not_null())
                    .col(
                        ColumnDef::new(VanitySlug::SlugKey)
                            .string_len(30)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VanitySlug::ChangedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(VanitySlug::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 大小写不敏感的唯一性由 slug_key（小写）保证
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_vanity_slugs_slug_key")
                    .table(VanitySlug::Table)
                    .col(VanitySlug::SlugKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_vanity_slugs_slug_key").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(VanitySlug::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VanitySlug {
    #[sea_orm(iden = "vanity_slugs")]
    Table,
    ProfileId,
    Slug,
    SlugKey,
    ChangedAt,
    CreatedAt,
}

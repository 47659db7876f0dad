use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profile::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Profile::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Profile::Role).string_len(32).not_null())
                    .col(ColumnDef::new(Profile::DisplayName).string().not_null())
                    .col(ColumnDef::new(Profile::Username).string().null())
                    .col(
                        ColumnDef::new(Profile::CreatedAt)
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
                    .name("idx_profiles_username")
                    .table(Profile::Table)
                    .col(Profile::Username)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Lead::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Lead::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Lead::Email).string().null())
                    .col(ColumnDef::new(Lead::Phone).string_len(32).null())
                    .col(ColumnDef::new(Lead::ContactKey).string().null())
                    .col(ColumnDef::new(Lead::FullName).string().null())
                    .col(ColumnDef::new(Lead::TrackingCode).string_len(30).null())
                    .col(ColumnDef::new(Lead::ReferrerUsername).string().null())
                    .col(ColumnDef::new(Lead::ReferrerType).string_len(32).null())
                    .col(
                        ColumnDef::new(Lead::AttributionMethod)
                            .string_len(16)
                            .not_null()
                            .default("DIRECT"),
                    )
                    .col(
                        ColumnDef::new(Lead::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Lead::UpdatedAt)
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
                    .name("idx_leads_email")
                    .table(Lead::Table)
                    .col(Lead::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 插入时的身份键（email 优先，否则 phone），仅电话的并发提交也会冲突
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_leads_contact_key")
                    .table(Lead::Table)
                    .col(Lead::ContactKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 电话匹配回退查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_leads_phone")
                    .table(Lead::Table)
                    .col(Lead::Phone)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_leads_phone").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_leads_contact_key").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_leads_email").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Lead::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_profiles_username").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profile::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Profile {
    #[sea_orm(iden = "profiles")]
    Table,
    Id,
    Role,
    DisplayName,
    Username,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Lead {
    #[sea_orm(iden = "leads")]
    Table,
    Id,
    Email,
    Phone,
    ContactKey,
    FullName,
    TrackingCode,
    ReferrerUsername,
    ReferrerType,
    AttributionMethod,
    CreatedAt,
    UpdatedAt,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 codes 表
        manager
            .create_table(
                Table::create()
                    .table(Codes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Codes::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Codes::OwnerId).string().not_null())
                    .col(
                        ColumnDef::new(Codes::Token)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Codes::ContentType).string_len(32).not_null())
                    .col(ColumnDef::new(Codes::Content).text().not_null())
                    .col(ColumnDef::new(Codes::DestinationUrl).text().null())
                    .col(ColumnDef::new(Codes::PasswordHash).string().null())
                    .col(
                        ColumnDef::new(Codes::ActiveFrom)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Codes::ActiveUntil)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Codes::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Codes::LandingPage)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Codes::ScanCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Codes::Archived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Codes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 按账户列出 code
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_codes_owner")
                    .table(Codes::Table)
                    .col(Codes::OwnerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_codes_owner").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Codes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Codes {
    Table,
    Id,
    OwnerId,
    Token,
    ContentType,
    Content,
    DestinationUrl,
    PasswordHash,
    ActiveFrom,
    ActiveUntil,
    ExpiresAt,
    LandingPage,
    ScanCount,
    Archived,
    CreatedAt,
}

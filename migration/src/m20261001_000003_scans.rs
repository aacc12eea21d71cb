//! 扫码事件表
//!
//! 仅追加写入；设备/浏览器/地理字段由上游计算后传入

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Scans::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Scans::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Scans::CodeId).string_len(36).not_null())
                    .col(
                        ColumnDef::new(Scans::ScannedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Scans::DeviceType).string_len(32).null())
                    .col(ColumnDef::new(Scans::Browser).string_len(64).null())
                    .col(ColumnDef::new(Scans::Os).string_len(64).null())
                    .col(ColumnDef::new(Scans::Country).string_len(2).null())
                    .col(ColumnDef::new(Scans::City).string_len(100).null())
                    .col(ColumnDef::new(Scans::VariantId).string_len(36).null())
                    .col(ColumnDef::new(Scans::VisitorHash).string_len(128).null())
                    .to_owned(),
            )
            .await?;

        // 单个 code 的时间序列查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_scans_code_time")
                    .table(Scans::Table)
                    .col(Scans::CodeId)
                    .col(Scans::ScannedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_scans_variant")
                    .table(Scans::Table)
                    .col(Scans::VariantId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_scans_variant").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_scans_code_time").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Scans::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Scans {
    Table,
    Id,
    CodeId,
    ScannedAt,
    DeviceType,
    Browser,
    Os,
    Country,
    City,
    VariantId,
    VisitorHash,
}

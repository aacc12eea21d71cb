//! 实验相关表
//!
//! - experiments: 绑定到单个 code 的 A/B 实验
//! - variants: 实验下的候选目标（带权重）
//! - assignments: 访客 → variant 的粘性分配，(experiment_id, visitor_hash) 唯一

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Experiments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Experiments::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Experiments::CodeId).string_len(36).not_null())
                    .col(
                        ColumnDef::new(Experiments::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(Experiments::TargetConfidence)
                            .double()
                            .not_null()
                            .default(0.95),
                    )
                    .col(
                        ColumnDef::new(Experiments::WinnerVariantId)
                            .string_len(36)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Experiments::StartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Experiments::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Experiments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 每次扫码都会按 (code_id, status) 查 running 实验
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_experiments_code_status")
                    .table(Experiments::Table)
                    .col(Experiments::CodeId)
                    .col(Experiments::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Variants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Variants::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Variants::ExperimentId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Variants::Label).string().not_null())
                    .col(ColumnDef::new(Variants::Slug).string_len(64).not_null())
                    .col(ColumnDef::new(Variants::DestinationUrl).text().not_null())
                    .col(
                        ColumnDef::new(Variants::Weight)
                            .integer()
                            .not_null()
                            .default(50),
                    )
                    .col(
                        ColumnDef::new(Variants::ScanCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_variants_experiment_slug")
                    .table(Variants::Table)
                    .col(Variants::ExperimentId)
                    .col(Variants::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Assignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assignments::ExperimentId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Assignments::VisitorHash)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Assignments::VariantId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Assignments::AssignedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(Assignments::ExperimentId)
                            .col(Assignments::VisitorHash),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Assignments::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_variants_experiment_slug").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Variants::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_experiments_code_status").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Experiments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Experiments {
    Table,
    Id,
    CodeId,
    Status,
    TargetConfidence,
    WinnerVariantId,
    StartedAt,
    CompletedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Variants {
    Table,
    Id,
    ExperimentId,
    Label,
    Slug,
    DestinationUrl,
    Weight,
    ScanCount,
}

#[derive(DeriveIden)]
enum Assignments {
    Table,
    ExperimentId,
    VisitorHash,
    VariantId,
    AssignedAt,
}

//! Mutation operations for SeaOrmStorage
//!
//! This module contains all write database operations.

use chrono::Utc;
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, EntityTrait, ExprTrait, QueryFilter, QuerySelect, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::{debug, info};

use super::SeaOrmStorage;
use super::converters::{code_to_active_model, experiment_to_active_model, variant_to_active_model};
use super::retry;
use crate::errors::{QrlinkerError, Result};
use crate::storage::models::{Assignment, Code, Experiment, ExperimentStatus, NewScan, Variant};

use migration::entities::{assignment, code, experiment, scan, variant};

/// `start_experiment` 的事务结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// 同一 code 上已有其他 running 实验
    AlreadyRunning(String),
    /// 实验已不处于 draft / paused
    NotStartable,
}

impl SeaOrmStorage {
    pub async fn insert_code(&self, c: &Code) -> Result<()> {
        code::Entity::insert(code_to_active_model(c, true))
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| QrlinkerError::database_operation(format!("创建 code 失败: {}", e)))?;
        info!("Code created: {}", c.token);
        Ok(())
    }

    /// 更新 code 元数据（不修改计数）
    pub async fn update_code(&self, c: &Code) -> Result<()> {
        let result = code::Entity::update_many()
            .set(code_to_active_model(c, false))
            .filter(code::Column::Id.eq(&c.id))
            .exec(&self.db)
            .await
            .map_err(|e| QrlinkerError::database_operation(format!("更新 code 失败: {}", e)))?;

        if result.rows_affected == 0 {
            return Err(QrlinkerError::not_found(format!("code 不存在: {}", c.id)));
        }
        Ok(())
    }

    pub async fn insert_experiment(&self, exp: &Experiment) -> Result<()> {
        experiment::Entity::insert(experiment_to_active_model(exp))
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| QrlinkerError::database_operation(format!("创建实验失败: {}", e)))?;
        Ok(())
    }

    pub async fn update_experiment(&self, exp: &Experiment) -> Result<()> {
        let db = &self.db;
        let am = experiment_to_active_model(exp);

        let result = retry::with_retry(
            &format!("update_experiment({})", exp.id),
            self.retry_config,
            || {
                experiment::Entity::update_many()
                    .set(am.clone())
                    .filter(experiment::Column::Id.eq(&exp.id))
                    .exec(db)
            },
        )
        .await
        .map_err(|e| QrlinkerError::database_operation(format!("更新实验失败: {}", e)))?;

        if result.rows_affected == 0 {
            return Err(QrlinkerError::not_found(format!("实验不存在: {}", exp.id)));
        }
        debug!("Experiment {} -> {}", exp.id, exp.status);
        Ok(())
    }

    /// draft / paused → running
    ///
    /// 锁住 code 行后检查冲突并条件更新状态，同一事务内完成。
    /// `exp.started_at` 已有值时保持不变
    pub async fn start_experiment(&self, exp: &Experiment) -> Result<StartOutcome> {
        let db = &self.db;
        let started_at = exp.started_at.unwrap_or_else(Utc::now);

        let outcome = retry::with_retry(
            &format!("start_experiment({})", exp.id),
            self.retry_config,
            || async move {
                let txn = db.begin().await?;

                // SQLite 不支持行锁，由数据库写锁串行化
                code::Entity::find_by_id(exp.code_id.clone())
                    .lock_exclusive()
                    .one(&txn)
                    .await?;

                let other = experiment::Entity::find()
                    .filter(experiment::Column::CodeId.eq(&exp.code_id))
                    .filter(experiment::Column::Status.eq(ExperimentStatus::Running.as_ref()))
                    .filter(experiment::Column::Id.ne(&exp.id))
                    .one(&txn)
                    .await?;
                if let Some(other) = other {
                    txn.rollback().await?;
                    return Ok(StartOutcome::AlreadyRunning(other.id));
                }

                let startable = [
                    ExperimentStatus::Draft.as_ref(),
                    ExperimentStatus::Paused.as_ref(),
                ];
                let result = experiment::Entity::update_many()
                    .col_expr(
                        experiment::Column::Status,
                        Expr::value(ExperimentStatus::Running.as_ref()),
                    )
                    .col_expr(
                        experiment::Column::StartedAt,
                        Expr::value(started_at),
                    )
                    .filter(experiment::Column::Id.eq(&exp.id))
                    .filter(experiment::Column::Status.is_in(startable))
                    .exec(&txn)
                    .await?;
                if result.rows_affected == 0 {
                    txn.rollback().await?;
                    return Ok(StartOutcome::NotStartable);
                }

                txn.commit().await?;
                Ok(StartOutcome::Started)
            },
        )
        .await
        .map_err(|e| QrlinkerError::database_operation(format!("启动实验失败: {}", e)))?;

        debug!("Experiment {} start: {:?}", exp.id, outcome);
        Ok(outcome)
    }

    pub async fn insert_variant(&self, v: &Variant) -> Result<()> {
        variant::Entity::insert(variant_to_active_model(v))
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| {
                // (experiment_id, slug) 唯一
                if e.to_string().to_lowercase().contains("unique") {
                    QrlinkerError::conflict(format!(
                        "variant slug '{}' 已存在于实验 {}",
                        v.slug, v.experiment_id
                    ))
                } else {
                    QrlinkerError::database_operation(format!("创建 variant 失败: {}", e))
                }
            })?;
        Ok(())
    }

    /// 删除 variant
    ///
    /// 指向它的分配保留不动，下次扫码时被识别为过期并重新分配
    pub async fn delete_variant(&self, variant_id: &str) -> Result<()> {
        let db = &self.db;
        let id = variant_id.to_string();

        let result = retry::with_retry(
            &format!("delete_variant({})", variant_id),
            self.retry_config,
            || variant::Entity::delete_by_id(id.clone()).exec(db),
        )
        .await
        .map_err(|e| QrlinkerError::database_operation(format!("删除 variant 失败: {}", e)))?;

        if result.rows_affected == 0 {
            return Err(QrlinkerError::not_found(format!(
                "variant 不存在: {}",
                variant_id
            )));
        }

        info!("Variant deleted: {}", variant_id);
        Ok(())
    }

    /// 插入分配，已存在则不做任何事
    ///
    /// 并发的首次扫码只有一个能写入，其余的保持先到者的结果
    pub async fn insert_assignment(&self, a: &Assignment) -> Result<bool> {
        let db = &self.db;
        let am = assignment::ActiveModel {
            experiment_id: Set(a.experiment_id.clone()),
            visitor_hash: Set(a.visitor_hash.clone()),
            variant_id: Set(a.variant_id.clone()),
            assigned_at: Set(a.assigned_at),
        };

        let inserted = retry::with_retry("insert_assignment", self.retry_config, || {
            assignment::Entity::insert(am.clone())
                .on_conflict(
                    OnConflict::columns([
                        assignment::Column::ExperimentId,
                        assignment::Column::VisitorHash,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(db)
        })
        .await
        .map_err(|e| QrlinkerError::database_operation(format!("写入分配失败: {}", e)))?;

        Ok(inserted > 0)
    }

    /// 把仍指向 `stale_variant_id` 的分配改写为新 variant
    pub async fn reassign(&self, a: &Assignment, stale_variant_id: &str) -> Result<bool> {
        let db = &self.db;

        let result = retry::with_retry("reassign", self.retry_config, || {
            assignment::Entity::update_many()
                .col_expr(assignment::Column::VariantId, Expr::value(a.variant_id.clone()))
                .col_expr(assignment::Column::AssignedAt, Expr::value(a.assigned_at))
                .filter(assignment::Column::ExperimentId.eq(&a.experiment_id))
                .filter(assignment::Column::VisitorHash.eq(&a.visitor_hash))
                .filter(assignment::Column::VariantId.eq(stale_variant_id))
                .exec(db)
        })
        .await
        .map_err(|e| QrlinkerError::database_operation(format!("改写分配失败: {}", e)))?;

        Ok(result.rows_affected > 0)
    }

    /// 写入扫码事件并递增计数，三者在同一事务中
    pub async fn insert_scan(&self, s: &NewScan) -> Result<()> {
        let db = &self.db;

        retry::with_retry(
            &format!("record_scan({})", s.code_id),
            self.retry_config,
            || async move {
                let txn = db.begin().await?;

                scan::Entity::insert(scan::ActiveModel {
                    id: NotSet,
                    code_id: Set(s.code_id.clone()),
                    scanned_at: Set(s.scanned_at),
                    device_type: Set(s.context.device_type.clone()),
                    browser: Set(s.context.browser.clone()),
                    os: Set(s.context.os.clone()),
                    country: Set(s.context.country.clone()),
                    city: Set(s.context.city.clone()),
                    variant_id: Set(s.variant_id.clone()),
                    visitor_hash: Set(s.visitor_hash.clone()),
                })
                .exec_without_returning(&txn)
                .await?;

                // 原子递增，避免读改写丢失计数
                code::Entity::update_many()
                    .col_expr(code::Column::ScanCount, Expr::col(code::Column::ScanCount).add(1))
                    .filter(code::Column::Id.eq(&s.code_id))
                    .exec(&txn)
                    .await?;

                if let Some(variant_id) = &s.variant_id {
                    variant::Entity::update_many()
                        .col_expr(
                            variant::Column::ScanCount,
                            Expr::col(variant::Column::ScanCount).add(1),
                        )
                        .filter(variant::Column::Id.eq(variant_id))
                        .exec(&txn)
                        .await?;
                }

                txn.commit().await
            },
        )
        .await
        .map_err(|e| QrlinkerError::database_operation(format!("记录扫码失败: {}", e)))?;

        debug!(
            "Scan recorded for code {} (variant: {:?})",
            s.code_id, s.variant_id
        );
        Ok(())
    }
}

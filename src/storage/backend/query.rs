//! Query operations for SeaOrmStorage
//!
//! This module contains all read-only database operations.

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use tracing::debug;

use super::converters::{
    model_to_assignment, model_to_code, model_to_experiment, model_to_variant,
};
use super::{SeaOrmStorage, retry};
use crate::errors::{QrlinkerError, Result};
use crate::storage::models::{
    Assignment, Code, Experiment, ExperimentStatus, RunningExperiment, Variant,
};

use migration::entities::{assignment, code, experiment, scan, variant};

impl SeaOrmStorage {
    pub async fn find_code(&self, token: &str) -> Result<Option<Code>> {
        let db = &self.db;

        let result = retry::with_retry(&format!("find_code({})", token), self.retry_config, || {
            code::Entity::find()
                .filter(code::Column::Token.eq(token))
                .one(db)
        })
        .await
        .map_err(|e| QrlinkerError::database_operation(format!("查询 code 失败: {}", e)))?;

        Ok(result.map(model_to_code))
    }

    pub async fn get_code(&self, id: &str) -> Result<Option<Code>> {
        let model = code::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(|e| QrlinkerError::database_operation(format!("查询 code 失败: {}", e)))?;
        Ok(model.map(model_to_code))
    }

    pub async fn get_experiment(&self, id: &str) -> Result<Option<Experiment>> {
        let model = experiment::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(|e| QrlinkerError::database_operation(format!("查询实验失败: {}", e)))?;
        Ok(model.map(model_to_experiment))
    }

    /// 实验下全部 variant，按 slug 升序（第一个即对照组）
    pub async fn list_variants(&self, experiment_id: &str) -> Result<Vec<Variant>> {
        let db = &self.db;

        let models = retry::with_retry(
            &format!("list_variants({})", experiment_id),
            self.retry_config,
            || {
                variant::Entity::find()
                    .filter(variant::Column::ExperimentId.eq(experiment_id))
                    .order_by_asc(variant::Column::Slug)
                    .all(db)
            },
        )
        .await
        .map_err(|e| QrlinkerError::database_operation(format!("查询 variant 失败: {}", e)))?;

        Ok(models.into_iter().map(model_to_variant).collect())
    }

    /// code 上处于 running 的实验
    pub async fn running_experiments(&self, code_id: &str) -> Result<Vec<Experiment>> {
        let db = &self.db;

        let models = retry::with_retry(
            &format!("running_experiments({})", code_id),
            self.retry_config,
            || {
                experiment::Entity::find()
                    .filter(experiment::Column::CodeId.eq(code_id))
                    .filter(experiment::Column::Status.eq(ExperimentStatus::Running.as_ref()))
                    .order_by_asc(experiment::Column::StartedAt)
                    .all(db)
            },
        )
        .await
        .map_err(|e| QrlinkerError::database_operation(format!("查询实验失败: {}", e)))?;

        Ok(models.into_iter().map(model_to_experiment).collect())
    }

    pub async fn find_running(&self, code_id: &str) -> Result<Option<RunningExperiment>> {
        let mut running = self.running_experiments(code_id).await?;
        if running.len() > 1 {
            // 不变量被破坏：取最早启动的一个，保证分流结果稳定
            tracing::error!(
                "Code {} has {} running experiments, using the earliest",
                code_id,
                running.len()
            );
        }
        if running.is_empty() {
            return Ok(None);
        }

        let experiment = running.swap_remove(0);
        let variants = self.list_variants(&experiment.id).await?;
        debug!(
            "Running experiment {} for code {} with {} variants",
            experiment.id,
            code_id,
            variants.len()
        );
        Ok(Some(RunningExperiment {
            experiment,
            variants,
        }))
    }

    pub async fn get_assignment(
        &self,
        experiment_id: &str,
        visitor_hash: &str,
    ) -> Result<Option<Assignment>> {
        let db = &self.db;
        let key = (experiment_id.to_string(), visitor_hash.to_string());

        let model = retry::with_retry("get_assignment", self.retry_config, || {
            assignment::Entity::find_by_id(key.clone()).one(db)
        })
        .await
        .map_err(|e| QrlinkerError::database_operation(format!("查询分配失败: {}", e)))?;

        Ok(model.map(model_to_assignment))
    }

    pub async fn count_scans(&self, code_id: &str) -> Result<u64> {
        scan::Entity::find()
            .filter(scan::Column::CodeId.eq(code_id))
            .count(&self.db)
            .await
            .map_err(|e| QrlinkerError::database_operation(format!("统计扫码失败: {}", e)))
    }

    pub async fn count_variant_scans(&self, variant_id: &str) -> Result<u64> {
        scan::Entity::find()
            .filter(scan::Column::VariantId.eq(variant_id))
            .count(&self.db)
            .await
            .map_err(|e| QrlinkerError::database_operation(format!("统计扫码失败: {}", e)))
    }
}

//! Experiment management service
//!
//! Lifecycle transitions and result reporting for A/B experiments.
//! Selection itself happens in the resolver; this service only manages state.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::config::{ExperimentConfig, get_config};
use crate::errors::{QrlinkerError, Result};
use crate::experiment::{self, SignificanceResult};
use crate::storage::{Experiment, ExperimentStatus, SeaOrmStorage, StartOutcome, Variant};

/// 单个 variant 的统计
#[derive(Debug, Clone, Serialize)]
pub struct VariantResult {
    pub id: String,
    pub label: String,
    pub slug: String,
    pub destination_url: String,
    pub weight: u32,
    pub scans: u64,
    /// 占实验总扫码的比例
    pub share: f64,
    pub is_control: bool,
    /// 与对照组比较，对照组自身为 None
    pub significance: Option<SignificanceResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentResults {
    pub experiment: Experiment,
    pub total_scans: u64,
    pub control_variant_id: Option<String>,
    pub variants: Vec<VariantResult>,
    pub suggested_winner: Option<String>,
}

/// 新建 variant 的参数
#[derive(Debug, Clone)]
pub struct NewVariant {
    pub label: String,
    pub slug: String,
    pub destination_url: String,
    pub weight: u32,
}

pub struct ExperimentService {
    storage: Arc<SeaOrmStorage>,
    limits: ExperimentConfig,
}

impl ExperimentService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self::with_limits(storage, get_config().experiment.clone())
    }

    /// 使用指定的显著性门槛（默认置信度、最小样本、扫码估计上限）
    pub fn with_limits(storage: Arc<SeaOrmStorage>, limits: ExperimentConfig) -> Self {
        Self { storage, limits }
    }

    fn winner(&self, variants: &[Variant], target_confidence: f64) -> Option<String> {
        experiment::determine_winner_with_limits(
            variants,
            target_confidence,
            self.limits.min_sample,
            self.limits.max_scans_needed,
        )
    }

    async fn load(&self, id: &str) -> Result<Experiment> {
        self.storage
            .get_experiment(id)
            .await?
            .ok_or_else(|| QrlinkerError::not_found(format!("实验不存在: {}", id)))
    }

    /// 在 code 上创建 draft 实验
    pub async fn create(&self, code_id: &str, target_confidence: Option<f64>) -> Result<Experiment> {
        if self.storage.get_code(code_id).await?.is_none() {
            return Err(QrlinkerError::not_found(format!("code 不存在: {}", code_id)));
        }

        let target = target_confidence.unwrap_or(self.limits.default_target_confidence);
        if !(target > 0.0 && target < 1.0) {
            return Err(QrlinkerError::validation(format!(
                "target_confidence must be in (0, 1), got {}",
                target
            )));
        }

        let exp = Experiment::new(code_id, target);
        self.storage.insert_experiment(&exp).await?;
        info!("ExperimentService: created {} on code {}", exp.id, code_id);
        Ok(exp)
    }

    pub async fn add_variant(&self, experiment_id: &str, req: NewVariant) -> Result<Variant> {
        let exp = self.load(experiment_id).await?;
        if exp.status == ExperimentStatus::Completed {
            return Err(QrlinkerError::validation(format!(
                "experiment {} is completed",
                experiment_id
            )));
        }

        let slug = req.slug.trim();
        if slug.is_empty() {
            return Err(QrlinkerError::validation("variant slug must not be empty"));
        }
        validate_weight(slug, req.weight)?;
        url::Url::parse(&req.destination_url).map_err(|e| {
            QrlinkerError::validation(format!(
                "invalid destination '{}': {}",
                req.destination_url, e
            ))
        })?;

        let mut variant = Variant::new(experiment_id, slug, &req.destination_url, req.weight);
        if !req.label.trim().is_empty() {
            variant.label = req.label.trim().to_string();
        }

        self.storage.insert_variant(&variant).await?;
        Ok(variant)
    }

    /// draft / paused → running
    pub async fn start(&self, id: &str) -> Result<Experiment> {
        let mut exp = self.load(id).await?;
        if !matches!(exp.status, ExperimentStatus::Draft | ExperimentStatus::Paused) {
            return Err(QrlinkerError::validation(format!(
                "cannot start experiment in status {}",
                exp.status
            )));
        }

        let variants = self.storage.list_variants(id).await?;
        if variants.is_empty() {
            return Err(QrlinkerError::no_variants_configured(format!(
                "experiment {} has no variants",
                id
            )));
        }
        for v in &variants {
            validate_weight(&v.slug, v.weight)?;
        }

        // 每个 code 同时最多一个 running 实验，检查与状态写入在同一事务中
        exp.started_at.get_or_insert_with(Utc::now);
        match self.storage.start_experiment(&exp).await? {
            StartOutcome::Started => exp.status = ExperimentStatus::Running,
            StartOutcome::AlreadyRunning(other) => {
                return Err(QrlinkerError::conflict(format!(
                    "code {} already has running experiment {}",
                    exp.code_id, other
                )));
            }
            StartOutcome::NotStartable => {
                return Err(QrlinkerError::conflict(format!(
                    "experiment {} changed status concurrently",
                    id
                )));
            }
        }

        info!("ExperimentService: started {}", id);
        Ok(exp)
    }

    /// running → paused
    pub async fn pause(&self, id: &str) -> Result<Experiment> {
        let mut exp = self.load(id).await?;
        if exp.status != ExperimentStatus::Running {
            return Err(QrlinkerError::validation(format!(
                "cannot pause experiment in status {}",
                exp.status
            )));
        }

        exp.status = ExperimentStatus::Paused;
        self.storage.update_experiment(&exp).await?;

        info!("ExperimentService: paused {}", id);
        Ok(exp)
    }

    pub async fn results(&self, id: &str) -> Result<ExperimentResults> {
        let exp = self.load(id).await?;
        let variants = self.storage.list_variants(id).await?;
        let limits = &self.limits;

        let total_scans: u64 = variants.iter().map(|v| v.scan_count).sum();
        let control = experiment::control(&variants);
        let control_id = control.map(|c| c.id.clone());

        let results = variants
            .iter()
            .map(|v| {
                let is_control = control_id.as_deref() == Some(v.id.as_str());
                let significance = match control {
                    Some(c) if !is_control => Some(experiment::evaluate_with_limits(
                        c.scan_count,
                        v.scan_count,
                        exp.target_confidence,
                        limits.min_sample,
                        limits.max_scans_needed,
                    )),
                    _ => None,
                };
                VariantResult {
                    id: v.id.clone(),
                    label: v.label.clone(),
                    slug: v.slug.clone(),
                    destination_url: v.destination_url.clone(),
                    weight: v.weight,
                    scans: v.scan_count,
                    share: if total_scans > 0 {
                        v.scan_count as f64 / total_scans as f64
                    } else {
                        0.0
                    },
                    is_control,
                    significance,
                }
            })
            .collect();

        let suggested_winner = self.winner(&variants, exp.target_confidence);

        Ok(ExperimentResults {
            experiment: exp,
            total_scans,
            control_variant_id: control_id,
            variants: results,
            suggested_winner,
        })
    }

    /// 结束实验并记录胜者
    ///
    /// `force_winner` 为空时使用统计判定；没有胜者则拒绝结束
    pub async fn conclude(&self, id: &str, force_winner: Option<&str>) -> Result<Experiment> {
        let mut exp = self.load(id).await?;
        if exp.status == ExperimentStatus::Completed {
            return Err(QrlinkerError::validation(format!(
                "experiment {} is already completed",
                id
            )));
        }

        let variants = self.storage.list_variants(id).await?;
        let winner = match force_winner {
            Some(forced) => {
                if !variants.iter().any(|v| v.id == forced) {
                    return Err(QrlinkerError::validation(format!(
                        "variant {} does not belong to experiment {}",
                        forced, id
                    )));
                }
                forced.to_string()
            }
            None => self.winner(&variants, exp.target_confidence).ok_or_else(|| {
                QrlinkerError::validation(format!(
                    "experiment {} has no significant winner yet",
                    id
                ))
            })?,
        };

        exp.status = ExperimentStatus::Completed;
        exp.winner_variant_id = Some(winner.clone());
        exp.completed_at = Some(Utc::now());
        self.storage.update_experiment(&exp).await?;

        info!("ExperimentService: concluded {} with winner {}", id, winner);
        Ok(exp)
    }

    /// 删除 variant，相关分配在下次扫码时重新分配
    pub async fn delete_variant(&self, variant_id: &str) -> Result<()> {
        self.storage.delete_variant(variant_id).await
    }
}

fn validate_weight(slug: &str, weight: u32) -> Result<()> {
    if !(1..=100).contains(&weight) {
        return Err(QrlinkerError::validation(format!(
            "variant '{}' weight must be between 1 and 100, got {}",
            slug, weight
        )));
    }
    Ok(())
}

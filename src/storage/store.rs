//! 解析器使用的数据访问接口
//!
//! 重定向解析只依赖这几个操作，生产环境由 `SeaOrmStorage` 实现，
//! 测试中可以用内存实现替换。

use async_trait::async_trait;

use crate::errors::Result;
use crate::storage::models::{Assignment, Code, NewScan, RunningExperiment};

#[async_trait]
pub trait ResolverStore: Send + Sync {
    /// 按公开 token 查找 code（不过滤归档状态）
    async fn find_code_by_token(&self, token: &str) -> Result<Option<Code>>;

    /// 查找 code 当前 running 的实验及其 variant
    async fn find_running_experiment(&self, code_id: &str) -> Result<Option<RunningExperiment>>;

    async fn find_assignment(
        &self,
        experiment_id: &str,
        visitor_hash: &str,
    ) -> Result<Option<Assignment>>;

    /// 写入分配
    ///
    /// - `stale_variant_id` 为 `None`：插入，(experiment, visitor) 冲突时什么也不做
    /// - 为 `Some(id)`：仅当现有分配仍指向已删除的 `id` 时改写为新 variant
    async fn save_assignment(
        &self,
        assignment: &Assignment,
        stale_variant_id: Option<&str>,
    ) -> Result<()>;

    /// 在同一事务内写入扫码事件并递增 code / variant 计数
    async fn record_scan(&self, scan: &NewScan) -> Result<()>;
}

use async_trait::async_trait;
use tracing::debug;

use super::SeaOrmStorage;
use crate::errors::Result;
use crate::storage::models::{Assignment, Code, NewScan, RunningExperiment};
use crate::storage::store::ResolverStore;

#[async_trait]
impl ResolverStore for SeaOrmStorage {
    async fn find_code_by_token(&self, token: &str) -> Result<Option<Code>> {
        self.find_code(token).await
    }

    async fn find_running_experiment(&self, code_id: &str) -> Result<Option<RunningExperiment>> {
        self.find_running(code_id).await
    }

    async fn find_assignment(
        &self,
        experiment_id: &str,
        visitor_hash: &str,
    ) -> Result<Option<Assignment>> {
        self.get_assignment(experiment_id, visitor_hash).await
    }

    async fn save_assignment(
        &self,
        assignment: &Assignment,
        stale_variant_id: Option<&str>,
    ) -> Result<()> {
        let written = match stale_variant_id {
            None => self.insert_assignment(assignment).await?,
            Some(stale) => self.reassign(assignment, stale).await?,
        };
        if !written {
            // 并发扫码已先写入，保留先到者
            debug!(
                "Assignment for visitor {} in experiment {} already settled",
                assignment.visitor_hash, assignment.experiment_id
            );
        }
        Ok(())
    }

    async fn record_scan(&self, scan: &NewScan) -> Result<()> {
        self.insert_scan(scan).await
    }
}

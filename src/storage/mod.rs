use std::sync::Arc;

use crate::errors::Result;

pub mod backend;
pub mod models;
pub mod store;

pub use backend::{SeaOrmStorage, StartOutcome};
pub use models::{
    Assignment, Code, ContentPayload, Experiment, ExperimentStatus, NewScan, RunningExperiment,
    ScanContext, Variant, WifiEncryption,
};
pub use store::ResolverStore;

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create() -> Result<Arc<SeaOrmStorage>> {
        let config = crate::config::get_config();
        let database_url = &config.database.database_url;

        // 从 URL 自动推断数据库类型
        let backend_type = backend::infer_backend_from_url(database_url)?;

        let storage = SeaOrmStorage::new(database_url, &backend_type).await?;
        Ok(Arc::new(storage))
    }
}

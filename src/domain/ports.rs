use crate::domain::model::{ImportBatch, NewLoan};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn api_key(&self) -> &str;
    fn table(&self) -> &str;
}

pub trait SessionStore: Send + Sync {
    fn is_logged_in(&self) -> bool;
    fn log_in(&self) -> Result<()>;
    fn log_out(&self) -> Result<()>;
}

#[async_trait]
pub trait ImportPipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<NewLoan>>;
    async fn transform(&self, rows: Vec<NewLoan>) -> Result<ImportBatch>;
    async fn load(&self, batch: ImportBatch) -> Result<usize>;
}

use crate::client::query::QueryBuilder;
use crate::client::TableClient;
use crate::domain::model::{ImportBatch, NewLoan};
use crate::domain::ports::ImportPipeline;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// 把 CSV 檔整批匯入 loanable 資料表
pub struct CsvImportPipeline {
    client: TableClient,
    csv_path: PathBuf,
    truncate: bool,
}

impl CsvImportPipeline {
    pub fn new(client: TableClient, csv_path: PathBuf, truncate: bool) -> Self {
        Self {
            client,
            csv_path,
            truncate,
        }
    }
}

#[async_trait]
impl ImportPipeline for CsvImportPipeline {
    async fn extract(&self) -> Result<Vec<NewLoan>> {
        tracing::debug!("Reading CSV file: {}", self.csv_path.display());

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.csv_path)?;

        let mut rows = Vec::new();
        for record in reader.deserialize::<NewLoan>() {
            rows.push(record?);
        }
        Ok(rows)
    }

    async fn transform(&self, rows: Vec<NewLoan>) -> Result<ImportBatch> {
        let total = rows.len();
        let records: Vec<NewLoan> = rows
            .into_iter()
            .filter(|row| !row.borrower_name.trim().is_empty())
            .collect();
        let skipped = total - records.len();

        if skipped > 0 {
            tracing::warn!("⚠️ Skipped {} rows without a borrower name", skipped);
        }
        Ok(ImportBatch { records, skipped })
    }

    async fn load(&self, batch: ImportBatch) -> Result<usize> {
        // 先做連線測試，失敗就整個中止
        if let Err(e) = self
            .client
            .select_rows(QueryBuilder::select("AccountNO").limit(1))
            .await
        {
            tracing::error!("❌ Connection test failed: {}", e);
            return Err(e);
        }
        tracing::info!("✅ Connection successful");

        if self.truncate {
            // 清不掉舊資料只記警告，照樣往下插入
            match self.client.delete(QueryBuilder::default().neq("id", 0)).await {
                Ok(()) => tracing::info!("🗑️ Cleared existing data"),
                Err(e) => tracing::warn!("⚠️ Could not clear existing data: {}", e),
            }
        }

        if batch.records.is_empty() {
            tracing::warn!("⚠️ Nothing to insert");
            return Ok(0);
        }

        let stored = self.client.insert(&batch.records).await?;
        if let Some(first) = stored.first() {
            tracing::debug!("📋 Sample record: {:?}", first);
        }
        Ok(stored.len())
    }
}

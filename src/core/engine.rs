use crate::domain::ports::ImportPipeline;
use crate::utils::error::Result;

pub struct ImportEngine<P: ImportPipeline> {
    pipeline: P,
}

impl<P: ImportPipeline> ImportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<usize> {
        tracing::info!("🔄 Starting database population...");

        let rows = self.pipeline.extract().await?;
        tracing::info!("📊 Found {} records in CSV", rows.len());

        let batch = self.pipeline.transform(rows).await?;
        tracing::info!("Keeping {} records after transform", batch.records.len());

        let inserted = self.pipeline.load(batch).await?;
        tracing::info!("✅ Successfully inserted {} records", inserted);

        Ok(inserted)
    }
}

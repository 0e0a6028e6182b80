pub mod engine;
pub mod import;
pub mod loans;

pub use crate::domain::model::{ImportBatch, LoadSource};
pub use crate::domain::ports::{ConfigProvider, ImportPipeline, SessionStore};
pub use crate::utils::error::Result;

pub mod client;
pub mod config;
pub mod core;
pub mod domain;
pub mod session;
pub mod utils;

pub use client::query::{OrFilter, QueryBuilder};
pub use client::TableClient;
pub use config::{Overrides, Settings};
pub use core::{engine::ImportEngine, import::CsvImportPipeline, loans::LoanService};
pub use domain::model::{Loan, LoanStatus, LoanUpdate, LoadSource, NewLoan, SearchFilters};
pub use session::FileSession;
pub use utils::error::{LoanError, Result};

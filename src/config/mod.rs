pub mod toml_config;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::{LoanError, Result};
use crate::utils::validation::Validate;
use std::path::PathBuf;
use self::toml_config::TomlConfig;

pub const DEFAULT_TABLE: &str = "loanable";
pub const DEFAULT_SESSION_FILE: &str = ".loanbook_session";

/// 命令列上可覆蓋配置檔的欄位
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub table: Option<String>,
    pub session_file: Option<PathBuf>,
}

/// 配置檔與命令列合併後的最終設定，命令列優先
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub api_key: String,
    pub table: String,
    pub session_file: PathBuf,
}

impl Settings {
    pub fn resolve(file: Option<TomlConfig>, overrides: Overrides) -> Result<Self> {
        let backend = file.as_ref().map(|f| &f.backend);

        let base_url = overrides
            .base_url
            .or_else(|| backend.map(|b| b.url.clone()))
            .ok_or_else(|| LoanError::MissingConfigError {
                field: "backend.url".to_string(),
            })?;

        let api_key = overrides
            .api_key
            .or_else(|| backend.map(|b| b.api_key.clone()))
            .ok_or_else(|| LoanError::MissingConfigError {
                field: "backend.api_key".to_string(),
            })?;

        let table = overrides
            .table
            .or_else(|| backend.and_then(|b| b.table.clone()))
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());

        let session_file = overrides
            .session_file
            .or_else(|| {
                file.as_ref()
                    .and_then(|f| f.session.as_ref())
                    .and_then(|s| s.file.clone())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE));

        Ok(Self {
            base_url,
            api_key,
            table,
            session_file,
        })
    }
}

impl ConfigProvider for Settings {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn table(&self) -> &str {
        &self.table
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        crate::utils::validation::validate_url("backend.url", &self.base_url)?;
        crate::utils::validation::validate_non_empty_string("backend.api_key", &self.api_key)?;
        crate::utils::validation::validate_non_empty_string("backend.table", &self.table)?;
        Ok(())
    }
}

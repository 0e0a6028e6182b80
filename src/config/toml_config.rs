use crate::utils::error::{LoanError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub backend: BackendConfig,
    pub session: Option<SessionConfig>,
    pub import: Option<ImportConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub api_key: String,
    pub table: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub csv_path: Option<String>,
    pub truncate: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(LoanError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LoanError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${LOANBOOK_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        crate::utils::validation::validate_url("backend.url", &self.backend.url)?;
        crate::utils::validation::validate_non_empty_string("backend.api_key", &self.backend.api_key)?;

        if let Some(table) = &self.backend.table {
            crate::utils::validation::validate_non_empty_string("backend.table", table)?;
        }
        if let Some(session) = &self.session {
            if let Some(file) = &session.file {
                crate::utils::validation::validate_path("session.file", file)?;
            }
        }
        if let Some(import) = &self.import {
            if let Some(csv_path) = &import.csv_path {
                crate::utils::validation::validate_path("import.csv_path", csv_path)?;
            }
        }

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

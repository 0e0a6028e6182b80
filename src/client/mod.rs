pub mod query;

use crate::domain::model::{Loan, LoanUpdate, NewLoan};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{LoanError, Result};
use self::query::QueryBuilder;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use url::Url;

/// loanable 資料表的 REST 客戶端，每個操作都是一次獨立呼叫
#[derive(Debug, Clone)]
pub struct TableClient {
    http: Client,
    base_url: Url,
    api_key: String,
    table: String,
}

impl TableClient {
    pub fn from_config(config: &impl ConfigProvider) -> Result<Self> {
        let base_url = Url::parse(config.base_url()).map_err(|e| LoanError::ConfigError {
            message: format!("Invalid backend URL '{}': {}", config.base_url(), e),
        })?;

        Ok(Self {
            http: Client::new(),
            base_url,
            api_key: config.api_key().to_string(),
            table: config.table().to_string(),
        })
    }

    fn endpoint(&self, query: &QueryBuilder) -> Result<Url> {
        let raw = format!(
            "{}/rest/v1/{}",
            self.base_url.as_str().trim_end_matches('/'),
            self.table
        );
        let mut url = Url::parse(&raw).map_err(|e| LoanError::ConfigError {
            message: format!("Invalid table endpoint '{}': {}", raw, e),
        })?;

        if !query.params().is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.params().iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    // 非 2xx 一律收斂成同一種錯誤形狀：讀出 PostgREST 的 message、記錄、回傳
    async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or(body);

        tracing::error!("❌ Backend error ({}): {}", status.as_u16(), message);
        Err(LoanError::BackendError {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn select(&self, query: QueryBuilder) -> Result<Vec<Loan>> {
        let url = self.endpoint(&query)?;
        tracing::debug!("GET {}", url);

        let response = self.request(Method::GET, url).send().await?;
        let rows = self.check(response).await?.json::<Vec<Loan>>().await?;
        Ok(rows)
    }

    /// 欄位投影用，回傳原始 JSON 列
    pub async fn select_rows(&self, query: QueryBuilder) -> Result<Vec<serde_json::Value>> {
        let url = self.endpoint(&query)?;
        tracing::debug!("GET {}", url);

        let response = self.request(Method::GET, url).send().await?;
        let rows = self
            .check(response)
            .await?
            .json::<Vec<serde_json::Value>>()
            .await?;
        Ok(rows)
    }

    /// 單列查詢；後端以 406 表示不是恰好一列
    pub async fn select_one(&self, query: QueryBuilder, account_no: i64) -> Result<Loan> {
        let url = self.endpoint(&query)?;
        tracing::debug!("GET {} (single row)", url);

        let response = self
            .request(Method::GET, url)
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await?;

        if response.status() == StatusCode::NOT_ACCEPTABLE {
            return Err(LoanError::NotFoundError { account_no });
        }

        let loan = self.check(response).await?.json::<Loan>().await?;
        Ok(loan)
    }

    pub async fn insert(&self, rows: &[NewLoan]) -> Result<Vec<Loan>> {
        let url = self.endpoint(&QueryBuilder::default())?;
        tracing::debug!("POST {} ({} rows)", url, rows.len());

        let response = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(rows)
            .send()
            .await?;

        let stored = self.check(response).await?.json::<Vec<Loan>>().await?;
        Ok(stored)
    }

    pub async fn update(&self, query: QueryBuilder, patch: &LoanUpdate) -> Result<Vec<Loan>> {
        let url = self.endpoint(&query)?;
        tracing::debug!("PATCH {}", url);

        let response = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;

        let stored = self.check(response).await?.json::<Vec<Loan>>().await?;
        Ok(stored)
    }

    pub async fn delete(&self, query: QueryBuilder) -> Result<()> {
        let url = self.endpoint(&query)?;
        tracing::debug!("DELETE {}", url);

        let response = self.request(Method::DELETE, url).send().await?;
        self.check(response).await?;
        Ok(())
    }

    /// 連線測試：撈一列就好，失敗只記錄不報錯
    pub async fn ping(&self) -> bool {
        let query = QueryBuilder::select("AccountNO").limit(1);
        let url = match self.endpoint(&query) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("❌ Connection test failed: {}", e);
                return false;
            }
        };

        match self.request(Method::GET, url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("✅ Connection test successful");
                true
            }
            Ok(response) => {
                tracing::error!("❌ Connection test failed: HTTP {}", response.status());
                false
            }
            Err(e) => {
                tracing::error!("❌ Connection test failed: {}", e);
                false
            }
        }
    }
}

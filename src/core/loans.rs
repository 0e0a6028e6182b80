use crate::client::query::{OrFilter, QueryBuilder};
use crate::client::TableClient;
use crate::domain::model::{Loan, LoanStatus, LoanUpdate, LoadSource, NewLoan, SearchFilters};
use crate::utils::error::{LoanError, Result};
use regex::Regex;
use std::collections::HashSet;

const COL_BORROWER: &str = "BorrowerName";
const COL_ACCOUNT: &str = "AccountNO";
const COL_TYPE: &str = "LoanType";
const COL_BRANCH: &str = "BranchName";
const COL_BALANCE: &str = "Closing Balance";
const COL_OVERDUE: &str = "Total Overdue Amount";

/// 貸款資料操作的入口，保留最後一次撈回來的清單（整批覆蓋）
pub struct LoanService {
    client: TableClient,
    loans: Vec<Loan>,
}

impl LoanService {
    pub fn new(client: TableClient) -> Self {
        Self {
            client,
            loans: Vec::new(),
        }
    }

    pub fn loans(&self) -> &[Loan] {
        &self.loans
    }

    pub async fn load_loans(&mut self) -> Result<LoadSource> {
        tracing::info!("🔄 Fetching loans from backend...");

        // 先做連線測試再撈整張表
        if let Err(e) = self
            .client
            .select_rows(QueryBuilder::select(COL_ACCOUNT).limit(1))
            .await
        {
            tracing::error!("❌ Connection test failed: {}", e);
            self.loans.clear();
            return Err(e);
        }
        tracing::info!("✅ Connection test successful");

        let query = QueryBuilder::select("*").order_asc(COL_BORROWER);
        match self.client.select(query).await {
            Ok(rows) if rows.is_empty() => {
                tracing::warn!("⚠️ No data found in backend table");
                self.loans.clear();
                Ok(LoadSource::Empty)
            }
            Ok(rows) => {
                tracing::info!("✅ Successfully loaded {} loans", rows.len());
                self.loans = rows;
                Ok(LoadSource::Backend)
            }
            Err(e) => {
                tracing::error!("❌ Error loading loans: {}", e);
                self.loans.clear();
                Err(e)
            }
        }
    }

    pub async fn get_loan(&self, account_no: i64) -> Result<Loan> {
        let query = QueryBuilder::select("*").eq(COL_ACCOUNT, account_no);
        self.client.select_one(query, account_no).await
    }

    pub async fn add_loan(&mut self, loan: NewLoan) -> Result<Loan> {
        let stored = self.client.insert(std::slice::from_ref(&loan)).await?;
        let stored = stored
            .into_iter()
            .next()
            .ok_or_else(|| LoanError::UnexpectedResponseError {
                message: "insert returned no rows".to_string(),
            })?;

        self.loans.push(stored.clone());
        Ok(stored)
    }

    pub async fn update_loan(&mut self, account_no: i64, patch: LoanUpdate) -> Result<Loan> {
        let query = QueryBuilder::select("*").eq(COL_ACCOUNT, account_no);
        let stored = self.client.update(query, &patch).await?;
        let stored = stored
            .into_iter()
            .next()
            .ok_or(LoanError::NotFoundError { account_no })?;

        if let Some(cached) = self.loans.iter_mut().find(|l| l.account_no == account_no) {
            *cached = stored.clone();
        }
        Ok(stored)
    }

    pub async fn delete_loan(&mut self, account_no: i64) -> Result<()> {
        let query = QueryBuilder::default().eq(COL_ACCOUNT, account_no);
        self.client.delete(query).await?;

        self.loans.retain(|l| l.account_no != account_no);
        Ok(())
    }

    /// 伺服器端搜尋：文字條件走 or 群組，其餘過濾條件直接下成欄位參數
    pub async fn search_loans(&mut self, term: &str, filters: &SearchFilters) -> Result<Vec<Loan>> {
        let mut query = QueryBuilder::select("*");

        let term = term.trim();
        if !term.is_empty() {
            query = query.or(OrFilter::new()
                .contains(COL_BORROWER, term)
                .contains_as_text(COL_ACCOUNT, term));
        }

        if let Some(loan_type) = &filters.loan_type {
            query = query.eq(COL_TYPE, loan_type.as_str());
        }
        if let Some(branch) = &filters.branch {
            query = query.eq(COL_BRANCH, branch.as_str());
        }
        if let Some(status) = filters.status {
            query = apply_status(query, status);
        }

        query = query.order_asc(COL_BORROWER);

        match self.client.select(query).await {
            Ok(rows) => {
                tracing::info!("✅ Search completed: {} results", rows.len());
                self.loans = rows.clone();
                Ok(rows)
            }
            Err(e) => {
                tracing::error!("❌ Error searching loans: {}", e);
                self.loans.clear();
                Err(e)
            }
        }
    }

    /// 進階搜尋：數字字串先比對帳號，複合過濾條件改在記憶體內做
    pub async fn advanced_search(
        &mut self,
        term: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<Loan>> {
        let term = term.trim();
        if term.is_empty() {
            return self.search_loans("", filters).await;
        }

        let numeric = Regex::new(r"^\d+$").unwrap();
        let group = if numeric.is_match(term) {
            OrFilter::new()
                .eq(COL_ACCOUNT, term)
                .contains(COL_BORROWER, term)
                .contains_as_text(COL_ACCOUNT, term)
        } else {
            OrFilter::new()
                .contains(COL_BORROWER, term)
                .contains(COL_TYPE, term)
                .contains(COL_BRANCH, term)
        };

        let query = QueryBuilder::select("*").or(group).order_asc(COL_BORROWER);
        let rows = match self.client.select(query).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("❌ Error in advanced search: {}", e);
                self.loans.clear();
                return Err(e);
            }
        };

        let filtered: Vec<Loan> = rows.into_iter().filter(|l| filters.matches(l)).collect();
        tracing::info!("✅ Advanced search completed: {} results", filtered.len());

        self.loans = filtered.clone();
        Ok(filtered)
    }

    pub async fn loan_types(&self) -> Result<Vec<String>> {
        self.distinct_values(COL_TYPE).await
    }

    pub async fn branches(&self) -> Result<Vec<String>> {
        self.distinct_values(COL_BRANCH).await
    }

    // 撈單欄位、去重、保留第一次出現的順序
    async fn distinct_values(&self, column: &str) -> Result<Vec<String>> {
        let query = QueryBuilder::select(column).not_null(column);
        let rows = self.client.select_rows(query).await?;

        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for row in rows {
            if let Some(value) = row.get(column).and_then(|v| v.as_str()) {
                if !value.is_empty() && seen.insert(value.to_string()) {
                    values.push(value.to_string());
                }
            }
        }
        Ok(values)
    }
}

fn apply_status(query: QueryBuilder, status: LoanStatus) -> QueryBuilder {
    match status {
        LoanStatus::Overdue => query.gt(COL_OVERDUE, 0),
        LoanStatus::Active => query.lt(COL_BALANCE, 0),
        LoanStatus::Closed => query.gte(COL_BALANCE, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ConfigProvider;
    use httpmock::prelude::*;
    use httpmock::Method::PATCH;

    struct MockConfig {
        base_url: String,
    }

    impl ConfigProvider for MockConfig {
        fn base_url(&self) -> &str {
            &self.base_url
        }

        fn api_key(&self) -> &str {
            "test-key"
        }

        fn table(&self) -> &str {
            "loanable"
        }
    }

    fn service_for(server: &MockServer) -> LoanService {
        let config = MockConfig {
            base_url: server.base_url(),
        };
        LoanService::new(TableClient::from_config(&config).unwrap())
    }

    fn loan_row(name: &str, account_no: i64, balance: f64, overdue: f64) -> serde_json::Value {
        serde_json::json!({
            "id": account_no,
            "BorrowerName": name,
            "AccountNO": account_no,
            "LoanType": "Home",
            "BranchName": "Central",
            "Closing Balance": balance,
            "Total Overdue Amount": overdue
        })
    }

    #[tokio::test]
    async fn test_load_loans_orders_by_borrower_name() {
        let server = MockServer::start();
        let ping_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/loanable")
                .query_param("select", "AccountNO")
                .query_param("limit", "1");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([{"AccountNO": 1}]));
        });
        let load_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/loanable")
                .query_param("select", "*")
                .query_param("order", "BorrowerName.asc");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([
                    loan_row("Asha Rao", 1, -100.0, 0.0),
                    loan_row("Binod Shah", 2, 50.0, 0.0)
                ]));
        });

        let mut service = service_for(&server);
        let source = service.load_loans().await.unwrap();

        ping_mock.assert();
        load_mock.assert();
        assert_eq!(source, LoadSource::Backend);
        assert_eq!(service.loans().len(), 2);
        assert_eq!(service.loans()[0].borrower_name, "Asha Rao");
    }

    #[tokio::test]
    async fn test_load_loans_reports_empty_table() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/v1/loanable");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([]));
        });

        let mut service = service_for(&server);
        let source = service.load_loans().await.unwrap();

        assert_eq!(source, LoadSource::Empty);
        assert!(service.loans().is_empty());
    }

    #[tokio::test]
    async fn test_load_loans_failure_clears_cache() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/v1/loanable");
            then.status(500)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"message": "boom"}));
        });

        let mut service = service_for(&server);
        service.loans.push(Loan {
            id: Some(1),
            borrower_name: "Stale".to_string(),
            account_no: 1,
            loan_type: None,
            branch_name: None,
            closing_balance: 0.0,
            overdue_amount: 0.0,
        });

        assert!(service.load_loans().await.is_err());
        assert!(service.loans().is_empty());
    }

    #[tokio::test]
    async fn test_empty_term_search_is_unfiltered_and_sorted() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/loanable")
                .query_param("select", "*")
                .query_param("order", "BorrowerName.asc");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([
                    loan_row("Asha Rao", 1, -100.0, 0.0),
                    loan_row("Binod Shah", 2, 50.0, 0.0)
                ]));
        });

        let mut service = service_for(&server);
        let results = service
            .search_loans("   ", &SearchFilters::default())
            .await
            .unwrap();

        mock.assert();
        // No `or` group, no column filters: just the sorted full list
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].borrower_name, "Asha Rao");
        assert_eq!(service.loans().len(), 2);
    }

    #[tokio::test]
    async fn test_search_term_builds_text_or_group() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/rest/v1/loanable").query_param(
                "or",
                "(BorrowerName.ilike.*rao*,AccountNO::text.ilike.*rao*)",
            );
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([loan_row("Asha Rao", 1, -100.0, 0.0)]));
        });

        let mut service = service_for(&server);
        let results = service
            .search_loans("rao", &SearchFilters::default())
            .await
            .unwrap();

        mock.assert();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_status_filters_map_to_sign_conditions() {
        let server = MockServer::start();
        let overdue_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/loanable")
                .query_param("Total Overdue Amount", "gt.0");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([]));
        });

        let mut service = service_for(&server);
        let filters = SearchFilters {
            status: Some(LoanStatus::Overdue),
            ..SearchFilters::default()
        };
        service.search_loans("", &filters).await.unwrap();
        overdue_mock.assert();

        let active_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/loanable")
                .query_param("Closing Balance", "lt.0");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([]));
        });
        let filters = SearchFilters {
            status: Some(LoanStatus::Active),
            ..SearchFilters::default()
        };
        service.search_loans("", &filters).await.unwrap();
        active_mock.assert();

        let closed_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/loanable")
                .query_param("Closing Balance", "gte.0");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([]));
        });
        let filters = SearchFilters {
            status: Some(LoanStatus::Closed),
            ..SearchFilters::default()
        };
        service.search_loans("", &filters).await.unwrap();
        closed_mock.assert();
    }

    #[tokio::test]
    async fn test_advanced_search_numeric_term_matches_exact_account() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/rest/v1/loanable").query_param(
                "or",
                "(AccountNO.eq.100234,BorrowerName.ilike.*100234*,AccountNO::text.ilike.*100234*)",
            );
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([loan_row("Asha Rao", 100234, -100.0, 0.0)]));
        });

        let mut service = service_for(&server);
        let results = service
            .advanced_search("100234", &SearchFilters::default())
            .await
            .unwrap();

        mock.assert();
        assert_eq!(results[0].account_no, 100234);
    }

    #[tokio::test]
    async fn test_advanced_search_text_term_stays_on_text_columns() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/rest/v1/loanable").query_param(
                "or",
                "(BorrowerName.ilike.*home*,LoanType.ilike.*home*,BranchName.ilike.*home*)",
            );
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([]));
        });

        let mut service = service_for(&server);
        service
            .advanced_search("home", &SearchFilters::default())
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn test_advanced_search_filters_in_memory() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/v1/loanable");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([
                    loan_row("Asha Rao", 1, -100.0, 50.0),
                    loan_row("Binod Rao", 2, 200.0, 0.0),
                    loan_row("Chitra Rao", 3, -300.0, 10.0)
                ]));
        });

        let mut service = service_for(&server);
        let filters = SearchFilters {
            status: Some(LoanStatus::Overdue),
            ..SearchFilters::default()
        };
        let results = service.advanced_search("rao", &filters).await.unwrap();

        // Server returned three rows; the overdue condition is applied locally
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|l| l.overdue_amount > 0.0));
        assert_eq!(service.loans().len(), 2);
    }

    #[tokio::test]
    async fn test_add_loan_appends_to_cache() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rest/v1/loanable");
            then.status(201)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([loan_row("Asha Rao", 100234, -100.0, 0.0)]));
        });

        let mut service = service_for(&server);
        let stored = service
            .add_loan(NewLoan {
                borrower_name: "Asha Rao".to_string(),
                account_no: 100234,
                loan_type: Some("Home".to_string()),
                branch_name: Some("Central".to_string()),
                closing_balance: -100.0,
                overdue_amount: 0.0,
            })
            .await
            .unwrap();

        assert_eq!(stored.id, Some(100234));
        assert_eq!(service.loans().len(), 1);
    }

    #[tokio::test]
    async fn test_update_loan_targets_account_and_merges_cache() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/loanable")
                .query_param("AccountNO", "eq.100234");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([loan_row("Asha R. Rao", 100234, -50.0, 0.0)]));
        });

        let mut service = service_for(&server);
        service.loans.push(Loan {
            id: Some(100234),
            borrower_name: "Asha Rao".to_string(),
            account_no: 100234,
            loan_type: Some("Home".to_string()),
            branch_name: Some("Central".to_string()),
            closing_balance: -100.0,
            overdue_amount: 0.0,
        });

        let patch = LoanUpdate {
            borrower_name: Some("Asha R. Rao".to_string()),
            closing_balance: Some(-50.0),
            ..LoanUpdate::default()
        };
        let stored = service.update_loan(100234, patch).await.unwrap();

        mock.assert();
        assert_eq!(stored.borrower_name, "Asha R. Rao");
        assert_eq!(service.loans()[0].closing_balance, -50.0);
    }

    #[tokio::test]
    async fn test_update_missing_account_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PATCH).path("/rest/v1/loanable");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([]));
        });

        let mut service = service_for(&server);
        let err = service
            .update_loan(999, LoanUpdate::default())
            .await
            .unwrap_err();

        match err {
            LoanError::NotFoundError { account_no } => assert_eq!(account_no, 999),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_loan_removes_from_cache() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(DELETE)
                .path("/rest/v1/loanable")
                .query_param("AccountNO", "eq.100234");
            then.status(204);
        });

        let mut service = service_for(&server);
        service.loans.push(Loan {
            id: Some(100234),
            borrower_name: "Asha Rao".to_string(),
            account_no: 100234,
            loan_type: None,
            branch_name: None,
            closing_balance: 0.0,
            overdue_amount: 0.0,
        });

        service.delete_loan(100234).await.unwrap();

        mock.assert();
        assert!(service.loans().is_empty());
    }

    #[tokio::test]
    async fn test_loan_types_dedupes_preserving_order() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/loanable")
                .query_param("select", "LoanType")
                .query_param("LoanType", "not.is.null");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([
                    {"LoanType": "Home"},
                    {"LoanType": "Auto"},
                    {"LoanType": "Home"},
                    {"LoanType": ""}
                ]));
        });

        let service = service_for(&server);
        let types = service.loan_types().await.unwrap();

        mock.assert();
        assert_eq!(types, vec!["Home".to_string(), "Auto".to_string()]);
    }
}

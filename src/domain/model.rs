use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 遠端 loanable 資料表的一列，欄位名稱沿用資料表原本的命名
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(rename = "BorrowerName")]
    pub borrower_name: String,

    #[serde(rename = "AccountNO")]
    pub account_no: i64,

    #[serde(rename = "LoanType", default)]
    pub loan_type: Option<String>,

    #[serde(rename = "BranchName", default)]
    pub branch_name: Option<String>,

    #[serde(rename = "Closing Balance", default)]
    pub closing_balance: f64,

    #[serde(rename = "Total Overdue Amount", default)]
    pub overdue_amount: f64,
}

/// 可插入的一列，id 由後端指派；CSV 匯入也解析成這個型別
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoan {
    #[serde(rename = "BorrowerName")]
    pub borrower_name: String,

    #[serde(rename = "AccountNO")]
    pub account_no: i64,

    #[serde(rename = "LoanType", default)]
    pub loan_type: Option<String>,

    #[serde(rename = "BranchName", default)]
    pub branch_name: Option<String>,

    #[serde(rename = "Closing Balance", default)]
    pub closing_balance: f64,

    #[serde(rename = "Total Overdue Amount", default)]
    pub overdue_amount: f64,
}

/// 部分更新，未填的欄位不會出現在 PATCH body
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoanUpdate {
    #[serde(rename = "BorrowerName", skip_serializing_if = "Option::is_none")]
    pub borrower_name: Option<String>,

    #[serde(rename = "LoanType", skip_serializing_if = "Option::is_none")]
    pub loan_type: Option<String>,

    #[serde(rename = "BranchName", skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,

    #[serde(rename = "Closing Balance", skip_serializing_if = "Option::is_none")]
    pub closing_balance: Option<f64>,

    #[serde(rename = "Total Overdue Amount", skip_serializing_if = "Option::is_none")]
    pub overdue_amount: Option<f64>,
}

impl LoanUpdate {
    pub fn is_empty(&self) -> bool {
        self.borrower_name.is_none()
            && self.loan_type.is_none()
            && self.branch_name.is_none()
            && self.closing_balance.is_none()
            && self.overdue_amount.is_none()
    }

    pub fn apply_to(&self, loan: &mut Loan) {
        if let Some(name) = &self.borrower_name {
            loan.borrower_name = name.clone();
        }
        if let Some(loan_type) = &self.loan_type {
            loan.loan_type = Some(loan_type.clone());
        }
        if let Some(branch) = &self.branch_name {
            loan.branch_name = Some(branch.clone());
        }
        if let Some(balance) = self.closing_balance {
            loan.closing_balance = balance;
        }
        if let Some(overdue) = self.overdue_amount {
            loan.overdue_amount = overdue;
        }
    }
}

/// 狀態對應到餘額/逾期欄位的正負號，伺服器端與記憶體內過濾共用同一份定義
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanStatus {
    Overdue,
    Active,
    Closed,
}

impl LoanStatus {
    pub fn matches(&self, loan: &Loan) -> bool {
        match self {
            LoanStatus::Overdue => loan.overdue_amount > 0.0,
            LoanStatus::Active => loan.closing_balance < 0.0,
            LoanStatus::Closed => loan.closing_balance >= 0.0,
        }
    }
}

impl FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overdue" => Ok(LoanStatus::Overdue),
            "active" => Ok(LoanStatus::Active),
            "closed" => Ok(LoanStatus::Closed),
            other => Err(format!(
                "Unknown status '{}'. Valid values: overdue, active, closed",
                other
            )),
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanStatus::Overdue => write!(f, "overdue"),
            LoanStatus::Active => write!(f, "active"),
            LoanStatus::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub loan_type: Option<String>,
    pub branch: Option<String>,
    pub status: Option<LoanStatus>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.loan_type.is_none() && self.branch.is_none() && self.status.is_none()
    }

    /// 記憶體內的複合條件過濾，對應伺服器端同一組條件
    pub fn matches(&self, loan: &Loan) -> bool {
        if let Some(loan_type) = &self.loan_type {
            if loan.loan_type.as_deref() != Some(loan_type.as_str()) {
                return false;
            }
        }
        if let Some(branch) = &self.branch {
            if loan.branch_name.as_deref() != Some(branch.as_str()) {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if !status.matches(loan) {
                return false;
            }
        }
        true
    }
}

/// load_loans 回報後端是有資料還是查到空表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Backend,
    Empty,
}

/// CSV 匯入 transform 階段的結果
#[derive(Debug, Clone)]
pub struct ImportBatch {
    pub records: Vec<NewLoan>,
    pub skipped: usize,
}

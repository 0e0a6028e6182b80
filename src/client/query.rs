/// 組出單次資料表請求的 query string。欄位過濾走 PostgREST 的
/// `<col>=<op>.<value>` 形式，OR 條件集中在一個 `or=(...)` 群組。
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    params: Vec<(String, String)>,
}

impl QueryBuilder {
    pub fn select(columns: &str) -> Self {
        Self {
            params: vec![("select".to_string(), columns.to_string())],
        }
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("eq.{}", quote_value(&value.to_string()))));
        self
    }

    pub fn neq(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("neq.{}", quote_value(&value.to_string()))));
        self
    }

    pub fn gt(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("gt.{}", value.to_string())));
        self
    }

    pub fn lt(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("lt.{}", value.to_string())));
        self
    }

    pub fn gte(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("gte.{}", value.to_string())));
        self
    }

    /// 部分比對，樣式為 *term*
    pub fn contains(mut self, column: &str, term: &str) -> Self {
        self.params
            .push((column.to_string(), format!("ilike.{}", contains_pattern(term))));
        self
    }

    pub fn not_null(mut self, column: &str) -> Self {
        self.params
            .push((column.to_string(), "not.is.null".to_string()));
        self
    }

    pub fn or(mut self, group: OrFilter) -> Self {
        if !group.parts.is_empty() {
            self.params.push(("or".to_string(), group.into_value()));
        }
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.params
            .push(("order".to_string(), format!("{}.asc", column)));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.params.push(("limit".to_string(), n.to_string()));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish()
    }
}

/// `or=(a,b,c)` 群組；條件為空時整個群組不會輸出
#[derive(Debug, Clone, Default)]
pub struct OrFilter {
    parts: Vec<String>,
}

impl OrFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.parts
            .push(format!("{}.eq.{}", column, quote_value(&value.to_string())));
        self
    }

    pub fn contains(mut self, column: &str, term: &str) -> Self {
        self.parts
            .push(format!("{}.ilike.{}", column, contains_pattern(term)));
        self
    }

    /// 數值欄位轉成文字再做部分比對（帳號當文字搜尋時用）
    pub fn contains_as_text(mut self, column: &str, term: &str) -> Self {
        self.parts
            .push(format!("{}::text.ilike.{}", column, contains_pattern(term)));
        self
    }

    fn into_value(self) -> String {
        format!("({})", self.parts.join(","))
    }
}

fn contains_pattern(term: &str) -> String {
    quote_value(&format!("*{}*", term))
}

// 值裡出現保留字元時整個值加雙引號，避免搜尋字串打壞過濾語法
fn quote_value(raw: &str) -> String {
    let needs_quoting = raw
        .chars()
        .any(|c| matches!(c, ',' | '(' | ')' | '"' | '\\'))
        || raw != raw.trim();

    if needs_quoting {
        format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        raw.to_string()
    }
}

// ==========================================
// 课堂考勤系统 - 查询过滤条件
// ==========================================
// 每种查询形状对应一个显式结构体，不使用无类型的 map
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 考勤记录列表过滤条件（所有字段可选，None 表示不限）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceFilter {
    #[serde(default, rename = "scode")]
    pub school_code: Option<String>,
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl AttendanceFilter {
    /// 按 (class_id, section_id, date) 过滤，不限学校
    pub fn class_section_on(class_id: &str, section_id: &str, date: NaiveDate) -> Self {
        Self {
            school_code: None,
            class_id: Some(class_id.to_string()),
            section_id: Some(section_id.to_string()),
            date: Some(date),
        }
    }

    pub fn on_date(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Default::default()
        }
    }

    /// 生成 WHERE 子句与参数（参数化查询，防止 SQL 注入）
    pub(crate) fn to_where_clause(&self) -> (String, Vec<String>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(school_code) = &self.school_code {
            params.push(school_code.clone());
            clauses.push(format!("school_code = ?{}", params.len()));
        }
        if let Some(class_id) = &self.class_id {
            params.push(class_id.clone());
            clauses.push(format!("class_id = ?{}", params.len()));
        }
        if let Some(section_id) = &self.section_id {
            params.push(section_id.clone());
            clauses.push(format!("section_id = ?{}", params.len()));
        }
        if let Some(date) = &self.date {
            params.push(date.format("%Y-%m-%d").to_string());
            clauses.push(format!("date = ?{}", params.len()));
        }

        if clauses.is_empty() {
            (String::new(), params)
        } else {
            (format!("WHERE {}", clauses.join(" AND ")), params)
        }
    }
}

// ==========================================
// 分页与排序
// ==========================================

/// 可排序字段（白名单）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Date,
    Time,
    CreatedAt,
}

impl SortField {
    fn column(&self) -> &'static str {
        match self {
            SortField::Date => "date",
            SortField::Time => "time",
            SortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: SortField,
    pub descending: bool,
}

impl SortOrder {
    /// 解析 `field:asc|desc` 格式，字段名支持 camelCase
    pub fn parse(raw: &str) -> Option<Self> {
        let (field_raw, dir_raw) = match raw.split_once(':') {
            Some((f, d)) => (f.trim(), d.trim()),
            None => (raw.trim(), "asc"),
        };
        let field = match field_raw {
            "date" => SortField::Date,
            "time" => SortField::Time,
            "createdAt" | "created_at" => SortField::CreatedAt,
            _ => return None,
        };
        let descending = match dir_raw.to_ascii_lowercase().as_str() {
            "desc" => true,
            "asc" => false,
            _ => return None,
        };
        Some(Self { field, descending })
    }

    pub(crate) fn to_order_by(self) -> String {
        let dir = if self.descending { "DESC" } else { "ASC" };
        // created_at 作为次序键，保证分页结果稳定
        format!("ORDER BY {} {}, created_at ASC, id ASC", self.field.column(), dir)
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            field: SortField::Date,
            descending: true,
        }
    }
}

/// 分页请求（已归一化：page >= 1, limit >= 1）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
    pub sort: SortOrder,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// 分页查询结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub results: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
    pub total_results: u64,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, request: &PageRequest, total_results: u64) -> Self {
        let limit = u64::from(request.limit.max(1));
        Self {
            results,
            page: request.page,
            limit: request.limit,
            total_pages: total_results.div_ceil(limit),
            total_results,
        }
    }
}

// ==========================================
// 课堂考勤系统 - 命令适配层
// ==========================================
// 职责: 命令名 + JSON 参数 -> AttendanceApi 调用 -> JSON 字符串
// 错误统一序列化为 ErrorResponse JSON 字符串
// ==========================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiError, PagingOptions};
use crate::app::state::AppState;
use crate::domain::attendance::{AttendancePatch, AttendanceSubmission};
use crate::repository::AttendanceFilter;

// ==========================================
// 错误映射
// ==========================================

/// 错误响应（返回给调用方）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,

    /// 错误消息
    pub message: String,

    /// 详细信息（可选）
    pub details: Option<Value>,
}

/// 将ApiError转换为JSON字符串
pub fn map_api_error(err: ApiError) -> String {
    let error_response = ErrorResponse {
        code: match &err {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::DatabaseTransactionError(_) => "DATABASE_TRANSACTION_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
        .to_string(),
        message: err.to_string(),
        details: None,
    };

    serde_json::to_string(&error_response).unwrap_or_else(|_| err.to_string())
}

// ==========================================
// 命令参数
// ==========================================

#[derive(Debug, Deserialize)]
struct IdParams {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ListAttendanceParams {
    #[serde(flatten)]
    filter: AttendanceFilter,
    #[serde(flatten)]
    options: PagingOptions,
}

#[derive(Debug, Deserialize)]
struct UpdateAttendanceParams {
    id: String,
    #[serde(flatten)]
    patch: AttendancePatch,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassSectionDateParams {
    class_id: String,
    section_id: String,
    date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchoolClassSectionDateParams {
    scode: String,
    class_id: String,
    section_id: String,
    date: String,
}

#[derive(Debug, Deserialize)]
struct SchoolDateParams {
    scode: String,
    date: String,
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, String> {
    serde_json::from_value(params)
        .map_err(|e| map_api_error(ApiError::InvalidInput(format!("参数解析失败: {}", e))))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value)
        .map_err(|e| map_api_error(ApiError::InternalError(format!("序列化失败: {}", e))))
}

// ==========================================
// 命令分发
// ==========================================

/// 执行命令
///
/// # 返回
/// - Ok(String): 结果 JSON
/// - Err(String): ErrorResponse JSON
pub async fn dispatch(state: &AppState, command: &str, params: Value) -> Result<String, String> {
    tracing::debug!(command, "执行命令");
    let api = &state.attendance_api;

    match command {
        "create_attendance" => {
            let submission: AttendanceSubmission = parse_params(params)?;
            let record = api.create_attendance(submission).await.map_err(map_api_error)?;
            to_json(&record)
        }
        "list_attendance" => {
            let p: ListAttendanceParams = parse_params(params)?;
            let page = api
                .get_all_attendance(p.filter, p.options)
                .await
                .map_err(map_api_error)?;
            to_json(&page)
        }
        "get_attendance" => {
            let p: IdParams = parse_params(params)?;
            let record = api.get_by_id(&p.id).await.map_err(map_api_error)?;
            to_json(&record)
        }
        "update_attendance" => {
            let p: UpdateAttendanceParams = parse_params(params)?;
            let record = api.update_by_id(&p.id, p.patch).await.map_err(map_api_error)?;
            to_json(&record)
        }
        "delete_attendance" => {
            let p: IdParams = parse_params(params)?;
            let record = api.delete_by_id(&p.id).await.map_err(map_api_error)?;
            to_json(&record)
        }
        "get_roster_joined_attendance" => {
            let p: ClassSectionDateParams = parse_params(params)?;
            let rows = api
                .get_roster_joined_attendance(&p.class_id, &p.section_id, &p.date)
                .await
                .map_err(map_api_error)?;
            to_json(&rows)
        }
        "get_week_report" => {
            let p: SchoolClassSectionDateParams = parse_params(params)?;
            let report = api
                .get_week_report(&p.scode, &p.class_id, &p.section_id, &p.date)
                .await
                .map_err(map_api_error)?;
            to_json(&report)
        }
        "get_summary" => {
            let p: SchoolDateParams = parse_params(params)?;
            let summary = api.get_summary(&p.scode, &p.date).await.map_err(map_api_error)?;
            to_json(&summary)
        }
        "get_stats" => {
            let p: SchoolClassSectionDateParams = parse_params(params)?;
            let stats = api
                .get_stats(&p.class_id, &p.section_id, &p.date, &p.scode)
                .await
                .map_err(map_api_error)?;
            to_json(&stats)
        }
        "submit_attendance" => {
            let submission: AttendanceSubmission = parse_params(params)?;
            let touched = api.submit_or_update(submission).await.map_err(map_api_error)?;
            to_json(&touched)
        }
        other => {
            tracing::warn!(command = other, "未知命令");
            Err(map_api_error(ApiError::InvalidInput(format!("未知命令: {}", other))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::student::StudentRecord;
    use crate::domain::types::Gender;
    use crate::engine::FixedClock;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn setup_state() -> (NamedTempFile, AppState) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();
        let today = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        let state = AppState::with_clock(db_path, Arc::new(FixedClock(today))).unwrap();

        state
            .student_repo
            .batch_upsert(&[
                StudentRecord::new("ST1", "SC01", Gender::Male).in_class("C1", "S1"),
                StudentRecord::new("ST2", "SC01", Gender::Female).in_class("C1", "S1"),
            ])
            .unwrap();
        (temp_file, state)
    }

    fn error_code(err: &str) -> String {
        let resp: ErrorResponse = serde_json::from_str(err).unwrap();
        resp.code
    }

    #[tokio::test]
    async fn test_submit_then_stats() {
        let (_tmp, state) = setup_state();

        let submitted = dispatch(
            &state,
            "submit_attendance",
            json!({
                "scode": "SC01",
                "classId": "C1",
                "sectionId": "S1",
                "date": "2024-03-06",
                "time": "09:00",
                "entries": [
                    { "studentId": "ST1" },
                    { "studentId": "ST2", "attendanceStatus": "absent", "remark": "sick" }
                ]
            }),
        )
        .await
        .unwrap();
        assert_eq!(submitted, "true");

        let stats = dispatch(
            &state,
            "get_stats",
            json!({ "scode": "SC01", "classId": "C1", "sectionId": "S1", "date": "2024-03-06" }),
        )
        .await
        .unwrap();
        let stats: Value = serde_json::from_str(&stats).unwrap();
        assert_eq!(stats["totalStudents"], 2);
        assert_eq!(stats["presentCount"], 1);
        assert_eq!(stats["totalFemaleAbsent"], 1);
    }

    #[tokio::test]
    async fn test_stats_missing_returns_error_payload() {
        let (_tmp, state) = setup_state();

        let stats = dispatch(
            &state,
            "get_stats",
            json!({ "scode": "SC01", "classId": "C1", "sectionId": "S1", "date": "2024-03-07" }),
        )
        .await
        .unwrap();
        assert_eq!(stats, r#"{"error":"Attendance not found"}"#);
    }

    #[tokio::test]
    async fn test_error_codes() {
        let (_tmp, state) = setup_state();

        let err = dispatch(&state, "drop_everything", Value::Null).await.unwrap_err();
        assert_eq!(error_code(&err), "INVALID_INPUT");

        let err = dispatch(&state, "get_summary", json!({ "scode": "SC01" }))
            .await
            .unwrap_err();
        assert_eq!(error_code(&err), "INVALID_INPUT");

        let err = dispatch(&state, "get_attendance", json!({ "id": "nope" }))
            .await
            .unwrap_err();
        assert_eq!(error_code(&err), "NOT_FOUND");
    }
}

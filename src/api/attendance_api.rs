// ==========================================
// 课堂考勤系统 - 考勤 API
// ==========================================
// 职责: 对外暴露考勤记录 CRUD、提交、汇总、统计、周报、联表查询
// 日期参数统一为 YYYY-MM-DD 字符串
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::config::PagingConfigReader;
use crate::domain::attendance::{AttendancePatch, AttendanceRecord, AttendanceSubmission};
use crate::domain::report::{
    AttendanceStats, AttendanceSummary, RosterJoinedAttendance, WeekReportEntry,
};
use crate::engine::{
    AttendanceAggregator, Clock, RosterJoinEngine, UpsertCoordinator, WeekReportBuilder,
};
use crate::repository::{AttendanceFilter, AttendanceRepository, Page, PageRequest, SortOrder};

/// 统计接口中"记录不存在"时返回的错误文案
pub const STATS_NOT_FOUND_MESSAGE: &str = "Attendance not found";

// ==========================================
// 请求/响应 DTO
// ==========================================

/// 分页选项（均可省略）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingOptions {
    /// `field:asc|desc`
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub page: Option<u32>,
}

/// 统计接口响应
///
/// 记录不存在时序列化为 `{"error": "..."}`，调用方按 error 字段分支
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatsResponse {
    Found(AttendanceStats),
    NotFound { error: String },
}

impl StatsResponse {
    pub fn is_found(&self) -> bool {
        matches!(self, StatsResponse::Found(_))
    }
}

// ==========================================
// AttendanceApi - 考勤 API
// ==========================================

/// 考勤API
///
/// 职责：
/// 1. 考勤记录的增删改查
/// 2. 按自然键提交（有则更新、无则新建）
/// 3. 汇总/统计/周报/花名册联表等派生视图
pub struct AttendanceApi {
    attendance_repo: Arc<dyn AttendanceRepository>,
    aggregator: Arc<AttendanceAggregator>,
    week_report: Arc<WeekReportBuilder>,
    roster_join: Arc<RosterJoinEngine>,
    upsert: Arc<UpsertCoordinator>,
    config: Arc<dyn PagingConfigReader>,
    clock: Arc<dyn Clock>,
}

impl AttendanceApi {
    /// 创建新的AttendanceApi实例
    pub fn new(
        attendance_repo: Arc<dyn AttendanceRepository>,
        aggregator: Arc<AttendanceAggregator>,
        week_report: Arc<WeekReportBuilder>,
        roster_join: Arc<RosterJoinEngine>,
        upsert: Arc<UpsertCoordinator>,
        config: Arc<dyn PagingConfigReader>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            attendance_repo,
            aggregator,
            week_report,
            roster_join,
            upsert,
            config,
            clock,
        }
    }

    /// 直接新建考勤记录（不做自然键去重）
    ///
    /// # 返回
    /// - Ok(AttendanceRecord): 新建的记录（含生成的 id）
    pub async fn create_attendance(
        &self,
        submission: AttendanceSubmission,
    ) -> ApiResult<AttendanceRecord> {
        validate_submission(&submission)?;

        let record = AttendanceRecord::from_submission(&submission);
        self.attendance_repo.create(&record).await?;

        tracing::info!(id = %record.id, "创建考勤记录");
        Ok(record)
    }

    /// 分页查询考勤记录
    pub async fn get_all_attendance(
        &self,
        filter: AttendanceFilter,
        options: PagingOptions,
    ) -> ApiResult<Page<AttendanceRecord>> {
        let request = self.resolve_page_request(&options).await?;
        Ok(self.attendance_repo.find_page(&filter, &request).await?)
    }

    /// 按ID查询考勤记录
    ///
    /// # 返回
    /// - Err(ApiError::NotFound): 记录不存在
    pub async fn get_by_id(&self, id: &str) -> ApiResult<AttendanceRecord> {
        require_non_empty("id", id)?;
        self.attendance_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// 按ID部分更新考勤记录
    pub async fn update_by_id(
        &self,
        id: &str,
        patch: AttendancePatch,
    ) -> ApiResult<AttendanceRecord> {
        let mut record = self.get_by_id(id).await?;
        if patch.is_empty() {
            return Err(ApiError::InvalidInput("更新内容不能为空".to_string()));
        }

        patch.apply_to(&mut record);
        if !self.attendance_repo.update(&record).await? {
            return Err(not_found(id));
        }

        tracing::info!(id, "按ID更新考勤记录");
        Ok(record)
    }

    /// 按ID删除考勤记录
    ///
    /// # 返回
    /// - Ok(AttendanceRecord): 被删除的记录
    pub async fn delete_by_id(&self, id: &str) -> ApiResult<AttendanceRecord> {
        let record = self.get_by_id(id).await?;
        if !self.attendance_repo.delete_by_id(id).await? {
            return Err(not_found(id));
        }

        tracing::info!(id, "删除考勤记录");
        Ok(record)
    }

    /// 班级/分班某日考勤与花名册联表
    pub async fn get_roster_joined_attendance(
        &self,
        class_id: &str,
        section_id: &str,
        date: &str,
    ) -> ApiResult<Vec<RosterJoinedAttendance>> {
        require_non_empty("classId", class_id)?;
        require_non_empty("sectionId", section_id)?;
        let date = parse_date(date)?;

        Ok(self
            .roster_join
            .attendance_with_roster(class_id, section_id, date)
            .await?)
    }

    /// 周考勤报告（周一至周六）
    pub async fn get_week_report(
        &self,
        school_code: &str,
        class_id: &str,
        section_id: &str,
        date: &str,
    ) -> ApiResult<Vec<WeekReportEntry>> {
        require_non_empty("scode", school_code)?;
        require_non_empty("classId", class_id)?;
        require_non_empty("sectionId", section_id)?;
        let anchor = parse_date(date)?;

        Ok(self
            .week_report
            .build(school_code, class_id, section_id, anchor, self.clock.today())
            .await?)
    }

    /// 学校某日考勤汇总
    pub async fn get_summary(&self, school_code: &str, date: &str) -> ApiResult<AttendanceSummary> {
        require_non_empty("scode", school_code)?;
        let date = parse_date(date)?;

        Ok(self.aggregator.summarize(school_code, date).await?)
    }

    /// 班级/分班某日考勤统计
    ///
    /// 记录不存在时返回 StatsResponse::NotFound，而不是错误
    pub async fn get_stats(
        &self,
        class_id: &str,
        section_id: &str,
        date: &str,
        school_code: &str,
    ) -> ApiResult<StatsResponse> {
        require_non_empty("classId", class_id)?;
        require_non_empty("sectionId", section_id)?;
        require_non_empty("scode", school_code)?;
        let date = parse_date(date)?;

        let stats = self
            .aggregator
            .stats_by_class_section(class_id, section_id, date, school_code)
            .await?;

        Ok(match stats {
            Some(stats) => StatsResponse::Found(stats),
            None => StatsResponse::NotFound {
                error: STATS_NOT_FOUND_MESSAGE.to_string(),
            },
        })
    }

    /// 按自然键提交考勤（有则更新、无则新建）
    ///
    /// # 返回
    /// - Ok(true): 新建或实际修改了记录
    /// - Ok(false): 已有记录无变化
    pub async fn submit_or_update(&self, submission: AttendanceSubmission) -> ApiResult<bool> {
        validate_submission(&submission)?;
        let outcome = self.upsert.submit(&submission).await?;
        Ok(outcome.touched())
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    async fn resolve_page_request(&self, options: &PagingOptions) -> ApiResult<PageRequest> {
        let default_limit = self
            .config
            .get_default_page_limit()
            .await
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        let max_limit = self
            .config
            .get_max_page_limit()
            .await
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        let sort_raw = match &options.sort_by {
            Some(s) => s.clone(),
            None => self
                .config
                .get_default_sort()
                .await
                .map_err(|e| ApiError::InternalError(e.to_string()))?,
        };
        let sort = SortOrder::parse(&sort_raw)
            .ok_or_else(|| ApiError::InvalidInput(format!("排序参数无效: {}", sort_raw)))?;

        Ok(PageRequest {
            page: options.page.unwrap_or(1).max(1),
            limit: options.limit.unwrap_or(default_limit).clamp(1, max_limit.max(1)),
            sort,
        })
    }
}

// ==========================================
// 参数校验
// ==========================================

fn parse_date(raw: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| ApiError::InvalidInput(format!("日期格式错误（应为YYYY-MM-DD）: {}", e)))
}

fn require_non_empty(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(())
}

fn validate_submission(submission: &AttendanceSubmission) -> ApiResult<()> {
    require_non_empty("scode", &submission.school_code)?;
    require_non_empty("classId", &submission.class_id)?;
    require_non_empty("sectionId", &submission.section_id)?;
    if submission.entries.iter().any(|e| e.student_id.trim().is_empty()) {
        return Err(ApiError::InvalidInput("studentId不能为空".to_string()));
    }
    Ok(())
}

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("考勤记录(id={})不存在", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::attendance::EntrySubmission;
    use crate::domain::types::{AttendanceStatus, WeekDayStatus};
    use crate::engine::test_support::{MockAttendanceRepository, MockStudentRepository};
    use crate::engine::FixedClock;
    use async_trait::async_trait;
    use std::error::Error;

    struct MockPagingConfig;

    #[async_trait]
    impl PagingConfigReader for MockPagingConfig {
        async fn get_default_page_limit(&self) -> Result<u32, Box<dyn Error + Send + Sync>> {
            Ok(2)
        }

        async fn get_max_page_limit(&self) -> Result<u32, Box<dyn Error + Send + Sync>> {
            Ok(3)
        }

        async fn get_default_sort(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
            Ok("date:desc".to_string())
        }
    }

    fn build_api(today: NaiveDate) -> AttendanceApi {
        let attendance_repo: Arc<dyn AttendanceRepository> =
            Arc::new(MockAttendanceRepository::default());
        let student_repo = Arc::new(MockStudentRepository::default());
        AttendanceApi::new(
            attendance_repo.clone(),
            Arc::new(AttendanceAggregator::new(attendance_repo.clone(), student_repo.clone())),
            Arc::new(WeekReportBuilder::new(attendance_repo.clone())),
            Arc::new(RosterJoinEngine::new(attendance_repo.clone(), student_repo)),
            Arc::new(UpsertCoordinator::new(attendance_repo)),
            Arc::new(MockPagingConfig),
            Arc::new(FixedClock(today)),
        )
    }

    fn submission(date: NaiveDate) -> AttendanceSubmission {
        AttendanceSubmission {
            school_code: "SC01".to_string(),
            class_id: "C1".to_string(),
            section_id: "S1".to_string(),
            date,
            time: "09:00".to_string(),
            teacher_name: None,
            lecture_id: None,
            entries: vec![EntrySubmission::new("ST1", Some(AttendanceStatus::Absent))],
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_get_stats_not_found_payload() {
        let api = build_api(ymd(2024, 3, 4));
        let resp = api.get_stats("C1", "S1", "2024-03-04", "SC01").await.unwrap();

        assert!(!resp.is_found());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Attendance not found" }));
    }

    #[tokio::test]
    async fn test_bad_date_is_invalid_input() {
        let api = build_api(ymd(2024, 3, 4));
        let err = api.get_summary("SC01", "04/03/2024").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_get_by_id_missing_is_not_found() {
        let api = build_api(ymd(2024, 3, 4));
        let err = api.get_by_id("missing").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = api.delete_by_id("missing").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_by_id_applies_patch() {
        let api = build_api(ymd(2024, 3, 4));
        let created = api.create_attendance(submission(ymd(2024, 3, 4))).await.unwrap();

        let updated = api
            .update_by_id(
                &created.id,
                AttendancePatch {
                    teacher_name: Some("Mr. Khan".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.teacher_name.as_deref(), Some("Mr. Khan"));
        assert_eq!(updated.entries, created.entries);
        assert_eq!(api.get_by_id(&created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_paging_limit_clamped_to_max() {
        let api = build_api(ymd(2024, 3, 4));
        for day in 4..=8 {
            api.create_attendance(submission(ymd(2024, 3, day))).await.unwrap();
        }

        let page = api
            .get_all_attendance(
                AttendanceFilter::default(),
                PagingOptions {
                    limit: Some(50),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.limit, 3);
        assert_eq!(page.total_results, 5);
        assert_eq!(page.total_pages, 2);

        let err = api
            .get_all_attendance(
                AttendanceFilter::default(),
                PagingOptions {
                    sort_by: Some("name:asc".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_week_report_uses_injected_clock() {
        let api = build_api(ymd(2024, 3, 7));
        let report = api.get_week_report("SC01", "C1", "S1", "2024-03-05").await.unwrap();

        assert_eq!(report.len(), 6);
        assert_eq!(report[3].date, ymd(2024, 3, 7));
        assert_eq!(report[3].status, WeekDayStatus::Done);
        assert_eq!(report[0].status, WeekDayStatus::Pending);
    }

    #[tokio::test]
    async fn test_submit_or_update_rejects_blank_student_id() {
        let api = build_api(ymd(2024, 3, 4));
        let mut sub = submission(ymd(2024, 3, 4));
        sub.entries.push(EntrySubmission::new("  ", None));

        let err = api.submit_or_update(sub).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }
}

// ==========================================
// 课堂考勤系统 - 周考勤报告引擎
// ==========================================
// 职责: 计算锚定日期所在 ISO 周（周一开始）的周一至周六完成状态
// 说明: 六天制教学周，不含周日
// ==========================================
// 状态判定（按优先级）:
// 1. 当天 == 今天 -> Done（无论是否有记录）
// 2. 当天有考勤记录 -> Done
// 3. 否则 -> Pending
// ==========================================

use crate::domain::attendance::AttendanceKey;
use crate::domain::report::WeekReportEntry;
use crate::domain::types::WeekDayStatus;
use crate::repository::{AttendanceRepository, RepositoryResult};
use chrono::{Datelike, Duration, NaiveDate};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::instrument;

/// 周报覆盖天数（周一至周六）
pub const WEEK_REPORT_DAYS: i64 = 6;

pub struct WeekReportBuilder {
    attendance_repo: Arc<dyn AttendanceRepository>,
}

impl WeekReportBuilder {
    pub fn new(attendance_repo: Arc<dyn AttendanceRepository>) -> Self {
        Self { attendance_repo }
    }

    /// 生成周报
    ///
    /// # 参数
    /// - anchor: 锚定日期（决定是哪一周）
    /// - today: 当前日期（决定哪一天强制为 Done）
    ///
    /// # 返回
    /// 固定 6 条，周一在前；六个日期的查询并发执行，结果按日期顺序重组
    #[instrument(skip(self))]
    pub async fn build(
        &self,
        school_code: &str,
        class_id: &str,
        section_id: &str,
        anchor: NaiveDate,
        today: NaiveDate,
    ) -> RepositoryResult<Vec<WeekReportEntry>> {
        let days = week_days(anchor);

        let lookups = days.iter().map(|day| {
            let key = AttendanceKey::new(school_code, class_id, section_id, *day);
            let repo = Arc::clone(&self.attendance_repo);
            async move { repo.find_by_key(&key).await.map(|r| r.is_some()) }
        });
        // try_join_all 按输入顺序返回结果，与完成顺序无关
        let has_record = try_join_all(lookups).await?;

        let report: Vec<WeekReportEntry> = days
            .into_iter()
            .zip(has_record)
            .map(|(date, exists)| WeekReportEntry {
                day: date.format("%A").to_string(),
                date,
                status: day_status(date, today, exists),
            })
            .collect();

        tracing::debug!(
            done = report.iter().filter(|e| e.status == WeekDayStatus::Done).count(),
            "周报生成完成"
        );
        Ok(report)
    }
}

/// 锚定日期所在 ISO 周的周一
pub fn week_start(anchor: NaiveDate) -> NaiveDate {
    anchor - Duration::days(i64::from(anchor.weekday().num_days_from_monday()))
}

/// 周一至周六的日期序列
pub fn week_days(anchor: NaiveDate) -> Vec<NaiveDate> {
    let monday = week_start(anchor);
    (0..WEEK_REPORT_DAYS)
        .map(|offset| monday + Duration::days(offset))
        .collect()
}

// TODO: "今天"无记录也判 Done 是前端乐观展示的约定，待与教务确认后再决定是否改为按实际提交判断
fn day_status(day: NaiveDate, today: NaiveDate, has_record: bool) -> WeekDayStatus {
    if day == today || has_record {
        WeekDayStatus::Done
    } else {
        WeekDayStatus::Pending
    }
}

// ==========================================
// 课堂考勤系统 - 考勤提交协调器
// ==========================================
// 职责: 按自然键"有则更新、无则新建"
// 更新规则:
// - 按学生ID线性匹配已有条目，覆盖状态（缺省为出勤）与备注（缺省为空）
// - 记录中不存在的学生ID不会被追加
// - 覆盖 teacher_name / lecture_id
// 并发: 先查后写两步非原子，假定同一自然键只有一个写入方
// ==========================================

use crate::domain::attendance::{AttendanceRecord, AttendanceSubmission};
use crate::repository::{AttendanceRepository, RepositoryResult};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// 提交结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// 新建记录
    Created { id: String },
    /// 已有记录被修改
    Updated { id: String },
    /// 已有记录内容未变化
    Unchanged { id: String },
}

impl SubmitOutcome {
    /// 是否实际写入了存储
    pub fn touched(&self) -> bool {
        !matches!(self, SubmitOutcome::Unchanged { .. })
    }

    pub fn record_id(&self) -> &str {
        match self {
            SubmitOutcome::Created { id }
            | SubmitOutcome::Updated { id }
            | SubmitOutcome::Unchanged { id } => id,
        }
    }
}

pub struct UpsertCoordinator {
    attendance_repo: Arc<dyn AttendanceRepository>,
}

impl UpsertCoordinator {
    pub fn new(attendance_repo: Arc<dyn AttendanceRepository>) -> Self {
        Self { attendance_repo }
    }

    #[instrument(skip(self, submission), fields(
        scode = %submission.school_code,
        class_id = %submission.class_id,
        section_id = %submission.section_id,
        date = %submission.date,
    ))]
    pub async fn submit(&self, submission: &AttendanceSubmission) -> RepositoryResult<SubmitOutcome> {
        let key = submission.key();

        let Some(mut existing) = self.attendance_repo.find_by_key(&key).await? else {
            let record = AttendanceRecord::from_submission(submission);
            self.attendance_repo.create(&record).await?;
            tracing::info!(id = %record.id, entries = record.entries.len(), "新建考勤记录");
            return Ok(SubmitOutcome::Created { id: record.id });
        };

        let unknown = submission
            .entries
            .iter()
            .filter(|e| existing.entry_for(&e.student_id).is_none())
            .count();
        if unknown > 0 {
            tracing::warn!(id = %existing.id, unknown, "提交中包含记录内不存在的学生，已忽略");
        }

        let entries_changed = existing.merge_entries(&submission.entries);
        let header_changed = existing.teacher_name != submission.teacher_name
            || existing.lecture_id != submission.lecture_id;

        if !entries_changed && !header_changed {
            tracing::debug!(id = %existing.id, "考勤记录无变化");
            return Ok(SubmitOutcome::Unchanged { id: existing.id });
        }

        existing.teacher_name = submission.teacher_name.clone();
        existing.lecture_id = submission.lecture_id.clone();
        existing.updated_at = Utc::now();

        if self.attendance_repo.update(&existing).await? {
            tracing::info!(id = %existing.id, "更新考勤记录");
            Ok(SubmitOutcome::Updated { id: existing.id })
        } else {
            // 查询与写入之间记录被删除
            tracing::warn!(id = %existing.id, "考勤记录在更新前已被删除");
            Ok(SubmitOutcome::Unchanged { id: existing.id })
        }
    }
}

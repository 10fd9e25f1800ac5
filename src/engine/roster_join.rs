// ==========================================
// 课堂考勤系统 - 考勤 × 花名册联表引擎
// ==========================================
// 职责: 将考勤条目与花名册记录内连接，生成"谁出勤"视图
// 规则: 内连接，花名册中找不到的学生不输出
// 输出顺序: 记录顺序 -> 条目顺序
// ==========================================

use crate::domain::report::RosterJoinedAttendance;
use crate::domain::student::StudentRecord;
use crate::repository::{AttendanceFilter, AttendanceRepository, RepositoryResult, StudentRepository};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::instrument;

pub struct RosterJoinEngine {
    attendance_repo: Arc<dyn AttendanceRepository>,
    student_repo: Arc<dyn StudentRepository>,
}

impl RosterJoinEngine {
    pub fn new(
        attendance_repo: Arc<dyn AttendanceRepository>,
        student_repo: Arc<dyn StudentRepository>,
    ) -> Self {
        Self {
            attendance_repo,
            student_repo,
        }
    }

    /// 查询班级/分班某日的考勤记录，并逐条目关联花名册
    ///
    /// 每个匹配到花名册的条目输出一行，行内携带整条记录的全部条目
    #[instrument(skip(self))]
    pub async fn attendance_with_roster(
        &self,
        class_id: &str,
        section_id: &str,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<RosterJoinedAttendance>> {
        let records = self
            .attendance_repo
            .find(&AttendanceFilter::class_section_on(class_id, section_id, date))
            .await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let student_ids: Vec<String> = records
            .iter()
            .flat_map(|r| r.entries.iter().map(|e| e.student_id.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let students = self.student_repo.find_by_student_ids(&student_ids).await?;
        let roster: HashMap<&str, &StudentRecord> = students
            .iter()
            .map(|s| (s.student_id.as_str(), s))
            .collect();

        let mut rows = Vec::new();
        for record in &records {
            for entry in &record.entries {
                let Some(student) = roster.get(entry.student_id.as_str()) else {
                    continue;
                };
                rows.push(RosterJoinedAttendance {
                    attendance_object_id: record.id.clone(),
                    date: record.date,
                    time: record.time.clone(),
                    school_code: record.school_code.clone(),
                    class_id: record.class_id.clone(),
                    section_id: record.section_id.clone(),
                    entries: record.entries.clone(),
                    student_info: (*student).clone(),
                });
            }
        }

        tracing::debug!(records = records.len(), rows = rows.len(), "花名册联表完成");
        Ok(rows)
    }
}

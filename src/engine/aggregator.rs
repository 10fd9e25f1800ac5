// ==========================================
// 课堂考勤系统 - 考勤汇总引擎
// ==========================================
// 职责: 出勤/缺勤计数 + 按性别拆分统计
// 输入: attendance_record + student 花名册
// 输出: AttendanceSummary / AttendanceStats（临时视图）
// 红线: 计数只依据条目状态，不依据学生是否出现在记录中
// ==========================================

use crate::domain::attendance::AttendanceKey;
use crate::domain::report::{AttendanceStats, AttendanceSummary};
use crate::domain::student::StudentRecord;
use crate::domain::types::{AttendanceStatus, Gender};
use crate::repository::{AttendanceFilter, AttendanceRepository, RepositoryResult, StudentRepository};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// AttendanceAggregator - 考勤汇总引擎
// ==========================================
// 红线: 不写库，每次调用都从存储重新计算（无缓存）
pub struct AttendanceAggregator {
    attendance_repo: Arc<dyn AttendanceRepository>,
    student_repo: Arc<dyn StudentRepository>,
}

impl AttendanceAggregator {
    pub fn new(
        attendance_repo: Arc<dyn AttendanceRepository>,
        student_repo: Arc<dyn StudentRepository>,
    ) -> Self {
        Self {
            attendance_repo,
            student_repo,
        }
    }

    /// 学校某日考勤汇总
    ///
    /// # 参数
    /// - school_code: 学校代码
    /// - date: 日期
    ///
    /// # 返回
    /// - total: 学校花名册总人数
    /// - present/absent: 当日所有记录中、学生ID属于该校花名册的条目按状态计数
    #[instrument(skip(self))]
    pub async fn summarize(
        &self,
        school_code: &str,
        date: NaiveDate,
    ) -> RepositoryResult<AttendanceSummary> {
        let total_students_count = self.student_repo.count_by_school(school_code).await?;
        let roster: HashSet<String> = self
            .student_repo
            .find_student_ids_by_school(school_code)
            .await?
            .into_iter()
            .collect();

        let records = self
            .attendance_repo
            .find(&AttendanceFilter::on_date(date))
            .await?;

        let mut summary = AttendanceSummary {
            total_students_count,
            ..Default::default()
        };
        for entry in records
            .iter()
            .flat_map(|r| r.entries.iter())
            .filter(|e| roster.contains(&e.student_id))
        {
            match entry.attendance_status {
                AttendanceStatus::Present => summary.present_students_count += 1,
                AttendanceStatus::Absent => summary.absent_students_count += 1,
            }
        }

        tracing::debug!(
            records = records.len(),
            present = summary.present_students_count,
            absent = summary.absent_students_count,
            "考勤汇总完成"
        );
        Ok(summary)
    }

    /// 班级/分班某日考勤统计
    ///
    /// # 返回
    /// - Ok(None): 该自然键没有考勤记录（正常空状态，不是错误）
    /// - Ok(Some(stats)): 统计结果
    ///
    /// # 说明
    /// - 性别计数只覆盖有条目、且学生ID能在花名册中找到的学生
    /// - 找不到花名册的条目计入出勤/缺勤总数，但不计入性别拆分
    #[instrument(skip(self))]
    pub async fn stats_by_class_section(
        &self,
        class_id: &str,
        section_id: &str,
        date: NaiveDate,
        school_code: &str,
    ) -> RepositoryResult<Option<AttendanceStats>> {
        let key = AttendanceKey::new(school_code, class_id, section_id, date);
        let Some(record) = self.attendance_repo.find_by_key(&key).await? else {
            tracing::debug!("考勤记录不存在");
            return Ok(None);
        };

        let total_students = self
            .student_repo
            .count_by_class_section(class_id, section_id)
            .await?;

        let student_ids: Vec<String> = record.entries.iter().map(|e| e.student_id.clone()).collect();
        let students = self.student_repo.find_by_student_ids(&student_ids).await?;
        let roster: HashMap<&str, &StudentRecord> = students
            .iter()
            .map(|s| (s.student_id.as_str(), s))
            .collect();

        let mut listed_absent: HashSet<&str> = HashSet::new();
        let mut stats = AttendanceStats {
            total_students,
            ..Default::default()
        };

        for entry in &record.entries {
            let is_present = entry.attendance_status == AttendanceStatus::Present;
            if is_present {
                stats.present_count += 1;
            } else {
                stats.absent_count += 1;
                if let Some(student) = roster.get(entry.student_id.as_str()) {
                    // 同一学生只列一次
                    if listed_absent.insert(entry.student_id.as_str()) {
                        stats.absent_students.push((*student).clone());
                    }
                }
            }

            let Some(student) = roster.get(entry.student_id.as_str()) else {
                continue;
            };
            match student.gender {
                Gender::Male => {
                    stats.total_male_count += 1;
                    if is_present {
                        stats.total_male_present += 1;
                    } else {
                        stats.total_male_absent += 1;
                    }
                }
                Gender::Female => {
                    stats.total_female_count += 1;
                    if is_present {
                        stats.total_female_present += 1;
                    } else {
                        stats.total_female_absent += 1;
                    }
                }
                Gender::Other(_) => {}
            }
        }

        Ok(Some(stats))
    }
}

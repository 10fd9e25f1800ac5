// ==========================================
// 课堂考勤系统 - 考勤领域模型
// ==========================================
// 自然键: (school_code, class_id, section_id, date)
// 红线: 同一自然键最多一条考勤记录
// ==========================================

use crate::domain::types::AttendanceStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// AttendanceKey - 考勤自然键
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceKey {
    #[serde(rename = "scode")]
    pub school_code: String,
    pub class_id: String,
    pub section_id: String,
    pub date: NaiveDate,
}

impl AttendanceKey {
    pub fn new(
        school_code: impl Into<String>,
        class_id: impl Into<String>,
        section_id: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            school_code: school_code.into(),
            class_id: class_id.into(),
            section_id: section_id.into(),
            date,
        }
    }
}

// ==========================================
// AttendanceEntry - 单个学生的考勤条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub student_id: String,
    pub attendance_status: AttendanceStatus,
    #[serde(default)]
    pub remark: Option<String>,
}

impl AttendanceEntry {
    pub fn present(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            attendance_status: AttendanceStatus::Present,
            remark: None,
        }
    }

    pub fn absent(student_id: impl Into<String>, remark: Option<String>) -> Self {
        Self {
            student_id: student_id.into(),
            attendance_status: AttendanceStatus::Absent,
            remark,
        }
    }
}

// ==========================================
// AttendanceRecord - 一节课的考勤记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,

    // ===== 自然键 =====
    #[serde(rename = "scode")]
    pub school_code: String,
    pub class_id: String,
    pub section_id: String,
    pub date: NaiveDate,

    // ===== 课程信息 =====
    pub time: String,
    pub teacher_name: Option<String>,
    pub lecture_id: Option<String>,

    // ===== 考勤条目（保持提交顺序）=====
    pub entries: Vec<AttendanceEntry>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// 由提交内容创建新记录（生成 id 与时间戳）
    ///
    /// 未指定状态的条目默认为出勤
    pub fn from_submission(submission: &AttendanceSubmission) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            school_code: submission.school_code.clone(),
            class_id: submission.class_id.clone(),
            section_id: submission.section_id.clone(),
            date: submission.date,
            time: submission.time.clone(),
            teacher_name: submission.teacher_name.clone(),
            lecture_id: submission.lecture_id.clone(),
            entries: submission
                .entries
                .iter()
                .map(EntrySubmission::to_entry)
                .collect(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> AttendanceKey {
        AttendanceKey::new(
            self.school_code.clone(),
            self.class_id.clone(),
            self.section_id.clone(),
            self.date,
        )
    }

    /// 按学生ID查找条目（线性扫描，条目规模为一个班级）
    pub fn entry_for(&self, student_id: &str) -> Option<&AttendanceEntry> {
        self.entries.iter().find(|e| e.student_id == student_id)
    }

    /// 统计指定状态的条目数
    pub fn count_status(&self, status: AttendanceStatus) -> usize {
        self.entries
            .iter()
            .filter(|e| e.attendance_status == status)
            .count()
    }

    /// 将提交的条目合并到已有条目中
    ///
    /// 只修改已存在的学生条目；记录中没有的学生ID被忽略。
    ///
    /// # 返回
    /// - true: 至少一个条目发生变化
    pub fn merge_entries(&mut self, updates: &[EntrySubmission]) -> bool {
        let mut changed = false;
        for update in updates {
            let Some(entry) = self
                .entries
                .iter_mut()
                .find(|e| e.student_id == update.student_id)
            else {
                continue;
            };

            let status = update.attendance_status.unwrap_or_default();
            let remark = normalize_remark(&update.remark);
            if entry.attendance_status != status || entry.remark != remark {
                entry.attendance_status = status;
                entry.remark = remark;
                changed = true;
            }
        }
        changed
    }
}

// ==========================================
// AttendanceSubmission - 考勤提交内容
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSubmission {
    #[serde(rename = "scode")]
    pub school_code: String,
    pub class_id: String,
    pub section_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub teacher_name: Option<String>,
    #[serde(default)]
    pub lecture_id: Option<String>,
    #[serde(default)]
    pub entries: Vec<EntrySubmission>,
}

impl AttendanceSubmission {
    pub fn key(&self) -> AttendanceKey {
        AttendanceKey::new(
            self.school_code.clone(),
            self.class_id.clone(),
            self.section_id.clone(),
            self.date,
        )
    }
}

/// 提交的单个条目，状态与备注均可省略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySubmission {
    pub student_id: String,
    #[serde(default)]
    pub attendance_status: Option<AttendanceStatus>,
    #[serde(default)]
    pub remark: Option<String>,
}

impl EntrySubmission {
    pub fn new(student_id: impl Into<String>, status: Option<AttendanceStatus>) -> Self {
        Self {
            student_id: student_id.into(),
            attendance_status: status,
            remark: None,
        }
    }

    pub fn to_entry(&self) -> AttendanceEntry {
        AttendanceEntry {
            student_id: self.student_id.clone(),
            attendance_status: self.attendance_status.unwrap_or_default(),
            remark: normalize_remark(&self.remark),
        }
    }
}

/// 空字符串备注按未填写处理
fn normalize_remark(remark: &Option<String>) -> Option<String> {
    remark.as_ref().filter(|r| !r.is_empty()).cloned()
}

// ==========================================
// AttendancePatch - 按ID部分更新
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePatch {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub teacher_name: Option<String>,
    #[serde(default)]
    pub lecture_id: Option<String>,
    #[serde(default)]
    pub entries: Option<Vec<AttendanceEntry>>,
}

impl AttendancePatch {
    pub fn is_empty(&self) -> bool {
        self.time.is_none()
            && self.teacher_name.is_none()
            && self.lecture_id.is_none()
            && self.entries.is_none()
    }

    /// 将补丁字段覆盖到记录上（未提供的字段保持不变）
    pub fn apply_to(&self, record: &mut AttendanceRecord) {
        if let Some(time) = &self.time {
            record.time = time.clone();
        }
        if let Some(teacher_name) = &self.teacher_name {
            record.teacher_name = Some(teacher_name.clone());
        }
        if let Some(lecture_id) = &self.lecture_id {
            record.lecture_id = Some(lecture_id.clone());
        }
        if let Some(entries) = &self.entries {
            record.entries = entries.clone();
        }
        record.updated_at = Utc::now();
    }
}

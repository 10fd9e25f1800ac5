// ==========================================
// 课堂考勤系统 - 派生视图模型
// ==========================================
// 职责: 汇总、统计、周报、花名册联表视图
// 说明: 均为按请求计算的临时视图，不持久化
// ==========================================

use crate::domain::attendance::AttendanceEntry;
use crate::domain::student::StudentRecord;
use crate::domain::types::WeekDayStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// AttendanceSummary - 学校某日考勤汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub total_students_count: u64,
    pub present_students_count: u64,
    pub absent_students_count: u64,
}

// ==========================================
// AttendanceStats - 班级/分班某日考勤统计
// ==========================================
// 性别计数只覆盖"有考勤条目且能在花名册中找到"的学生
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    /// 该班级/分班在花名册中的学生总数
    pub total_students: u64,
    pub present_count: u64,
    pub absent_count: u64,

    pub total_male_count: u64,
    pub total_female_count: u64,
    pub total_male_present: u64,
    pub total_female_present: u64,
    pub total_male_absent: u64,
    pub total_female_absent: u64,

    /// 缺勤学生的完整花名册记录
    pub absent_students: Vec<StudentRecord>,
}

// ==========================================
// WeekReportEntry - 周报中的一天
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekReportEntry {
    /// 英文星期名 (Monday..Saturday)
    pub day: String,
    pub date: NaiveDate,
    pub status: WeekDayStatus,
}

// ==========================================
// RosterJoinedAttendance - 考勤记录与花名册联表行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterJoinedAttendance {
    pub attendance_object_id: String,
    pub date: NaiveDate,
    pub time: String,
    #[serde(rename = "scode")]
    pub school_code: String,
    pub class_id: String,
    pub section_id: String,
    pub entries: Vec<AttendanceEntry>,
    pub student_info: StudentRecord,
}

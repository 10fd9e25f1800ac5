// ==========================================
// 课堂考勤系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型与派生视图
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod attendance;
pub mod report;
pub mod student;
pub mod types;

// 重导出核心类型
pub use attendance::{
    AttendanceEntry, AttendanceKey, AttendancePatch, AttendanceRecord, AttendanceSubmission,
    EntrySubmission,
};
pub use report::{AttendanceStats, AttendanceSummary, RosterJoinedAttendance, WeekReportEntry};
pub use student::StudentRecord;
pub use types::{AttendanceStatus, Gender, WeekDayStatus};

// ==========================================
// 课堂考勤系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令适配层调用
// ==========================================

pub mod attendance_api;
pub mod error;

// 重导出核心类型
pub use attendance_api::{AttendanceApi, PagingOptions, StatsResponse, STATS_NOT_FOUND_MESSAGE};
pub use error::{ApiError, ApiResult};

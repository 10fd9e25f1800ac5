// ==========================================
// 课堂考勤系统 - 应用层
// ==========================================
// 职责: 应用状态装配与命令适配
// ==========================================

pub mod commands;
pub mod state;

pub use commands::{dispatch, map_api_error, ErrorResponse};
pub use state::{get_default_db_path, AppState};

// ==========================================
// 课堂考勤系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 考勤提交、汇总、统计与周报
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 汇总/周报/联表/提交
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/表结构）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态装配与命令适配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AttendanceStatus, Gender, WeekDayStatus};

// 领域实体
pub use domain::{
    AttendanceEntry, AttendanceKey, AttendancePatch, AttendanceRecord, AttendanceStats,
    AttendanceSubmission, AttendanceSummary, EntrySubmission, RosterJoinedAttendance,
    StudentRecord, WeekReportEntry,
};

// 引擎
pub use engine::{
    AttendanceAggregator, RosterJoinEngine, SubmitOutcome, UpsertCoordinator, WeekReportBuilder,
};

// API
pub use api::{AttendanceApi, PagingOptions, StatsResponse};

// ==========================================
// 系统常量
// ==========================================

/// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 系统名称
pub const APP_NAME: &str = "课堂考勤系统";

// ==========================================
// 课堂考勤系统 - 引擎层
// ==========================================
// 职责: 考勤汇总、周报、花名册联表、提交协调
// 红线: 引擎只依赖仓储 trait，不直接操作数据库
// ==========================================

pub mod aggregator;
pub mod clock;
pub mod roster_join;
pub mod upsert;
pub mod week_report;

#[cfg(test)]
pub(crate) mod test_support;

// 重导出核心引擎
pub use aggregator::AttendanceAggregator;
pub use clock::{Clock, FixedClock, SystemClock};
pub use roster_join::RosterJoinEngine;
pub use upsert::{SubmitOutcome, UpsertCoordinator};
pub use week_report::{week_days, week_start, WeekReportBuilder, WEEK_REPORT_DAYS};

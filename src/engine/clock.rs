// ==========================================
// 课堂考勤系统 - 当前日期注入
// ==========================================
// 周报的"今天"判定依赖当前日期；引擎只接收日期参数，
// API 层通过 Clock 获取，测试中替换为固定日期
// ==========================================

use chrono::NaiveDate;

pub trait Clock: Send + Sync {
    /// 当前本地日期
    fn today(&self) -> NaiveDate;
}

/// 系统时钟（本地时区）
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// 固定日期时钟
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

// ==========================================
// 课堂考勤系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::AttendanceApi;
use crate::config::{ConfigManager, PagingConfigReader};
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::{
    AttendanceAggregator, Clock, RosterJoinEngine, SystemClock, UpsertCoordinator,
    WeekReportBuilder,
};
use crate::repository::{
    AttendanceRepository, SqliteAttendanceRepository, SqliteStudentRepository, StudentRepository,
};

/// 应用状态
///
/// 所有仓储共享同一个数据库连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 考勤API
    pub attendance_api: Arc<AttendanceApi>,

    /// 花名册仓储（用于种子数据导入）
    pub student_repo: Arc<SqliteStudentRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例（使用系统时钟）
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_clock(db_path, Arc::new(SystemClock))
    }

    /// 使用指定时钟创建AppState
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并初始化表结构
    /// 2. 初始化Repository与Engine
    /// 3. 创建AttendanceApi
    pub fn with_clock(db_path: String, clock: Arc<dyn Clock>) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("无法初始化数据库表结构: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let attendance_repo: Arc<dyn AttendanceRepository> =
            Arc::new(SqliteAttendanceRepository::from_connection(conn.clone()));
        let student_repo = Arc::new(SqliteStudentRepository::from_connection(conn.clone()));
        let student_reader: Arc<dyn StudentRepository> = student_repo.clone();

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let paging_config: Arc<dyn PagingConfigReader> = config_manager.clone();

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let aggregator = Arc::new(AttendanceAggregator::new(
            attendance_repo.clone(),
            student_reader.clone(),
        ));
        let week_report = Arc::new(WeekReportBuilder::new(attendance_repo.clone()));
        let roster_join = Arc::new(RosterJoinEngine::new(attendance_repo.clone(), student_reader));
        let upsert = Arc::new(UpsertCoordinator::new(attendance_repo.clone()));

        let attendance_api = Arc::new(AttendanceApi::new(
            attendance_repo,
            aggregator,
            week_report,
            roster_join,
            upsert,
            paging_config,
            clock,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            attendance_api,
            student_repo,
            config_manager,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 LECTURE_ATTENDANCE_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("LECTURE_ATTENDANCE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./lecture_attendance.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("lecture-attendance");
        // 目录创建失败时回落到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("lecture_attendance.db");
        }
    }

    path.to_string_lossy().to_string()
}

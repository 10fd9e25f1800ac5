// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、花名册/提交数据生成等功能
// ==========================================
#![allow(dead_code)]

use chrono::NaiveDate;
use lecture_attendance::domain::{AttendanceSubmission, EntrySubmission, Gender, StudentRecord};
use lecture_attendance::repository::SqliteStudentRepository;
use lecture_attendance::AttendanceStatus;
use rusqlite::Connection;
use std::error::Error;
use tempfile::NamedTempFile;

pub const SCHOOL: &str = "SC01";
pub const CLASS: &str = "C1";
pub const SECTION: &str = "S1";

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是合法 UTF-8")?
        .to_string();

    let conn = Connection::open(&db_path)?;
    lecture_attendance::db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开测试数据库连接（应用统一 PRAGMA）
pub fn open_test_connection(db_path: &str) -> Result<Connection, Box<dyn Error>> {
    Ok(lecture_attendance::db::open_sqlite_connection(db_path)?)
}

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("非法日期")
}

/// 标准花名册：SC01 / C1 / S1 下 2 男 2 女，另有一名其他学校学生
pub fn default_roster() -> Vec<StudentRecord> {
    vec![
        StudentRecord::new("ST1", SCHOOL, Gender::Male)
            .in_class(CLASS, SECTION)
            .with_name("Arjun"),
        StudentRecord::new("ST2", SCHOOL, Gender::Female)
            .in_class(CLASS, SECTION)
            .with_name("Meera"),
        StudentRecord::new("ST3", SCHOOL, Gender::Male)
            .in_class(CLASS, SECTION)
            .with_name("Kabir"),
        StudentRecord::new("ST4", SCHOOL, Gender::Female)
            .in_class(CLASS, SECTION)
            .with_name("Zoya"),
        StudentRecord::new("OT1", "SC02", Gender::Male).in_class(CLASS, SECTION),
    ]
}

/// 写入花名册
pub fn seed_roster(db_path: &str, students: &[StudentRecord]) -> Result<usize, Box<dyn Error>> {
    let repo = SqliteStudentRepository::new(db_path)?;
    Ok(repo.batch_upsert(students)?)
}

/// 构造一次提交（SC01 / C1 / S1）
pub fn submission(date: NaiveDate, entries: &[(&str, Option<AttendanceStatus>)]) -> AttendanceSubmission {
    AttendanceSubmission {
        school_code: SCHOOL.to_string(),
        class_id: CLASS.to_string(),
        section_id: SECTION.to_string(),
        date,
        time: "09:00".to_string(),
        teacher_name: Some("Ms. Rao".to_string()),
        lecture_id: Some("L-101".to_string()),
        entries: entries
            .iter()
            .map(|(id, status)| EntrySubmission::new(*id, *status))
            .collect(),
    }
}

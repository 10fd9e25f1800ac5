// ==========================================
// 课堂考勤系统 - 考勤记录数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 存储: attendance_record + attendance_entry（按 position 保序）
// 写入: 整条记录在事务内落库
// ==========================================

use crate::domain::attendance::{AttendanceEntry, AttendanceKey, AttendanceRecord};
use crate::domain::types::AttendanceStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::filter::{AttendanceFilter, Page, PageRequest};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// AttendanceRepository Trait
// ==========================================
// 用途: 考勤核心所需的存储契约（find / findOne / count / create / update）
// 实现者: SqliteAttendanceRepository
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// 按自然键查询唯一记录
    ///
    /// # 返回
    /// - Ok(None): 不存在（正常状态，不是错误）
    async fn find_by_key(&self, key: &AttendanceKey) -> RepositoryResult<Option<AttendanceRecord>>;

    /// 按过滤条件查询全部记录（按创建时间升序）
    async fn find(&self, filter: &AttendanceFilter) -> RepositoryResult<Vec<AttendanceRecord>>;

    /// 按过滤条件计数
    async fn count(&self, filter: &AttendanceFilter) -> RepositoryResult<u64>;

    /// 分页查询
    async fn find_page(
        &self,
        filter: &AttendanceFilter,
        request: &PageRequest,
    ) -> RepositoryResult<Page<AttendanceRecord>>;

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<AttendanceRecord>>;

    /// 新建记录（包含全部条目）
    async fn create(&self, record: &AttendanceRecord) -> RepositoryResult<()>;

    /// 整条记录覆盖写入（头信息 + 条目）
    ///
    /// # 返回
    /// - Ok(true): 命中并写入
    /// - Ok(false): id 不存在
    async fn update(&self, record: &AttendanceRecord) -> RepositoryResult<bool>;

    /// 按ID删除
    ///
    /// # 返回
    /// - Ok(true): 已删除
    /// - Ok(false): id 不存在
    async fn delete_by_id(&self, id: &str) -> RepositoryResult<bool>;
}

// ==========================================
// SqliteAttendanceRepository - SQLite 实现
// ==========================================
pub struct SqliteAttendanceRepository {
    conn: Arc<Mutex<Connection>>,
}

const RECORD_COLUMNS: &str = r#"
    id, school_code, class_id, section_id, date,
    time, teacher_name, lecture_id, created_at, updated_at
"#;

/// 数据库原始行（字段解析放在 rusqlite 闭包之外，以便返回仓储错误）
struct RecordRow {
    id: String,
    school_code: String,
    class_id: String,
    section_id: String,
    date: String,
    time: String,
    teacher_name: Option<String>,
    lecture_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl RecordRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            school_code: row.get(1)?,
            class_id: row.get(2)?,
            section_id: row.get(3)?,
            date: row.get(4)?,
            time: row.get(5)?,
            teacher_name: row.get(6)?,
            lecture_id: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_record(self, entries: Vec<AttendanceEntry>) -> RepositoryResult<AttendanceRecord> {
        Ok(AttendanceRecord {
            date: parse_date("date", &self.date)?,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            id: self.id,
            school_code: self.school_code,
            class_id: self.class_id,
            section_id: self.section_id,
            time: self.time,
            teacher_name: self.teacher_name,
            lecture_id: self.lecture_id,
            entries,
        })
    }
}

impl SqliteAttendanceRepository {
    /// 创建新的 SqliteAttendanceRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path).map_err(RepositoryError::connection)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn load_entries(conn: &Connection, record_id: &str) -> RepositoryResult<Vec<AttendanceEntry>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT student_id, attendance_status, remark
            FROM attendance_entry
            WHERE record_id = ?1
            ORDER BY position ASC
            "#,
        )?;

        let raw = stmt
            .query_map(params![record_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(student_id, status, remark)| {
                let attendance_status =
                    AttendanceStatus::from_db_str(&status).ok_or_else(|| {
                        RepositoryError::FieldValueError {
                            field: "attendance_status".to_string(),
                            message: format!("未知考勤状态: {}", status),
                        }
                    })?;
                Ok(AttendanceEntry {
                    student_id,
                    attendance_status,
                    remark,
                })
            })
            .collect()
    }

    fn hydrate(conn: &Connection, rows: Vec<RecordRow>) -> RepositoryResult<Vec<AttendanceRecord>> {
        rows.into_iter()
            .map(|row| {
                let entries = Self::load_entries(conn, &row.id)?;
                row.into_record(entries)
            })
            .collect()
    }

    fn insert_entries(
        tx: &rusqlite::Transaction<'_>,
        record_id: &str,
        entries: &[AttendanceEntry],
    ) -> RepositoryResult<()> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO attendance_entry (
                record_id, position, student_id, attendance_status, remark
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )?;
        for (position, entry) in entries.iter().enumerate() {
            stmt.execute(params![
                record_id,
                position as i64,
                entry.student_id,
                entry.attendance_status.to_db_str(),
                entry.remark,
            ])?;
        }
        Ok(())
    }

    fn query_records(
        conn: &Connection,
        sql: &str,
        bind: Vec<String>,
    ) -> RepositoryResult<Vec<AttendanceRecord>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params_from_iter(bind.iter()), RecordRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Self::hydrate(conn, rows)
    }
}

#[async_trait]
impl AttendanceRepository for SqliteAttendanceRepository {
    async fn find_by_key(&self, key: &AttendanceKey) -> RepositoryResult<Option<AttendanceRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM attendance_record
            WHERE school_code = ?1 AND class_id = ?2 AND section_id = ?3 AND date = ?4
            ORDER BY created_at ASC
            LIMIT 1
            "#
        );
        let row = conn
            .query_row(
                &sql,
                params![
                    key.school_code,
                    key.class_id,
                    key.section_id,
                    format_date(key.date)
                ],
                RecordRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => {
                let entries = Self::load_entries(&conn, &row.id)?;
                Ok(Some(row.into_record(entries)?))
            }
            None => Ok(None),
        }
    }

    async fn find(&self, filter: &AttendanceFilter) -> RepositoryResult<Vec<AttendanceRecord>> {
        let conn = self.get_conn()?;
        let (where_clause, bind) = filter.to_where_clause();
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance_record {where_clause} ORDER BY created_at ASC, id ASC"
        );
        Self::query_records(&conn, &sql, bind)
    }

    async fn count(&self, filter: &AttendanceFilter) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        let (where_clause, bind) = filter.to_where_clause();
        let sql = format!("SELECT COUNT(*) FROM attendance_record {where_clause}");
        let count: i64 = conn.query_row(&sql, params_from_iter(bind.iter()), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    async fn find_page(
        &self,
        filter: &AttendanceFilter,
        request: &PageRequest,
    ) -> RepositoryResult<Page<AttendanceRecord>> {
        let conn = self.get_conn()?;
        let (where_clause, bind) = filter.to_where_clause();

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM attendance_record {where_clause}"),
            params_from_iter(bind.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance_record {where_clause} {} LIMIT {} OFFSET {}",
            request.sort.to_order_by(),
            request.limit,
            request.offset(),
        );
        let records = Self::query_records(&conn, &sql, bind)?;

        Ok(Page::new(records, request, total.max(0) as u64))
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<AttendanceRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {RECORD_COLUMNS} FROM attendance_record WHERE id = ?1");
        let row = conn
            .query_row(&sql, params![id], RecordRow::from_row)
            .optional()?;

        match row {
            Some(row) => {
                let entries = Self::load_entries(&conn, &row.id)?;
                Ok(Some(row.into_record(entries)?))
            }
            None => Ok(None),
        }
    }

    async fn create(&self, record: &AttendanceRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(RepositoryError::transaction)?;

        tx.execute(
            r#"
            INSERT INTO attendance_record (
                id, school_code, class_id, section_id, date,
                time, teacher_name, lecture_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.id,
                record.school_code,
                record.class_id,
                record.section_id,
                format_date(record.date),
                record.time,
                record.teacher_name,
                record.lecture_id,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Self::insert_entries(&tx, &record.id, &record.entries)?;

        tx.commit().map_err(RepositoryError::transaction)?;
        Ok(())
    }

    async fn update(&self, record: &AttendanceRecord) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(RepositoryError::transaction)?;

        let affected = tx.execute(
            r#"
            UPDATE attendance_record SET
                school_code = ?2, class_id = ?3, section_id = ?4, date = ?5,
                time = ?6, teacher_name = ?7, lecture_id = ?8, updated_at = ?9
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.school_code,
                record.class_id,
                record.section_id,
                format_date(record.date),
                record.time,
                record.teacher_name,
                record.lecture_id,
                record.updated_at.to_rfc3339(),
            ],
        )?;
        if affected == 0 {
            return Ok(false);
        }

        tx.execute(
            "DELETE FROM attendance_entry WHERE record_id = ?1",
            params![record.id],
        )?;
        Self::insert_entries(&tx, &record.id, &record.entries)?;

        tx.commit().map_err(RepositoryError::transaction)?;
        Ok(true)
    }

    async fn delete_by_id(&self, id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(RepositoryError::transaction)?;
        tx.execute("DELETE FROM attendance_entry WHERE record_id = ?1", params![id])?;
        let affected = tx.execute("DELETE FROM attendance_record WHERE id = ?1", params![id])?;
        tx.commit().map_err(RepositoryError::transaction)?;
        Ok(affected > 0)
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(field: &str, raw: &str) -> RepositoryResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("{} ({})", e, raw),
    })
}

fn parse_timestamp(field: &str, raw: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("{} ({})", e, raw),
        })
}

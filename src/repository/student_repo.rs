// ==========================================
// 课堂考勤系统 - 学生花名册数据仓储
// ==========================================
// 花名册对考勤核心只读；写入方法仅供数据导入与测试夹具使用
// 其余花名册字段存为 profile_json，读取时原样还原
// ==========================================

use crate::domain::student::StudentRecord;
use crate::domain::types::Gender;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// StudentRepository Trait
// ==========================================
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// 统计学校的花名册人数
    async fn count_by_school(&self, school_code: &str) -> RepositoryResult<u64>;

    /// 查询学校全部学生ID
    async fn find_student_ids_by_school(&self, school_code: &str) -> RepositoryResult<Vec<String>>;

    /// 按学生ID集合批量查询（ID 不存在时静默跳过）
    async fn find_by_student_ids(&self, student_ids: &[String]) -> RepositoryResult<Vec<StudentRecord>>;

    /// 统计班级/分班的花名册人数
    async fn count_by_class_section(&self, class_id: &str, section_id: &str) -> RepositoryResult<u64>;
}

// ==========================================
// SqliteStudentRepository - SQLite 实现
// ==========================================
pub struct SqliteStudentRepository {
    conn: Arc<Mutex<Connection>>,
}

struct StudentRow {
    student_id: String,
    school_code: String,
    gender: Option<String>,
    class_id: Option<String>,
    section_id: Option<String>,
    name: Option<String>,
    profile_json: Option<String>,
}

impl StudentRow {
    fn into_record(self) -> RepositoryResult<StudentRecord> {
        let profile = match self.profile_json.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str::<Map<String, Value>>(raw)?,
            _ => Map::new(),
        };
        Ok(StudentRecord {
            student_id: self.student_id,
            school_code: self.school_code,
            gender: self
                .gender
                .as_deref()
                .map(Gender::from_db_str)
                .unwrap_or_default(),
            class_id: self.class_id,
            section_id: self.section_id,
            name: self.name,
            profile,
        })
    }
}

impl SqliteStudentRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path).map_err(RepositoryError::connection)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入或覆盖花名册记录（按 student_id）
    pub fn upsert(&self, student: &StudentRecord) -> RepositoryResult<()> {
        self.batch_upsert(std::slice::from_ref(student)).map(|_| ())
    }

    /// 批量写入花名册（事务化）
    ///
    /// # 返回
    /// - Ok(usize): 写入条数
    pub fn batch_upsert(&self, students: &[StudentRecord]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(RepositoryError::transaction)?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO student (
                    student_id, school_code, gender, class_id, section_id, name, profile_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for student in students {
                let profile_json = serde_json::to_string(&student.profile)?;
                stmt.execute(params![
                    student.student_id,
                    student.school_code,
                    student.gender.to_db_str(),
                    student.class_id,
                    student.section_id,
                    student.name,
                    profile_json,
                ])?;
            }
        }
        tx.commit().map_err(RepositoryError::transaction)?;

        tracing::debug!("花名册写入完成: {} 条", students.len());
        Ok(students.len())
    }
}

#[async_trait]
impl StudentRepository for SqliteStudentRepository {
    async fn count_by_school(&self, school_code: &str) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM student WHERE school_code = ?1",
            params![school_code],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    async fn find_student_ids_by_school(&self, school_code: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT student_id FROM student WHERE school_code = ?1 ORDER BY student_id")?;
        let ids = stmt
            .query_map(params![school_code], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    async fn find_by_student_ids(&self, student_ids: &[String]) -> RepositoryResult<Vec<StudentRecord>> {
        if student_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let placeholders = (1..=student_ids.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"
            SELECT student_id, school_code, gender, class_id, section_id, name, profile_json
            FROM student
            WHERE student_id IN ({placeholders})
            ORDER BY student_id
            "#
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(student_ids.iter()), |row| {
                Ok(StudentRow {
                    student_id: row.get(0)?,
                    school_code: row.get(1)?,
                    gender: row.get(2)?,
                    class_id: row.get(3)?,
                    section_id: row.get(4)?,
                    name: row.get(5)?,
                    profile_json: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(StudentRow::into_record).collect()
    }

    async fn count_by_class_section(&self, class_id: &str, section_id: &str) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM student WHERE class_id = ?1 AND section_id = ?2",
            params![class_id, section_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}

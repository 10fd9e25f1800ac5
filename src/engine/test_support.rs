// ==========================================
// 引擎单元测试共用的 Mock 仓储
// ==========================================

use crate::domain::attendance::{AttendanceEntry, AttendanceKey, AttendanceRecord};
use crate::domain::student::StudentRecord;
use crate::domain::types::AttendanceStatus;
use crate::repository::{
    AttendanceFilter, AttendanceRepository, Page, PageRequest, RepositoryResult, StudentRepository,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub(crate) fn record_with(
    school_code: &str,
    class_id: &str,
    section_id: &str,
    date: NaiveDate,
    entries: &[(&str, AttendanceStatus)],
) -> AttendanceRecord {
    let now = Utc::now();
    AttendanceRecord {
        id: uuid::Uuid::new_v4().to_string(),
        school_code: school_code.to_string(),
        class_id: class_id.to_string(),
        section_id: section_id.to_string(),
        date,
        time: "09:00".to_string(),
        teacher_name: None,
        lecture_id: None,
        entries: entries
            .iter()
            .map(|(id, status)| match status {
                AttendanceStatus::Present => AttendanceEntry::present(*id),
                AttendanceStatus::Absent => AttendanceEntry::absent(*id, None),
            })
            .collect(),
        created_at: now,
        updated_at: now,
    }
}

// ==========================================
// MockAttendanceRepository
// ==========================================
#[derive(Default)]
pub(crate) struct MockAttendanceRepository {
    records: Mutex<Vec<AttendanceRecord>>,
    /// 按日期注入的查询延迟（用于打乱并发完成顺序）
    delays: HashMap<NaiveDate, Duration>,
}

impl MockAttendanceRepository {
    pub(crate) fn with_records(records: Vec<AttendanceRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            delays: HashMap::new(),
        }
    }

    pub(crate) fn with_delay(mut self, date: NaiveDate, delay: Duration) -> Self {
        self.delays.insert(date, delay);
        self
    }

    pub(crate) fn snapshot(&self) -> Vec<AttendanceRecord> {
        self.records.lock().unwrap().clone()
    }

    fn matches(record: &AttendanceRecord, filter: &AttendanceFilter) -> bool {
        filter.school_code.as_ref().map_or(true, |v| *v == record.school_code)
            && filter.class_id.as_ref().map_or(true, |v| *v == record.class_id)
            && filter.section_id.as_ref().map_or(true, |v| *v == record.section_id)
            && filter.date.map_or(true, |v| v == record.date)
    }
}

#[async_trait]
impl AttendanceRepository for MockAttendanceRepository {
    async fn find_by_key(&self, key: &AttendanceKey) -> RepositoryResult<Option<AttendanceRecord>> {
        if let Some(delay) = self.delays.get(&key.date) {
            tokio::time::sleep(*delay).await;
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.key() == *key)
            .cloned())
    }

    async fn find(&self, filter: &AttendanceFilter) -> RepositoryResult<Vec<AttendanceRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| Self::matches(r, filter))
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &AttendanceFilter) -> RepositoryResult<u64> {
        Ok(self.find(filter).await?.len() as u64)
    }

    async fn find_page(
        &self,
        filter: &AttendanceFilter,
        request: &PageRequest,
    ) -> RepositoryResult<Page<AttendanceRecord>> {
        let all = self.find(filter).await?;
        let total = all.len() as u64;
        let results = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit as usize)
            .collect();
        Ok(Page::new(results, request, total))
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<AttendanceRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn create(&self, record: &AttendanceRecord) -> RepositoryResult<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn update(&self, record: &AttendanceRecord) -> RepositoryResult<bool> {
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_id(&self, id: &str) -> RepositoryResult<bool> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }
}

// ==========================================
// MockStudentRepository
// ==========================================
#[derive(Default)]
pub(crate) struct MockStudentRepository {
    students: Vec<StudentRecord>,
}

impl MockStudentRepository {
    pub(crate) fn with_students(students: Vec<StudentRecord>) -> Self {
        Self { students }
    }
}

#[async_trait]
impl StudentRepository for MockStudentRepository {
    async fn count_by_school(&self, school_code: &str) -> RepositoryResult<u64> {
        Ok(self
            .students
            .iter()
            .filter(|s| s.school_code == school_code)
            .count() as u64)
    }

    async fn find_student_ids_by_school(&self, school_code: &str) -> RepositoryResult<Vec<String>> {
        Ok(self
            .students
            .iter()
            .filter(|s| s.school_code == school_code)
            .map(|s| s.student_id.clone())
            .collect())
    }

    async fn find_by_student_ids(&self, student_ids: &[String]) -> RepositoryResult<Vec<StudentRecord>> {
        Ok(self
            .students
            .iter()
            .filter(|s| student_ids.contains(&s.student_id))
            .cloned()
            .collect())
    }

    async fn count_by_class_section(&self, class_id: &str, section_id: &str) -> RepositoryResult<u64> {
        Ok(self
            .students
            .iter()
            .filter(|s| {
                s.class_id.as_deref() == Some(class_id) && s.section_id.as_deref() == Some(section_id)
            })
            .count() as u64)
    }
}

// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: 验证 SQLite 仓储的持久化、条目顺序、分页排序与级联删除
// ==========================================

mod test_helpers;

use lecture_attendance::domain::AttendanceRecord;
use lecture_attendance::logging;
use lecture_attendance::repository::{
    AttendanceFilter, AttendanceRepository, PageRequest, SortField, SortOrder,
    SqliteAttendanceRepository, SqliteStudentRepository, StudentRepository,
};
use lecture_attendance::{AttendanceKey, AttendanceStatus, EntrySubmission};
use test_helpers::{ymd, CLASS, SCHOOL, SECTION};

fn record_on(date: chrono::NaiveDate, student_count: usize) -> AttendanceRecord {
    let mut sub = test_helpers::submission(date, &[]);
    // 学号倒序生成，确保读取顺序来自写入位置而不是字典序
    sub.entries = (0..student_count)
        .map(|i| {
            let status = if i % 3 == 0 {
                AttendanceStatus::Absent
            } else {
                AttendanceStatus::Present
            };
            EntrySubmission::new(format!("ST{:03}", 999 - i), Some(status))
        })
        .collect();
    AttendanceRecord::from_submission(&sub)
}

#[tokio::test]
async fn test_record_round_trip_preserves_entry_order() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let repo = SqliteAttendanceRepository::new(&db_path).expect("Failed to create repo");

    let record = record_on(ymd(2024, 3, 4), 40);
    repo.create(&record).await.unwrap();

    let key = AttendanceKey::new(SCHOOL, CLASS, SECTION, ymd(2024, 3, 4));
    let loaded = repo.find_by_key(&key).await.unwrap().expect("记录应存在");

    assert_eq!(loaded.id, record.id);
    assert_eq!(loaded.entries.len(), 40);
    assert_eq!(loaded.entries, record.entries);
    assert_eq!(loaded.count_status(AttendanceStatus::Absent), 14);
    assert_eq!(loaded.teacher_name.as_deref(), Some("Ms. Rao"));
}

#[tokio::test]
async fn test_update_replaces_entries_and_delete_cascades() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let repo = SqliteAttendanceRepository::new(&db_path).expect("Failed to create repo");

    let mut record = record_on(ymd(2024, 3, 4), 3);
    repo.create(&record).await.unwrap();

    record.entries.truncate(1);
    record.time = "10:30".to_string();
    assert!(repo.update(&record).await.unwrap());

    let loaded = repo.find_by_id(&record.id).await.unwrap().unwrap();
    assert_eq!(loaded.entries.len(), 1);
    assert_eq!(loaded.time, "10:30");

    assert!(repo.delete_by_id(&record.id).await.unwrap());
    assert!(!repo.delete_by_id(&record.id).await.unwrap());
    assert!(repo.find_by_id(&record.id).await.unwrap().is_none());

    let conn = test_helpers::open_test_connection(&db_path).unwrap();
    let orphan_entries: i64 = conn
        .query_row("SELECT COUNT(*) FROM attendance_entry", [], |row| row.get(0))
        .unwrap();
    assert_eq!(orphan_entries, 0);
}

#[tokio::test]
async fn test_paging_and_sorting() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let repo = SqliteAttendanceRepository::new(&db_path).expect("Failed to create repo");

    for day in [5, 3, 8, 4, 6] {
        repo.create(&record_on(ymd(2024, 3, day), 1)).await.unwrap();
    }

    let request = PageRequest {
        page: 2,
        limit: 2,
        sort: SortOrder {
            field: SortField::Date,
            descending: false,
        },
    };
    let page = repo
        .find_page(&AttendanceFilter::default(), &request)
        .await
        .unwrap();

    assert_eq!(page.total_results, 5);
    assert_eq!(page.total_pages, 3);
    let dates: Vec<_> = page.results.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![ymd(2024, 3, 5), ymd(2024, 3, 6)]);

    let filtered = AttendanceFilter::class_section_on(CLASS, SECTION, ymd(2024, 3, 8));
    assert_eq!(repo.count(&filtered).await.unwrap(), 1);
}

#[tokio::test]
async fn test_student_repository_queries() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_roster(&db_path, &test_helpers::default_roster()).unwrap();
    let repo = SqliteStudentRepository::new(&db_path).expect("Failed to create repo");

    assert_eq!(repo.count_by_school(SCHOOL).await.unwrap(), 4);
    assert_eq!(repo.count_by_class_section(CLASS, SECTION).await.unwrap(), 5);

    let mut ids = repo.find_student_ids_by_school(SCHOOL).await.unwrap();
    ids.sort();
    assert_eq!(ids, vec!["ST1", "ST2", "ST3", "ST4"]);

    let found = repo
        .find_by_student_ids(&["ST2".to_string(), "NOPE".to_string()])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name.as_deref(), Some("Meera"));

    assert!(repo.find_by_student_ids(&[]).await.unwrap().is_empty());
}

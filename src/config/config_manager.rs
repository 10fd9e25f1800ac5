// ==========================================
// 课堂考勤系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::paging_config_trait::PagingConfigReader;
use crate::db::open_sqlite_connection;
use crate::repository::SortOrder;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const PAGING_DEFAULT_LIMIT: &str = "paging.default_limit";
    pub const PAGING_MAX_LIMIT: &str = "paging.max_limit";
    pub const ATTENDANCE_DEFAULT_SORT: &str = "attendance.default_sort";
}

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const DEFAULT_MAX_PAGE_LIMIT: u32 = 100;
pub const DEFAULT_SORT: &str = "date:desc";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        tracing::info!(key, value, "配置已更新");
        Ok(())
    }

    /// 读取并解析配置值；缺失或解析失败时回落到默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr + Copy,
    {
        match self.get_config_value(key)? {
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(key, raw = %raw, "配置值无法解析，使用默认值");
                    Ok(default)
                }
            },
            None => Ok(default),
        }
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> ConfigResult<HashMap<String, String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global'")?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        Ok(pairs)
    }
}

#[async_trait]
impl PagingConfigReader for ConfigManager {
    async fn get_default_page_limit(&self) -> ConfigResult<u32> {
        let v = self.get_parsed_or_default(config_keys::PAGING_DEFAULT_LIMIT, DEFAULT_PAGE_LIMIT)?;
        Ok(v.max(1))
    }

    async fn get_max_page_limit(&self) -> ConfigResult<u32> {
        let v = self.get_parsed_or_default(config_keys::PAGING_MAX_LIMIT, DEFAULT_MAX_PAGE_LIMIT)?;
        Ok(v.max(1))
    }

    async fn get_default_sort(&self) -> ConfigResult<String> {
        let key = config_keys::ATTENDANCE_DEFAULT_SORT;
        match self.get_config_value(key)? {
            Some(raw) if SortOrder::parse(&raw).is_some() => Ok(raw.trim().to_string()),
            Some(raw) => {
                tracing::warn!(key, raw = %raw, "排序配置无效，使用默认值");
                Ok(DEFAULT_SORT.to_string())
            }
            None => Ok(DEFAULT_SORT.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_missing() {
        let manager = setup_manager();
        assert_eq!(manager.get_default_page_limit().await.unwrap(), DEFAULT_PAGE_LIMIT);
        assert_eq!(manager.get_max_page_limit().await.unwrap(), DEFAULT_MAX_PAGE_LIMIT);
        assert_eq!(manager.get_default_sort().await.unwrap(), DEFAULT_SORT);
    }

    #[tokio::test]
    async fn test_override_and_bad_value_fallback() {
        let manager = setup_manager();
        manager
            .set_global_config_value(config_keys::PAGING_DEFAULT_LIMIT, "25")
            .unwrap();
        manager
            .set_global_config_value(config_keys::PAGING_MAX_LIMIT, "lots")
            .unwrap();

        assert_eq!(manager.get_default_page_limit().await.unwrap(), 25);
        assert_eq!(manager.get_max_page_limit().await.unwrap(), DEFAULT_MAX_PAGE_LIMIT);
        assert_eq!(manager.get_config_snapshot().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_bad_default_sort_falls_back() {
        let manager = setup_manager();
        manager
            .set_global_config_value(config_keys::ATTENDANCE_DEFAULT_SORT, "name:up")
            .unwrap();
        assert_eq!(manager.get_default_sort().await.unwrap(), DEFAULT_SORT);

        manager
            .set_global_config_value(config_keys::ATTENDANCE_DEFAULT_SORT, "time:asc")
            .unwrap();
        assert_eq!(manager.get_default_sort().await.unwrap(), "time:asc");
    }
}

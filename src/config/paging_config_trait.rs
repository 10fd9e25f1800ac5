// ==========================================
// 课堂考勤系统 - 分页配置读取 Trait
// ==========================================
// 职责: 列表查询所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait PagingConfigReader: Send + Sync {
    /// 默认每页条数
    ///
    /// # 默认值
    /// - 10
    async fn get_default_page_limit(&self) -> Result<u32, Box<dyn Error + Send + Sync>>;

    /// 每页条数上限
    ///
    /// # 默认值
    /// - 100
    async fn get_max_page_limit(&self) -> Result<u32, Box<dyn Error + Send + Sync>>;

    /// 默认排序（`field:asc|desc`）
    ///
    /// # 默认值
    /// - date:desc
    async fn get_default_sort(&self) -> Result<String, Box<dyn Error + Send + Sync>>;
}

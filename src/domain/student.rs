// ==========================================
// 课堂考勤系统 - 学生花名册模型
// ==========================================
// 花名册由外部系统维护，考勤核心只读
// 除性别与学生ID外，其余人口/行政字段作为不透明对象保留
// ==========================================

use crate::domain::types::Gender;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub student_id: String,
    #[serde(rename = "scode")]
    pub school_code: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,

    /// 其余花名册字段（原样透传，不做校验）
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl StudentRecord {
    pub fn new(student_id: impl Into<String>, school_code: impl Into<String>, gender: Gender) -> Self {
        Self {
            student_id: student_id.into(),
            school_code: school_code.into(),
            gender,
            class_id: None,
            section_id: None,
            name: None,
            profile: Map::new(),
        }
    }

    pub fn in_class(mut self, class_id: impl Into<String>, section_id: impl Into<String>) -> Self {
        self.class_id = Some(class_id.into());
        self.section_id = Some(section_id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.profile.insert(key.into(), value);
        self
    }
}

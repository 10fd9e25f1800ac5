// ==========================================
// 课堂考勤系统 - 领域类型定义
// ==========================================
// 职责: 考勤状态、性别、周报状态等枚举
// 序列化格式: 与存储层字符串一致
// ==========================================

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ==========================================
// 考勤状态 (Attendance Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    #[default]
    Present, // 出勤
    Absent, // 缺勤
}

impl AttendanceStatus {
    /// 转换为数据库存储字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        }
    }

    /// 从数据库字符串解析
    ///
    /// 未知取值返回 None（由调用方决定如何处理）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            _ => None,
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 性别 (Gender)
// ==========================================
// 花名册中的原始取值为 "Male" / "Female"，其余取值原样保留
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    Other(String),
}

impl Gender {
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "Male" => Gender::Male,
            "Female" => Gender::Female,
            other => Gender::Other(other.to_string()),
        }
    }

    pub fn to_db_str(&self) -> &str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other(s) => s.as_str(),
        }
    }
}

impl Default for Gender {
    fn default() -> Self {
        Gender::Other(String::new())
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl Serialize for Gender {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.to_db_str())
    }
}

impl<'de> Deserialize<'de> for Gender {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Gender::from_db_str(&raw))
    }
}

// ==========================================
// 周报日状态 (Week Day Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekDayStatus {
    Pending, // 未提交
    Done,    // 已完成
}

impl fmt::Display for WeekDayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekDayStatus::Pending => write!(f, "Pending"),
            WeekDayStatus::Done => write!(f, "Done"),
        }
    }
}

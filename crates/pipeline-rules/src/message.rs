//! 日志消息模型

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

pub const FIELD_MESSAGE: &str = "message";
pub const FIELD_SOURCE: &str = "source";
pub const FIELD_TIMESTAMP: &str = "timestamp";

/// 流经管道的一条消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    fields: Map<String, JsonValue>,
    #[serde(default)]
    dropped: bool,
}

impl Message {
    /// 创建带标准字段（message / source / timestamp）的新消息
    pub fn new(message: impl Into<String>, source: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(FIELD_MESSAGE.to_string(), JsonValue::String(message.into()));
        fields.insert(FIELD_SOURCE.to_string(), JsonValue::String(source.into()));
        fields.insert(
            FIELD_TIMESTAMP.to_string(),
            JsonValue::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        Self::from_fields(fields)
    }

    /// 从任意字段集合创建
    pub fn from_fields(fields: Map<String, JsonValue>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            fields,
            dropped: false,
        }
    }

    /// 从 JSON 对象创建（非对象输入视为解析失败）
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let fields: Map<String, JsonValue> = serde_json::from_str(json)?;
        Ok(Self::from_fields(fields))
    }

    /// 获取字段值
    ///
    /// 先按完整字段名查找，找不到时按点号分隔的路径逐级查找，
    /// 支持数组索引访问，如 "order.items.0.name"。
    pub fn get_field(&self, path: &str) -> Option<&JsonValue> {
        if let Some(value) = self.fields.get(path) {
            return Some(value);
        }

        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;

        for part in parts {
            match current {
                JsonValue::Object(map) => {
                    current = map.get(part)?;
                }
                JsonValue::Array(arr) => {
                    let index: usize = part.parse().ok()?;
                    current = arr.get(index)?;
                }
                _ => return None,
            }
        }

        Some(current)
    }

    pub fn has_field(&self, path: &str) -> bool {
        self.get_field(path).is_some()
    }

    /// 设置顶层字段，返回旧值
    pub fn set_field(&mut self, name: impl Into<String>, value: JsonValue) -> Option<JsonValue> {
        self.fields.insert(name.into(), value)
    }

    pub fn remove_field(&mut self, name: &str) -> Option<JsonValue> {
        self.fields.remove(name)
    }

    pub fn fields(&self) -> &Map<String, JsonValue> {
        &self.fields
    }

    /// 标记消息被丢弃（由调度方决定是否继续路由）
    pub fn mark_dropped(&mut self) {
        self.dropped = true;
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.fields.clone())
    }
}

//! 规则语言的值模型
//!
//! 函数结果统一为 `Option<Value>`：`None` 表示“没有值”，
//! 与某个类型的零值（`false`、`0`、空字符串）在类型层面可以区分。

use crate::message::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

/// 运行期值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Long(i64),
    Double(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Message(Box<Message>),
}

/// 语义类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// 任意类型（无类型参数）
    Any,
    /// 无返回值 / 可为空
    Void,
    Bool,
    Long,
    Double,
    String,
    List,
    Map,
    Message,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Any => "any",
            Self::Void => "void",
            Self::Bool => "bool",
            Self::Long => "long",
            Self::Double => "double",
            Self::String => "string",
            Self::List => "list",
            Self::Map => "map",
            Self::Message => "message",
        };
        write!(f, "{}", s)
    }
}

impl ValueType {
    /// 值是否满足该声明类型
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Void => false,
            other => *other == value.value_type(),
        }
    }
}

impl Value {
    /// 运行期类型标签
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Long(_) => ValueType::Long,
            Self::Double(_) => ValueType::Double,
            Self::String(_) => ValueType::String,
            Self::List(_) => ValueType::List,
            Self::Map(_) => ValueType::Map,
            Self::Message(_) => ValueType::Message,
        }
    }

    /// 从消息字段的 JSON 值转换
    ///
    /// `null` 视为没有值；数组和对象中的 `null` 元素会被丢弃。
    pub fn from_json(json: &JsonValue) -> Option<Self> {
        match json {
            JsonValue::Null => None,
            JsonValue::Bool(b) => Some(Self::Bool(*b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Long(i)),
                None => n.as_f64().map(Self::Double),
            },
            JsonValue::String(s) => Some(Self::String(s.clone())),
            JsonValue::Array(arr) => Some(Self::List(arr.iter().filter_map(Self::from_json).collect())),
            JsonValue::Object(obj) => Some(Self::Map(
                obj.iter()
                    .filter_map(|(k, v)| Self::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
        }
    }

    /// 转换为 JSON 值（写回消息字段时使用）
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Long(i) => JsonValue::from(*i),
            // NaN / 无穷大无法用 JSON 表示
            Self::Double(d) => serde_json::Number::from_f64(*d)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Message(message) => message.to_json(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// 数值视图：整数、小数以及可解析为数字的字符串
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Long(i) => Some(*i as f64),
            Self::Double(d) => Some(*d),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Long(i) => write!(f, "{}", i),
            Self::Double(d) => write!(f, "{}", d),
            Self::String(s) => f.write_str(s),
            Self::List(_) | Self::Map(_) | Self::Message(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Long(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<Message> for Value {
    fn from(message: Message) -> Self {
        Self::Message(Box::new(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        assert_eq!(Value::from_json(&json!(null)), None);
        assert_eq!(Value::from_json(&json!(42)), Some(Value::Long(42)));
        assert_eq!(Value::from_json(&json!(1.5)), Some(Value::Double(1.5)));
        assert_eq!(
            Value::from_json(&json!(["a", null, 1])),
            Some(Value::List(vec![Value::from("a"), Value::Long(1)]))
        );
    }

    #[test]
    fn test_canonical_string() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Long(-3).to_string(), "-3");
        assert_eq!(Value::from("TRUE").to_string(), "TRUE");
        assert_eq!(
            Value::List(vec![Value::Long(1), Value::from("x")]).to_string(),
            r#"[1,"x"]"#
        );
    }

    #[test]
    fn test_value_type_accepts() {
        assert!(ValueType::Any.accepts(&Value::Long(1)));
        assert!(ValueType::Long.accepts(&Value::Long(1)));
        assert!(!ValueType::Long.accepts(&Value::Double(1.0)));
        assert!(!ValueType::Void.accepts(&Value::Bool(false)));
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(Value::from(" 12 ").as_f64(), Some(12.0));
        assert_eq!(Value::Long(7).as_f64(), Some(7.0));
        assert_eq!(Value::Bool(true).as_f64(), None);
    }
}

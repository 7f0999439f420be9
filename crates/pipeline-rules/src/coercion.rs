//! 类型转换库
//!
//! 把松散类型的字段值转换为目标基本类型。转换永不失败：
//! 无法解析的输入退化为调用方给定的默认值（或类型的零值）。

use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// 转换为布尔值
///
/// 取值的规范字符串表示，忽略大小写等于 `true` 时为真，其余一律为假。
/// 没有值时为假。
pub fn to_bool(value: Option<&Value>) -> bool {
    value.is_some_and(|v| v.to_string().eq_ignore_ascii_case("true"))
}

/// 转换为整数
///
/// 小数向零截断并在 i64 范围内饱和；字符串先按整数解析，再按小数解析。
pub fn to_long(value: Option<&Value>, default: i64) -> i64 {
    let converted = match value {
        Some(Value::Long(i)) => Some(*i),
        Some(Value::Double(d)) => truncate(*d),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    };

    converted.unwrap_or_else(|| {
        trace!(value = ?value, default, "整数转换退化为默认值");
        default
    })
}

/// 转换为小数
pub fn to_double(value: Option<&Value>, default: f64) -> f64 {
    let converted = match value {
        Some(Value::Long(i)) => Some(*i as f64),
        Some(Value::Double(d)) => Some(*d),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    converted.unwrap_or_else(|| {
        trace!(value = ?value, default, "小数转换退化为默认值");
        default
    })
}

/// 转换为字符串（规范字符串表示）
pub fn to_string(value: Option<&Value>, default: &str) -> String {
    match value {
        Some(v) => v.to_string(),
        None => default.to_string(),
    }
}

fn truncate(d: f64) -> Option<i64> {
    // `as` 对超出范围的值做饱和转换
    d.is_finite().then(|| d.trunc() as i64)
}

/// 参数转换
///
/// 当实参的运行期类型与参数声明类型不一致时应用，使用各类型的零值作为默认值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    ToBool,
    ToLong,
    ToDouble,
    ToString,
}

impl Transform {
    /// 与声明类型对应的默认转换
    pub fn for_type(value_type: ValueType) -> Option<Self> {
        match value_type {
            ValueType::Bool => Some(Self::ToBool),
            ValueType::Long => Some(Self::ToLong),
            ValueType::Double => Some(Self::ToDouble),
            ValueType::String => Some(Self::ToString),
            _ => None,
        }
    }

    pub fn apply(&self, value: Option<&Value>) -> Value {
        match self {
            Self::ToBool => Value::Bool(to_bool(value)),
            Self::ToLong => Value::Long(to_long(value, 0)),
            Self::ToDouble => Value::Double(to_double(value, 0.0)),
            Self::ToString => Value::String(to_string(value, "")),
        }
    }
}

//! 函数描述符
//!
//! 描述函数名、返回类型和有序参数列表。描述符在注册时创建且不可变，
//! 既用于参数绑定，也作为元数据导出给外部工具（自动补全、校验）。

use crate::coercion::Transform;
use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};

/// 参数描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub declared_type: ValueType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParameterDescriptor {
    /// 必填参数；带有类型的参数默认使用该类型的转换
    pub fn new(name: impl Into<String>, declared_type: ValueType) -> Self {
        Self {
            name: name.into(),
            declared_type,
            required: true,
            default_value: None,
            transform: Transform::for_type(declared_type),
            description: None,
        }
    }

    /// 无类型参数
    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Any)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Bool)
    }

    pub fn long(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Long)
    }

    pub fn double(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Double)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::String)
    }

    pub fn message(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Message)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// 未绑定时使用的默认值（隐含可选）
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self.required = false;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// 禁用类型转换，类型不符时由取值方报错
    pub fn without_transform(mut self) -> Self {
        self.transform = None;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// 函数描述符
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub return_type: ValueType,
    pub params: Vec<ParameterDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FunctionDescriptor {
    pub fn builder(name: impl Into<String>) -> FunctionDescriptorBuilder {
        FunctionDescriptorBuilder {
            name: name.into(),
            return_type: ValueType::Void,
            params: Vec::new(),
            description: None,
        }
    }

    /// 按名称查找参数位置
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    pub fn param(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.params.iter().find(|p| p.name == name)
    }

    /// 第一个重复的参数名
    pub(crate) fn duplicate_param(&self) -> Option<&str> {
        self.params.iter().enumerate().find_map(|(i, p)| {
            self.params[..i]
                .iter()
                .any(|earlier| earlier.name == p.name)
                .then_some(p.name.as_str())
        })
    }

    /// 导出为 JSON 元数据
    pub fn to_metadata(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn from_metadata(metadata: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(metadata)
    }
}

/// 描述符构建器
#[derive(Debug)]
pub struct FunctionDescriptorBuilder {
    name: String,
    return_type: ValueType,
    params: Vec<ParameterDescriptor>,
    description: Option<String>,
}

impl FunctionDescriptorBuilder {
    pub fn returns(mut self, return_type: ValueType) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn param(mut self, param: ParameterDescriptor) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = ParameterDescriptor>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn build(self) -> FunctionDescriptor {
        FunctionDescriptor {
            name: self.name,
            return_type: self.return_type,
            params: self.params,
            description: self.description,
        }
    }
}

//! 规则定义（解析器输出）
//!
//! 解析器把规则源码转换为这里的 JSON 结构，本模块只负责反序列化，
//! 名称解析和参数绑定由 [`RuleCompiler`](crate::compiler::RuleCompiler) 完成。

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use uuid::Uuid;

/// 规则定义：一个 when 条件加一组有序的 then 动作
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: String,
    pub name: String,
    pub when: AstNode,
    #[serde(default)]
    pub then: Vec<AstNode>,
}

impl RuleDefinition {
    pub fn new(name: impl Into<String>, when: AstNode, then: Vec<AstNode>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            when,
            then,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// AST 节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AstNode {
    /// 字面量
    Literal { value: JsonValue },
    /// 消息字段引用
    Field { name: String },
    /// 函数调用
    Call {
        function: String,
        #[serde(default)]
        args: Vec<AstNode>,
        #[serde(default)]
        named: BTreeMap<String, AstNode>,
    },
}

impl AstNode {
    pub fn literal(value: impl Into<JsonValue>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    pub fn field(name: impl Into<String>) -> Self {
        Self::Field { name: name.into() }
    }

    pub fn call(function: impl Into<String>, args: Vec<AstNode>) -> Self {
        Self::Call {
            function: function.into(),
            args,
            named: BTreeMap::new(),
        }
    }

    /// 追加命名参数（仅对调用节点有效）
    pub fn with_named(mut self, name: impl Into<String>, node: AstNode) -> Self {
        if let Self::Call { named, .. } = &mut self {
            named.insert(name.into(), node);
        }
        self
    }
}

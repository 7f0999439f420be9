//! 已绑定的表达式树
//!
//! 由 [`RuleCompiler`](crate::compiler::RuleCompiler) 从解析器输出构建。
//! 构建完成后不可变，可以在多个 worker 之间共享。

use crate::context::{ErrorKind, EvaluationContext};
use crate::error::Result;
use crate::function::{FunctionArgs, is_unresolved};
use crate::value::Value;
use tracing::debug;

/// 表达式节点
#[derive(Debug)]
pub enum Expr {
    /// 字面量；`None` 为 null 字面量
    Constant(Option<Value>),
    /// 当前消息的字段引用
    Field(String),
    /// 函数调用
    Call(CallExpr),
}

impl Expr {
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(Some(value.into()))
    }

    pub fn null() -> Self {
        Self::Constant(None)
    }

    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn call(name: impl Into<String>, args: FunctionArgs) -> Self {
        Self::Call(CallExpr {
            name: name.into(),
            args,
        })
    }

    /// 求值
    ///
    /// 字面量和字段引用直接返回，不经过注册表。
    pub fn evaluate(&self, context: &mut EvaluationContext<'_>) -> Result<Option<Value>> {
        match self {
            Self::Constant(value) => Ok(value.clone()),
            Self::Field(name) => Ok(context
                .current_message()
                .get_field(name)
                .and_then(Value::from_json)),
            Self::Call(call) => call.evaluate(context),
        }
    }

    /// 是否为未注册函数的调用
    pub fn is_unresolved_call(&self) -> bool {
        matches!(self, Self::Call(call) if call.is_unresolved())
    }

    /// 调用节点引用的函数名
    pub fn function_name(&self) -> Option<&str> {
        match self {
            Self::Call(call) => Some(call.name()),
            _ => None,
        }
    }
}

/// 函数调用节点
#[derive(Debug)]
pub struct CallExpr {
    /// 源码中引用的函数名（未解析时与占位函数的名称不同）
    name: String,
    args: FunctionArgs,
}

impl CallExpr {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &FunctionArgs {
        &self.args
    }

    pub fn is_unresolved(&self) -> bool {
        is_unresolved(self.args.function().as_ref())
    }

    pub fn evaluate(&self, context: &mut EvaluationContext<'_>) -> Result<Option<Value>> {
        if self.is_unresolved() {
            debug!(function = %self.name, "调用未注册的函数");
            context.add_error(ErrorKind::UnresolvedFunction, &self.name, "函数未注册");
        }

        self.args.function().evaluate(&self.args, context)
    }
}

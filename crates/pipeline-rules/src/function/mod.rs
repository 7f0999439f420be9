//! 函数扩展接口
//!
//! 规则语言唯一的扩展点：实现 [`Function`] 并注册到
//! [`FunctionRegistry`](crate::registry::FunctionRegistry)。
//!
//! 注册表和描述符在初始化后只读，会被多个 worker 无锁并发访问。
//! 函数实现不得持有或修改上下文之外的共享状态，所有副作用都必须经由
//! [`EvaluationContext`] 传递。违反这一约定属于扩展的编程错误。

pub mod args;
pub mod descriptor;

pub use args::{FunctionArgs, LazyArgument};
pub use descriptor::{FunctionDescriptor, FunctionDescriptorBuilder, ParameterDescriptor};

use crate::context::EvaluationContext;
use crate::error::Result;
use crate::value::{Value, ValueType};

/// 未解析函数的保留名称
pub const UNRESOLVED_FUNCTION_NAME: &str = "__unresolved_function";

/// 规则函数
pub trait Function: Send + Sync {
    /// 不可变的函数描述符
    fn descriptor(&self) -> &FunctionDescriptor;

    /// 执行函数
    ///
    /// 返回 `Ok(None)` 表示没有值；返回错误时由求值器记录到上下文，不会中断其他语句。
    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>>;

    /// 绑定期检查，在调用点构建时执行一次
    fn preflight(&self, _args: &FunctionArgs) -> Result<()> {
        Ok(())
    }
}

/// 判断函数是否为未解析占位函数
pub fn is_unresolved(function: &dyn Function) -> bool {
    function.descriptor().name == UNRESOLVED_FUNCTION_NAME
}

/// 未解析占位函数
///
/// 无参数、返回类型可为空，接受任意参数列表，求值结果永远是没有值。
pub struct UnresolvedFunction {
    descriptor: FunctionDescriptor,
}

impl UnresolvedFunction {
    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder(UNRESOLVED_FUNCTION_NAME)
                .returns(ValueType::Void)
                .build(),
        }
    }
}

impl Default for UnresolvedFunction {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for UnresolvedFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        _args: &FunctionArgs,
        _context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use std::sync::Arc;

    #[test]
    fn test_unresolved_descriptor() {
        let function = UnresolvedFunction::new();
        assert!(is_unresolved(&function));
        assert!(function.descriptor().params.is_empty());
        assert_eq!(function.descriptor().return_type, ValueType::Void);
    }

    #[test]
    fn test_unresolved_returns_no_value() {
        let function: Arc<dyn Function> = Arc::new(UnresolvedFunction::new());
        let args = FunctionArgs::bind(function.clone(), Vec::new(), Vec::new()).unwrap();

        let mut message = Message::new("hello", "test");
        let mut ctx = EvaluationContext::new(&mut message);

        assert_eq!(function.evaluate(&args, &mut ctx).unwrap(), None);
        assert!(!ctx.has_errors());
    }
}

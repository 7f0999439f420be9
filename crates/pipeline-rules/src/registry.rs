//! 函数注册表
//!
//! 名称到函数实现的映射。注册完成后以 `Arc<FunctionRegistry>` 只读共享；
//! 同一名称在注册表生命周期内始终解析到同一个函数实例。

use crate::error::{Result, RuleError};
use crate::function::{
    Function, FunctionArgs, FunctionDescriptor, UNRESOLVED_FUNCTION_NAME, UnresolvedFunction,
};
use crate::expr::Expr;
use crate::functions;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Function>>,
    /// 未命中时返回的占位函数，初始化时创建一次
    unresolved: Arc<dyn Function>,
}

impl FunctionRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
            unresolved: Arc::new(UnresolvedFunction::new()),
        }
    }

    /// 创建包含标准函数库的注册表
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        functions::register_builtins(&mut registry)?;
        Ok(registry)
    }

    /// 注册函数
    pub fn register<F>(&mut self, function: F) -> Result<()>
    where
        F: Function + 'static,
    {
        self.register_arc(Arc::new(function))
    }

    pub fn register_arc(&mut self, function: Arc<dyn Function>) -> Result<()> {
        let descriptor = function.descriptor();
        let name = descriptor.name.clone();

        if name == UNRESOLVED_FUNCTION_NAME || self.functions.contains_key(&name) {
            return Err(RuleError::DuplicateFunction(name));
        }

        if let Some(parameter) = descriptor.duplicate_param() {
            return Err(RuleError::DuplicateParameter {
                function: name,
                parameter: parameter.to_string(),
            });
        }

        debug!(function = %name, params = descriptor.params.len(), "函数已注册");
        self.functions.insert(name, function);
        Ok(())
    }

    /// 解析函数
    ///
    /// 永不失败：名称不存在时返回未解析占位函数。
    pub fn resolve(&self, name: &str) -> Arc<dyn Function> {
        self.functions
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.unresolved.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// 所有已注册函数的描述符（按名称排序）
    pub fn descriptors(&self) -> Vec<&FunctionDescriptor> {
        let mut descriptors: Vec<_> = self.functions.values().map(|f| f.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// 解析函数并绑定参数，构建调用节点
    pub fn call(
        &self,
        name: &str,
        positional: Vec<Expr>,
        named: Vec<(String, Expr)>,
    ) -> Result<Expr> {
        let args = FunctionArgs::bind(self.resolve(name), positional, named)?;
        Ok(Expr::call(name, args))
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ErrorKind, EvaluationContext};
    use crate::function::is_unresolved;
    use crate::message::Message;
    use crate::value::{Value, ValueType};

    struct Named(FunctionDescriptor);

    impl Function for Named {
        fn descriptor(&self) -> &FunctionDescriptor {
            &self.0
        }

        fn evaluate(
            &self,
            _args: &FunctionArgs,
            _context: &mut EvaluationContext<'_>,
        ) -> Result<Option<Value>> {
            Ok(Some(Value::from(self.0.name.as_str())))
        }
    }

    fn named(name: &str) -> Named {
        Named(FunctionDescriptor::builder(name).returns(ValueType::String).build())
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = FunctionRegistry::new();
        registry.register(named("hello")).unwrap();

        let first = registry.resolve("hello");
        let second = registry.resolve("hello");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!is_unresolved(first.as_ref()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_function() {
        let mut registry = FunctionRegistry::new();
        registry.register(named("hello")).unwrap();

        let err = registry.register(named("hello")).unwrap_err();
        assert!(matches!(err, RuleError::DuplicateFunction(ref name) if name == "hello"));
    }

    #[test]
    fn test_reserved_name_rejected() {
        let mut registry = FunctionRegistry::new();
        let err = registry.register(named(UNRESOLVED_FUNCTION_NAME)).unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_FUNCTION");
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let mut registry = FunctionRegistry::new();
        let descriptor = FunctionDescriptor::builder("dup")
            .param(crate::function::ParameterDescriptor::any("a"))
            .param(crate::function::ParameterDescriptor::any("a"))
            .build();

        let err = registry.register(Named(descriptor)).unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_PARAMETER");
        assert!(!registry.contains("dup"));
    }

    #[test]
    fn test_resolve_missing_returns_unresolved_marker() {
        let registry = FunctionRegistry::with_builtins().unwrap();

        for name in ["upper", "", "does_not_exist", UNRESOLVED_FUNCTION_NAME] {
            let function = registry.resolve(name);
            assert!(is_unresolved(function.as_ref()));
            assert!(Arc::ptr_eq(&function, &registry.resolve("another_missing")));
        }
    }

    #[test]
    fn test_unresolved_call_accepts_any_arguments() {
        let registry = FunctionRegistry::new();
        let expr = registry
            .call(
                "upper",
                vec![Expr::constant("a"), Expr::constant(1i64)],
                vec![("whatever".to_string(), Expr::field("x"))],
            )
            .unwrap();

        let mut message = Message::new("hello", "test");
        let mut ctx = EvaluationContext::new(&mut message);

        assert_eq!(expr.evaluate(&mut ctx).unwrap(), None);
        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.errors()[0].kind, ErrorKind::UnresolvedFunction);
        assert_eq!(ctx.errors()[0].function_name, "upper");
    }

    #[test]
    fn test_descriptors_sorted() {
        let registry = FunctionRegistry::with_builtins().unwrap();
        let names: Vec<_> = registry.descriptors().iter().map(|d| d.name.clone()).collect();

        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(names.contains(&"bool".to_string()));
    }
}

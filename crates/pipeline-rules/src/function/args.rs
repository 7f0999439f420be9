//! 函数参数绑定
//!
//! 在调用点构建时把实参表达式按位置或名称绑定到形参上，
//! 之后只读。提供两种取值方式：
//! - [`FunctionArgs::value`]：立即求值，并在类型不符时应用参数的转换；
//! - [`FunctionArgs::expression`]：返回未求值的句柄，由函数决定是否以及何时求值（短路）。

use super::{Function, FunctionDescriptor, ParameterDescriptor, is_unresolved};
use crate::context::EvaluationContext;
use crate::error::{Result, RuleError};
use crate::expr::Expr;
use crate::value::{Value, ValueType};
use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

/// 单个调用点的参数绑定
pub struct FunctionArgs {
    function: Arc<dyn Function>,
    /// 与描述符参数一一对应
    bindings: Vec<Option<Expr>>,
}

impl FunctionArgs {
    /// 绑定实参
    ///
    /// 位置参数依次填充形参，命名参数按名称填充。必填参数既无实参也无默认值时绑定失败。
    /// 未解析占位函数接受任意参数，这些参数永远不会被求值。
    pub fn bind(
        function: Arc<dyn Function>,
        positional: Vec<Expr>,
        named: Vec<(String, Expr)>,
    ) -> Result<Self> {
        if is_unresolved(function.as_ref()) {
            return Ok(Self {
                function,
                bindings: Vec::new(),
            });
        }

        let descriptor = function.descriptor();
        let params = &descriptor.params;

        if positional.len() > params.len() {
            return Err(RuleError::TooManyArguments {
                function: descriptor.name.clone(),
                expected: params.len(),
                actual: positional.len(),
            });
        }

        let mut bindings: Vec<Option<Expr>> = params.iter().map(|_| None).collect();
        for (slot, expr) in bindings.iter_mut().zip(positional) {
            *slot = Some(expr);
        }

        for (name, expr) in named {
            let index = descriptor
                .param_index(&name)
                .ok_or_else(|| RuleError::UnknownParameter {
                    function: descriptor.name.clone(),
                    parameter: name.clone(),
                })?;

            if bindings[index].is_some() {
                return Err(RuleError::DuplicateArgument {
                    function: descriptor.name.clone(),
                    parameter: name,
                });
            }
            bindings[index] = Some(expr);
        }

        if let Some(missing) = params
            .iter()
            .zip(&bindings)
            .find(|(param, binding)| {
                binding.is_none() && param.required && param.default_value.is_none()
            })
            .map(|(param, _)| param)
        {
            return Err(RuleError::MissingRequiredParameter {
                function: descriptor.name.clone(),
                parameter: missing.name.clone(),
            });
        }

        let args = Self { function, bindings };
        args.function.preflight(&args)?;
        Ok(args)
    }

    pub fn function(&self) -> &Arc<dyn Function> {
        &self.function
    }

    pub fn descriptor(&self) -> &FunctionDescriptor {
        self.function.descriptor()
    }

    /// 调用点是否为该参数提供了实参
    pub fn is_bound(&self, name: &str) -> bool {
        self.slot(name)
            .map(|(index, _)| self.bindings[index].is_some())
            .unwrap_or(false)
    }

    /// 实参为字面量时返回其值（供绑定期检查使用）
    pub fn constant(&self, name: &str) -> Option<&Value> {
        let (index, _) = self.slot(name).ok()?;
        match self.bindings[index].as_ref()? {
            Expr::Constant(value) => value.as_ref(),
            _ => None,
        }
    }

    /// 立即求值
    ///
    /// 未绑定或求值结果为没有值时使用参数默认值；运行期类型与声明类型不符时应用参数转换。
    pub fn value(&self, name: &str, context: &mut EvaluationContext<'_>) -> Result<Option<Value>> {
        let (index, param) = self.slot(name)?;
        resolve(param, self.bindings[index].as_ref(), context)
    }

    /// 延迟求值句柄
    pub fn expression(&self, name: &str) -> Result<LazyArgument<'_>> {
        let (index, param) = self.slot(name)?;
        Ok(LazyArgument {
            param,
            expr: self.bindings[index].as_ref(),
            cached: OnceCell::new(),
        })
    }

    pub fn bool(&self, name: &str, context: &mut EvaluationContext<'_>) -> Result<Option<bool>> {
        match self.value(name, context)? {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(other) => Err(self.mismatch(name, ValueType::Bool, &other)),
        }
    }

    pub fn long(&self, name: &str, context: &mut EvaluationContext<'_>) -> Result<Option<i64>> {
        match self.value(name, context)? {
            None => Ok(None),
            Some(Value::Long(i)) => Ok(Some(i)),
            Some(other) => Err(self.mismatch(name, ValueType::Long, &other)),
        }
    }

    pub fn double(&self, name: &str, context: &mut EvaluationContext<'_>) -> Result<Option<f64>> {
        match self.value(name, context)? {
            None => Ok(None),
            Some(Value::Double(d)) => Ok(Some(d)),
            Some(other) => Err(self.mismatch(name, ValueType::Double, &other)),
        }
    }

    pub fn string(
        &self,
        name: &str,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<String>> {
        match self.value(name, context)? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.mismatch(name, ValueType::String, &other)),
        }
    }

    /// 必须有值的字符串参数
    pub fn required_string(
        &self,
        name: &str,
        context: &mut EvaluationContext<'_>,
    ) -> Result<String> {
        self.string(name, context)?.ok_or_else(|| {
            RuleError::evaluation(&self.descriptor().name, format!("参数 {} 没有值", name))
        })
    }

    fn slot(&self, name: &str) -> Result<(usize, &ParameterDescriptor)> {
        let descriptor = self.descriptor();
        descriptor
            .param_index(name)
            .map(|index| (index, &descriptor.params[index]))
            .ok_or_else(|| RuleError::UnknownParameter {
                function: descriptor.name.clone(),
                parameter: name.to_string(),
            })
    }

    fn mismatch(&self, name: &str, expected: ValueType, actual: &Value) -> RuleError {
        RuleError::TypeMismatch {
            parameter: format!("{}.{}", self.descriptor().name, name),
            expected: expected.to_string(),
            actual: actual.value_type().to_string(),
        }
    }
}

impl fmt::Debug for FunctionArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionArgs")
            .field("function", &self.descriptor().name)
            .field("bindings", &self.bindings)
            .finish()
    }
}

/// 未求值的参数句柄
///
/// 创建句柄不会求值；第一次调用 [`LazyArgument::evaluate`] 时求值并缓存结果，
/// 之后重复读取直接返回缓存，不会重复产生副作用。
pub struct LazyArgument<'a> {
    param: &'a ParameterDescriptor,
    expr: Option<&'a Expr>,
    cached: OnceCell<Option<Value>>,
}

impl LazyArgument<'_> {
    pub fn name(&self) -> &str {
        &self.param.name
    }

    pub fn is_bound(&self) -> bool {
        self.expr.is_some()
    }

    pub fn is_evaluated(&self) -> bool {
        self.cached.get().is_some()
    }

    pub fn evaluate(&self, context: &mut EvaluationContext<'_>) -> Result<Option<Value>> {
        if let Some(cached) = self.cached.get() {
            return Ok(cached.clone());
        }

        // 求值失败不缓存
        let value = resolve(self.param, self.expr, context)?;
        Ok(self.cached.get_or_init(|| value).clone())
    }
}

fn resolve(
    param: &ParameterDescriptor,
    expr: Option<&Expr>,
    context: &mut EvaluationContext<'_>,
) -> Result<Option<Value>> {
    let evaluated = match expr {
        Some(expr) => expr.evaluate(context)?,
        None => None,
    };

    Ok(evaluated
        .or_else(|| param.default_value.clone())
        .map(|value| coerce(param, value)))
}

fn coerce(param: &ParameterDescriptor, value: Value) -> Value {
    if param.declared_type.accepts(&value) {
        return value;
    }

    match param.transform {
        Some(transform) => transform.apply(Some(&value)),
        None => value,
    }
}

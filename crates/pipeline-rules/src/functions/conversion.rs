//! 类型转换函数
//!
//! 唯一参数 `value` 为无类型参数，转换永不失败。

use crate::coercion;
use crate::context::EvaluationContext;
use crate::error::Result;
use crate::function::{Function, FunctionArgs, FunctionDescriptor, ParameterDescriptor};
use crate::value::{Value, ValueType};

const VALUE: &str = "value";
const DEFAULT: &str = "default";

/// bool(value)
pub struct BoolConversion {
    descriptor: FunctionDescriptor,
}

impl BoolConversion {
    pub const NAME: &'static str = "bool";

    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder(Self::NAME)
                .returns(ValueType::Bool)
                .param(ParameterDescriptor::any(VALUE))
                .description("忽略大小写等于 \"true\" 时为真，其余为假")
                .build(),
        }
    }
}

impl Default for BoolConversion {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for BoolConversion {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        let value = args.value(VALUE, context)?;
        Ok(Some(Value::Bool(coercion::to_bool(value.as_ref()))))
    }
}

/// long(value, default = 0)
pub struct LongConversion {
    descriptor: FunctionDescriptor,
}

impl LongConversion {
    pub const NAME: &'static str = "long";

    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder(Self::NAME)
                .returns(ValueType::Long)
                .param(ParameterDescriptor::any(VALUE))
                .param(ParameterDescriptor::long(DEFAULT).with_default(0i64))
                .description("转换为整数，小数向零截断")
                .build(),
        }
    }
}

impl Default for LongConversion {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for LongConversion {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        let value = args.value(VALUE, context)?;
        let default = args.long(DEFAULT, context)?.unwrap_or(0);
        Ok(Some(Value::Long(coercion::to_long(value.as_ref(), default))))
    }
}

/// double(value, default = 0.0)
pub struct DoubleConversion {
    descriptor: FunctionDescriptor,
}

impl DoubleConversion {
    pub const NAME: &'static str = "double";

    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder(Self::NAME)
                .returns(ValueType::Double)
                .param(ParameterDescriptor::any(VALUE))
                .param(ParameterDescriptor::double(DEFAULT).with_default(0.0))
                .build(),
        }
    }
}

impl Default for DoubleConversion {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for DoubleConversion {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        let value = args.value(VALUE, context)?;
        let default = args.double(DEFAULT, context)?.unwrap_or(0.0);
        Ok(Some(Value::Double(coercion::to_double(value.as_ref(), default))))
    }
}

/// string(value, default = "")
pub struct StringConversion {
    descriptor: FunctionDescriptor,
}

impl StringConversion {
    pub const NAME: &'static str = "string";

    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder(Self::NAME)
                .returns(ValueType::String)
                .param(ParameterDescriptor::any(VALUE))
                .param(ParameterDescriptor::string(DEFAULT).with_default(""))
                .build(),
        }
    }
}

impl Default for StringConversion {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for StringConversion {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        let value = args.value(VALUE, context)?;
        let default = args.string(DEFAULT, context)?.unwrap_or_default();
        Ok(Some(Value::String(coercion::to_string(value.as_ref(), &default))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::message::Message;
    use serde_json::json;
    use std::sync::Arc;

    fn call(function: impl Function + 'static, positional: Vec<Expr>) -> Option<Value> {
        let args = FunctionArgs::bind(Arc::new(function), positional, Vec::new()).unwrap();
        let mut message = Message::new("hello", "test");
        message.set_field("flag", json!("True"));
        message.set_field("empty", json!(null));
        let mut ctx = EvaluationContext::new(&mut message);
        args.function().evaluate(&args, &mut ctx).unwrap()
    }

    fn bool_of(arg: Expr) -> Option<Value> {
        call(BoolConversion::new(), vec![arg])
    }

    #[test]
    fn test_bool_conversion() {
        assert_eq!(bool_of(Expr::constant("true")), Some(Value::Bool(true)));
        assert_eq!(bool_of(Expr::constant("TRUE")), Some(Value::Bool(true)));
        assert_eq!(bool_of(Expr::constant("yes")), Some(Value::Bool(false)));
        assert_eq!(bool_of(Expr::constant(123i64)), Some(Value::Bool(false)));
        assert_eq!(bool_of(Expr::null()), Some(Value::Bool(false)));
        assert_eq!(bool_of(Expr::field("missing")), Some(Value::Bool(false)));
        assert_eq!(bool_of(Expr::field("empty")), Some(Value::Bool(false)));
        assert_eq!(bool_of(Expr::field("flag")), Some(Value::Bool(true)));
    }

    #[test]
    fn test_long_conversion() {
        assert_eq!(
            call(LongConversion::new(), vec![Expr::constant("42")]),
            Some(Value::Long(42))
        );
        assert_eq!(
            call(
                LongConversion::new(),
                vec![Expr::constant("oops"), Expr::constant(-1i64)]
            ),
            Some(Value::Long(-1))
        );
        assert_eq!(
            call(LongConversion::new(), vec![Expr::constant(9.99)]),
            Some(Value::Long(9))
        );
    }

    #[test]
    fn test_double_conversion() {
        assert_eq!(
            call(DoubleConversion::new(), vec![Expr::constant("2.5")]),
            Some(Value::Double(2.5))
        );
        assert_eq!(
            call(DoubleConversion::new(), vec![Expr::null(), Expr::constant(1.5)]),
            Some(Value::Double(1.5))
        );
    }

    #[test]
    fn test_string_conversion() {
        assert_eq!(
            call(StringConversion::new(), vec![Expr::constant(true)]),
            Some(Value::from("true"))
        );
        assert_eq!(
            call(StringConversion::new(), vec![Expr::null(), Expr::constant("n/a")]),
            Some(Value::from("n/a"))
        );
    }
}

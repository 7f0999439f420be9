//! 逻辑函数
//!
//! `and` / `or` / `if` 通过延迟参数实现短路求值，未选中的分支不会产生副作用。

use crate::context::EvaluationContext;
use crate::error::Result;
use crate::function::{Function, FunctionArgs, FunctionDescriptor, ParameterDescriptor};
use crate::value::{Value, ValueType};

const LEFT: &str = "left";
const RIGHT: &str = "right";

fn is_true(value: Option<Value>) -> bool {
    matches!(value, Some(Value::Bool(true)))
}

/// and(left, right)
pub struct And {
    descriptor: FunctionDescriptor,
}

impl And {
    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder("and")
                .returns(ValueType::Bool)
                .param(ParameterDescriptor::bool(LEFT))
                .param(ParameterDescriptor::bool(RIGHT))
                .build(),
        }
    }
}

impl Default for And {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for And {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        // 左侧为假时短路，不求值右侧
        if !is_true(args.expression(LEFT)?.evaluate(context)?) {
            return Ok(Some(Value::Bool(false)));
        }
        let right = args.expression(RIGHT)?.evaluate(context)?;
        Ok(Some(Value::Bool(is_true(right))))
    }
}

/// or(left, right)
pub struct Or {
    descriptor: FunctionDescriptor,
}

impl Or {
    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder("or")
                .returns(ValueType::Bool)
                .param(ParameterDescriptor::bool(LEFT))
                .param(ParameterDescriptor::bool(RIGHT))
                .build(),
        }
    }
}

impl Default for Or {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for Or {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        if is_true(args.expression(LEFT)?.evaluate(context)?) {
            return Ok(Some(Value::Bool(true)));
        }
        let right = args.expression(RIGHT)?.evaluate(context)?;
        Ok(Some(Value::Bool(is_true(right))))
    }
}

/// not(value)
pub struct Not {
    descriptor: FunctionDescriptor,
}

impl Not {
    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder("not")
                .returns(ValueType::Bool)
                .param(ParameterDescriptor::bool("value"))
                .build(),
        }
    }
}

impl Default for Not {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for Not {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        let value = args.bool("value", context)?.unwrap_or(false);
        Ok(Some(Value::Bool(!value)))
    }
}

/// if(condition, then, else?)
///
/// 只求值被选中的分支；条件为假且未提供 else 时没有值。
pub struct If {
    descriptor: FunctionDescriptor,
}

impl If {
    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder("if")
                .returns(ValueType::Any)
                .param(ParameterDescriptor::bool("condition"))
                .param(ParameterDescriptor::any("then"))
                .param(ParameterDescriptor::any("else").optional())
                .build(),
        }
    }
}

impl Default for If {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for If {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        let branch = if args.bool("condition", context)?.unwrap_or(false) {
            "then"
        } else {
            "else"
        };
        args.expression(branch)?.evaluate(context)
    }
}

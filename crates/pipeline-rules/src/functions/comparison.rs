//! 比较函数
//!
//! 两个整数按 i64 精确比较；有一侧为小数时统一转为浮点数比较，
//! 避免整数和小数比较失败（如 100 == 100.0）。

use crate::context::EvaluationContext;
use crate::error::{Result, RuleError};
use crate::function::{Function, FunctionArgs, FunctionDescriptor, ParameterDescriptor};
use crate::value::{Value, ValueType};
use std::cmp::Ordering;
use std::fmt;

/// 比较操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub const ALL: [CompareOp; 6] = [
        Self::Eq,
        Self::Neq,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
    ];
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
        };
        write!(f, "{}", s)
    }
}

/// 二元比较函数，每个操作符注册为一个独立函数
pub struct Comparison {
    op: CompareOp,
    descriptor: FunctionDescriptor,
}

impl Comparison {
    pub fn new(op: CompareOp) -> Self {
        Self {
            op,
            descriptor: FunctionDescriptor::builder(op.to_string())
                .returns(ValueType::Bool)
                .param(ParameterDescriptor::any("left"))
                .param(ParameterDescriptor::any("right"))
                .build(),
        }
    }

    /// 相等比较；非数值按结构比较
    fn eq(left: Option<&Value>, right: Option<&Value>) -> bool {
        match (left.and_then(as_number), right.and_then(as_number)) {
            (Some(Number::Long(l)), Some(Number::Long(r))) => l == r,
            (Some(l), Some(r)) => (l.as_f64() - r.as_f64()).abs() < f64::EPSILON,
            _ => left == right,
        }
    }

    /// 数值比较；任一侧没有值时为假
    fn compare<F>(&self, left: Option<&Value>, right: Option<&Value>, cmp: F) -> Result<bool>
    where
        F: Fn(Ordering) -> bool,
    {
        let (Some(left), Some(right)) = (left, right) else {
            return Ok(false);
        };

        match (as_number(left), as_number(right)) {
            (Some(l), Some(r)) => Ok(l.partial_cmp(&r).is_some_and(cmp)),
            _ => Err(RuleError::evaluation(
                self.op.to_string(),
                format!(
                    "无法比较 {} 与 {}",
                    left.value_type(),
                    right.value_type()
                ),
            )),
        }
    }
}

/// 参与比较的数值
#[derive(Debug, Clone, Copy)]
enum Number {
    Long(i64),
    Double(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Self::Long(i) => i as f64,
            Self::Double(d) => d,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Long(l), Self::Long(r)) => Some(l.cmp(r)),
            (l, r) => l.as_f64().partial_cmp(&r.as_f64()),
        }
    }
}

/// 数值视图；布尔值不参与数值比较，字符串只接受有限数值
fn as_number(value: &Value) -> Option<Number> {
    match value {
        Value::Long(i) => Some(Number::Long(*i)),
        Value::Double(d) => Some(Number::Double(*d)),
        Value::String(s) => {
            let s = s.trim();
            s.parse()
                .ok()
                .map(Number::Long)
                .or_else(|| s.parse::<f64>().ok().filter(|d| d.is_finite()).map(Number::Double))
        }
        _ => None,
    }
}

impl Function for Comparison {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        let left = args.value("left", context)?;
        let right = args.value("right", context)?;
        let (left, right) = (left.as_ref(), right.as_ref());

        let result = match self.op {
            CompareOp::Eq => Self::eq(left, right),
            CompareOp::Neq => !Self::eq(left, right),
            CompareOp::Gt => self.compare(left, right, Ordering::is_gt)?,
            CompareOp::Gte => self.compare(left, right, Ordering::is_ge)?,
            CompareOp::Lt => self.compare(left, right, Ordering::is_lt)?,
            CompareOp::Lte => self.compare(left, right, Ordering::is_le)?,
        };

        Ok(Some(Value::Bool(result)))
    }
}

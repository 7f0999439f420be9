//! 字符串函数

use crate::context::EvaluationContext;
use crate::error::{Result, RuleError};
use crate::function::{Function, FunctionArgs, FunctionDescriptor, ParameterDescriptor};
use crate::value::{Value, ValueType};
use regex::Regex;

const VALUE: &str = "value";

/// lowercase(value)
pub struct Lowercase {
    descriptor: FunctionDescriptor,
}

impl Lowercase {
    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder("lowercase")
                .returns(ValueType::String)
                .param(ParameterDescriptor::string(VALUE))
                .build(),
        }
    }
}

impl Default for Lowercase {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for Lowercase {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        Ok(args
            .string(VALUE, context)?
            .map(|s| Value::String(s.to_lowercase())))
    }
}

/// uppercase(value)
pub struct Uppercase {
    descriptor: FunctionDescriptor,
}

impl Uppercase {
    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder("uppercase")
                .returns(ValueType::String)
                .param(ParameterDescriptor::string(VALUE))
                .build(),
        }
    }
}

impl Default for Uppercase {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for Uppercase {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        Ok(args
            .string(VALUE, context)?
            .map(|s| Value::String(s.to_uppercase())))
    }
}

/// contains(value, search, ignore_case = false)
pub struct Contains {
    descriptor: FunctionDescriptor,
}

impl Contains {
    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder("contains")
                .returns(ValueType::Bool)
                .param(ParameterDescriptor::string(VALUE))
                .param(ParameterDescriptor::string("search"))
                .param(ParameterDescriptor::bool("ignore_case").with_default(false))
                .build(),
        }
    }
}

impl Default for Contains {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for Contains {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        let value = args.string(VALUE, context)?;
        let search = args.string("search", context)?;
        let ignore_case = args.bool("ignore_case", context)?.unwrap_or(false);

        let matched = match (value, search) {
            (Some(value), Some(search)) if ignore_case => {
                value.to_lowercase().contains(&search.to_lowercase())
            }
            (Some(value), Some(search)) => value.contains(&search),
            _ => false,
        };
        Ok(Some(Value::Bool(matched)))
    }
}

/// concat(first, second)，没有值的一侧视为空字符串
pub struct Concat {
    descriptor: FunctionDescriptor,
}

impl Concat {
    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder("concat")
                .returns(ValueType::String)
                .param(ParameterDescriptor::string("first"))
                .param(ParameterDescriptor::string("second"))
                .build(),
        }
    }
}

impl Default for Concat {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for Concat {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        let mut first = args.string("first", context)?.unwrap_or_default();
        first.push_str(&args.string("second", context)?.unwrap_or_default());
        Ok(Some(Value::String(first)))
    }
}

/// substring(value, start, end?)
///
/// 按字符下标截取，越界下标会被收敛到字符串范围内。
pub struct Substring {
    descriptor: FunctionDescriptor,
}

impl Substring {
    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder("substring")
                .returns(ValueType::String)
                .param(ParameterDescriptor::string(VALUE))
                .param(ParameterDescriptor::long("start"))
                .param(ParameterDescriptor::long("end").optional())
                .build(),
        }
    }
}

impl Default for Substring {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for Substring {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        let Some(value) = args.string(VALUE, context)? else {
            return Ok(None);
        };

        let len = value.chars().count();
        let clamp = |i: i64| i.clamp(0, len as i64) as usize;

        let start = clamp(args.long("start", context)?.unwrap_or(0));
        let end = args.long("end", context)?.map(clamp).unwrap_or(len);

        let result = if start >= end {
            String::new()
        } else {
            value.chars().skip(start).take(end - start).collect()
        };
        Ok(Some(Value::String(result)))
    }
}

/// regex(pattern, value)
pub struct RegexMatch {
    descriptor: FunctionDescriptor,
}

impl RegexMatch {
    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder("regex")
                .returns(ValueType::Bool)
                .param(ParameterDescriptor::string("pattern"))
                .param(ParameterDescriptor::string(VALUE))
                .build(),
        }
    }

    fn compile(&self, pattern: &str) -> Result<Regex> {
        Regex::new(pattern).map_err(|e| RuleError::InvalidArgument {
            function: self.descriptor.name.clone(),
            parameter: "pattern".to_string(),
            reason: format!("无效的正则表达式 '{}': {}", pattern, e),
        })
    }
}

impl Default for RegexMatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for RegexMatch {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    /// 字面量正则在绑定期预验证
    fn preflight(&self, args: &FunctionArgs) -> Result<()> {
        if let Some(Value::String(pattern)) = args.constant("pattern") {
            self.compile(pattern)?;
        }
        Ok(())
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        let pattern = args.required_string("pattern", context)?;
        let Some(value) = args.string(VALUE, context)? else {
            return Ok(Some(Value::Bool(false)));
        };

        // 动态正则每次求值时编译
        let regex = self
            .compile(&pattern)
            .map_err(|e| RuleError::evaluation(&self.descriptor.name, e.to_string()))?;
        Ok(Some(Value::Bool(regex.is_match(&value))))
    }
}

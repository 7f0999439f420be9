//! 消息操作函数
//!
//! 对当前消息的修改和新建消息都通过评估上下文完成。

use crate::context::EvaluationContext;
use crate::error::{Result, RuleError};
use crate::function::{Function, FunctionArgs, FunctionDescriptor, ParameterDescriptor};
use crate::message::Message;
use crate::value::{Value, ValueType};

const FIELD: &str = "field";

/// has_field(field)
pub struct HasField {
    descriptor: FunctionDescriptor,
}

impl HasField {
    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder("has_field")
                .returns(ValueType::Bool)
                .param(ParameterDescriptor::string(FIELD))
                .build(),
        }
    }
}

impl Default for HasField {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for HasField {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        let field = args.required_string(FIELD, context)?;
        Ok(Some(Value::Bool(context.current_message().has_field(&field))))
    }
}

/// set_field(field, value)
pub struct SetField {
    descriptor: FunctionDescriptor,
}

impl SetField {
    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder("set_field")
                .returns(ValueType::Void)
                .param(ParameterDescriptor::string(FIELD))
                .param(ParameterDescriptor::any("value"))
                .build(),
        }
    }
}

impl Default for SetField {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for SetField {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        let field = args.required_string(FIELD, context)?;
        if field.is_empty() {
            return Err(RuleError::evaluation(&self.descriptor.name, "字段名不能为空"));
        }

        let value = args.value("value", context)?.ok_or_else(|| {
            RuleError::evaluation(&self.descriptor.name, format!("字段 {} 的值为空", field))
        })?;

        context.current_message_mut().set_field(field, value.to_json());
        Ok(None)
    }
}

/// remove_field(field)
pub struct RemoveField {
    descriptor: FunctionDescriptor,
}

impl RemoveField {
    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder("remove_field")
                .returns(ValueType::Void)
                .param(ParameterDescriptor::string(FIELD))
                .build(),
        }
    }
}

impl Default for RemoveField {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for RemoveField {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        let field = args.required_string(FIELD, context)?;
        context.current_message_mut().remove_field(&field);
        Ok(None)
    }
}

/// drop_message()
pub struct DropMessage {
    descriptor: FunctionDescriptor,
}

impl DropMessage {
    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder("drop_message")
                .returns(ValueType::Void)
                .build(),
        }
    }
}

impl Default for DropMessage {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for DropMessage {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        _args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        context.current_message_mut().mark_dropped();
        Ok(None)
    }
}

/// create_message(message = "", source = "")
///
/// 新消息交给上下文，由调度方在评估结束后接管。
pub struct CreateMessage {
    descriptor: FunctionDescriptor,
}

impl CreateMessage {
    pub fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder("create_message")
                .returns(ValueType::Void)
                .param(ParameterDescriptor::string("message").with_default(""))
                .param(ParameterDescriptor::string("source").with_default(""))
                .build(),
        }
    }
}

impl Default for CreateMessage {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for CreateMessage {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Option<Value>> {
        let text = args.string("message", context)?.unwrap_or_default();
        let source = args.string("source", context)?.unwrap_or_default();
        context.add_created_message(Message::new(text, source));
        Ok(None)
    }
}

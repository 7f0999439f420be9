//! 标准函数库

pub mod comparison;
pub mod conversion;
pub mod logic;
pub mod messages;
pub mod strings;

use crate::error::Result;
use crate::registry::FunctionRegistry;
use comparison::{CompareOp, Comparison};

/// 注册全部内置函数
pub fn register_builtins(registry: &mut FunctionRegistry) -> Result<()> {
    // 类型转换
    registry.register(conversion::BoolConversion::new())?;
    registry.register(conversion::LongConversion::new())?;
    registry.register(conversion::DoubleConversion::new())?;
    registry.register(conversion::StringConversion::new())?;

    // 逻辑
    registry.register(logic::And::new())?;
    registry.register(logic::Or::new())?;
    registry.register(logic::Not::new())?;
    registry.register(logic::If::new())?;

    // 比较
    for op in CompareOp::ALL {
        registry.register(Comparison::new(op))?;
    }

    // 字符串
    registry.register(strings::Lowercase::new())?;
    registry.register(strings::Uppercase::new())?;
    registry.register(strings::Contains::new())?;
    registry.register(strings::Concat::new())?;
    registry.register(strings::Substring::new())?;
    registry.register(strings::RegexMatch::new())?;

    // 消息
    registry.register(messages::HasField::new())?;
    registry.register(messages::SetField::new())?;
    registry.register(messages::RemoveField::new())?;
    registry.register(messages::DropMessage::new())?;
    registry.register(messages::CreateMessage::new())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::Function;

    fn same_descriptor<F: Function + Default>(function: F) {
        assert_eq!(F::default().descriptor(), function.descriptor());
    }

    #[test]
    fn test_default_matches_new() {
        same_descriptor(conversion::BoolConversion::new());
        same_descriptor(conversion::LongConversion::new());
        same_descriptor(conversion::DoubleConversion::new());
        same_descriptor(conversion::StringConversion::new());
        same_descriptor(logic::And::new());
        same_descriptor(logic::Or::new());
        same_descriptor(logic::Not::new());
        same_descriptor(logic::If::new());
        same_descriptor(strings::Lowercase::new());
        same_descriptor(strings::Uppercase::new());
        same_descriptor(strings::Contains::new());
        same_descriptor(strings::Concat::new());
        same_descriptor(strings::Substring::new());
        same_descriptor(strings::RegexMatch::new());
        same_descriptor(messages::HasField::new());
        same_descriptor(messages::SetField::new());
        same_descriptor(messages::RemoveField::new());
        same_descriptor(messages::DropMessage::new());
        same_descriptor(messages::CreateMessage::new());
    }

    #[test]
    fn test_register_builtins() {
        let mut registry = FunctionRegistry::new();
        register_builtins(&mut registry).unwrap();

        assert_eq!(registry.len(), 25);
        for op in CompareOp::ALL {
            assert!(registry.contains(&op.to_string()));
        }
        assert!(register_builtins(&mut registry).is_err());
    }
}

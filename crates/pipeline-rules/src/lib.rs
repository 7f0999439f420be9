//! 日志管道规则引擎核心
//!
//! 规则由解析器生成的 AST 描述，编译期完成函数解析和参数绑定，
//! 运行期对每条消息求值，支持：
//! - 可扩展的函数注册表（未注册的函数解析为哨兵函数，不会中断评估）
//! - 惰性/急切两种参数求值，短路逻辑
//! - 宽松的类型转换
//! - 线程安全的规则存储，规则链评估

pub mod ast;
pub mod coercion;
pub mod compiler;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod function;
pub mod functions;
pub mod message;
pub mod registry;
pub mod store;
pub mod value;

pub use ast::{AstNode, RuleDefinition};
pub use compiler::{CompiledRule, RuleCompiler};
pub use context::{ErrorKind, EvaluationContext, EvaluationError};
pub use error::{Result, RuleError};
pub use evaluator::{EvaluationResult, ProcessedMessage, RuleEvaluator};
pub use expr::Expr;
pub use function::{
    Function, FunctionArgs, FunctionDescriptor, LazyArgument, ParameterDescriptor,
    UNRESOLVED_FUNCTION_NAME,
};
pub use message::Message;
pub use registry::FunctionRegistry;
pub use store::{RuleStore, RuleStoreStats};
pub use value::{Value, ValueType};

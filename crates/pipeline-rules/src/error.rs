//! 规则引擎错误类型
//!
//! 绑定期错误（函数注册、参数绑定）会中止对应 AST 节点的构建；
//! 运行期错误只会被记录到 [`EvaluationContext`](crate::context::EvaluationContext)，不会越过求值器向上传播。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("函数已注册: {0}")]
    DuplicateFunction(String),

    #[error("函数 {function} 的参数名重复: {parameter}")]
    DuplicateParameter { function: String, parameter: String },

    #[error("函数 {function} 不存在参数: {parameter}")]
    UnknownParameter { function: String, parameter: String },

    #[error("函数 {function} 缺少必填参数: {parameter}")]
    MissingRequiredParameter { function: String, parameter: String },

    #[error("函数 {function} 的参数 {parameter} 被重复绑定")]
    DuplicateArgument { function: String, parameter: String },

    #[error("函数 {function} 最多接受 {expected} 个位置参数, 实际 {actual}")]
    TooManyArguments {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("函数 {function} 的参数 {parameter} 无效: {reason}")]
    InvalidArgument {
        function: String,
        parameter: String,
        reason: String,
    },

    #[error("规则解析失败: {0}")]
    ParseError(String),

    #[error("函数 {function} 执行失败: {detail}")]
    Evaluation { function: String, detail: String },

    #[error("类型不匹配: 参数 {parameter} 期望 {expected}, 实际 {actual}")]
    TypeMismatch {
        parameter: String,
        expected: String,
        actual: String,
    },

    #[error("规则未找到: {0}")]
    RuleNotFound(String),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RuleError>;

impl RuleError {
    /// 运行期错误的便捷构造
    pub fn evaluation(function: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Evaluation {
            function: function.into(),
            detail: detail.into(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateFunction(_) => "DUPLICATE_FUNCTION",
            Self::DuplicateParameter { .. } => "DUPLICATE_PARAMETER",
            Self::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            Self::MissingRequiredParameter { .. } => "MISSING_REQUIRED_PARAMETER",
            Self::DuplicateArgument { .. } => "DUPLICATE_ARGUMENT",
            Self::TooManyArguments { .. } => "TOO_MANY_ARGUMENTS",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::Evaluation { .. } => "EVALUATION_ERROR",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::RuleNotFound(_) => "RULE_NOT_FOUND",
            Self::JsonError(_) => "JSON_ERROR",
        }
    }

    /// 是否为绑定期（结构性）错误
    pub fn is_bind_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateParameter { .. }
                | Self::UnknownParameter { .. }
                | Self::MissingRequiredParameter { .. }
                | Self::DuplicateArgument { .. }
                | Self::TooManyArguments { .. }
                | Self::InvalidArgument { .. }
        )
    }

    /// 错误关联的函数名（如果有）
    pub fn function_name(&self) -> Option<&str> {
        match self {
            Self::DuplicateParameter { function, .. }
            | Self::UnknownParameter { function, .. }
            | Self::MissingRequiredParameter { function, .. }
            | Self::DuplicateArgument { function, .. }
            | Self::TooManyArguments { function, .. }
            | Self::InvalidArgument { function, .. }
            | Self::Evaluation { function, .. } => Some(function),
            Self::DuplicateFunction(name) => Some(name),
            _ => None,
        }
    }
}

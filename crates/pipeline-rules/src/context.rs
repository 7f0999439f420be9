//! 评估上下文
//!
//! 每次对一条消息执行规则（或规则链）时创建一个实例，由单个 worker 独占，
//! 不在并发评估之间共享。函数的副作用只能通过上下文对调度方可见。

use crate::message::Message;
use serde::Serialize;
use std::fmt;

/// 评估错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 函数执行失败
    Evaluation,
    /// 引用了注册表中不存在的函数
    UnresolvedFunction,
    /// 条件结果不是布尔值
    ConditionNotBoolean,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Evaluation => "evaluation",
            Self::UnresolvedFunction => "unresolved_function",
            Self::ConditionNotBoolean => "condition_not_boolean",
        };
        write!(f, "{}", s)
    }
}

/// 非致命的评估错误记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationError {
    pub kind: ErrorKind,
    pub function_name: String,
    pub detail: String,
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.function_name, self.detail)
    }
}

/// 单次评估的可变状态
#[derive(Debug)]
pub struct EvaluationContext<'m> {
    message: &'m mut Message,
    created_messages: Vec<Message>,
    errors: Vec<EvaluationError>,
    aborted: bool,
}

impl<'m> EvaluationContext<'m> {
    pub fn new(message: &'m mut Message) -> Self {
        Self {
            message,
            created_messages: Vec::new(),
            errors: Vec::new(),
            aborted: false,
        }
    }

    /// 当前被评估的消息
    pub fn current_message(&self) -> &Message {
        &*self.message
    }

    /// 修改当前消息（供 set_field 等函数使用）
    pub fn current_message_mut(&mut self) -> &mut Message {
        &mut *self.message
    }

    /// 记录函数新创建的消息，所有权转移给上下文
    pub fn add_created_message(&mut self, message: Message) {
        self.created_messages.push(message);
    }

    pub fn created_messages(&self) -> &[Message] {
        &self.created_messages
    }

    /// 取走已创建的消息（交给调度方）
    pub fn take_created_messages(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.created_messages)
    }

    /// 记录非致命错误，不会中断评估
    pub fn add_error(
        &mut self,
        kind: ErrorKind,
        function_name: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.errors.push(EvaluationError {
            kind,
            function_name: function_name.into(),
            detail: detail.into(),
        });
    }

    pub fn errors(&self) -> &[EvaluationError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 跳过当前规则剩余的动作
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// 开始评估下一条规则前清除中止标记
    pub(crate) fn reset_abort(&mut self) {
        self.aborted = false;
    }

    /// 结束评估，交出已创建的消息和错误
    pub fn into_parts(self) -> (Vec<Message>, Vec<EvaluationError>) {
        (self.created_messages, self.errors)
    }
}

//! 规则评估器
//!
//! 先求值 when 条件，匹配后按顺序执行 then 动作。条件失败或结果不是布尔值时
//! 视为不匹配；单个动作失败只记录错误，继续执行后续动作，除非上下文被中止。

use crate::compiler::CompiledRule;
use crate::context::{ErrorKind, EvaluationContext, EvaluationError};
use crate::error::RuleError;
use crate::expr::Expr;
use crate::message::Message;
use crate::value::Value;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// 单条规则的评估结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationResult {
    pub rule_id: String,
    pub rule_name: String,
    pub matched: bool,
    /// 成功执行的动作数
    pub actions_applied: usize,
    /// 失败的动作数
    pub actions_failed: usize,
    /// 因中止而跳过的动作数
    pub actions_skipped: usize,
    pub aborted: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evaluation_trace: Vec<String>,
    pub evaluation_time_us: u64,
}

impl EvaluationResult {
    pub fn new(rule_id: impl Into<String>, rule_name: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            ..Default::default()
        }
    }
}

/// 一条消息经过规则链后的产出，交给调度方处理
#[derive(Debug, Serialize)]
pub struct ProcessedMessage {
    pub message: Message,
    pub created_messages: Vec<Message>,
    pub errors: Vec<EvaluationError>,
    pub results: Vec<EvaluationResult>,
}

impl ProcessedMessage {
    pub fn matched_rules(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.matched)
            .map(|r| r.rule_id.as_str())
    }
}

/// 规则评估器
#[derive(Debug, Clone, Default)]
pub struct RuleEvaluator {
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl RuleEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 对上下文中的消息评估一条规则
    #[instrument(skip(self, rule, context), fields(rule_id = %rule.id))]
    pub fn evaluate(
        &self,
        rule: &CompiledRule,
        context: &mut EvaluationContext<'_>,
    ) -> EvaluationResult {
        let start = Instant::now();
        let mut result = EvaluationResult::new(rule.id.clone(), rule.name.clone());

        context.reset_abort();
        result.matched = self.evaluate_condition(&rule.when, context, &mut result);

        if result.matched {
            self.apply_actions(&rule.then, context, &mut result);
        }

        result.evaluation_time_us = start.elapsed().as_micros() as u64;

        metrics::counter!(
            "rule_evaluations_total",
            "matched" => result.matched.to_string()
        )
        .increment(1);

        debug!(
            matched = result.matched,
            applied = result.actions_applied,
            failed = result.actions_failed,
            "规则评估完成"
        );

        result
    }

    /// 对一条消息按顺序评估规则链，整个链共享一个上下文
    pub fn process_message(
        &self,
        rules: &[Arc<CompiledRule>],
        mut message: Message,
    ) -> ProcessedMessage {
        let mut context = EvaluationContext::new(&mut message);
        let results = rules
            .iter()
            .map(|rule| self.evaluate(rule, &mut context))
            .collect();
        let (created_messages, errors) = context.into_parts();

        ProcessedMessage {
            message,
            created_messages,
            errors,
            results,
        }
    }

    /// 求值 when 条件；失败或非布尔结果都按不匹配处理
    fn evaluate_condition(
        &self,
        when: &Expr,
        context: &mut EvaluationContext<'_>,
        result: &mut EvaluationResult,
    ) -> bool {
        let outcome = when.evaluate(context);
        let name = when.function_name().unwrap_or("when");

        let matched = match outcome {
            Ok(Some(Value::Bool(matched))) => matched,
            // 未注册函数已在调用时记录
            Ok(_) if when.is_unresolved_call() => false,
            Ok(other) => {
                let actual = other
                    .as_ref()
                    .map(|v| v.value_type().to_string())
                    .unwrap_or_else(|| "none".to_string());
                record_error(
                    context,
                    ErrorKind::ConditionNotBoolean,
                    name,
                    format!("条件结果不是布尔值: {}", actual),
                );
                false
            }
            Err(e) => {
                record_failure(context, name, &e);
                false
            }
        };

        if self.trace_enabled {
            result.evaluation_trace.push(format!(
                "when: {} => {}",
                name,
                if matched { "MATCHED" } else { "NOT_MATCHED" }
            ));
        }

        matched
    }

    /// 按顺序执行动作
    fn apply_actions(
        &self,
        actions: &[Expr],
        context: &mut EvaluationContext<'_>,
        result: &mut EvaluationResult,
    ) {
        for (i, action) in actions.iter().enumerate() {
            if context.is_aborted() {
                result.aborted = true;
                result.actions_skipped = actions.len() - i;
                metrics::counter!("rule_actions_total", "outcome" => "skipped")
                    .increment(result.actions_skipped as u64);
                if self.trace_enabled {
                    result
                        .evaluation_trace
                        .push(format!("then[{}]: 已中止，跳过剩余 {} 个动作", i, result.actions_skipped));
                }
                return;
            }

            let name = action.function_name().unwrap_or("then");
            match action.evaluate(context) {
                Ok(_) => {
                    result.actions_applied += 1;
                    metrics::counter!("rule_actions_total", "outcome" => "applied").increment(1);
                    if self.trace_enabled {
                        result.evaluation_trace.push(format!("then[{}]: {} => OK", i, name));
                    }
                }
                Err(e) => {
                    result.actions_failed += 1;
                    metrics::counter!("rule_actions_total", "outcome" => "failed").increment(1);
                    if self.trace_enabled {
                        result
                            .evaluation_trace
                            .push(format!("then[{}]: {} => FAILED ({})", i, name, e));
                    }
                    record_failure(context, name, &e);
                }
            }
        }

        // 最后一个动作触发的中止
        if context.is_aborted() {
            result.aborted = true;
        }
    }
}

/// 函数返回的错误转为上下文中的评估错误
fn record_failure(context: &mut EvaluationContext<'_>, fallback_name: &str, error: &RuleError) {
    let name = error.function_name().unwrap_or(fallback_name).to_string();
    let detail = match error {
        RuleError::Evaluation { detail, .. } => detail.clone(),
        other => other.to_string(),
    };
    record_error(context, ErrorKind::Evaluation, &name, detail);
}

fn record_error(
    context: &mut EvaluationContext<'_>,
    kind: ErrorKind,
    function_name: &str,
    detail: impl Into<String>,
) {
    let detail = detail.into();
    warn!(kind = %kind, function = function_name, detail = %detail, "规则评估出错");
    metrics::counter!("rule_evaluation_errors_total", "kind" => kind.to_string()).increment(1);
    context.add_error(kind, function_name, detail);
}

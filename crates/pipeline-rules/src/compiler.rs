//! 规则编译器
//!
//! 把解析器输出的规则定义编译成已绑定的表达式树：通过注册表解析每个调用节点，
//! 在绑定期一次性完成参数检查，并预提取规则引用的字段。

use crate::ast::{AstNode, RuleDefinition};
use crate::error::{Result, RuleError};
use crate::expr::Expr;
use crate::function::FunctionArgs;
use crate::registry::FunctionRegistry;
use crate::value::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// 编译后的规则
#[derive(Debug)]
pub struct CompiledRule {
    pub id: String,
    pub name: String,
    /// 已绑定的条件
    pub when: Expr,
    /// 已绑定的动作，按定义顺序执行
    pub then: Vec<Expr>,
    /// 规则中引用的所有字段路径
    pub referenced_fields: HashSet<String>,
    /// 注册表中不存在的函数名
    pub unresolved_functions: BTreeSet<String>,
    /// 编译版本号（用于缓存失效）
    pub compile_version: u64,
}

impl CompiledRule {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 是否引用了未注册的函数
    pub fn has_unresolved(&self) -> bool {
        !self.unresolved_functions.is_empty()
    }
}

/// 规则编译器
pub struct RuleCompiler {
    registry: Arc<FunctionRegistry>,
    compile_version: u64,
}

/// 单条规则编译期间收集的信息
#[derive(Default)]
struct CompileScope {
    fields: HashSet<String>,
    unresolved: BTreeSet<String>,
}

impl RuleCompiler {
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self {
            registry,
            compile_version: 0,
        }
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    /// 从 JSON 字符串编译规则
    pub fn compile_from_json(&mut self, json: &str) -> Result<CompiledRule> {
        let definition: RuleDefinition = serde_json::from_str(json)?;
        self.compile(definition)
    }

    /// 编译规则
    pub fn compile(&mut self, definition: RuleDefinition) -> Result<CompiledRule> {
        self.validate(&definition)?;

        let mut scope = CompileScope::default();
        let when = self.compile_node(&definition.when, &mut scope)?;
        let then = definition
            .then
            .iter()
            .map(|node| self.compile_node(node, &mut scope))
            .collect::<Result<Vec<_>>>()?;

        if !scope.unresolved.is_empty() {
            warn!(
                rule_id = %definition.id,
                functions = ?scope.unresolved,
                "规则引用了未注册的函数"
            );
        }

        self.compile_version += 1;
        debug!(rule_id = %definition.id, version = self.compile_version, "规则已编译");

        Ok(CompiledRule {
            id: definition.id,
            name: definition.name,
            when,
            then,
            referenced_fields: scope.fields,
            unresolved_functions: scope.unresolved,
            compile_version: self.compile_version,
        })
    }

    /// 验证规则结构
    fn validate(&self, definition: &RuleDefinition) -> Result<()> {
        if definition.id.is_empty() {
            return Err(RuleError::ParseError("规则 ID 不能为空".to_string()));
        }

        if definition.name.is_empty() {
            return Err(RuleError::ParseError("规则名称不能为空".to_string()));
        }

        Ok(())
    }

    /// 递归编译节点
    fn compile_node(&self, node: &AstNode, scope: &mut CompileScope) -> Result<Expr> {
        match node {
            AstNode::Literal { value } => Ok(Expr::Constant(Value::from_json(value))),
            AstNode::Field { name } => {
                if name.is_empty() {
                    return Err(RuleError::ParseError("字段名不能为空".to_string()));
                }
                scope.fields.insert(name.clone());
                Ok(Expr::field(name.clone()))
            }
            AstNode::Call {
                function,
                args,
                named,
            } => {
                if !self.registry.contains(function) {
                    scope.unresolved.insert(function.clone());
                }

                let positional = args
                    .iter()
                    .map(|arg| self.compile_node(arg, scope))
                    .collect::<Result<Vec<_>>>()?;
                let named = named
                    .iter()
                    .map(|(name, arg)| Ok((name.clone(), self.compile_node(arg, scope)?)))
                    .collect::<Result<Vec<_>>>()?;

                let args = FunctionArgs::bind(self.registry.resolve(function), positional, named)?;
                Ok(Expr::call(function.clone(), args))
            }
        }
    }
}

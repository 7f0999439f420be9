//! 规则存储管理
//!
//! 使用 DashMap 提供线程安全的规则缓存，支持规则的加载、更新、删除和批量操作。
//! 编译后的规则以 `Arc` 共享，评估线程拿到的是只读快照，更新不会影响进行中的评估。

use crate::ast::RuleDefinition;
use crate::compiler::{CompiledRule, RuleCompiler};
use crate::error::{Result, RuleError};
use crate::registry::FunctionRegistry;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, instrument, warn};

/// 存储条目；`seq` 记录首次加载顺序，规则链按此顺序执行
struct StoredRule {
    seq: u64,
    rule: Arc<CompiledRule>,
}

/// 规则存储
#[derive(Clone)]
pub struct RuleStore {
    /// 编译后的规则缓存
    rules: Arc<DashMap<String, StoredRule>>,
    /// 规则编译器
    compiler: Arc<parking_lot::Mutex<RuleCompiler>>,
    next_seq: Arc<AtomicU64>,
}

impl RuleStore {
    /// 创建新的规则存储
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self {
            rules: Arc::new(DashMap::new()),
            compiler: Arc::new(parking_lot::Mutex::new(RuleCompiler::new(registry))),
            next_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 获取当前存储的规则数量
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 检查存储是否为空
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 加载规则（从规则定义）
    #[instrument(skip(self, rule), fields(rule_id = %rule.id, rule_name = %rule.name))]
    pub fn load(&self, rule: RuleDefinition) -> Result<()> {
        let compiled = {
            let mut compiler = self.compiler.lock();
            compiler.compile(rule)?
        };

        let rule_id = self.insert(compiled);
        info!("规则已加载: {}", rule_id);
        Ok(())
    }

    /// 加载规则（从 JSON 字符串）
    #[instrument(skip(self, json))]
    pub fn load_from_json(&self, json: &str) -> Result<String> {
        let compiled = {
            let mut compiler = self.compiler.lock();
            compiler.compile_from_json(json)?
        };

        let rule_id = self.insert(compiled);
        info!("规则已加载: {}", rule_id);
        Ok(rule_id)
    }

    /// 从 JSON 数组加载多条规则，任一条失败则整体失败且不修改存储
    #[instrument(skip(self, json))]
    pub fn load_all_from_json(&self, json: &str) -> Result<Vec<String>> {
        let definitions: Vec<RuleDefinition> = serde_json::from_str(json)?;

        let compiled = {
            let mut compiler = self.compiler.lock();
            definitions
                .into_iter()
                .map(|d| compiler.compile(d))
                .collect::<Result<Vec<_>>>()?
        };

        let ids: Vec<String> = compiled.into_iter().map(|c| self.insert(c)).collect();
        info!("规则文件加载完成: {} 条", ids.len());
        Ok(ids)
    }

    /// 更新规则
    #[instrument(skip(self, rule), fields(rule_id = %rule.id))]
    pub fn update(&self, rule: RuleDefinition) -> Result<()> {
        let rule_id = rule.id.clone();

        if !self.rules.contains_key(&rule_id) {
            warn!("更新不存在的规则: {}", rule_id);
            return Err(RuleError::RuleNotFound(rule_id));
        }

        let compiled = {
            let mut compiler = self.compiler.lock();
            compiler.compile(rule)?
        };

        // 编译期间规则可能已被删除，存在性检查与替换在同一个分片锁内完成
        match self.rules.entry(rule_id.clone()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().rule = Arc::new(compiled);
                info!("规则已更新: {}", rule_id);
                Ok(())
            }
            Entry::Vacant(_) => {
                warn!("更新不存在的规则: {}", rule_id);
                Err(RuleError::RuleNotFound(rule_id))
            }
        }
    }

    /// 删除规则
    #[instrument(skip(self))]
    pub fn delete(&self, rule_id: &str) -> Result<()> {
        if self.rules.remove(rule_id).is_some() {
            info!("规则已删除: {}", rule_id);
            Ok(())
        } else {
            warn!("删除不存在的规则: {}", rule_id);
            Err(RuleError::RuleNotFound(rule_id.to_string()))
        }
    }

    /// 获取规则
    pub fn get(&self, rule_id: &str) -> Option<Arc<CompiledRule>> {
        self.rules.get(rule_id).map(|r| Arc::clone(&r.rule))
    }

    /// 检查规则是否存在
    pub fn contains(&self, rule_id: &str) -> bool {
        self.rules.contains_key(rule_id)
    }

    /// 获取所有规则 ID（按加载顺序）
    pub fn list_ids(&self) -> Vec<String> {
        self.list_all().iter().map(|r| r.id.clone()).collect()
    }

    /// 获取所有规则（按加载顺序），可直接作为规则链评估
    pub fn list_all(&self) -> Vec<Arc<CompiledRule>> {
        let mut entries: Vec<(u64, Arc<CompiledRule>)> = self
            .rules
            .iter()
            .map(|r| (r.seq, Arc::clone(&r.rule)))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, rule)| rule).collect()
    }

    /// 批量加载规则
    #[instrument(skip(self, rules))]
    pub fn load_batch(&self, rules: Vec<RuleDefinition>) -> Result<Vec<String>> {
        let mut loaded_ids = Vec::with_capacity(rules.len());
        let mut errors = Vec::new();

        for rule in rules {
            let rule_id = rule.id.clone();
            match self.load(rule) {
                Ok(()) => loaded_ids.push(rule_id),
                Err(e) => errors.push((rule_id, e)),
            }
        }

        if !errors.is_empty() {
            warn!("批量加载部分失败: {:?}", errors);
        }

        info!("批量加载完成: {} 成功, {} 失败", loaded_ids.len(), errors.len());
        Ok(loaded_ids)
    }

    /// 清空所有规则
    #[instrument(skip(self))]
    pub fn clear(&self) {
        let count = self.rules.len();
        self.rules.clear();
        info!("已清空 {} 条规则", count);
    }

    /// 获取规则统计信息
    pub fn stats(&self) -> RuleStoreStats {
        let rules_count = self.rules.len();
        let mut total_fields = 0;
        let mut rules_with_unresolved = 0;
        for entry in self.rules.iter() {
            total_fields += entry.rule.referenced_fields.len();
            if entry.rule.has_unresolved() {
                rules_with_unresolved += 1;
            }
        }

        RuleStoreStats {
            rules_count,
            total_fields,
            avg_fields_per_rule: if rules_count > 0 {
                total_fields as f64 / rules_count as f64
            } else {
                0.0
            },
            rules_with_unresolved,
        }
    }

    /// 插入编译结果；替换已有规则时保留原来的顺序
    fn insert(&self, compiled: CompiledRule) -> String {
        let rule_id = compiled.id.clone();
        let rule = Arc::new(compiled);

        self.rules
            .entry(rule_id.clone())
            .and_modify(|stored| stored.rule = Arc::clone(&rule))
            .or_insert_with(|| StoredRule {
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                rule,
            });

        rule_id
    }
}

/// 规则存储统计信息
#[derive(Debug, Clone)]
pub struct RuleStoreStats {
    /// 规则总数
    pub rules_count: usize,
    /// 所有规则引用的字段总数
    pub total_fields: usize,
    /// 平均每条规则引用的字段数
    pub avg_fields_per_rule: f64,
    /// 引用了未注册函数的规则数
    pub rules_with_unresolved: usize,
}

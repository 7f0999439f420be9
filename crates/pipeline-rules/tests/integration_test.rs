//! 规则引擎集成测试
//!
//! 测试完整的规则加载、编译、执行工作流。

use pipeline_rules::functions::conversion::BoolConversion;
use pipeline_rules::{
    AstNode, ErrorKind, EvaluationContext, Expr, Function, FunctionArgs, FunctionDescriptor,
    FunctionRegistry, Message, ParameterDescriptor, RuleDefinition, RuleError, RuleEvaluator,
    RuleStore, Value, ValueType,
};
use serde_json::json;
use std::sync::Arc;
use std::thread;

fn builtins() -> Arc<FunctionRegistry> {
    Arc::new(FunctionRegistry::with_builtins().unwrap())
}

/// 创建测试消息：模拟一条 nginx 访问日志
fn create_access_log() -> Message {
    let mut message = Message::new("GET /api/orders HTTP/1.1 502", "nginx-edge-01");
    message.set_field("level", json!("ERROR"));
    message.set_field(
        "http",
        json!({
            "method": "GET",
            "path": "/api/orders",
            "status": 502,
            "latency_ms": 1834.5
        }),
    );
    message.set_field("tags", json!(["edge", "public"]));
    message
}

// ==================== 端到端场景 ====================

#[test]
fn test_bool_only_registry_scenario() {
    let mut registry = FunctionRegistry::new();
    registry.register(BoolConversion::new()).unwrap();

    let condition = registry
        .call("bool", vec![Expr::constant("TRUE")], Vec::new())
        .unwrap();
    let undefined = registry
        .call("upper", vec![Expr::field("message")], Vec::new())
        .unwrap();
    let after = registry
        .call("bool", vec![Expr::constant("yes")], Vec::new())
        .unwrap();

    let mut message = create_access_log();
    let mut ctx = EvaluationContext::new(&mut message);

    assert_eq!(condition.evaluate(&mut ctx).unwrap(), Some(Value::Bool(true)));
    assert_eq!(undefined.evaluate(&mut ctx).unwrap(), None);
    // 后续节点照常求值
    assert_eq!(after.evaluate(&mut ctx).unwrap(), Some(Value::Bool(false)));

    assert_eq!(ctx.errors().len(), 1);
    assert_eq!(ctx.errors()[0].kind, ErrorKind::UnresolvedFunction);
    assert_eq!(ctx.errors()[0].function_name, "upper");
}

#[test]
fn test_bool_only_registry_rule_evaluation() {
    let mut registry = FunctionRegistry::new();
    registry.register(BoolConversion::new()).unwrap();
    let store = RuleStore::new(Arc::new(registry));

    let rule = RuleDefinition::new(
        "bool_condition",
        AstNode::call("bool", vec![AstNode::literal("TRUE")]),
        vec![
            AstNode::call("upper", vec![AstNode::field("message")]),
            AstNode::call("bool", vec![AstNode::literal("yes")]),
        ],
    )
    .with_id("bool-only");
    store.load(rule).unwrap();

    let rules = store.list_all();
    assert!(rules[0].has_unresolved());

    let processed = RuleEvaluator::new().process_message(&rules, create_access_log());
    let result = &processed.results[0];

    assert!(result.matched);
    assert_eq!(result.actions_applied, 2);
    assert_eq!(result.actions_failed, 0);
    assert_eq!(processed.errors.len(), 1);
    assert_eq!(processed.errors[0].kind, ErrorKind::UnresolvedFunction);
    assert_eq!(processed.errors[0].function_name, "upper");
    assert_eq!(
        processed.message.get_field("message"),
        Some(&json!("GET /api/orders HTTP/1.1 502"))
    );
}

#[test]
fn test_full_workflow_with_store() {
    // 1. 创建存储
    let store = RuleStore::new(builtins());

    // 2. 加载规则
    let rules_json = r#"
    [
        {
            "id": "route-upstream-errors",
            "name": "上游错误告警",
            "when": {
                "type": "call",
                "function": "and",
                "args": [
                    {
                        "type": "call",
                        "function": "gte",
                        "args": [
                            {"type": "field", "name": "http.status"},
                            {"type": "literal", "value": 500}
                        ]
                    },
                    {
                        "type": "call",
                        "function": "regex",
                        "args": [
                            {"type": "literal", "value": "^nginx-"},
                            {"type": "field", "name": "source"}
                        ]
                    }
                ]
            },
            "then": [
                {
                    "type": "call",
                    "function": "set_field",
                    "args": [
                        {"type": "literal", "value": "alert"},
                        {"type": "literal", "value": true}
                    ]
                },
                {
                    "type": "call",
                    "function": "create_message",
                    "named": {
                        "message": {
                            "type": "call",
                            "function": "concat",
                            "args": [
                                {"type": "literal", "value": "upstream error on "},
                                {"type": "field", "name": "http.path"}
                            ]
                        },
                        "source": {"type": "literal", "value": "alerting"}
                    }
                }
            ]
        },
        {
            "id": "drop-health-checks",
            "name": "丢弃健康检查",
            "when": {
                "type": "call",
                "function": "eq",
                "args": [
                    {"type": "field", "name": "http.path"},
                    {"type": "literal", "value": "/health"}
                ]
            },
            "then": [{"type": "call", "function": "drop_message"}]
        }
    ]
    "#;
    let ids = store.load_all_from_json(rules_json).unwrap();
    assert_eq!(ids.len(), 2);

    // 3. 评估
    let processed = RuleEvaluator::new().process_message(&store.list_all(), create_access_log());

    // 4. 验证
    assert_eq!(
        processed.matched_rules().collect::<Vec<_>>(),
        vec!["route-upstream-errors"]
    );
    assert!(processed.errors.is_empty());
    assert!(!processed.message.is_dropped());
    assert_eq!(processed.message.get_field("alert"), Some(&json!(true)));
    assert_eq!(processed.created_messages.len(), 1);
    assert_eq!(
        processed.created_messages[0].get_field("message"),
        Some(&json!("upstream error on /api/orders"))
    );
    assert_eq!(
        processed.created_messages[0].get_field("source"),
        Some(&json!("alerting"))
    );
}

// ==================== 失败处理 ====================

#[test]
fn test_partial_action_failure_preserves_order() {
    let store = RuleStore::new(builtins());
    let rule = RuleDefinition::new(
        "partial",
        AstNode::literal(true),
        vec![
            // A：对字符串做数值比较，执行失败
            AstNode::call(
                "set_field",
                vec![
                    AstNode::literal("slow"),
                    AstNode::call(
                        "gt",
                        vec![AstNode::field("level"), AstNode::literal(1000)],
                    ),
                ],
            ),
            // B：成功
            AstNode::call(
                "create_message",
                vec![AstNode::literal("after failure")],
            ),
        ],
    )
    .with_id("partial-rule");
    store.load(rule).unwrap();

    let processed = RuleEvaluator::new().process_message(&store.list_all(), create_access_log());

    let result = &processed.results[0];
    assert!(result.matched);
    assert_eq!(result.actions_failed, 1);
    assert_eq!(result.actions_applied, 1);

    assert_eq!(processed.errors.len(), 1);
    assert_eq!(processed.errors[0].kind, ErrorKind::Evaluation);
    assert_eq!(processed.errors[0].function_name, "gt");
    assert!(!processed.message.has_field("slow"));
    assert_eq!(processed.created_messages.len(), 1);
}

#[test]
fn test_non_boolean_condition_suppresses_actions() {
    let store = RuleStore::new(builtins());
    store
        .load(
            RuleDefinition::new(
                "string_condition",
                AstNode::field("level"),
                vec![AstNode::call("drop_message", Vec::new())],
            )
            .with_id("string-condition"),
        )
        .unwrap();

    let processed = RuleEvaluator::new().process_message(&store.list_all(), create_access_log());

    assert!(!processed.results[0].matched);
    assert!(!processed.message.is_dropped());
    assert_eq!(processed.errors[0].kind, ErrorKind::ConditionNotBoolean);
}

#[test]
fn test_bind_errors_surface_at_compile_time() {
    let store = RuleStore::new(builtins());

    let missing = RuleDefinition::new(
        "missing",
        AstNode::call("contains", vec![AstNode::field("message")]),
        Vec::new(),
    )
    .with_id("missing");
    let err = store.load(missing).unwrap_err();
    assert!(matches!(err, RuleError::MissingRequiredParameter { .. }));
    assert_eq!(err.code(), "MISSING_REQUIRED_PARAMETER");

    // 补上参数后绑定成功
    let fixed = RuleDefinition::new(
        "fixed",
        AstNode::call(
            "contains",
            vec![AstNode::field("message"), AstNode::literal("502")],
        ),
        Vec::new(),
    )
    .with_id("fixed");
    store.load(fixed).unwrap();
    assert_eq!(store.len(), 1);

    let unknown = RuleDefinition::new(
        "unknown",
        AstNode::call("lowercase", vec![AstNode::field("message")])
            .with_named("locale", AstNode::literal("tr")),
        Vec::new(),
    )
    .with_id("unknown");
    assert!(matches!(
        store.load(unknown).unwrap_err(),
        RuleError::UnknownParameter { .. }
    ));
}

// ==================== 短路求值测试 ====================

#[test]
fn test_short_circuit_avoids_side_effects() {
    let store = RuleStore::new(builtins());
    let side_effect = || AstNode::call("create_message", vec![AstNode::literal("side_effect")]);

    store
        .load(
            RuleDefinition::new(
                "short_circuit",
                AstNode::call(
                    "or",
                    vec![
                        AstNode::call("has_field", vec![AstNode::literal("http")]),
                        side_effect(),
                    ],
                ),
                vec![AstNode::call(
                    "if",
                    vec![
                        AstNode::call(
                            "contains",
                            vec![AstNode::field("tags"), AstNode::literal("edge")],
                        ),
                        AstNode::call(
                            "set_field",
                            vec![AstNode::literal("zone"), AstNode::literal("edge")],
                        ),
                        side_effect(),
                    ],
                )],
            )
            .with_id("short-circuit"),
        )
        .unwrap();

    let processed = RuleEvaluator::new().process_message(&store.list_all(), create_access_log());

    assert!(processed.results[0].matched);
    assert!(processed.created_messages.is_empty());
    assert_eq!(processed.message.get_field("zone"), Some(&json!("edge")));
}

// ==================== 扩展函数测试 ====================

/// 自定义函数：按阈值给延迟分级
struct LatencyBucket {
    descriptor: FunctionDescriptor,
}

impl LatencyBucket {
    fn new() -> Self {
        Self {
            descriptor: FunctionDescriptor::builder("latency_bucket")
                .returns(ValueType::String)
                .param(ParameterDescriptor::double("latency"))
                .param(ParameterDescriptor::double("slow_ms").with_default(1000.0))
                .build(),
        }
    }
}

impl Function for LatencyBucket {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn evaluate(
        &self,
        args: &FunctionArgs,
        context: &mut EvaluationContext<'_>,
    ) -> pipeline_rules::Result<Option<Value>> {
        let Some(latency) = args.double("latency", context)? else {
            return Ok(None);
        };
        let slow = args.double("slow_ms", context)?.unwrap_or(1000.0);
        let bucket = if latency >= slow { "slow" } else { "fast" };
        Ok(Some(Value::from(bucket)))
    }
}

#[test]
fn test_custom_function_extension() {
    let mut registry = FunctionRegistry::with_builtins().unwrap();
    registry.register(LatencyBucket::new()).unwrap();
    assert!(matches!(
        registry.register(LatencyBucket::new()),
        Err(RuleError::DuplicateFunction(_))
    ));

    let store = RuleStore::new(Arc::new(registry));
    store
        .load(
            RuleDefinition::new(
                "bucket",
                AstNode::literal(true),
                vec![AstNode::call(
                    "set_field",
                    vec![
                        AstNode::literal("latency_bucket"),
                        AstNode::call("latency_bucket", vec![AstNode::field("http.latency_ms")]),
                    ],
                )],
            )
            .with_id("bucket"),
        )
        .unwrap();

    let processed = RuleEvaluator::new().process_message(&store.list_all(), create_access_log());
    assert_eq!(
        processed.message.get_field("latency_bucket"),
        Some(&json!("slow"))
    );
}

#[test]
fn test_descriptor_metadata_round_trip() {
    let registry = builtins();
    for descriptor in registry.descriptors() {
        let metadata = descriptor.to_metadata().unwrap();
        let restored = FunctionDescriptor::from_metadata(metadata).unwrap();
        assert_eq!(&restored, descriptor);
    }
}

// ==================== 并发测试 ====================

#[test]
fn test_concurrent_evaluation_is_isolated() {
    let store = RuleStore::new(builtins());
    store
        .load(
            RuleDefinition::new(
                "echo",
                AstNode::call("has_field", vec![AstNode::literal("worker")]),
                vec![
                    AstNode::call(
                        "create_message",
                        vec![AstNode::field("worker"), AstNode::literal("echo")],
                    ),
                    AstNode::call("upper", vec![AstNode::field("worker")]),
                ],
            )
            .with_id("echo"),
        )
        .unwrap();

    let rules = Arc::new(store.list_all());
    let evaluator = Arc::new(RuleEvaluator::new());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let rules = Arc::clone(&rules);
            let evaluator = Arc::clone(&evaluator);
            thread::spawn(move || {
                let mut message = Message::new(format!("message {}", i), "load-test");
                message.set_field("worker", json!(format!("worker-{}", i)));
                (i, evaluator.process_message(&rules, message))
            })
        })
        .collect();

    for handle in handles {
        let (i, processed) = handle.join().unwrap();
        assert_eq!(processed.created_messages.len(), 1);
        assert_eq!(
            processed.created_messages[0].get_field("message"),
            Some(&json!(format!("worker-{}", i)))
        );
        assert_eq!(processed.errors.len(), 1);
        assert_eq!(processed.errors[0].kind, ErrorKind::UnresolvedFunction);
    }
}

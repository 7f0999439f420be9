//! 规则评估命令行工具
//!
//! 加载规则文件，逐行读取 JSON 消息并发评估，每条消息输出一行 JSON 结果。
//!
//! ```text
//! rule-eval [rules.json] [messages.ndjson]
//! ```
//!
//! 未指定消息文件时从标准输入读取。

use anyhow::{Context, Result};
use futures::stream::{self, Stream, StreamExt};
use pipeline_rules::{
    CompiledRule, FunctionRegistry, Message, ProcessedMessage, RuleEvaluator, RuleStore,
};
use pipeline_shared::config::AppConfig;
use pipeline_shared::observability;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

/// 单行输入的处理结果
enum Outcome {
    Blank,
    Invalid(serde_json::Error),
    Processed(Box<ProcessedMessage>),
}

#[tokio::main]
async fn main() -> Result<()> {
    // 统一加载配置：从 config/{service_name}.toml 加载，包含可观测性配置
    let mut config = AppConfig::load("rule-eval").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    // 命令行参数覆盖配置文件
    let mut args = std::env::args().skip(1);
    if let Some(rules_path) = args.next() {
        config.engine.rules_path = rules_path;
    }
    if let Some(messages_path) = args.next() {
        config.engine.messages_path = Some(messages_path);
    }

    let _guard = observability::init(&config.observability_config()).await?;

    info!("Starting rule-eval...");

    let registry = Arc::new(FunctionRegistry::with_builtins()?);
    info!(functions = registry.len(), "Function registry initialized");

    let store = RuleStore::new(Arc::clone(&registry));
    let rules_json = tokio::fs::read_to_string(&config.engine.rules_path)
        .await
        .with_context(|| format!("Failed to read rules from {}", config.engine.rules_path))?;
    store
        .load_all_from_json(&rules_json)
        .with_context(|| format!("Failed to compile rules in {}", config.engine.rules_path))?;

    let stats = store.stats();
    info!(
        rules = stats.rules_count,
        unresolved = stats.rules_with_unresolved,
        "Rules loaded"
    );
    if stats.rules_with_unresolved > 0 {
        warn!(
            "{} rules reference unregistered functions",
            stats.rules_with_unresolved
        );
    }

    let evaluator = if config.engine.trace_enabled {
        RuleEvaluator::new().with_trace()
    } else {
        RuleEvaluator::new()
    };

    let reader = open_messages(config.engine.messages_path.as_deref()).await?;
    let (processed, skipped) = run(
        reader,
        Arc::new(evaluator),
        store.list_all().into(),
        config.engine.worker_threads.max(1),
    )
    .await?;

    info!(processed, skipped, "Evaluation complete");
    Ok(())
}

/// 打开消息输入
async fn open_messages(path: Option<&str>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .await
                .with_context(|| format!("Failed to open messages file {}", path))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

/// 按行读取输入
fn lines(
    reader: Box<dyn AsyncBufRead + Unpin + Send>,
) -> impl Stream<Item = std::io::Result<String>> {
    stream::unfold(reader.lines(), |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((Ok(line), lines)),
            Ok(None) => None,
            Err(e) => Some((Err(e), lines)),
        }
    })
}

/// 在阻塞线程池上并发评估，输出顺序与输入一致
async fn run(
    reader: Box<dyn AsyncBufRead + Unpin + Send>,
    evaluator: Arc<RuleEvaluator>,
    rules: Arc<[Arc<CompiledRule>]>,
    workers: usize,
) -> Result<(usize, usize)> {
    let outcomes = lines(reader)
        .map(|line| {
            let evaluator = Arc::clone(&evaluator);
            let rules = Arc::clone(&rules);
            async move {
                let line = line.context("Failed to read message input")?;
                let outcome =
                    tokio::task::spawn_blocking(move || evaluate_line(&evaluator, &rules, &line))
                        .await?;
                Ok::<_, anyhow::Error>(outcome)
            }
        })
        .buffered(workers)
        .enumerate();
    let mut outcomes = std::pin::pin!(outcomes);

    let mut stdout = tokio::io::stdout();
    let (mut processed, mut skipped) = (0, 0);

    while let Some((index, outcome)) = outcomes.next().await {
        match outcome? {
            Outcome::Blank => {}
            Outcome::Invalid(e) => {
                skipped += 1;
                warn!(line = index + 1, error = %e, "Skipping invalid message");
            }
            Outcome::Processed(report) => {
                processed += 1;
                metrics::counter!("messages_processed_total").increment(1);
                let mut json = serde_json::to_string(&report)?;
                json.push('\n');
                stdout.write_all(json.as_bytes()).await?;
            }
        }
    }

    stdout.flush().await?;
    Ok((processed, skipped))
}

fn evaluate_line(evaluator: &RuleEvaluator, rules: &[Arc<CompiledRule>], line: &str) -> Outcome {
    if line.trim().is_empty() {
        return Outcome::Blank;
    }

    match Message::from_json(line) {
        Ok(message) => Outcome::Processed(Box::new(evaluator.process_message(rules, message))),
        Err(e) => Outcome::Invalid(e),
    }
}

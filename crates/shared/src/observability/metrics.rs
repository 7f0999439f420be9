//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

use super::ObservabilityConfig;

/// 初始化 Prometheus 指标导出，需要在 tokio 运行时内调用
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    register_common_metrics(&config.service_name);
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

/// 注册规则引擎指标的描述
fn register_common_metrics(service_name: &str) {
    // 这些描述会出现在 /metrics 端点的 HELP 注释中
    metrics::describe_counter!("rule_evaluations_total", "Total number of rule evaluations");
    metrics::describe_counter!(
        "rule_evaluation_errors_total",
        "Total number of recorded evaluation errors"
    );
    metrics::describe_counter!("rule_actions_total", "Total number of rule actions by outcome");
    metrics::describe_counter!("messages_processed_total", "Total number of processed messages");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_without_recorder_does_not_panic() {
        // 没有安装 recorder 时，描述和计数都是空操作
        register_common_metrics("test-service");
    }
}

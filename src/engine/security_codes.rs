// ==========================================
// 揽收任务系统 - 安全码批量获取
// ==========================================
// 职责: 并发获取多个任务的安全码
// 红线: 单个任务失败只影响该任务（结果为 None），不中断整批
// 并发: buffer_unordered，上限来自配置 security_code_fetch_concurrency
// ==========================================

use crate::engine::timeout::within;
use crate::repository::gateway::MissionGateway;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// 批量获取安全码
///
/// # 返回
/// 每个输入任务 ID 一项；获取失败或尚未签发均为 None
pub async fn fetch_security_codes(
    gateway: &dyn MissionGateway,
    mission_ids: &[i64],
    concurrency: usize,
    limit: Duration,
) -> HashMap<i64, Option<String>> {
    let results: Vec<(i64, Option<String>)> = stream::iter(mission_ids.iter().copied())
        .map(|mission_id| async move {
            match within(limit, "get_security_code", gateway.get_security_code(mission_id)).await {
                Ok(code) => (mission_id, code),
                Err(e) => {
                    warn!(mission_id, error = %e, "安全码获取失败");
                    (mission_id, None)
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let fetched = results.iter().filter(|(_, code)| code.is_some()).count();
    info!(requested = mission_ids.len(), fetched, "安全码批量获取完成");
    results.into_iter().collect()
}

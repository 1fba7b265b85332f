// ==========================================
// 揽收任务系统 - 协作方调用超时
// ==========================================
// 超时统一转为 RepositoryError::Timeout，再经 From 转为 CollaboratorFailure
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use std::future::Future;
use std::time::Duration;

/// 在限定时间内等待协作方调用
pub async fn within<T, F>(limit: Duration, operation: &str, fut: F) -> RepositoryResult<T>
where
    F: Future<Output = RepositoryResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "协作方调用超时");
            Err(RepositoryError::Timeout {
                operation: operation.to_string(),
                timeout_ms: limit.as_millis() as u64,
            })
        }
    }
}

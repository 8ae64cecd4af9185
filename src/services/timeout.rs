// ==========================================
// 平台运营分析引擎 - 协作方调用超时
// ==========================================
// 红线: 每次取数/持久化都必须在超时内完成，超时映射为 RepositoryError::Timeout
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use std::future::Future;
use std::time::Duration;

/// 在超时内执行协作方调用
///
/// # 参数
/// - `operation`: 操作名（写入错误与日志）
/// - `timeout_ms`: 超时毫秒数
pub async fn with_timeout<T, F>(operation: &str, timeout_ms: u64, fut: F) -> RepositoryResult<T>
where
    F: Future<Output = RepositoryResult<T>>,
{
    match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation = operation, timeout_ms = timeout_ms, "协作方调用超时");
            Err(RepositoryError::Timeout {
                operation: operation.to_string(),
                timeout_ms,
            })
        }
    }
}

// ==========================================
// 揽收任务系统 - 配置读取 Trait
// ==========================================
// 职责: 定义引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// 默认值
// ==========================================
pub const DEFAULT_COLLABORATOR_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_SECURITY_CODE_FETCH_CONCURRENCY: usize = 8;
pub const DEFAULT_DESK_QUEUE_CAPACITY: usize = 64;

// ==========================================
// PickupConfig - 配置快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupConfig {
    /// 单次协作方调用超时（毫秒）
    pub collaborator_timeout_ms: u64,
    /// 安全码批量获取并发度
    pub security_code_fetch_concurrency: usize,
    /// 任务号前缀
    pub mission_number_prefix: String,
    /// 列出请求时排除已分配的请求
    pub exclude_assigned_requests: bool,
    /// 任务台命令队列容量
    pub desk_queue_capacity: usize,
}

impl Default for PickupConfig {
    fn default() -> Self {
        Self {
            collaborator_timeout_ms: DEFAULT_COLLABORATOR_TIMEOUT_MS,
            security_code_fetch_concurrency: DEFAULT_SECURITY_CODE_FETCH_CONCURRENCY,
            mission_number_prefix: crate::repository::DEFAULT_MISSION_NUMBER_PREFIX.to_string(),
            exclude_assigned_requests: true,
            desk_queue_capacity: DEFAULT_DESK_QUEUE_CAPACITY,
        }
    }
}

impl PickupConfig {
    pub fn collaborator_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.collaborator_timeout_ms)
    }
}

// ==========================================
// PickupConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait PickupConfigReader: Send + Sync {
    /// 协作方调用超时（毫秒）
    ///
    /// # 默认值
    /// - 30000
    async fn get_collaborator_timeout_ms(&self) -> RepositoryResult<u64>;

    /// 安全码批量获取并发度（至少为 1）
    ///
    /// # 默认值
    /// - 8
    async fn get_security_code_fetch_concurrency(&self) -> RepositoryResult<usize>;

    /// 任务号前缀
    ///
    /// # 默认值
    /// - PKP
    async fn get_mission_number_prefix(&self) -> RepositoryResult<String>;

    /// 是否排除已分配请求
    ///
    /// # 默认值
    /// - true
    async fn get_exclude_assigned_requests(&self) -> RepositoryResult<bool>;

    /// 任务台命令队列容量
    ///
    /// # 默认值
    /// - 64
    async fn get_desk_queue_capacity(&self) -> RepositoryResult<usize>;

    /// 读取完整配置快照
    async fn load_snapshot(&self) -> RepositoryResult<PickupConfig> {
        Ok(PickupConfig {
            collaborator_timeout_ms: self.get_collaborator_timeout_ms().await?,
            security_code_fetch_concurrency: self.get_security_code_fetch_concurrency().await?,
            mission_number_prefix: self.get_mission_number_prefix().await?,
            exclude_assigned_requests: self.get_exclude_assigned_requests().await?,
            desk_queue_capacity: self.get_desk_queue_capacity().await?,
        })
    }
}

// ==========================================
// 揽收任务系统 - 协作方接口 Trait
// ==========================================
// 职责: 定义引擎消费的外部协作方接口（不包含实现）
// 红线: 接口只做数据读写与远端校验，不含生命周期规则
// 实现者: SqlitePickupStore（rusqlite）、测试中的内存 Mock
// ==========================================

use crate::domain::{AcceptedRequest, Actor, Driver, Mission, MissionStatus, Parcel};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// MissionGateway - 任务读写
// ==========================================
#[async_trait]
pub trait MissionGateway: Send + Sync {
    /// 列出全部任务
    async fn list_missions(&self) -> RepositoryResult<Vec<Mission>>;

    /// 获取任务详情（含司机与包裹）
    ///
    /// # 返回
    /// - Err(NotFound): 任务不存在
    async fn get_mission(&self, mission_id: i64) -> RepositoryResult<Mission>;

    /// 创建任务（分配任务号，初始状态 En attente）
    async fn create_mission(
        &self,
        driver_id: i64,
        request_ids: &[i64],
        note: &str,
    ) -> RepositoryResult<Mission>;

    /// 删除任务
    ///
    /// # 返回
    /// - Err(NotFound): 任务不存在（调用方视为已删除）
    async fn delete_mission(&self, mission_id: i64) -> RepositoryResult<()>;

    /// 读取任务安全码（尚未签发时为 None）
    async fn get_security_code(&self, mission_id: i64) -> RepositoryResult<Option<String>>;

    /// 远端登记一次揽收扫描
    async fn scan_parcel_remote(&self, mission_id: i64, code: &str) -> RepositoryResult<()>;

    /// 持久化状态流转结果
    async fn update_status(&self, mission_id: i64, status: MissionStatus) -> RepositoryResult<()>;
}

// ==========================================
// DirectoryGateway - 司机/请求/包裹目录
// ==========================================
#[async_trait]
pub trait DirectoryGateway: Send + Sync {
    async fn list_drivers(&self) -> RepositoryResult<Vec<Driver>>;

    /// 列出已受理请求
    ///
    /// # 参数
    /// - exclude_assigned: 排除已打包进任务的请求
    async fn list_accepted_requests(
        &self,
        exclude_assigned: bool,
    ) -> RepositoryResult<Vec<AcceptedRequest>>;

    async fn get_parcels_for_request(&self, request_id: i64) -> RepositoryResult<Vec<Parcel>>;
}

// ==========================================
// ReceptionGateway - 分支签收
// ==========================================
#[async_trait]
pub trait ReceptionGateway: Send + Sync {
    /// 分支负责人扫描一个包裹（重复/归属校验由协作方负责）
    async fn chef_agence_scan(&self, mission_id: i64, parcel_id: i64) -> RepositoryResult<()>;

    /// 提交已签收包裹，生成完成码
    async fn generate_completion_code(
        &self,
        mission_id: i64,
        scanned_parcel_ids: &[i64],
    ) -> RepositoryResult<String>;
}

// ==========================================
// SessionStore - 会话引导
// ==========================================
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 读取当前操作人（未登录为 None）
    async fn load_actor(&self) -> RepositoryResult<Option<Actor>>;
}

/// 固定会话（嵌入方已持有操作人时使用）
#[derive(Debug, Clone, Default)]
pub struct StaticSessionStore {
    actor: Option<Actor>,
}

impl StaticSessionStore {
    pub fn new(actor: Option<Actor>) -> Self {
        Self { actor }
    }
}

#[async_trait]
impl SessionStore for StaticSessionStore {
    async fn load_actor(&self) -> RepositoryResult<Option<Actor>> {
        Ok(self.actor.clone())
    }
}

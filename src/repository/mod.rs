// ==========================================
// 揽收任务系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含生命周期规则
// ==========================================
// 职责: 定义外部协作方接口，并提供 SQLite 参考实现
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod gateway;
pub mod pickup_store;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use gateway::{
    DirectoryGateway, MissionGateway, ReceptionGateway, SessionStore, StaticSessionStore,
};
pub use pickup_store::{SqlitePickupStore, DEFAULT_MISSION_NUMBER_PREFIX};

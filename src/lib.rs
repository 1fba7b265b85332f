// ==========================================
// 揽收任务系统 - 核心库
// ==========================================
// 职责: 揽收任务生命周期与扫描核对引擎
// 技术栈: Rust + tokio + SQLite
// 系统定位: 指派司机、跟踪任务状态、核对包裹扫描、安全码把关完成
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 协作方接口与 SQLite 实现
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 应用层 - 状态组装与任务台
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{MissionStatus, ParcelStatus, Role};

// 领域实体
pub use domain::{AcceptedRequest, Actor, Driver, Mission, MissionStats, Parcel, RemoveOutcome};

// 引擎
pub use engine::{
    AccessPolicy, AssignmentBuilder, EngineError, EngineResult, MissionLifecycle, ScanOutcome,
    ScanSession, StatusFilter,
};

// 应用
pub use app::{AppState, MissionDeskHandle};

// ==========================================
// 版本信息
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "揽收任务系统";

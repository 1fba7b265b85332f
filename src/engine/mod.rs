// ==========================================
// 揽收任务系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎，不拼 SQL
// 红线: 规则失败以 EngineError 返回，本地状态保持不变
// ==========================================
// 组件（叶子在前）:
// - access_policy: 角色/分支可见性
// - lifecycle: 任务状态机
// - assignment: 指派向导
// - scan: 扫描核对
// - dashboard: 统计与筛选
// - reception: 分支签收与完成码
// ==========================================

pub mod access_policy;
pub mod agency_match;
pub mod assignment;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod manifest;
pub mod reception;
pub mod scan;
pub mod security_codes;
pub mod timeout;

// 重导出核心引擎
pub use access_policy::AccessPolicy;
pub use assignment::{AssignmentBuilder, AssignmentPayload, AssignmentSummary, WizardStep};
pub use dashboard::{compute_stats, filter_by_status, search, StatusFilter};
pub use error::{EngineError, EngineResult};
pub use events::{
    ChannelEventPublisher, MissionEvent, MissionEventPublisher, MissionEventType,
    NoOpEventPublisher, OptionalEventPublisher,
};
pub use lifecycle::{can_transition, MissionLifecycle};
pub use manifest::{export_manifest, write_manifest};
pub use reception::ReceptionSession;
pub use scan::{ScanOutcome, ScanSession};
pub use security_codes::fetch_security_codes;

// ==========================================
// 揽收任务系统 - 领域层
// ==========================================
// 职责: 实体与类型定义，不含业务规则
// ==========================================

pub mod actor;
pub mod driver;
pub mod mission;
pub mod parcel;
pub mod request;
pub mod types;

// 重导出核心实体
pub use actor::Actor;
pub use driver::Driver;
pub use mission::{Mission, MissionStats, RemoveOutcome};
pub use parcel::{Parcel, ScannedParcel};
pub use request::AcceptedRequest;
pub use types::{MissionStatus, ParcelStatus, Role};

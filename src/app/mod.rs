// ==========================================
// 揽收任务系统 - 应用层
// ==========================================
// 职责: 组装协作方、配置与任务台
// ==========================================

pub mod desk;
pub mod state;

// 重导出
pub use desk::{DeskServices, MissionDesk, MissionDeskHandle, ScanReport};
pub use state::{get_default_db_path, AppState};

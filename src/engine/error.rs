// ==========================================
// 揽收任务系统 - 引擎层错误类型
// ==========================================
// 职责: 生命周期/扫描/指派错误分类，并把协作方失败统一收敛
// 说明: 所有错误都可在下一次用户操作时恢复，不存在进程级致命错误
// ==========================================

use crate::domain::MissionStatus;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 缺少司机或请求集合为空
    #[error("无效指派: {0}")]
    InvalidAssignment(String),

    /// 当前状态不允许该操作
    #[error("无效状态: mission_id={mission_id}, status={status}, 操作={operation}")]
    InvalidState {
        mission_id: i64,
        status: MissionStatus,
        operation: String,
    },

    /// 扫描码不在本任务的期望包裹集合中
    #[error("包裹未找到: code={code}")]
    ParcelNotFound { code: String },

    /// 包裹已在本次扫描会话中扫描过
    #[error("重复扫描: parcel_id={parcel_id}")]
    DuplicateScan { parcel_id: i64 },

    /// 完成任务时提交的安全码与签发值不一致
    #[error("安全码不匹配: mission_id={mission_id}")]
    SecurityCodeMismatch { mission_id: i64 },

    /// 当前没有打开的扫描/签收会话
    #[error("会话未开启: 操作={operation}")]
    SessionNotOpen { operation: String },

    /// 任务不在当前集合中
    #[error("任务不存在: mission_id={0}")]
    MissionNotFound(i64),

    /// 外部协作方调用失败（网络、持久化、远端校验）
    #[error("协作方调用失败: {0}")]
    CollaboratorFailure(String),
}

impl EngineError {
    pub fn invalid_state(mission_id: i64, status: MissionStatus, operation: &str) -> Self {
        EngineError::InvalidState {
            mission_id,
            status,
            operation: operation.to_string(),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
// 协作方的任何失败都以 CollaboratorFailure 呈现给操作人
impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        EngineError::CollaboratorFailure(err.to_string())
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

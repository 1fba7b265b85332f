// ==========================================
// 揽收任务系统 - 任务领域模型
// ==========================================
// 职责: 揽收任务实体与看板统计结构
// 红线: 状态只能经由生命周期引擎流转；司机指派创建后不可变
// ==========================================

use crate::domain::driver::Driver;
use crate::domain::parcel::Parcel;
use crate::domain::types::{MissionStatus, ParcelStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Mission - 揽收任务
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    // ===== 标识 =====
    pub id: i64,
    pub mission_number: String, // 人类可读任务号（由持久化方分配）

    // ===== 状态 =====
    pub status: MissionStatus,

    // ===== 指派 =====
    pub driver_id: i64,
    pub driver: Option<Driver>, // 司机详情（列表接口可能不带）
    pub request_ids: Vec<i64>,
    pub parcels: Vec<Parcel>, // 期望包裹集合（有序）

    // ===== 时间 =====
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,

    // ===== 授权码 =====
    pub security_code: Option<String>,   // 服务端签发，异步获取
    pub completion_code: Option<String>, // 分支签收后生成

    pub notes: Option<String>,
}

impl Mission {
    /// 司机名称（无详情时为空串）
    pub fn driver_name(&self) -> &str {
        self.driver.as_ref().map(|d| d.name.as_str()).unwrap_or("")
    }

    /// 司机分支（无详情时为空串）
    pub fn driver_agency(&self) -> &str {
        self.driver.as_ref().map(|d| d.agency()).unwrap_or("")
    }

    /// 已到仓的包裹数
    pub fn parcels_at_depot(&self) -> usize {
        self.parcels
            .iter()
            .filter(|p| p.status == ParcelStatus::AtDepot)
            .count()
    }

    /// 期望包裹是否全部到仓
    pub fn all_parcels_at_depot(&self) -> bool {
        self.parcels_at_depot() == self.parcels.len()
    }
}

// ==========================================
// MissionStats - 看板统计
// ==========================================
// 除 Pending/Completed/Rejected 外的状态只计入 total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionStats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub rejected: usize,
}

// ==========================================
// RemoveOutcome - 删除结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoveOutcome {
    Removed,        // 已删除
    AlreadyRemoved, // 任务不存在，视为已删除
    Cancelled,      // 操作人未确认
}

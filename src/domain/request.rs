// ==========================================
// 揽收任务系统 - 已受理揽收请求
// ==========================================
// 说明: 发件人的揽收请求，已受理但尚未打包成任务
// ==========================================

use crate::domain::parcel::Parcel;
use serde::{Deserialize, Serialize};

// ==========================================
// AcceptedRequest - 已受理请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedRequest {
    pub id: i64,
    pub sender_name: Option<String>,   // expediteur_name
    pub sender_agency: Option<String>, // expediteur_agency
    pub parcel_count: u32,
    #[serde(default)]
    pub parcels: Vec<Parcel>, // 勾选后才拉取明细
}

impl AcceptedRequest {
    /// 发件分支（缺失为空串）
    pub fn agency(&self) -> &str {
        self.sender_agency.as_deref().unwrap_or("")
    }
}

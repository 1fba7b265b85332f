// ==========================================
// 揽收任务系统 - 包裹领域模型
// ==========================================

use crate::domain::types::ParcelStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Parcel - 包裹
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    pub id: i64,
    pub tracking_number: String,
    pub recipient_name: Option<String>,
    pub destination: Option<String>,
    #[serde(default)]
    pub status: ParcelStatus,
}

impl Parcel {
    /// 扫码匹配: 运单号或 ID 字符串完全相等
    pub fn matches_code(&self, code: &str) -> bool {
        self.tracking_number == code || self.id.to_string() == code
    }

    /// 收件信息（收件人优先，其次目的地）
    pub fn recipient_label(&self) -> &str {
        self.recipient_name
            .as_deref()
            .or(self.destination.as_deref())
            .unwrap_or("N/A")
    }
}

// ==========================================
// ScannedParcel - 已扫描包裹
// ==========================================
// 扫描成功时盖上扫描时间戳，状态置为 Au dépôt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedParcel {
    pub parcel: Parcel,
    pub scanned_at: DateTime<Utc>,
}

impl ScannedParcel {
    pub fn stamp(parcel: &Parcel, scanned_at: DateTime<Utc>) -> Self {
        Self {
            parcel: Parcel {
                status: ParcelStatus::AtDepot,
                ..parcel.clone()
            },
            scanned_at,
        }
    }

    pub fn id(&self) -> i64 {
        self.parcel.id
    }
}

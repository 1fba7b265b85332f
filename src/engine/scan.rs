// ==========================================
// 揽收任务系统 - 扫描核对引擎
// ==========================================
// 职责: 将扫描码与任务期望包裹集合逐一核对，维护已扫/未扫分区
// 红线: 已扫集合 ⊆ 期望集合，且不含重复包裹
// 红线: 校验失败不修改已扫集合
// ==========================================
// 完成判定: 成功扫描后 |已扫| == |期望| 即完成
// 期望集合为空时永不完成，进度为 0%
// ==========================================

use crate::domain::{Mission, Parcel, ScannedParcel};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::timeout::within;
use crate::repository::gateway::MissionGateway;
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

// ==========================================
// ScanOutcome - 单次扫描结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ScanOutcome {
    /// 空白输入，不做任何处理
    Ignored,
    /// 扫描成功，尚有未扫包裹
    Accepted {
        parcel_id: i64,
        scanned: usize,
        expected: usize,
    },
    /// 扫描成功且全部到齐
    Completed { parcel_id: i64, expected: usize },
}

impl ScanOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ScanOutcome::Completed { .. })
    }
}

// ==========================================
// ScanSession - 扫描会话
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanSession {
    mission_id: i64,
    expected: Vec<Parcel>,
    scanned: Vec<ScannedParcel>,
}

impl ScanSession {
    /// 以任务当前包裹集合为快照开启会话
    pub fn open(mission: &Mission) -> Self {
        Self::with_expected(mission.id, mission.parcels.clone())
    }

    pub fn with_expected(mission_id: i64, parcels: Vec<Parcel>) -> Self {
        let mut expected: Vec<Parcel> = Vec::with_capacity(parcels.len());
        for parcel in parcels {
            if !expected.iter().any(|p| p.id == parcel.id) {
                expected.push(parcel);
            }
        }
        Self {
            mission_id,
            expected,
            scanned: Vec::new(),
        }
    }

    pub fn mission_id(&self) -> i64 {
        self.mission_id
    }

    pub fn expected(&self) -> &[Parcel] {
        &self.expected
    }

    pub fn scanned(&self) -> &[ScannedParcel] {
        &self.scanned
    }

    /// 尚未扫描的期望包裹（保持期望顺序）
    pub fn unscanned(&self) -> Vec<&Parcel> {
        self.expected
            .iter()
            .filter(|p| !self.is_scanned(p.id))
            .collect()
    }

    fn is_scanned(&self, parcel_id: i64) -> bool {
        self.scanned.iter().any(|s| s.id() == parcel_id)
    }

    pub fn is_complete(&self) -> bool {
        !self.expected.is_empty() && self.scanned.len() == self.expected.len()
    }

    /// 扫描进度（百分比）
    pub fn progress_percent(&self) -> f64 {
        if self.expected.is_empty() {
            return 0.0;
        }
        self.scanned.len() as f64 / self.expected.len() as f64 * 100.0
    }

    /// 校验扫描码，返回命中的期望包裹（不修改状态）
    fn resolve(&self, raw_code: &str) -> EngineResult<Option<Parcel>> {
        let code = raw_code.trim();
        if code.is_empty() {
            return Ok(None);
        }

        let parcel = self
            .expected
            .iter()
            .find(|p| p.matches_code(code))
            .ok_or_else(|| EngineError::ParcelNotFound {
                code: code.to_string(),
            })?;

        if self.is_scanned(parcel.id) {
            return Err(EngineError::DuplicateScan {
                parcel_id: parcel.id,
            });
        }
        Ok(Some(parcel.clone()))
    }

    fn commit(&mut self, parcel: &Parcel) -> ScanOutcome {
        self.scanned.push(ScannedParcel::stamp(parcel, Utc::now()));
        debug!(
            mission_id = self.mission_id,
            parcel_id = parcel.id,
            scanned = self.scanned.len(),
            expected = self.expected.len(),
            "包裹扫描成功"
        );

        if self.is_complete() {
            ScanOutcome::Completed {
                parcel_id: parcel.id,
                expected: self.expected.len(),
            }
        } else {
            ScanOutcome::Accepted {
                parcel_id: parcel.id,
                scanned: self.scanned.len(),
                expected: self.expected.len(),
            }
        }
    }

    /// 本地扫描
    ///
    /// # 返回
    /// - Ok(Ignored): 去空白后为空
    /// - Err(ParcelNotFound): 扫描码不匹配任何期望包裹
    /// - Err(DuplicateScan): 包裹已扫描
    pub fn scan(&mut self, raw_code: &str) -> EngineResult<ScanOutcome> {
        match self.resolve(raw_code)? {
            None => Ok(ScanOutcome::Ignored),
            Some(parcel) => Ok(self.commit(&parcel)),
        }
    }

    /// 扫描并同步到远端
    ///
    /// 本地校验通过后先登记远端，远端失败时本地已扫集合保持不变
    pub async fn scan_mirrored(
        &mut self,
        gateway: &dyn MissionGateway,
        raw_code: &str,
        limit: Duration,
    ) -> EngineResult<ScanOutcome> {
        let Some(parcel) = self.resolve(raw_code)? else {
            return Ok(ScanOutcome::Ignored);
        };

        within(
            limit,
            "scan_parcel_remote",
            gateway.scan_parcel_remote(self.mission_id, &parcel.tracking_number),
        )
        .await?;

        Ok(self.commit(&parcel))
    }
}

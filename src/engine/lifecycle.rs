// ==========================================
// 揽收任务系统 - 任务生命周期引擎
// ==========================================
// 职责: 任务状态机与各流转操作的前置校验
// 红线: 不跳级、不回退；校验失败时本地集合保持不变
// 红线: 每次流转都经过 can_transition 表，并记录 tracing 日志
// ==========================================
// 状态链:
//   En attente → À enlever → Enlevé → Au dépôt → Terminé
//   En attente / À enlever → Refusé par livreur（终态）
// ==========================================

use crate::domain::{
    AcceptedRequest, Driver, Mission, MissionStats, MissionStatus, Parcel, ParcelStatus,
    RemoveOutcome,
};
use crate::engine::dashboard::compute_stats;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::events::{MissionEvent, MissionEventType, OptionalEventPublisher};
use crate::engine::scan::ScanSession;
use crate::engine::timeout::within;
use crate::repository::gateway::MissionGateway;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// 状态流转表
pub fn can_transition(from: MissionStatus, to: MissionStatus) -> bool {
    use MissionStatus::*;
    matches!(
        (from, to),
        (Pending, ToPickup)
            | (ToPickup, PickedUp)
            | (PickedUp, AtDepot)
            | (AtDepot, Completed)
            | (Pending, Rejected)
            | (ToPickup, Rejected)
    )
}

/// 请求包裹并集（按包裹 ID 去重，保持请求顺序）
pub fn union_parcels(requests: &[AcceptedRequest]) -> Vec<Parcel> {
    let mut parcels: Vec<Parcel> = Vec::new();
    for parcel in requests.iter().flat_map(|r| r.parcels.iter()) {
        if !parcels.iter().any(|p| p.id == parcel.id) {
            parcels.push(parcel.clone());
        }
    }
    parcels
}

// ==========================================
// MissionLifecycle
// ==========================================
pub struct MissionLifecycle {
    gateway: Arc<dyn MissionGateway>,
    events: OptionalEventPublisher,
    timeout: Duration,
    missions: Vec<Mission>,
}

impl MissionLifecycle {
    pub fn new(gateway: Arc<dyn MissionGateway>, timeout: Duration) -> Self {
        Self {
            gateway,
            events: OptionalEventPublisher::none(),
            timeout,
            missions: Vec::new(),
        }
    }

    pub fn with_events(mut self, events: OptionalEventPublisher) -> Self {
        self.events = events;
        self
    }

    pub fn missions(&self) -> &[Mission] {
        &self.missions
    }

    pub fn stats(&self) -> MissionStats {
        compute_stats(&self.missions)
    }

    pub fn find(&self, mission_id: i64) -> EngineResult<&Mission> {
        self.missions
            .iter()
            .find(|m| m.id == mission_id)
            .ok_or(EngineError::MissionNotFound(mission_id))
    }

    fn find_mut(&mut self, mission_id: i64) -> EngineResult<&mut Mission> {
        self.missions
            .iter_mut()
            .find(|m| m.id == mission_id)
            .ok_or(EngineError::MissionNotFound(mission_id))
    }

    /// 从协作方重新加载任务集合
    ///
    /// 已获取的安全码在刷新后保留
    pub async fn refresh(&mut self) -> EngineResult<()> {
        let mut fresh = within(self.timeout, "list_missions", self.gateway.list_missions()).await?;
        for mission in fresh.iter_mut() {
            if mission.security_code.is_none() {
                mission.security_code = self
                    .missions
                    .iter()
                    .find(|m| m.id == mission.id)
                    .and_then(|m| m.security_code.clone());
            }
        }
        self.missions = fresh;
        Ok(())
    }

    /// 合并批量获取的安全码（None 表示获取失败，保留原值）
    pub fn merge_security_codes(&mut self, codes: &HashMap<i64, Option<String>>) {
        for mission in self.missions.iter_mut() {
            if let Some(Some(code)) = codes.get(&mission.id) {
                mission.security_code = Some(code.clone());
            }
        }
    }

    /// 记录分支签收生成的完成码（状态不变）
    pub fn record_completion_code(&mut self, mission_id: i64, code: &str) {
        let status = match self.find_mut(mission_id) {
            Ok(mission) => {
                mission.completion_code = Some(code.to_string());
                Some(mission.status)
            }
            Err(_) => None,
        };
        info!(mission_id, "完成码已生成");
        self.events.publish(
            MissionEvent::new(mission_id, MissionEventType::CompletionCodeGenerated, status)
                .with_source("finalize_reception"),
        );
    }

    /// 创建任务
    ///
    /// # 返回
    /// - Err(InvalidAssignment): 未选择司机或请求集合为空，集合不变
    #[instrument(skip(self, driver, requests, note), fields(request_count = requests.len()))]
    pub async fn create(
        &mut self,
        driver: Option<&Driver>,
        requests: &[AcceptedRequest],
        note: &str,
    ) -> EngineResult<Mission> {
        let driver = driver
            .ok_or_else(|| EngineError::InvalidAssignment("未选择司机".to_string()))?;
        if requests.is_empty() {
            return Err(EngineError::InvalidAssignment(
                "至少需要选择一个揽收请求".to_string(),
            ));
        }

        let request_ids: Vec<i64> = requests.iter().map(|r| r.id).collect();
        let mut mission = within(
            self.timeout,
            "create_mission",
            self.gateway.create_mission(driver.id, &request_ids, note),
        )
        .await?;

        if mission.parcels.is_empty() {
            mission.parcels = union_parcels(requests);
        }
        if mission.driver.is_none() {
            mission.driver = Some(driver.clone());
        }
        mission.status = MissionStatus::Pending;
        mission.security_code = None;

        info!(
            mission_id = mission.id,
            mission_number = %mission.mission_number,
            driver_id = driver.id,
            parcels = mission.parcels.len(),
            "任务已创建"
        );
        self.events.publish(MissionEvent::new(
            mission.id,
            MissionEventType::MissionCreated,
            Some(mission.status),
        ));
        self.missions.insert(0, mission.clone());
        Ok(mission)
    }

    /// 删除任务（需操作人确认）
    ///
    /// # 返回
    /// - Ok(Cancelled): 未确认，不做任何调用
    /// - Ok(AlreadyRemoved): 协作方报告任务不存在
    /// - Err(InvalidState): 任务已处于终态
    pub async fn remove(&mut self, mission_id: i64, confirmed: bool) -> EngineResult<RemoveOutcome> {
        if !confirmed {
            return Ok(RemoveOutcome::Cancelled);
        }

        if let Some(mission) = self.missions.iter().find(|m| m.id == mission_id) {
            if mission.status.is_terminal() {
                return Err(EngineError::invalid_state(mission_id, mission.status, "remove"));
            }
        }

        let outcome = match within(
            self.timeout,
            "delete_mission",
            self.gateway.delete_mission(mission_id),
        )
        .await
        {
            Ok(()) => RemoveOutcome::Removed,
            Err(e) if e.is_not_found() => {
                warn!(mission_id, "任务已不存在，视为已删除");
                RemoveOutcome::AlreadyRemoved
            }
            Err(e) => return Err(e.into()),
        };

        self.missions.retain(|m| m.id != mission_id);
        info!(mission_id, ?outcome, "任务已删除");
        self.events.publish(MissionEvent::new(
            mission_id,
            MissionEventType::MissionRemoved,
            None,
        ));
        Ok(outcome)
    }

    /// 单步流转: 校验 → 持久化 → 更新本地集合
    async fn transition(
        &mut self,
        mission_id: i64,
        to: MissionStatus,
        operation: &str,
    ) -> EngineResult<()> {
        let from = self.find(mission_id)?.status;
        if !can_transition(from, to) {
            return Err(EngineError::invalid_state(mission_id, from, operation));
        }

        within(
            self.timeout,
            "update_status",
            self.gateway.update_status(mission_id, to),
        )
        .await?;

        self.find_mut(mission_id)?.status = to;
        info!(mission_id, from = %from, to = %to, operation, "任务状态流转");
        self.events.publish(
            MissionEvent::new(mission_id, MissionEventType::StatusChanged, Some(to))
                .with_source(operation),
        );
        Ok(())
    }

    /// 司机接单: En attente → À enlever
    pub async fn accept(&mut self, mission_id: i64) -> EngineResult<()> {
        self.transition(mission_id, MissionStatus::ToPickup, "accept").await
    }

    /// 司机拒单: En attente / À enlever → Refusé par livreur
    pub async fn reject(&mut self, mission_id: i64) -> EngineResult<()> {
        self.transition(mission_id, MissionStatus::Rejected, "reject").await
    }

    /// 开启揽收扫描会话（仅 À enlever）
    pub fn begin_pickup_scan(&self, mission_id: i64) -> EngineResult<ScanSession> {
        let mission = self.find(mission_id)?;
        if mission.status != MissionStatus::ToPickup {
            return Err(EngineError::invalid_state(
                mission_id,
                mission.status,
                "begin_pickup_scan",
            ));
        }
        info!(mission_id, expected = mission.parcels.len(), "开启揽收扫描");
        Ok(ScanSession::open(mission))
    }

    /// 扫描完成后推进到 Au dépôt
    ///
    /// 依次经过 Enlevé、Au dépôt 两次流转；会话在此被消费（关闭）
    pub async fn advance_on_full_scan(&mut self, session: ScanSession) -> EngineResult<Mission> {
        let mission_id = session.mission_id();
        let status = self.find(mission_id)?.status;
        if !session.is_complete() {
            return Err(EngineError::invalid_state(
                mission_id,
                status,
                "advance_on_full_scan",
            ));
        }

        if status == MissionStatus::ToPickup {
            self.transition(mission_id, MissionStatus::PickedUp, "advance_on_full_scan")
                .await?;
        }
        self.transition(mission_id, MissionStatus::AtDepot, "advance_on_full_scan")
            .await?;

        let mission = self.find_mut(mission_id)?;
        for scanned in session.scanned() {
            if let Some(parcel) = mission.parcels.iter_mut().find(|p| p.id == scanned.id()) {
                parcel.status = ParcelStatus::AtDepot;
            }
        }
        let mission = mission.clone();

        self.events.publish(MissionEvent::new(
            mission_id,
            MissionEventType::ScanCompleted,
            Some(mission.status),
        ));
        self.events
            .publish(MissionEvent::refresh(mission_id, "advance_on_full_scan"));
        Ok(mission)
    }

    /// 完成任务: Au dépôt → Terminé
    ///
    /// # 前置条件
    /// - 状态为 Au dépôt
    /// - 期望包裹全部到仓
    /// - 提交的安全码与签发值一致（未签发时为 InvalidState）
    pub async fn complete(&mut self, mission_id: i64, security_code: &str) -> EngineResult<()> {
        let mission = self.find(mission_id)?;
        if mission.status != MissionStatus::AtDepot || !mission.all_parcels_at_depot() {
            return Err(EngineError::invalid_state(mission_id, mission.status, "complete"));
        }
        let status = mission.status;

        let issued = match mission.security_code.clone() {
            Some(code) => Some(code),
            None => {
                within(
                    self.timeout,
                    "get_security_code",
                    self.gateway.get_security_code(mission_id),
                )
                .await?
            }
        };
        let issued = issued.ok_or_else(|| EngineError::invalid_state(mission_id, status, "complete"))?;

        if issued.trim() != security_code.trim() {
            warn!(mission_id, "安全码不匹配");
            return Err(EngineError::SecurityCodeMismatch { mission_id });
        }

        self.find_mut(mission_id)?.security_code = Some(issued);
        self.transition(mission_id, MissionStatus::Completed, "complete")
            .await
    }
}

// ==========================================
// 揽收任务系统 - 分支签收 / 完成码
// ==========================================
// 职责: 分支负责人逐件扫描到仓包裹，提交后生成完成码
// 说明: 重复与归属校验全部由协作方负责，本地只累积确认结果
// 红线: 生成完成码不触发状态流转
// ==========================================

use crate::engine::error::EngineResult;
use crate::engine::timeout::within;
use crate::repository::gateway::ReceptionGateway;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceptionSession {
    mission_id: i64,
    confirmed: Vec<i64>,
}

impl ReceptionSession {
    pub fn new(mission_id: i64) -> Self {
        Self {
            mission_id,
            confirmed: Vec::new(),
        }
    }

    pub fn mission_id(&self) -> i64 {
        self.mission_id
    }

    /// 协作方已确认的包裹 ID（按扫描顺序）
    pub fn confirmed(&self) -> &[i64] {
        &self.confirmed
    }

    /// 扫描一个包裹
    ///
    /// 协作方拒绝时返回 CollaboratorFailure，已确认集合不变
    pub async fn scan(
        &mut self,
        gateway: &dyn ReceptionGateway,
        parcel_id: i64,
        limit: Duration,
    ) -> EngineResult<usize> {
        within(
            limit,
            "chef_agence_scan",
            gateway.chef_agence_scan(self.mission_id, parcel_id),
        )
        .await?;

        self.confirmed.push(parcel_id);
        debug!(
            mission_id = self.mission_id,
            parcel_id,
            confirmed = self.confirmed.len(),
            "分支签收扫描"
        );
        Ok(self.confirmed.len())
    }

    /// 提交已确认集合，生成完成码（空集合同样提交，由协作方裁决）
    pub async fn finalize(
        &self,
        gateway: &dyn ReceptionGateway,
        limit: Duration,
    ) -> EngineResult<String> {
        let code = within(
            limit,
            "generate_completion_code",
            gateway.generate_completion_code(self.mission_id, &self.confirmed),
        )
        .await?;

        info!(
            mission_id = self.mission_id,
            parcels = self.confirmed.len(),
            "完成码已生成"
        );
        Ok(code)
    }
}

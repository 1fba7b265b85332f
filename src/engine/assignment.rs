// ==========================================
// 揽收任务系统 - 任务指派向导
// ==========================================
// 职责: 累积司机选择与请求选择，产出任务创建载荷
// 红线: 无司机或无请求时不能离开对应步骤，也不能产出载荷
// ==========================================
// 步骤: Driver(1) → Requests(2) → Summary(3) → Confirmation(4)
// 包裹获取失败时软失败: 请求以空包裹列表加入
// ==========================================

use crate::domain::{AcceptedRequest, Driver, Parcel};
use crate::engine::access_policy::AccessPolicy;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::timeout::within;
use crate::repository::gateway::DirectoryGateway;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

// ==========================================
// WizardStep
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardStep {
    Driver,
    Requests,
    Summary,
    Confirmation,
}

impl WizardStep {
    pub fn index(&self) -> u8 {
        match self {
            WizardStep::Driver => 1,
            WizardStep::Requests => 2,
            WizardStep::Summary => 3,
            WizardStep::Confirmation => 4,
        }
    }

    fn next(&self) -> WizardStep {
        match self {
            WizardStep::Driver => WizardStep::Requests,
            WizardStep::Requests => WizardStep::Summary,
            WizardStep::Summary | WizardStep::Confirmation => WizardStep::Confirmation,
        }
    }

    fn previous(&self) -> WizardStep {
        match self {
            WizardStep::Driver | WizardStep::Requests => WizardStep::Driver,
            WizardStep::Summary => WizardStep::Requests,
            WizardStep::Confirmation => WizardStep::Summary,
        }
    }
}

/// 汇总（Summary 步骤展示）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentSummary {
    pub driver: Option<Driver>,
    pub requests: Vec<AcceptedRequest>,
    pub total_parcels: usize,
}

/// 任务创建载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentPayload {
    pub driver: Driver,
    pub requests: Vec<AcceptedRequest>,
    pub note: String,
}

// ==========================================
// AssignmentBuilder
// ==========================================
pub struct AssignmentBuilder {
    policy: AccessPolicy,
    directory: Arc<dyn DirectoryGateway>,
    timeout: Duration,

    step: WizardStep,
    agency_filter: Option<String>,

    // 原始目录（未过滤）
    all_drivers: Vec<Driver>,
    all_requests: Vec<AcceptedRequest>,

    // 按角色/司机派生的候选池
    driver_pool: Vec<Driver>,
    request_pool: Vec<AcceptedRequest>,

    selected_driver: Option<Driver>,
    selected_requests: Vec<AcceptedRequest>,
    parcel_cache: HashMap<i64, Vec<Parcel>>,
}

impl AssignmentBuilder {
    pub fn new(policy: AccessPolicy, directory: Arc<dyn DirectoryGateway>, timeout: Duration) -> Self {
        Self {
            policy,
            directory,
            timeout,
            step: WizardStep::Driver,
            agency_filter: None,
            all_drivers: Vec::new(),
            all_requests: Vec::new(),
            driver_pool: Vec::new(),
            request_pool: Vec::new(),
            selected_driver: None,
            selected_requests: Vec::new(),
            parcel_cache: HashMap::new(),
        }
    }

    /// 从目录加载司机与请求（失败时以空列表兜底）
    pub async fn load(&mut self, exclude_assigned: bool) {
        let drivers = within(self.timeout, "list_drivers", self.directory.list_drivers()).await;
        let requests = within(
            self.timeout,
            "list_accepted_requests",
            self.directory.list_accepted_requests(exclude_assigned),
        )
        .await;

        let drivers = drivers.unwrap_or_else(|e| {
            warn!(error = %e, "司机列表加载失败");
            Vec::new()
        });
        let requests = requests.unwrap_or_else(|e| {
            warn!(error = %e, "揽收请求列表加载失败");
            Vec::new()
        });
        self.set_directory(drivers, requests);
    }

    /// 直接设置目录数据并重算候选池
    pub fn set_directory(&mut self, drivers: Vec<Driver>, requests: Vec<AcceptedRequest>) {
        self.all_drivers = drivers;
        self.all_requests = requests;
        self.recompute_pools();
    }

    fn recompute_pools(&mut self) {
        self.driver_pool = if self.policy.can_narrow_by_agency() {
            self.policy
                .drivers_in_agency(&self.all_drivers, self.agency_filter.as_deref())
        } else {
            self.policy.visible_drivers(&self.all_drivers)
        };

        self.request_pool = match &self.selected_driver {
            Some(driver) => self.policy.requests_for_driver(driver, &self.all_requests),
            None => self.policy.visible_requests(&self.all_requests),
        };
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn driver_pool(&self) -> &[Driver] {
        &self.driver_pool
    }

    pub fn request_pool(&self) -> &[AcceptedRequest] {
        &self.request_pool
    }

    pub fn selected_driver(&self) -> Option<&Driver> {
        self.selected_driver.as_ref()
    }

    pub fn selected_requests(&self) -> &[AcceptedRequest] {
        &self.selected_requests
    }

    pub fn agency_options(&self) -> Vec<String> {
        AccessPolicy::agency_options(&self.all_drivers)
    }

    // ==========================================
    // 选择
    // ==========================================

    /// 选择司机: 清空已选请求并按新司机重算请求池
    pub fn select_driver(&mut self, driver_id: i64) -> EngineResult<()> {
        let driver = self
            .driver_pool
            .iter()
            .find(|d| d.id == driver_id)
            .cloned()
            .ok_or_else(|| {
                EngineError::InvalidAssignment(format!("司机 {} 不在可选范围内", driver_id))
            })?;

        debug!(driver_id, agency = driver.agency(), "选择司机");
        self.selected_driver = Some(driver);
        self.selected_requests.clear();
        self.recompute_pools();
        Ok(())
    }

    /// 切换请求选择
    ///
    /// # 返回
    /// - Ok(true): 已加入（首次加入时获取包裹）
    /// - Ok(false): 已移除
    pub async fn toggle_request(&mut self, request_id: i64) -> EngineResult<bool> {
        if let Some(pos) = self.selected_requests.iter().position(|r| r.id == request_id) {
            self.selected_requests.remove(pos);
            return Ok(false);
        }

        let mut request = self
            .request_pool
            .iter()
            .find(|r| r.id == request_id)
            .cloned()
            .ok_or_else(|| {
                EngineError::InvalidAssignment(format!("请求 {} 不在可选范围内", request_id))
            })?;

        let cached = self.parcel_cache.get(&request_id).cloned();
        request.parcels = match cached {
            Some(parcels) => parcels,
            None => match within(
                self.timeout,
                "get_parcels_for_request",
                self.directory.get_parcels_for_request(request_id),
            )
            .await
            {
                Ok(parcels) => {
                    self.parcel_cache.insert(request_id, parcels.clone());
                    parcels
                }
                Err(e) => {
                    warn!(request_id, error = %e, "包裹获取失败，以空列表加入");
                    Vec::new()
                }
            },
        };

        self.selected_requests.push(request);
        Ok(true)
    }

    /// 管理员按分支收窄司机列表（非管理员忽略）
    pub fn narrow_by_agency(&mut self, agency: Option<&str>) -> bool {
        if !self.policy.can_narrow_by_agency() {
            debug!("当前角色不支持分支筛选");
            return false;
        }
        self.agency_filter = agency
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);
        self.recompute_pools();
        true
    }

    // ==========================================
    // 步骤导航
    // ==========================================

    pub fn next_step(&mut self) -> EngineResult<WizardStep> {
        match self.step {
            WizardStep::Driver if self.selected_driver.is_none() => {
                return Err(EngineError::InvalidAssignment("请先选择司机".to_string()))
            }
            WizardStep::Requests if self.selected_requests.is_empty() => {
                return Err(EngineError::InvalidAssignment(
                    "请至少选择一个揽收请求".to_string(),
                ))
            }
            _ => {}
        }
        self.step = self.step.next();
        Ok(self.step)
    }

    pub fn previous_step(&mut self) -> WizardStep {
        self.step = self.step.previous();
        self.step
    }

    /// 重置到第一步，清空选择并按角色重算候选池
    pub fn reset(&mut self) {
        self.step = WizardStep::Driver;
        self.agency_filter = None;
        self.selected_driver = None;
        self.selected_requests.clear();
        self.recompute_pools();
    }

    pub fn summary(&self) -> AssignmentSummary {
        AssignmentSummary {
            driver: self.selected_driver.clone(),
            requests: self.selected_requests.clone(),
            total_parcels: self.selected_requests.iter().map(|r| r.parcels.len()).sum(),
        }
    }

    /// 产出创建载荷（不改变向导状态）
    pub fn build(&self) -> EngineResult<AssignmentPayload> {
        let driver = self
            .selected_driver
            .clone()
            .ok_or_else(|| EngineError::InvalidAssignment("未选择司机".to_string()))?;
        if self.selected_requests.is_empty() {
            return Err(EngineError::InvalidAssignment(
                "至少需要选择一个揽收请求".to_string(),
            ));
        }

        let note = match self.policy.actor() {
            Some(actor) => actor.creation_note(),
            None => "Mission créée par inconnu".to_string(),
        };

        Ok(AssignmentPayload {
            driver,
            requests: self.selected_requests.clone(),
            note,
        })
    }
}

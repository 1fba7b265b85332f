// ==========================================
// 揽收任务系统 - 任务台（单写者命令队列）
// ==========================================
// 职责: 持有全部可变状态（任务集合、扫描会话、签收会话、指派向导、筛选）
// 红线: 状态只在任务台 task 内修改；调用方通过 Handle 发送命令并等待 oneshot 回复
// 说明: 命令按到达顺序逐个执行，扫描校验总能看到此前所有已接受的扫描
// ==========================================

use crate::config::PickupConfig;
use crate::domain::{AcceptedRequest, Actor, Driver, Mission, MissionStats, MissionStatus, RemoveOutcome};
use crate::engine::{
    export_manifest, fetch_security_codes, AccessPolicy, AssignmentBuilder, AssignmentSummary,
    EngineError, EngineResult, MissionLifecycle, OptionalEventPublisher, ReceptionSession,
    ScanOutcome, ScanSession, StatusFilter, WizardStep,
};
use crate::repository::{DirectoryGateway, MissionGateway, ReceptionGateway};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Reply<T> = oneshot::Sender<EngineResult<T>>;

/// 协作方集合
#[derive(Clone)]
pub struct DeskServices {
    pub missions: Arc<dyn MissionGateway>,
    pub directory: Arc<dyn DirectoryGateway>,
    pub reception: Arc<dyn ReceptionGateway>,
}

impl DeskServices {
    /// 同一实现同时承担三类协作方
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: MissionGateway + DirectoryGateway + ReceptionGateway + 'static,
    {
        Self {
            missions: store.clone(),
            directory: store.clone(),
            reception: store,
        }
    }
}

/// 扫描进度回执
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub mission_id: i64,
    pub outcome: ScanOutcome,
    pub scanned: usize,
    pub expected: usize,
    pub progress_percent: f64,
    /// 全部到齐并推进后的任务
    pub advanced: Option<Mission>,
}

impl ScanReport {
    fn from_session(session: &ScanSession, outcome: ScanOutcome) -> Self {
        Self {
            mission_id: session.mission_id(),
            outcome,
            scanned: session.scanned().len(),
            expected: session.expected().len(),
            progress_percent: session.progress_percent(),
            advanced: None,
        }
    }
}

// ==========================================
// 命令
// ==========================================
enum DeskCommand {
    Refresh { reply: Reply<usize> },
    Missions { reply: Reply<Vec<Mission>> },
    Stats { reply: Reply<MissionStats> },
    ToggleFilter { status: Option<MissionStatus>, reply: Reply<Vec<Mission>> },
    Search { term: String, reply: Reply<Vec<Mission>> },

    LoadDirectory { reply: Reply<()> },
    DriverPool { reply: Reply<Vec<Driver>> },
    RequestPool { reply: Reply<Vec<AcceptedRequest>> },
    SelectDriver { driver_id: i64, reply: Reply<()> },
    ToggleRequest { request_id: i64, reply: Reply<bool> },
    NarrowByAgency { agency: Option<String>, reply: Reply<bool> },
    NextStep { reply: Reply<WizardStep> },
    PreviousStep { reply: Reply<WizardStep> },
    AssignmentSummary { reply: Reply<AssignmentSummary> },
    ResetAssignment { reply: Reply<()> },
    SubmitAssignment { reply: Reply<Mission> },
    CreateMission { driver: Option<Driver>, requests: Vec<AcceptedRequest>, reply: Reply<Mission> },

    RemoveMission { mission_id: i64, confirmed: bool, reply: Reply<RemoveOutcome> },
    Accept { mission_id: i64, reply: Reply<()> },
    Reject { mission_id: i64, reply: Reply<()> },
    Complete { mission_id: i64, security_code: String, reply: Reply<()> },

    BeginPickupScan { mission_id: i64, reply: Reply<ScanReport> },
    Scan { raw_code: String, reply: Reply<ScanReport> },
    CloseScan { reply: Reply<()> },

    BeginReception { mission_id: i64, reply: Reply<()> },
    ReceptionScan { parcel_id: i64, reply: Reply<usize> },
    FinalizeReception { reply: Reply<String> },

    ExportManifest { mission_id: i64, reply: Reply<String> },
}

// ==========================================
// MissionDesk - 状态持有者
// ==========================================
pub struct MissionDesk {
    services: DeskServices,
    config: PickupConfig,
    lifecycle: MissionLifecycle,
    builder: AssignmentBuilder,
    filter: StatusFilter,
    scan: Option<ScanSession>,
    reception: Option<ReceptionSession>,
}

impl MissionDesk {
    pub fn new(
        services: DeskServices,
        actor: Option<Actor>,
        config: PickupConfig,
        events: OptionalEventPublisher,
    ) -> Self {
        let timeout = config.collaborator_timeout();
        let lifecycle =
            MissionLifecycle::new(services.missions.clone(), timeout).with_events(events);
        let builder = AssignmentBuilder::new(
            AccessPolicy::new(actor),
            services.directory.clone(),
            timeout,
        );
        Self {
            services,
            config,
            lifecycle,
            builder,
            filter: StatusFilter::default(),
            scan: None,
            reception: None,
        }
    }

    /// 启动任务台 task，返回句柄
    pub fn spawn(self) -> (MissionDeskHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(self.config.desk_queue_capacity.max(1));
        let policy = self.builder.policy().clone();
        let join = tokio::spawn(self.run(receiver));
        (MissionDeskHandle { sender, policy }, join)
    }

    async fn run(mut self, mut receiver: mpsc::Receiver<DeskCommand>) {
        info!("任务台已启动");
        while let Some(command) = receiver.recv().await {
            self.dispatch(command).await;
        }
        info!("任务台已关闭");
    }

    fn timeout(&self) -> Duration {
        self.config.collaborator_timeout()
    }

    async fn dispatch(&mut self, command: DeskCommand) {
        match command {
            DeskCommand::Refresh { reply } => send(reply, self.refresh().await),
            DeskCommand::Missions { reply } => {
                send(reply, Ok(self.filter.apply(self.lifecycle.missions())))
            }
            DeskCommand::Stats { reply } => send(reply, Ok(self.lifecycle.stats())),
            DeskCommand::ToggleFilter { status, reply } => {
                self.filter.toggle(status);
                send(reply, Ok(self.filter.apply(self.lifecycle.missions())))
            }
            DeskCommand::Search { term, reply } => {
                let visible = self.filter.apply(self.lifecycle.missions());
                send(reply, Ok(crate::engine::search(&visible, &term)))
            }

            DeskCommand::LoadDirectory { reply } => {
                self.builder.load(self.config.exclude_assigned_requests).await;
                send(reply, Ok(()))
            }
            DeskCommand::DriverPool { reply } => send(reply, Ok(self.builder.driver_pool().to_vec())),
            DeskCommand::RequestPool { reply } => {
                send(reply, Ok(self.builder.request_pool().to_vec()))
            }
            DeskCommand::SelectDriver { driver_id, reply } => {
                send(reply, self.builder.select_driver(driver_id))
            }
            DeskCommand::ToggleRequest { request_id, reply } => {
                send(reply, self.builder.toggle_request(request_id).await)
            }
            DeskCommand::NarrowByAgency { agency, reply } => {
                send(reply, Ok(self.builder.narrow_by_agency(agency.as_deref())))
            }
            DeskCommand::NextStep { reply } => send(reply, self.builder.next_step()),
            DeskCommand::PreviousStep { reply } => send(reply, Ok(self.builder.previous_step())),
            DeskCommand::AssignmentSummary { reply } => send(reply, Ok(self.builder.summary())),
            DeskCommand::ResetAssignment { reply } => {
                self.builder.reset();
                send(reply, Ok(()))
            }
            DeskCommand::SubmitAssignment { reply } => send(reply, self.submit_assignment().await),
            DeskCommand::CreateMission {
                driver,
                requests,
                reply,
            } => {
                let note = match self.builder.policy().actor() {
                    Some(actor) => actor.creation_note(),
                    None => "Mission créée par inconnu".to_string(),
                };
                send(
                    reply,
                    self.lifecycle.create(driver.as_ref(), &requests, &note).await,
                )
            }

            DeskCommand::RemoveMission {
                mission_id,
                confirmed,
                reply,
            } => send(reply, self.lifecycle.remove(mission_id, confirmed).await),
            DeskCommand::Accept { mission_id, reply } => {
                send(reply, self.lifecycle.accept(mission_id).await)
            }
            DeskCommand::Reject { mission_id, reply } => {
                send(reply, self.lifecycle.reject(mission_id).await)
            }
            DeskCommand::Complete {
                mission_id,
                security_code,
                reply,
            } => send(
                reply,
                self.lifecycle.complete(mission_id, &security_code).await,
            ),

            DeskCommand::BeginPickupScan { mission_id, reply } => {
                send(reply, self.begin_pickup_scan(mission_id))
            }
            DeskCommand::Scan { raw_code, reply } => send(reply, self.scan(&raw_code).await),
            DeskCommand::CloseScan { reply } => {
                if let Some(session) = self.scan.take() {
                    debug!(mission_id = session.mission_id(), "扫描会话已关闭");
                }
                send(reply, Ok(()))
            }

            DeskCommand::BeginReception { mission_id, reply } => {
                let result = self.lifecycle.find(mission_id).map(|_| ());
                if result.is_ok() {
                    self.reception = Some(ReceptionSession::new(mission_id));
                }
                send(reply, result)
            }
            DeskCommand::ReceptionScan { parcel_id, reply } => {
                send(reply, self.reception_scan(parcel_id).await)
            }
            DeskCommand::FinalizeReception { reply } => {
                send(reply, self.finalize_reception().await)
            }

            DeskCommand::ExportManifest { mission_id, reply } => {
                let result = self
                    .lifecycle
                    .find(mission_id)
                    .and_then(|mission| export_manifest(mission).map_err(EngineError::from));
                send(reply, result)
            }
        }
    }

    /// 重新加载任务集合，并补齐安全码（逐个软失败）
    async fn refresh(&mut self) -> EngineResult<usize> {
        self.lifecycle.refresh().await?;

        let missing: Vec<i64> = self
            .lifecycle
            .missions()
            .iter()
            .filter(|m| m.security_code.is_none())
            .map(|m| m.id)
            .collect();
        if !missing.is_empty() {
            let codes = fetch_security_codes(
                self.services.missions.as_ref(),
                &missing,
                self.config.security_code_fetch_concurrency,
                self.timeout(),
            )
            .await;
            self.lifecycle.merge_security_codes(&codes);
        }
        Ok(self.lifecycle.missions().len())
    }

    async fn refresh_soft(&mut self, source: &str) {
        if let Err(e) = self.refresh().await {
            warn!(source, error = %e, "任务列表刷新失败");
        }
    }

    async fn submit_assignment(&mut self) -> EngineResult<Mission> {
        let payload = self.builder.build()?;
        let mission = self
            .lifecycle
            .create(Some(&payload.driver), &payload.requests, &payload.note)
            .await?;
        self.builder.reset();
        self.builder.load(self.config.exclude_assigned_requests).await;
        Ok(mission)
    }

    fn begin_pickup_scan(&mut self, mission_id: i64) -> EngineResult<ScanReport> {
        let session = self.lifecycle.begin_pickup_scan(mission_id)?;
        let report = ScanReport::from_session(&session, ScanOutcome::Ignored);
        self.scan = Some(session);
        Ok(report)
    }

    async fn scan(&mut self, raw_code: &str) -> EngineResult<ScanReport> {
        let timeout = self.timeout();
        let gateway = self.services.missions.clone();
        let session = self.scan.as_mut().ok_or_else(|| EngineError::SessionNotOpen {
            operation: "scan".to_string(),
        })?;

        let outcome = session
            .scan_mirrored(gateway.as_ref(), raw_code, timeout)
            .await?;
        let mut report = ScanReport::from_session(session, outcome.clone());
        if !outcome.is_completed() {
            return Ok(report);
        }

        // 全部到齐: 推进状态并关闭会话；推进失败时保留会话以便重试
        let Some(session) = self.scan.take() else {
            return Ok(report);
        };
        match self.lifecycle.advance_on_full_scan(session.clone()).await {
            Ok(mission) => {
                report.advanced = Some(mission);
                self.refresh_soft("advance_on_full_scan").await;
                Ok(report)
            }
            Err(e) => {
                self.scan = Some(session);
                Err(e)
            }
        }
    }

    async fn reception_scan(&mut self, parcel_id: i64) -> EngineResult<usize> {
        let timeout = self.timeout();
        let gateway = self.services.reception.clone();
        let session = self.reception.as_mut().ok_or_else(|| EngineError::SessionNotOpen {
            operation: "reception_scan".to_string(),
        })?;
        session.scan(gateway.as_ref(), parcel_id, timeout).await
    }

    async fn finalize_reception(&mut self) -> EngineResult<String> {
        let session = self.reception.as_ref().ok_or_else(|| EngineError::SessionNotOpen {
            operation: "finalize_reception".to_string(),
        })?;
        let code = session
            .finalize(self.services.reception.as_ref(), self.timeout())
            .await?;
        let mission_id = session.mission_id();
        self.reception = None;
        self.lifecycle.record_completion_code(mission_id, &code);
        self.refresh_soft("finalize_reception").await;
        Ok(code)
    }
}

fn send<T>(reply: Reply<T>, result: EngineResult<T>) {
    if reply.send(result).is_err() {
        debug!("调用方已放弃等待任务台回复");
    }
}

// ==========================================
// MissionDeskHandle - 可克隆句柄
// ==========================================
#[derive(Clone)]
pub struct MissionDeskHandle {
    sender: mpsc::Sender<DeskCommand>,
    policy: AccessPolicy,
}

impl MissionDeskHandle {
    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> DeskCommand) -> EngineResult<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(build(reply))
            .await
            .map_err(|_| EngineError::CollaboratorFailure("任务台已关闭".to_string()))?;
        response
            .await
            .map_err(|_| EngineError::CollaboratorFailure("任务台未回复".to_string()))?
    }

    /// 当前操作人的可见性策略
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn can_view_dashboard(&self) -> bool {
        self.policy.can_view_dashboard()
    }

    // ===== 任务列表 / 看板 =====

    pub async fn refresh(&self) -> EngineResult<usize> {
        self.request(|reply| DeskCommand::Refresh { reply }).await
    }

    /// 当前筛选下的任务列表
    pub async fn missions(&self) -> EngineResult<Vec<Mission>> {
        self.request(|reply| DeskCommand::Missions { reply }).await
    }

    pub async fn stats(&self) -> EngineResult<MissionStats> {
        self.request(|reply| DeskCommand::Stats { reply }).await
    }

    pub async fn toggle_filter(&self, status: Option<MissionStatus>) -> EngineResult<Vec<Mission>> {
        self.request(|reply| DeskCommand::ToggleFilter { status, reply })
            .await
    }

    pub async fn search(&self, term: &str) -> EngineResult<Vec<Mission>> {
        let term = term.to_string();
        self.request(|reply| DeskCommand::Search { term, reply }).await
    }

    // ===== 指派向导 =====

    pub async fn load_directory(&self) -> EngineResult<()> {
        self.request(|reply| DeskCommand::LoadDirectory { reply }).await
    }

    pub async fn driver_pool(&self) -> EngineResult<Vec<Driver>> {
        self.request(|reply| DeskCommand::DriverPool { reply }).await
    }

    pub async fn request_pool(&self) -> EngineResult<Vec<AcceptedRequest>> {
        self.request(|reply| DeskCommand::RequestPool { reply }).await
    }

    pub async fn select_driver(&self, driver_id: i64) -> EngineResult<()> {
        self.request(|reply| DeskCommand::SelectDriver { driver_id, reply })
            .await
    }

    pub async fn toggle_request(&self, request_id: i64) -> EngineResult<bool> {
        self.request(|reply| DeskCommand::ToggleRequest { request_id, reply })
            .await
    }

    pub async fn narrow_by_agency(&self, agency: Option<&str>) -> EngineResult<bool> {
        let agency = agency.map(str::to_string);
        self.request(|reply| DeskCommand::NarrowByAgency { agency, reply })
            .await
    }

    pub async fn next_step(&self) -> EngineResult<WizardStep> {
        self.request(|reply| DeskCommand::NextStep { reply }).await
    }

    pub async fn previous_step(&self) -> EngineResult<WizardStep> {
        self.request(|reply| DeskCommand::PreviousStep { reply }).await
    }

    pub async fn assignment_summary(&self) -> EngineResult<AssignmentSummary> {
        self.request(|reply| DeskCommand::AssignmentSummary { reply })
            .await
    }

    pub async fn reset_assignment(&self) -> EngineResult<()> {
        self.request(|reply| DeskCommand::ResetAssignment { reply })
            .await
    }

    /// 提交向导选择，创建任务并重置向导
    pub async fn submit_assignment(&self) -> EngineResult<Mission> {
        self.request(|reply| DeskCommand::SubmitAssignment { reply })
            .await
    }

    /// 不经向导直接创建
    pub async fn create_mission(
        &self,
        driver: Option<Driver>,
        requests: Vec<AcceptedRequest>,
    ) -> EngineResult<Mission> {
        self.request(|reply| DeskCommand::CreateMission {
            driver,
            requests,
            reply,
        })
        .await
    }

    // ===== 生命周期 =====

    pub async fn remove_mission(&self, mission_id: i64, confirmed: bool) -> EngineResult<RemoveOutcome> {
        self.request(|reply| DeskCommand::RemoveMission {
            mission_id,
            confirmed,
            reply,
        })
        .await
    }

    pub async fn accept(&self, mission_id: i64) -> EngineResult<()> {
        self.request(|reply| DeskCommand::Accept { mission_id, reply })
            .await
    }

    pub async fn reject(&self, mission_id: i64) -> EngineResult<()> {
        self.request(|reply| DeskCommand::Reject { mission_id, reply })
            .await
    }

    pub async fn complete(&self, mission_id: i64, security_code: &str) -> EngineResult<()> {
        let security_code = security_code.to_string();
        self.request(|reply| DeskCommand::Complete {
            mission_id,
            security_code,
            reply,
        })
        .await
    }

    // ===== 揽收扫描 =====

    pub async fn begin_pickup_scan(&self, mission_id: i64) -> EngineResult<ScanReport> {
        self.request(|reply| DeskCommand::BeginPickupScan { mission_id, reply })
            .await
    }

    pub async fn scan(&self, raw_code: &str) -> EngineResult<ScanReport> {
        let raw_code = raw_code.to_string();
        self.request(|reply| DeskCommand::Scan { raw_code, reply })
            .await
    }

    /// 关闭扫描会话（已提交的扫描不回滚）
    pub async fn close_scan(&self) -> EngineResult<()> {
        self.request(|reply| DeskCommand::CloseScan { reply }).await
    }

    // ===== 分支签收 =====

    pub async fn begin_reception(&self, mission_id: i64) -> EngineResult<()> {
        self.request(|reply| DeskCommand::BeginReception { mission_id, reply })
            .await
    }

    pub async fn reception_scan(&self, parcel_id: i64) -> EngineResult<usize> {
        self.request(|reply| DeskCommand::ReceptionScan { parcel_id, reply })
            .await
    }

    pub async fn finalize_reception(&self) -> EngineResult<String> {
        self.request(|reply| DeskCommand::FinalizeReception { reply })
            .await
    }

    pub async fn export_manifest(&self, mission_id: i64) -> EngineResult<String> {
        self.request(|reply| DeskCommand::ExportManifest { mission_id, reply })
            .await
    }
}

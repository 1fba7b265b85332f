// ==========================================
// Mock 协作方实现 - 用于集成测试
// ==========================================
// 内存实现 MissionGateway / DirectoryGateway / ReceptionGateway
// 支持失败注入: 包裹获取、安全码、远端扫描、创建、延迟
// ==========================================

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use pickup_missions::domain::{
    AcceptedRequest, Driver, Mission, MissionStatus, Parcel, ParcelStatus,
};
use pickup_missions::repository::{
    DirectoryGateway, MissionGateway, ReceptionGateway, RepositoryError, RepositoryResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct MockState {
    drivers: Vec<Driver>,
    requests: Vec<AcceptedRequest>,
    assigned: HashSet<i64>,
    missions: Vec<Mission>,
    security_codes: HashMap<i64, String>,
    next_mission_id: i64,

    // ===== 调用记录 =====
    remote_scans: Vec<(i64, String)>,
    chef_scans: Vec<(i64, i64)>,
    status_updates: Vec<(i64, MissionStatus)>,
    parcel_fetches: Vec<i64>,

    // ===== 失败注入 =====
    fail_parcels_for: HashSet<i64>,
    fail_security_code_for: HashSet<i64>,
    reject_remote_codes: HashSet<String>,
    fail_create: bool,
    fail_list: bool,
    fail_update_status: bool,
    slow_security_code_for: HashSet<i64>,
}

pub struct MockGateway {
    state: Mutex<MockState>,
}

impl MockGateway {
    pub fn new(drivers: Vec<Driver>, requests: Vec<AcceptedRequest>) -> Self {
        Self {
            state: Mutex::new(MockState {
                drivers,
                requests,
                next_mission_id: 1,
                ..MockState::default()
            }),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    // ===== 失败注入 =====

    pub fn fail_parcels_for(&self, request_id: i64) {
        self.with_state(|s| s.fail_parcels_for.insert(request_id));
    }

    pub fn fail_security_code_for(&self, mission_id: i64) {
        self.with_state(|s| s.fail_security_code_for.insert(mission_id));
    }

    pub fn slow_security_code_for(&self, mission_id: i64) {
        self.with_state(|s| s.slow_security_code_for.insert(mission_id));
    }

    pub fn reject_remote_code(&self, code: &str) {
        self.with_state(|s| s.reject_remote_codes.insert(code.to_string()));
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.with_state(|s| s.fail_create = fail);
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.with_state(|s| s.fail_list = fail);
    }

    pub fn set_fail_update_status(&self, fail: bool) {
        self.with_state(|s| s.fail_update_status = fail);
    }

    // ===== 预置数据 =====

    /// 直接放入一个任务（绕过创建流程）
    pub fn put_mission(&self, mission: Mission, security_code: Option<&str>) {
        self.with_state(|s| {
            if let Some(code) = security_code {
                s.security_codes.insert(mission.id, code.to_string());
            }
            s.next_mission_id = s.next_mission_id.max(mission.id + 1);
            s.missions.push(mission);
        });
    }

    // ===== 调用记录 =====

    pub fn remote_scans(&self) -> Vec<(i64, String)> {
        self.with_state(|s| s.remote_scans.clone())
    }

    pub fn chef_scans(&self) -> Vec<(i64, i64)> {
        self.with_state(|s| s.chef_scans.clone())
    }

    pub fn status_updates(&self) -> Vec<(i64, MissionStatus)> {
        self.with_state(|s| s.status_updates.clone())
    }

    pub fn parcel_fetches(&self) -> Vec<i64> {
        self.with_state(|s| s.parcel_fetches.clone())
    }

    pub fn mission_count(&self) -> usize {
        self.with_state(|s| s.missions.len())
    }

    pub fn stored_mission(&self, mission_id: i64) -> Option<Mission> {
        self.with_state(|s| s.missions.iter().find(|m| m.id == mission_id).cloned())
    }

    pub fn security_code(&self, mission_id: i64) -> Option<String> {
        self.with_state(|s| s.security_codes.get(&mission_id).cloned())
    }
}

#[async_trait]
impl MissionGateway for MockGateway {
    async fn list_missions(&self) -> RepositoryResult<Vec<Mission>> {
        self.with_state(|s| {
            if s.fail_list {
                return Err(RepositoryError::DatabaseQueryError("list indisponible".to_string()));
            }
            let mut missions = s.missions.clone();
            missions.reverse();
            Ok(missions)
        })
    }

    async fn get_mission(&self, mission_id: i64) -> RepositoryResult<Mission> {
        self.stored_mission(mission_id)
            .ok_or_else(|| RepositoryError::not_found("mission", mission_id))
    }

    async fn create_mission(
        &self,
        driver_id: i64,
        request_ids: &[i64],
        note: &str,
    ) -> RepositoryResult<Mission> {
        self.with_state(|s| {
            if s.fail_create {
                return Err(RepositoryError::RemoteRejected("création refusée".to_string()));
            }
            let driver = s
                .drivers
                .iter()
                .find(|d| d.id == driver_id)
                .cloned()
                .ok_or_else(|| RepositoryError::not_found("driver", driver_id))?;

            let mut parcels: Vec<Parcel> = Vec::new();
            for request_id in request_ids {
                let request = s
                    .requests
                    .iter()
                    .find(|r| r.id == *request_id)
                    .ok_or_else(|| RepositoryError::not_found("pickup_request", request_id))?;
                parcels.extend(request.parcels.iter().cloned());
            }

            let id = s.next_mission_id;
            s.next_mission_id += 1;
            let mission = Mission {
                id,
                mission_number: format!("MOCK-{:04}", id),
                status: MissionStatus::Pending,
                driver_id,
                driver: Some(driver),
                request_ids: request_ids.to_vec(),
                parcels,
                scheduled_at: None,
                created_at: Utc::now(),
                security_code: None,
                completion_code: None,
                notes: Some(note.to_string()),
            };
            s.security_codes.insert(id, format!("{:06}", 100_000 + id * 7));
            s.assigned.extend(request_ids.iter().copied());
            s.missions.push(mission.clone());
            Ok(mission)
        })
    }

    async fn delete_mission(&self, mission_id: i64) -> RepositoryResult<()> {
        self.with_state(|s| {
            let before = s.missions.len();
            s.missions.retain(|m| m.id != mission_id);
            if s.missions.len() == before {
                return Err(RepositoryError::not_found("mission", mission_id));
            }
            Ok(())
        })
    }

    async fn get_security_code(&self, mission_id: i64) -> RepositoryResult<Option<String>> {
        let slow = self.with_state(|s| s.slow_security_code_for.contains(&mission_id));
        if slow {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        self.with_state(|s| {
            if s.fail_security_code_for.contains(&mission_id) {
                return Err(RepositoryError::DatabaseConnectionError("réseau".to_string()));
            }
            Ok(s.security_codes.get(&mission_id).cloned())
        })
    }

    async fn scan_parcel_remote(&self, mission_id: i64, code: &str) -> RepositoryResult<()> {
        self.with_state(|s| {
            if s.reject_remote_codes.contains(code) {
                return Err(RepositoryError::RemoteRejected(format!(
                    "Colis {} refusé",
                    code
                )));
            }
            s.remote_scans.push((mission_id, code.to_string()));
            if let Some(mission) = s.missions.iter_mut().find(|m| m.id == mission_id) {
                if let Some(parcel) = mission.parcels.iter_mut().find(|p| p.matches_code(code)) {
                    parcel.status = ParcelStatus::AtDepot;
                }
            }
            Ok(())
        })
    }

    async fn update_status(&self, mission_id: i64, status: MissionStatus) -> RepositoryResult<()> {
        self.with_state(|s| {
            if s.fail_update_status {
                return Err(RepositoryError::DatabaseQueryError("statut".to_string()));
            }
            let mission = s
                .missions
                .iter_mut()
                .find(|m| m.id == mission_id)
                .ok_or_else(|| RepositoryError::not_found("mission", mission_id))?;
            mission.status = status;
            s.status_updates.push((mission_id, status));
            Ok(())
        })
    }
}

#[async_trait]
impl DirectoryGateway for MockGateway {
    async fn list_drivers(&self) -> RepositoryResult<Vec<Driver>> {
        Ok(self.with_state(|s| s.drivers.clone()))
    }

    async fn list_accepted_requests(
        &self,
        exclude_assigned: bool,
    ) -> RepositoryResult<Vec<AcceptedRequest>> {
        Ok(self.with_state(|s| {
            s.requests
                .iter()
                .filter(|r| !exclude_assigned || !s.assigned.contains(&r.id))
                .map(|r| AcceptedRequest {
                    parcels: Vec::new(),
                    ..r.clone()
                })
                .collect()
        }))
    }

    async fn get_parcels_for_request(&self, request_id: i64) -> RepositoryResult<Vec<Parcel>> {
        self.with_state(|s| {
            s.parcel_fetches.push(request_id);
            if s.fail_parcels_for.contains(&request_id) {
                return Err(RepositoryError::DatabaseConnectionError("réseau".to_string()));
            }
            s.requests
                .iter()
                .find(|r| r.id == request_id)
                .map(|r| r.parcels.clone())
                .ok_or_else(|| RepositoryError::not_found("pickup_request", request_id))
        })
    }
}

#[async_trait]
impl ReceptionGateway for MockGateway {
    async fn chef_agence_scan(&self, mission_id: i64, parcel_id: i64) -> RepositoryResult<()> {
        self.with_state(|s| {
            if s.chef_scans.contains(&(mission_id, parcel_id)) {
                return Err(RepositoryError::RemoteRejected(format!(
                    "Colis {} déjà scanné",
                    parcel_id
                )));
            }
            let belongs = s
                .missions
                .iter()
                .find(|m| m.id == mission_id)
                .map(|m| m.parcels.iter().any(|p| p.id == parcel_id))
                .unwrap_or(false);
            if !belongs {
                return Err(RepositoryError::RemoteRejected(format!(
                    "Colis {} hors mission",
                    parcel_id
                )));
            }
            s.chef_scans.push((mission_id, parcel_id));
            Ok(())
        })
    }

    async fn generate_completion_code(
        &self,
        mission_id: i64,
        scanned_parcel_ids: &[i64],
    ) -> RepositoryResult<String> {
        self.with_state(|s| {
            let mission = s
                .missions
                .iter_mut()
                .find(|m| m.id == mission_id)
                .ok_or_else(|| RepositoryError::not_found("mission", mission_id))?;
            let code = format!("CMP{:02}-{:03}", scanned_parcel_ids.len(), mission_id);
            mission.completion_code = Some(code.clone());
            Ok(code)
        })
    }
}

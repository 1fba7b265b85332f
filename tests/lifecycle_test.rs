// ==========================================
// 任务生命周期集成测试
// ==========================================
// 覆盖: 创建 / 删除 / 接单 / 拒单 / 完成（安全码）/ 统计
// ==========================================

#[path = "helpers/fixtures.rs"]
mod fixtures;
#[path = "helpers/mock_gateway.rs"]
mod mock_gateway;

use fixtures::{mission, parcel, standard_directory};
use mock_gateway::MockGateway;
use pickup_missions::domain::{MissionStats, MissionStatus, ParcelStatus, RemoveOutcome};
use pickup_missions::engine::{EngineError, MissionLifecycle};
use pickup_missions::repository::MissionGateway;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(2);

fn setup() -> (Arc<MockGateway>, MissionLifecycle) {
    pickup_missions::logging::init_test();
    let (drivers, requests) = standard_directory();
    let gateway = Arc::new(MockGateway::new(drivers, requests));
    let lifecycle = MissionLifecycle::new(gateway.clone(), TIMEOUT);
    (gateway, lifecycle)
}

#[tokio::test]
async fn test_create_without_driver_is_invalid_assignment() {
    let (gateway, mut lifecycle) = setup();
    let (_, requests) = standard_directory();

    let err = lifecycle
        .create(None, &requests[..1], "note")
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidAssignment(_)));
    assert!(lifecycle.missions().is_empty());
    assert_eq!(gateway.mission_count(), 0);
}

#[tokio::test]
async fn test_create_with_empty_requests_is_invalid_assignment() {
    let (gateway, mut lifecycle) = setup();
    let (drivers, _) = standard_directory();

    let err = lifecycle
        .create(Some(&drivers[0]), &[], "note")
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidAssignment(_)));
    assert!(lifecycle.missions().is_empty());
    assert_eq!(gateway.mission_count(), 0);
}

#[tokio::test]
async fn test_create_builds_pending_mission_with_parcel_union() {
    let (_gateway, mut lifecycle) = setup();
    let (drivers, requests) = standard_directory();
    let selected = vec![requests[0].clone(), requests[2].clone()];

    let mission = lifecycle
        .create(Some(&drivers[0]), &selected, "Mission créée par Amira (Chef d'agence)")
        .await
        .unwrap();

    assert_eq!(mission.status, MissionStatus::Pending);
    assert!(mission.security_code.is_none());
    assert_eq!(mission.mission_number, "MOCK-0001");
    let tracking: Vec<&str> = mission
        .parcels
        .iter()
        .map(|p| p.tracking_number.as_str())
        .collect();
    assert_eq!(tracking, vec!["A1", "A2", "C1"]);
    assert_eq!(lifecycle.missions().len(), 1);
    assert_eq!(lifecycle.stats().pending, 1);
}

#[tokio::test]
async fn test_create_collaborator_failure_adds_nothing() {
    let (gateway, mut lifecycle) = setup();
    gateway.set_fail_create(true);
    let (drivers, requests) = standard_directory();

    let err = lifecycle
        .create(Some(&drivers[0]), &requests[..1], "note")
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::CollaboratorFailure(_)));
    assert!(lifecycle.missions().is_empty());
}

#[tokio::test]
async fn test_accept_then_reject_paths() {
    let (gateway, mut lifecycle) = setup();
    gateway.put_mission(mission(1, MissionStatus::Pending, vec![]), None);
    gateway.put_mission(mission(2, MissionStatus::Pending, vec![]), None);
    lifecycle.refresh().await.unwrap();

    lifecycle.accept(1).await.unwrap();
    assert_eq!(lifecycle.find(1).unwrap().status, MissionStatus::ToPickup);
    lifecycle.reject(1).await.unwrap();
    assert_eq!(lifecycle.find(1).unwrap().status, MissionStatus::Rejected);

    lifecycle.reject(2).await.unwrap();
    let err = lifecycle.accept(2).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidState {
            status: MissionStatus::Rejected,
            ..
        }
    ));

    assert_eq!(
        lifecycle.stats(),
        MissionStats {
            total: 2,
            pending: 0,
            completed: 0,
            rejected: 2
        }
    );
}

#[tokio::test]
async fn test_failed_persistence_leaves_status_unchanged() {
    let (gateway, mut lifecycle) = setup();
    gateway.put_mission(mission(1, MissionStatus::Pending, vec![]), None);
    lifecycle.refresh().await.unwrap();
    gateway.set_fail_update_status(true);

    let err = lifecycle.accept(1).await.unwrap_err();
    assert!(matches!(err, EngineError::CollaboratorFailure(_)));
    assert_eq!(lifecycle.find(1).unwrap().status, MissionStatus::Pending);
}

#[tokio::test]
async fn test_unknown_mission_transition() {
    let (_gateway, mut lifecycle) = setup();
    let err = lifecycle.accept(99).await.unwrap_err();
    assert!(matches!(err, EngineError::MissionNotFound(99)));
}

#[tokio::test]
async fn test_remove_requires_confirmation() {
    let (gateway, mut lifecycle) = setup();
    gateway.put_mission(mission(1, MissionStatus::Pending, vec![]), None);
    lifecycle.refresh().await.unwrap();

    assert_eq!(lifecycle.remove(1, false).await.unwrap(), RemoveOutcome::Cancelled);
    assert_eq!(gateway.mission_count(), 1);

    assert_eq!(lifecycle.remove(1, true).await.unwrap(), RemoveOutcome::Removed);
    assert_eq!(gateway.mission_count(), 0);
    assert!(lifecycle.missions().is_empty());
}

#[tokio::test]
async fn test_remove_missing_mission_is_already_removed() {
    let (gateway, mut lifecycle) = setup();
    gateway.put_mission(mission(1, MissionStatus::ToPickup, vec![]), None);
    lifecycle.refresh().await.unwrap();

    // 其他终端已删除
    gateway.delete_mission(1).await.unwrap();

    assert_eq!(
        lifecycle.remove(1, true).await.unwrap(),
        RemoveOutcome::AlreadyRemoved
    );
    assert!(lifecycle.missions().is_empty());
}

#[tokio::test]
async fn test_remove_terminal_mission_rejected() {
    let (gateway, mut lifecycle) = setup();
    gateway.put_mission(mission(1, MissionStatus::Completed, vec![]), None);
    lifecycle.refresh().await.unwrap();

    let err = lifecycle.remove(1, true).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
    assert_eq!(gateway.mission_count(), 1);
}

#[tokio::test]
async fn test_complete_checks_security_code() {
    let (gateway, mut lifecycle) = setup();
    let mut parcels = vec![parcel(100, "A1")];
    parcels[0].status = ParcelStatus::AtDepot;
    gateway.put_mission(mission(1, MissionStatus::AtDepot, parcels), Some("654321"));
    lifecycle.refresh().await.unwrap();

    let err = lifecycle.complete(1, "000000").await.unwrap_err();
    assert!(matches!(err, EngineError::SecurityCodeMismatch { mission_id: 1 }));
    assert_eq!(lifecycle.find(1).unwrap().status, MissionStatus::AtDepot);

    lifecycle.complete(1, " 654321 ").await.unwrap();
    assert_eq!(lifecycle.find(1).unwrap().status, MissionStatus::Completed);
    assert_eq!(lifecycle.stats().completed, 1);
}

#[tokio::test]
async fn test_complete_without_issued_code_is_invalid_state() {
    let (gateway, mut lifecycle) = setup();
    gateway.put_mission(mission(1, MissionStatus::AtDepot, vec![]), None);
    lifecycle.refresh().await.unwrap();

    let err = lifecycle.complete(1, "123456").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
}

#[tokio::test]
async fn test_complete_requires_all_parcels_at_depot() {
    let (gateway, mut lifecycle) = setup();
    gateway.put_mission(
        mission(1, MissionStatus::AtDepot, vec![parcel(100, "A1")]),
        Some("654321"),
    );
    lifecycle.refresh().await.unwrap();

    let err = lifecycle.complete(1, "654321").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
}

#[tokio::test]
async fn test_complete_from_wrong_status() {
    let (gateway, mut lifecycle) = setup();
    gateway.put_mission(mission(1, MissionStatus::ToPickup, vec![]), Some("654321"));
    lifecycle.refresh().await.unwrap();

    let err = lifecycle.complete(1, "654321").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidState {
            status: MissionStatus::ToPickup,
            ..
        }
    ));
}

#[tokio::test]
async fn test_refresh_failure_is_collaborator_failure() {
    let (gateway, mut lifecycle) = setup();
    gateway.put_mission(mission(1, MissionStatus::Pending, vec![]), None);
    lifecycle.refresh().await.unwrap();
    gateway.set_fail_list(true);

    let err = lifecycle.refresh().await.unwrap_err();
    assert!(matches!(err, EngineError::CollaboratorFailure(_)));
    assert_eq!(lifecycle.missions().len(), 1);
}

// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 验证配置读取、默认值兜底与覆写
// ==========================================


use pickup_missions::config::{config_keys, ConfigManager, PickupConfig, PickupConfigReader};
use std::time::Duration;
use test_helpers::{create_test_db, insert_test_config, open_test_connection};

#[tokio::test]
async fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    assert!(ConfigManager::new(&db_path).is_ok());
}

#[tokio::test]
async fn test_defaults_on_empty_config() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    let snapshot = config_manager.load_snapshot().await.unwrap();
    assert_eq!(snapshot, PickupConfig::default());
    assert_eq!(snapshot.collaborator_timeout(), Duration::from_secs(30));
    assert_eq!(snapshot.mission_number_prefix, "PKP");
    assert!(snapshot.exclude_assigned_requests);
}

#[tokio::test]
async fn test_overrides_from_config_kv() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).expect("Failed to open db");
    insert_test_config(&conn, config_keys::COLLABORATOR_TIMEOUT_MS, "2500").unwrap();
    insert_test_config(&conn, config_keys::SECURITY_CODE_FETCH_CONCURRENCY, "3").unwrap();
    insert_test_config(&conn, config_keys::MISSION_NUMBER_PREFIX, "TUN").unwrap();
    insert_test_config(&conn, config_keys::EXCLUDE_ASSIGNED_REQUESTS, "false").unwrap();

    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    assert_eq!(config_manager.get_collaborator_timeout_ms().await.unwrap(), 2500);
    assert_eq!(
        config_manager.get_security_code_fetch_concurrency().await.unwrap(),
        3
    );
    assert_eq!(config_manager.get_mission_number_prefix().await.unwrap(), "TUN");
    assert!(!config_manager.get_exclude_assigned_requests().await.unwrap());
}

#[tokio::test]
async fn test_malformed_values_fall_back_to_defaults() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).expect("Failed to open db");
    insert_test_config(&conn, config_keys::COLLABORATOR_TIMEOUT_MS, "bientôt").unwrap();
    insert_test_config(&conn, config_keys::EXCLUDE_ASSIGNED_REQUESTS, "peut-être").unwrap();

    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    let snapshot = config_manager.load_snapshot().await.unwrap();

    assert_eq!(snapshot.collaborator_timeout_ms, 30_000);
    assert!(snapshot.exclude_assigned_requests);
}

#[tokio::test]
async fn test_set_global_config_value_is_visible_in_snapshot() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    config_manager
        .set_global_config_value(config_keys::DESK_QUEUE_CAPACITY, "16")
        .unwrap();
    config_manager
        .set_global_config_value(config_keys::DESK_QUEUE_CAPACITY, "32")
        .unwrap();

    assert_eq!(config_manager.get_desk_queue_capacity().await.unwrap(), 32);
    assert_eq!(
        config_manager
            .get_global_config_value(config_keys::DESK_QUEUE_CAPACITY)
            .unwrap()
            .as_deref(),
        Some("32")
    );
    let json = config_manager.get_config_snapshot().unwrap();
    assert!(json.contains("\"desk_queue_capacity\":\"32\""));
}

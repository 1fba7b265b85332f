// ==========================================
// 揽收任务系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::pickup_config_trait::{
    PickupConfigReader, DEFAULT_COLLABORATOR_TIMEOUT_MS, DEFAULT_DESK_QUEUE_CAPACITY,
    DEFAULT_SECURITY_CODE_FETCH_CONCURRENCY,
};
use crate::db::{configure_sqlite_connection, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::DEFAULT_MISSION_NUMBER_PREFIX;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（需已建表）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取并解析配置，缺失或格式错误时回退默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T: FromStr + std::fmt::Debug,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(key, value = %raw, default = ?default, "配置值格式错误，使用默认值");
                    Ok(default)
                }
            },
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
            ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let mut stmt = conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        serde_json::to_string(&json!(config_map))
            .map_err(|e| RepositoryError::InternalError(e.to_string()))
    }
}

// ==========================================
// PickupConfigReader 实现
// ==========================================
#[async_trait]
impl PickupConfigReader for ConfigManager {
    async fn get_collaborator_timeout_ms(&self) -> RepositoryResult<u64> {
        self.get_parsed_or_default(
            config_keys::COLLABORATOR_TIMEOUT_MS,
            DEFAULT_COLLABORATOR_TIMEOUT_MS,
        )
    }

    async fn get_security_code_fetch_concurrency(&self) -> RepositoryResult<usize> {
        let value = self.get_parsed_or_default(
            config_keys::SECURITY_CODE_FETCH_CONCURRENCY,
            DEFAULT_SECURITY_CODE_FETCH_CONCURRENCY,
        )?;
        Ok(value.max(1))
    }

    async fn get_mission_number_prefix(&self) -> RepositoryResult<String> {
        Ok(self
            .get_config_value(config_keys::MISSION_NUMBER_PREFIX)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_MISSION_NUMBER_PREFIX.to_string()))
    }

    async fn get_exclude_assigned_requests(&self) -> RepositoryResult<bool> {
        self.get_parsed_or_default(config_keys::EXCLUDE_ASSIGNED_REQUESTS, true)
    }

    async fn get_desk_queue_capacity(&self) -> RepositoryResult<usize> {
        let value =
            self.get_parsed_or_default(config_keys::DESK_QUEUE_CAPACITY, DEFAULT_DESK_QUEUE_CAPACITY)?;
        Ok(value.max(1))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 协作方调用
    pub const COLLABORATOR_TIMEOUT_MS: &str = "collaborator_timeout_ms";
    pub const SECURITY_CODE_FETCH_CONCURRENCY: &str = "security_code_fetch_concurrency";

    // 任务
    pub const MISSION_NUMBER_PREFIX: &str = "mission_number_prefix";
    pub const EXCLUDE_ASSIGNED_REQUESTS: &str = "exclude_assigned_requests";

    // 任务台
    pub const DESK_QUEUE_CAPACITY: &str = "desk_queue_capacity";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PickupConfig;
    use crate::db::open_in_memory;

    fn manager() -> ConfigManager {
        let conn = open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_table_empty() {
        let manager = manager();
        let snapshot = manager.load_snapshot().await.unwrap();
        assert_eq!(snapshot, PickupConfig::default());
    }

    #[tokio::test]
    async fn test_overrides_and_malformed_values() {
        let manager = manager();
        manager
            .set_global_config_value(config_keys::COLLABORATOR_TIMEOUT_MS, "1500")
            .unwrap();
        manager
            .set_global_config_value(config_keys::SECURITY_CODE_FETCH_CONCURRENCY, "abc")
            .unwrap();
        manager
            .set_global_config_value(config_keys::MISSION_NUMBER_PREFIX, " SOU ")
            .unwrap();
        manager
            .set_global_config_value(config_keys::DESK_QUEUE_CAPACITY, "0")
            .unwrap();

        let snapshot = manager.load_snapshot().await.unwrap();
        assert_eq!(snapshot.collaborator_timeout_ms, 1500);
        assert_eq!(
            snapshot.security_code_fetch_concurrency,
            DEFAULT_SECURITY_CODE_FETCH_CONCURRENCY
        );
        assert_eq!(snapshot.mission_number_prefix, "SOU");
        assert_eq!(snapshot.desk_queue_capacity, 1);

        let json = manager.get_config_snapshot().unwrap();
        assert!(json.contains("collaborator_timeout_ms"));
    }
}

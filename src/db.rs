// ==========================================
// 揽收任务系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 幂等建表，记录 schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存库（测试/演示用），并完成建表
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 幂等建表
///
/// 表:
/// - config_scope / config_kv: 配置
/// - driver / pickup_request / parcel: 目录数据
/// - mission / mission_request / mission_parcel: 任务及其包裹
/// - current_session: 当前操作人（单行）
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS driver (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            agency TEXT,
            governorate TEXT,
            car_number TEXT
        );

        CREATE TABLE IF NOT EXISTS pickup_request (
            id INTEGER PRIMARY KEY,
            sender_name TEXT,
            sender_agency TEXT,
            status TEXT NOT NULL DEFAULT 'Accepted',
            assigned_mission_id INTEGER REFERENCES mission(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS parcel (
            id INTEGER PRIMARY KEY,
            request_id INTEGER NOT NULL REFERENCES pickup_request(id) ON DELETE CASCADE,
            tracking_number TEXT NOT NULL UNIQUE,
            recipient_name TEXT,
            destination TEXT,
            status TEXT NOT NULL DEFAULT 'En attente'
        );

        CREATE INDEX IF NOT EXISTS idx_parcel_request ON parcel(request_id);

        CREATE TABLE IF NOT EXISTS mission (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            mission_number TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL DEFAULT 'En attente',
            driver_id INTEGER NOT NULL REFERENCES driver(id),
            scheduled_at TEXT,
            security_code TEXT,
            completion_code TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_mission_status ON mission(status);

        CREATE TABLE IF NOT EXISTS mission_request (
            mission_id INTEGER NOT NULL REFERENCES mission(id) ON DELETE CASCADE,
            request_id INTEGER NOT NULL REFERENCES pickup_request(id),
            position INTEGER NOT NULL,
            PRIMARY KEY (mission_id, request_id)
        );

        CREATE TABLE IF NOT EXISTS mission_parcel (
            mission_id INTEGER NOT NULL REFERENCES mission(id) ON DELETE CASCADE,
            parcel_id INTEGER NOT NULL REFERENCES parcel(id),
            position INTEGER NOT NULL,
            scanned_at TEXT,
            chef_scanned_at TEXT,
            PRIMARY KEY (mission_id, parcel_id)
        );

        CREATE TABLE IF NOT EXISTS current_session (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            role TEXT NOT NULL,
            agency TEXT,
            governorate TEXT,
            display_name TEXT
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_schema_version_absent_on_empty_db() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}

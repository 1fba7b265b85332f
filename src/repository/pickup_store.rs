// ==========================================
// 揽收任务系统 - SQLite 协作方实现
// ==========================================
// 职责: 以 rusqlite 实现 MissionGateway / DirectoryGateway /
//       ReceptionGateway / SessionStore
// 红线: Repository 不做生命周期判断,只做数据映射与远端侧校验
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::{
    AcceptedRequest, Actor, Driver, Mission, MissionStatus, Parcel, ParcelStatus, Role,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::gateway::{DirectoryGateway, MissionGateway, ReceptionGateway, SessionStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// 默认任务号前缀
pub const DEFAULT_MISSION_NUMBER_PREFIX: &str = "PKP";

// ==========================================
// SqlitePickupStore
// ==========================================
pub struct SqlitePickupStore {
    conn: Arc<Mutex<Connection>>,
    mission_number_prefix: String,
}

impl SqlitePickupStore {
    /// 基于共享连接创建（调用方负责建表）
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            mission_number_prefix: DEFAULT_MISSION_NUMBER_PREFIX.to_string(),
        }
    }

    /// 打开数据库文件并建表
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// 设置任务号前缀
    pub fn with_mission_number_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if !prefix.trim().is_empty() {
            self.mission_number_prefix = prefix.trim().to_string();
        }
        self
    }

    /// 共享连接（供 ConfigManager 复用）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 目录数据写入（导入/测试夹具）
    // ==========================================

    /// 写入或替换司机
    pub fn upsert_driver(&self, driver: &Driver) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO driver (id, name, agency, governorate, car_number)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                driver.id,
                driver.name,
                driver.agency,
                driver.governorate,
                driver.car_number
            ],
        )?;
        Ok(())
    }

    /// 写入已受理请求及其包裹（事务）
    pub fn insert_request(&self, request: &AcceptedRequest) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO pickup_request (id, sender_name, sender_agency, status)
            VALUES (?1, ?2, ?3, 'Accepted')
            "#,
            params![request.id, request.sender_name, request.sender_agency],
        )?;

        for parcel in &request.parcels {
            tx.execute(
                r#"
                INSERT INTO parcel (id, request_id, tracking_number, recipient_name, destination, status)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    parcel.id,
                    request.id,
                    parcel.tracking_number,
                    parcel.recipient_name,
                    parcel.destination,
                    parcel.status.label()
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// 写入当前会话操作人
    pub fn set_session(&self, actor: &Actor) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO current_session (id, role, agency, governorate, display_name)
            VALUES (1, ?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE
            SET role = ?1, agency = ?2, governorate = ?3, display_name = ?4
            "#,
            params![
                actor.role.label(),
                actor.agency,
                actor.governorate,
                actor.display_name
            ],
        )?;
        Ok(())
    }

    // ==========================================
    // 读取辅助
    // ==========================================

    fn load_mission(conn: &Connection, mission_id: i64) -> RepositoryResult<Mission> {
        let row = conn
            .query_row(
                r#"
                SELECT m.id, m.mission_number, m.status, m.driver_id, m.scheduled_at,
                       m.completion_code, m.notes, m.created_at,
                       d.name, d.agency, d.governorate, d.car_number
                FROM mission m
                LEFT JOIN driver d ON d.id = m.driver_id
                WHERE m.id = ?1
                "#,
                params![mission_id],
                |row| {
                    Ok(MissionRow {
                        id: row.get(0)?,
                        mission_number: row.get(1)?,
                        status: row.get(2)?,
                        driver_id: row.get(3)?,
                        scheduled_at: row.get(4)?,
                        completion_code: row.get(5)?,
                        notes: row.get(6)?,
                        created_at: row.get(7)?,
                        driver_name: row.get(8)?,
                        driver_agency: row.get(9)?,
                        driver_governorate: row.get(10)?,
                        driver_car_number: row.get(11)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| RepositoryError::not_found("mission", mission_id))?;

        let request_ids = {
            let mut stmt = conn.prepare(
                "SELECT request_id FROM mission_request WHERE mission_id = ?1 ORDER BY position",
            )?;
            let ids = stmt
                .query_map(params![mission_id], |r| r.get::<_, i64>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };

        let parcels = {
            let mut stmt = conn.prepare(
                r#"
                SELECT p.id, p.tracking_number, p.recipient_name, p.destination, p.status
                FROM mission_parcel mp
                JOIN parcel p ON p.id = mp.parcel_id
                WHERE mp.mission_id = ?1
                ORDER BY mp.position
                "#,
            )?;
            let parcels = stmt
                .query_map(params![mission_id], map_parcel)?
                .collect::<Result<Vec<_>, _>>()?;
            parcels
        };

        row.into_mission(request_ids, parcels)
    }

    fn next_mission_number(&self, conn: &Connection, now: DateTime<Utc>) -> RepositoryResult<String> {
        let day_prefix = format!("{}-{}-", self.mission_number_prefix, now.format("%Y%m%d"));
        // 取当日最大序号而非行数，删除任务后序号不回退
        let last: i64 = conn.query_row(
            r#"
            SELECT COALESCE(MAX(CAST(substr(mission_number, ?2) AS INTEGER)), 0)
            FROM mission
            WHERE mission_number LIKE ?1
            "#,
            params![format!("{}%", day_prefix), day_prefix.chars().count() as i64 + 1],
            |row| row.get(0),
        )?;
        Ok(format!("{}{:04}", day_prefix, last + 1))
    }
}

// ==========================================
// 行映射
// ==========================================

struct MissionRow {
    id: i64,
    mission_number: String,
    status: String,
    driver_id: i64,
    scheduled_at: Option<String>,
    completion_code: Option<String>,
    notes: Option<String>,
    created_at: String,
    driver_name: Option<String>,
    driver_agency: Option<String>,
    driver_governorate: Option<String>,
    driver_car_number: Option<String>,
}

impl MissionRow {
    fn into_mission(self, request_ids: Vec<i64>, parcels: Vec<Parcel>) -> RepositoryResult<Mission> {
        let status = MissionStatus::from_label(&self.status).ok_or_else(|| {
            RepositoryError::FieldValueError {
                field: "mission.status".to_string(),
                message: format!("未知任务状态: {}", self.status),
            }
        })?;

        let driver = self.driver_name.map(|name| Driver {
            id: self.driver_id,
            name,
            agency: self.driver_agency,
            governorate: self.driver_governorate,
            car_number: self.driver_car_number,
        });

        Ok(Mission {
            id: self.id,
            mission_number: self.mission_number,
            status,
            driver_id: self.driver_id,
            driver,
            request_ids,
            parcels,
            scheduled_at: self
                .scheduled_at
                .as_deref()
                .map(|s| parse_ts("mission.scheduled_at", s))
                .transpose()?,
            created_at: parse_ts("mission.created_at", &self.created_at)?,
            // 安全码只通过 get_security_code 获取
            security_code: None,
            completion_code: self.completion_code,
            notes: self.notes,
        })
    }
}

fn map_parcel(row: &rusqlite::Row<'_>) -> rusqlite::Result<Parcel> {
    Ok(Parcel {
        id: row.get(0)?,
        tracking_number: row.get(1)?,
        recipient_name: row.get(2)?,
        destination: row.get(3)?,
        status: ParcelStatus::from_label(&row.get::<_, String>(4)?),
    })
}

fn parse_ts(field: &str, value: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::FieldValueError {
            field: field.to_string(),
            message: e.to_string(),
        })
}

/// 6 位数字安全码
fn generate_security_code() -> String {
    format!("{:06}", Uuid::new_v4().as_u128() % 1_000_000)
}

/// 8 位完成码（大写十六进制）
fn generate_completion_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

// ==========================================
// MissionGateway 实现
// ==========================================
#[async_trait]
impl MissionGateway for SqlitePickupStore {
    async fn list_missions(&self) -> RepositoryResult<Vec<Mission>> {
        let conn = self.get_conn()?;
        let ids = {
            let mut stmt = conn.prepare("SELECT id FROM mission ORDER BY created_at DESC, id DESC")?;
            let ids = stmt
                .query_map([], |r| r.get::<_, i64>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };

        ids.into_iter()
            .map(|id| Self::load_mission(&conn, id))
            .collect()
    }

    async fn get_mission(&self, mission_id: i64) -> RepositoryResult<Mission> {
        let conn = self.get_conn()?;
        Self::load_mission(&conn, mission_id)
    }

    async fn create_mission(
        &self,
        driver_id: i64,
        request_ids: &[i64],
        note: &str,
    ) -> RepositoryResult<Mission> {
        if request_ids.is_empty() {
            return Err(RepositoryError::ValidationError(
                "任务至少需要一个揽收请求".to_string(),
            ));
        }

        let now = Utc::now();
        let mut conn = self.get_conn()?;
        let mission_number = self.next_mission_number(&conn, now)?;
        let tx = conn.transaction()?;

        let driver_exists: bool = tx
            .query_row("SELECT 1 FROM driver WHERE id = ?1", params![driver_id], |_| Ok(true))
            .optional()?
            .unwrap_or(false);
        if !driver_exists {
            return Err(RepositoryError::not_found("driver", driver_id));
        }

        for request_id in request_ids {
            let assigned: Option<Option<i64>> = tx
                .query_row(
                    "SELECT assigned_mission_id FROM pickup_request WHERE id = ?1",
                    params![request_id],
                    |row| row.get(0),
                )
                .optional()?;
            match assigned {
                None => return Err(RepositoryError::not_found("pickup_request", request_id)),
                Some(Some(mission_id)) => {
                    return Err(RepositoryError::ValidationError(format!(
                        "请求 {} 已分配给任务 {}",
                        request_id, mission_id
                    )))
                }
                Some(None) => {}
            }
        }

        tx.execute(
            r#"
            INSERT INTO mission (mission_number, status, driver_id, security_code, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                mission_number,
                MissionStatus::Pending.label(),
                driver_id,
                generate_security_code(),
                note,
                now.to_rfc3339()
            ],
        )?;
        let mission_id = tx.last_insert_rowid();

        let mut parcel_position: i64 = 0;
        for (position, request_id) in request_ids.iter().enumerate() {
            tx.execute(
                "INSERT INTO mission_request (mission_id, request_id, position) VALUES (?1, ?2, ?3)",
                params![mission_id, request_id, position as i64],
            )?;
            tx.execute(
                "UPDATE pickup_request SET assigned_mission_id = ?1 WHERE id = ?2",
                params![mission_id, request_id],
            )?;

            let parcel_ids = {
                let mut stmt =
                    tx.prepare("SELECT id FROM parcel WHERE request_id = ?1 ORDER BY id")?;
                let ids = stmt
                    .query_map(params![request_id], |r| r.get::<_, i64>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                ids
            };
            for parcel_id in parcel_ids {
                tx.execute(
                    "INSERT INTO mission_parcel (mission_id, parcel_id, position) VALUES (?1, ?2, ?3)",
                    params![mission_id, parcel_id, parcel_position],
                )?;
                parcel_position += 1;
            }
        }

        tx.commit()?;
        tracing::debug!(mission_id, %mission_number, "任务已写入");
        Self::load_mission(&conn, mission_id)
    }

    async fn delete_mission(&self, mission_id: i64) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE pickup_request SET assigned_mission_id = NULL WHERE assigned_mission_id = ?1",
            params![mission_id],
        )?;
        let deleted = tx.execute("DELETE FROM mission WHERE id = ?1", params![mission_id])?;
        if deleted == 0 {
            return Err(RepositoryError::not_found("mission", mission_id));
        }
        tx.commit()?;
        Ok(())
    }

    async fn get_security_code(&self, mission_id: i64) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT security_code FROM mission WHERE id = ?1",
            params![mission_id],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?
        .ok_or_else(|| RepositoryError::not_found("mission", mission_id))
    }

    async fn scan_parcel_remote(&self, mission_id: i64, code: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let parcel_id: Option<i64> = tx
            .query_row(
                r#"
                SELECT p.id FROM mission_parcel mp
                JOIN parcel p ON p.id = mp.parcel_id
                WHERE mp.mission_id = ?1
                  AND (p.tracking_number = ?2 OR CAST(p.id AS TEXT) = ?2)
                "#,
                params![mission_id, code],
                |row| row.get(0),
            )
            .optional()?;

        let parcel_id = match parcel_id {
            Some(id) => id,
            None => {
                let mission_exists: bool = tx
                    .query_row("SELECT 1 FROM mission WHERE id = ?1", params![mission_id], |_| {
                        Ok(true)
                    })
                    .optional()?
                    .unwrap_or(false);
                if !mission_exists {
                    return Err(RepositoryError::not_found("mission", mission_id));
                }
                return Err(RepositoryError::RemoteRejected(format!(
                    "Colis {} non trouvé dans cette mission",
                    code
                )));
            }
        };

        tx.execute(
            r#"
            UPDATE mission_parcel SET scanned_at = COALESCE(scanned_at, ?3)
            WHERE mission_id = ?1 AND parcel_id = ?2
            "#,
            params![mission_id, parcel_id, Utc::now().to_rfc3339()],
        )?;
        tx.execute(
            "UPDATE parcel SET status = ?2 WHERE id = ?1",
            params![parcel_id, ParcelStatus::AtDepot.label()],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn update_status(&self, mission_id: i64, status: MissionStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE mission SET status = ?2 WHERE id = ?1",
            params![mission_id, status.label()],
        )?;
        if updated == 0 {
            return Err(RepositoryError::not_found("mission", mission_id));
        }
        Ok(())
    }
}

// ==========================================
// DirectoryGateway 实现
// ==========================================
#[async_trait]
impl DirectoryGateway for SqlitePickupStore {
    async fn list_drivers(&self) -> RepositoryResult<Vec<Driver>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, agency, governorate, car_number FROM driver ORDER BY id",
        )?;
        let drivers = stmt
            .query_map([], |row| {
                Ok(Driver {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    agency: row.get(2)?,
                    governorate: row.get(3)?,
                    car_number: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(drivers)
    }

    async fn list_accepted_requests(
        &self,
        exclude_assigned: bool,
    ) -> RepositoryResult<Vec<AcceptedRequest>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT r.id, r.sender_name, r.sender_agency,
                   (SELECT COUNT(*) FROM parcel p WHERE p.request_id = r.id)
            FROM pickup_request r
            WHERE r.status = 'Accepted'
              AND (?1 = 0 OR r.assigned_mission_id IS NULL)
            ORDER BY r.id
            "#,
        )?;
        let requests = stmt
            .query_map(params![exclude_assigned as i64], |row| {
                Ok(AcceptedRequest {
                    id: row.get(0)?,
                    sender_name: row.get(1)?,
                    sender_agency: row.get(2)?,
                    parcel_count: row.get::<_, i64>(3)?.max(0) as u32,
                    parcels: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(requests)
    }

    async fn get_parcels_for_request(&self, request_id: i64) -> RepositoryResult<Vec<Parcel>> {
        let conn = self.get_conn()?;
        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM pickup_request WHERE id = ?1",
                params![request_id],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !exists {
            return Err(RepositoryError::not_found("pickup_request", request_id));
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT id, tracking_number, recipient_name, destination, status
            FROM parcel WHERE request_id = ?1 ORDER BY id
            "#,
        )?;
        let parcels = stmt
            .query_map(params![request_id], map_parcel)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parcels)
    }
}

// ==========================================
// ReceptionGateway 实现
// ==========================================
#[async_trait]
impl ReceptionGateway for SqlitePickupStore {
    async fn chef_agence_scan(&self, mission_id: i64, parcel_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let scanned: Option<Option<String>> = conn
            .query_row(
                "SELECT chef_scanned_at FROM mission_parcel WHERE mission_id = ?1 AND parcel_id = ?2",
                params![mission_id, parcel_id],
                |row| row.get(0),
            )
            .optional()?;

        match scanned {
            None => Err(RepositoryError::RemoteRejected(format!(
                "Colis {} n'appartient pas à la mission {}",
                parcel_id, mission_id
            ))),
            Some(Some(_)) => Err(RepositoryError::RemoteRejected(format!(
                "Colis {} déjà scanné",
                parcel_id
            ))),
            Some(None) => {
                conn.execute(
                    "UPDATE mission_parcel SET chef_scanned_at = ?3 WHERE mission_id = ?1 AND parcel_id = ?2",
                    params![mission_id, parcel_id, Utc::now().to_rfc3339()],
                )?;
                Ok(())
            }
        }
    }

    async fn generate_completion_code(
        &self,
        mission_id: i64,
        scanned_parcel_ids: &[i64],
    ) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let exists: bool = conn
            .query_row("SELECT 1 FROM mission WHERE id = ?1", params![mission_id], |_| Ok(true))
            .optional()?
            .unwrap_or(false);
        if !exists {
            return Err(RepositoryError::not_found("mission", mission_id));
        }

        for parcel_id in scanned_parcel_ids {
            let belongs: bool = conn
                .query_row(
                    "SELECT 1 FROM mission_parcel WHERE mission_id = ?1 AND parcel_id = ?2",
                    params![mission_id, parcel_id],
                    |_| Ok(true),
                )
                .optional()?
                .unwrap_or(false);
            if !belongs {
                return Err(RepositoryError::ValidationError(format!(
                    "包裹 {} 不属于任务 {}",
                    parcel_id, mission_id
                )));
            }
        }

        let code = generate_completion_code();
        conn.execute(
            "UPDATE mission SET completion_code = ?2 WHERE id = ?1",
            params![mission_id, code],
        )?;
        Ok(code)
    }
}

// ==========================================
// SessionStore 实现
// ==========================================
#[async_trait]
impl SessionStore for SqlitePickupStore {
    async fn load_actor(&self) -> RepositoryResult<Option<Actor>> {
        let conn = self.get_conn()?;
        let actor = conn
            .query_row(
                "SELECT role, agency, governorate, display_name FROM current_session WHERE id = 1",
                [],
                |row| {
                    Ok(Actor {
                        role: Role::from_label(&row.get::<_, String>(0)?),
                        agency: row.get(1)?,
                        governorate: row.get(2)?,
                        display_name: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(actor)
    }
}

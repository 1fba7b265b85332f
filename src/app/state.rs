// ==========================================
// 揽收任务系统 - 应用状态
// ==========================================
// 职责: 打开数据库、加载配置与操作人，启动任务台
// ==========================================

use std::sync::Arc;

use crate::app::desk::{DeskServices, MissionDesk, MissionDeskHandle};
use crate::config::{ConfigManager, PickupConfig, PickupConfigReader};
use crate::domain::Actor;
use crate::engine::{MissionEventPublisher, OptionalEventPublisher};
use crate::repository::{SessionStore, SqlitePickupStore};
use tokio::task::JoinHandle;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "PICKUP_MISSIONS_DB_PATH";

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// SQLite 协作方（任务/目录/签收/会话）
    pub store: Arc<SqlitePickupStore>,

    /// 配置管理器（与 store 共享连接）
    pub config_manager: Arc<ConfigManager>,

    /// 启动时解析的配置快照
    pub config: PickupConfig,

    /// 启动时读取的操作人（未登录为 None）
    pub actor: Option<Actor>,

    /// 任务台句柄
    pub desk: MissionDeskHandle,

    desk_task: JoinHandle<()>,
}

impl AppState {
    /// 创建 AppState（不发布事件）
    pub async fn new(db_path: String) -> Result<Self, String> {
        Self::build(db_path, OptionalEventPublisher::none()).await
    }

    /// 创建 AppState，并把任务事件交给指定发布者
    pub async fn with_publisher(
        db_path: String,
        publisher: Arc<dyn MissionEventPublisher>,
    ) -> Result<Self, String> {
        Self::build(db_path, OptionalEventPublisher::with_publisher(publisher)).await
    }

    /// 初始化顺序:
    /// 1. 打开数据库并建表
    /// 2. 读取配置快照
    /// 3. 读取当前操作人
    /// 4. 启动任务台并加载首屏数据（失败只记日志）
    async fn build(db_path: String, events: OptionalEventPublisher) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let base_store =
            SqlitePickupStore::open(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        let config_manager = Arc::new(
            ConfigManager::from_connection(base_store.connection())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let config = config_manager
            .load_snapshot()
            .await
            .map_err(|e| format!("无法加载配置: {}", e))?;
        tracing::debug!(?config, "配置快照");

        let store = Arc::new(base_store.with_mission_number_prefix(config.mission_number_prefix.clone()));

        let actor = match store.load_actor().await {
            Ok(actor) => actor,
            Err(e) => {
                tracing::warn!("读取当前操作人失败，按未登录处理: {}", e);
                None
            }
        };
        match &actor {
            Some(a) => tracing::info!(role = %a.role, agency = ?a.agency(), "当前操作人"),
            None => tracing::info!("未找到当前操作人，列表不做角色过滤"),
        }

        let desk = MissionDesk::new(
            DeskServices::from_store(store.clone()),
            actor.clone(),
            config.clone(),
            events,
        );
        let (desk, desk_task) = desk.spawn();

        if let Err(e) = desk.refresh().await {
            tracing::warn!("首次加载任务列表失败: {}", e);
        }
        if let Err(e) = desk.load_directory().await {
            tracing::warn!("首次加载司机/请求目录失败: {}", e);
        }

        Ok(Self {
            db_path,
            store,
            config_manager,
            config,
            actor,
            desk,
            desk_task,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }

    /// 关闭任务台并等待其退出
    pub async fn shutdown(self) {
        let AppState {
            desk, desk_task, ..
        } = self;
        drop(desk);
        if let Err(e) = desk_task.await {
            tracing::warn!("任务台退出异常: {}", e);
        }
    }
}

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 PICKUP_MISSIONS_DB_PATH（非空时）
/// - 用户数据目录/pickup-missions/pickup_missions.db
/// - 兜底: ./pickup_missions.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    match dirs::data_dir() {
        Some(data_dir) => {
            let dir = data_dir.join("pickup-missions");
            // 目录创建失败时退回当前目录
            if let Err(e) = std::fs::create_dir_all(&dir) {
                tracing::warn!("无法创建数据目录 {:?}: {}", dir, e);
                return "./pickup_missions.db".to_string();
            }
            dir.join("pickup_missions.db").to_string_lossy().to_string()
        }
        None => "./pickup_missions.db".to_string(),
    }
}

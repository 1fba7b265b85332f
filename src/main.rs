// ==========================================
// 揽收任务系统 - 命令行入口
// ==========================================
// 用法: pickup-missions [db_path]
// 输出: 看板统计（JSON）
// ==========================================

use anyhow::Context;
use pickup_missions::app::{get_default_db_path, AppState};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pickup_missions::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", pickup_missions::APP_NAME);
    tracing::info!("系统版本: {}", pickup_missions::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args()
        .nth(1)
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path)
        .await
        .map_err(anyhow::Error::msg)
        .context("无法初始化AppState")?;

    let stats = state.desk.stats().await.context("读取看板统计失败")?;
    let output = json!({
        "actor": state.actor.as_ref().map(|a| a.role.label().to_string()),
        "dashboard_visible": state.desk.can_view_dashboard(),
        "stats": stats,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    state.shutdown().await;
    Ok(())
}

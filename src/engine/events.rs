// ==========================================
// 揽收任务系统 - 引擎层事件发布
// ==========================================
// 职责: 定义任务事件发布 trait（刷新信号），实现依赖倒置
// 说明: Engine 层定义 trait，App 层/嵌入方提供适配器
// ==========================================

use crate::domain::MissionStatus;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;
use tokio::sync::mpsc;

// ==========================================
// 任务事件类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionEventType {
    /// 任务已创建
    MissionCreated,
    /// 任务已删除
    MissionRemoved,
    /// 状态流转
    StatusChanged,
    /// 揽收扫描完成
    ScanCompleted,
    /// 分支签收生成完成码
    CompletionCodeGenerated,
    /// 请求刷新任务列表
    RefreshRequested,
}

impl MissionEventType {
    pub fn as_str(&self) -> &str {
        match self {
            MissionEventType::MissionCreated => "MissionCreated",
            MissionEventType::MissionRemoved => "MissionRemoved",
            MissionEventType::StatusChanged => "StatusChanged",
            MissionEventType::ScanCompleted => "ScanCompleted",
            MissionEventType::CompletionCodeGenerated => "CompletionCodeGenerated",
            MissionEventType::RefreshRequested => "RefreshRequested",
        }
    }
}

/// 任务事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionEvent {
    pub mission_id: i64,
    pub event_type: MissionEventType,
    /// 事件发生后的任务状态（删除事件为 None）
    pub status: Option<MissionStatus>,
    /// 事件来源描述
    pub source: Option<String>,
}

impl MissionEvent {
    pub fn new(mission_id: i64, event_type: MissionEventType, status: Option<MissionStatus>) -> Self {
        Self {
            mission_id,
            event_type,
            status,
            source: None,
        }
    }

    pub fn refresh(mission_id: i64, source: &str) -> Self {
        Self {
            mission_id,
            event_type: MissionEventType::RefreshRequested,
            status: None,
            source: Some(source.to_string()),
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 任务事件发布者
///
/// 发布失败不影响已完成的状态流转，调用方只记录日志
pub trait MissionEventPublisher: Send + Sync {
    fn publish(&self, event: MissionEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者（单元测试/无订阅方）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl MissionEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: MissionEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - mission_id={}, event_type={}",
            event.mission_id,
            event.event_type.as_str()
        );
        Ok(())
    }
}

/// 基于 tokio 通道的发布者，订阅方持有接收端
#[derive(Debug, Clone)]
pub struct ChannelEventPublisher {
    sender: mpsc::UnboundedSender<MissionEvent>,
}

impl ChannelEventPublisher {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MissionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl MissionEventPublisher for ChannelEventPublisher {
    fn publish(&self, event: MissionEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.sender
            .send(event)
            .map_err(|e| format!("事件订阅方已关闭: {}", e).into())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn MissionEventPublisher>> 的使用；发布失败只记 warn
#[derive(Clone, Default)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn MissionEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn MissionEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn publish(&self, event: MissionEvent) {
        let Some(publisher) = &self.inner else {
            tracing::debug!(
                "OptionalEventPublisher: 未配置发布者，跳过事件 - mission_id={}, event_type={}",
                event.mission_id,
                event.event_type.as_str()
            );
            return;
        };

        let event_type = event.event_type;
        let mission_id = event.mission_id;
        if let Err(e) = publisher.publish(event) {
            tracing::warn!(
                mission_id,
                event_type = event_type.as_str(),
                error = %e,
                "任务事件发布失败"
            );
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl std::fmt::Debug for OptionalEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionalEventPublisher")
            .field("configured", &self.is_configured())
            .finish()
    }
}

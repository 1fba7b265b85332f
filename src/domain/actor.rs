// ==========================================
// 揽收任务系统 - 操作人领域模型
// ==========================================
// 职责: 描述当前操作人的角色与所属分支
// 说明: 启动时由会话引导方读取一次，显式传入各引擎，不做持久化
// ==========================================

use crate::domain::types::Role;
use serde::{Deserialize, Serialize};

// ==========================================
// Actor - 操作人
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub role: Role,               // 角色
    pub agency: Option<String>,       // 所属分支
    pub governorate: Option<String>,  // 所属省份（agency 为空时作为分支）
    pub display_name: Option<String>, // 显示名称（用于任务备注）
}

impl Actor {
    pub fn new(role: Role, agency: impl Into<String>) -> Self {
        Self {
            role,
            agency: Some(agency.into()),
            governorate: None,
            display_name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_governorate(mut self, governorate: impl Into<String>) -> Self {
        self.governorate = Some(governorate.into());
        self
    }

    /// 所属分支（空字符串视为未设置，回退到 governorate）
    pub fn agency(&self) -> Option<&str> {
        fn non_blank(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|a| !a.is_empty())
        }
        non_blank(&self.agency).or_else(|| non_blank(&self.governorate))
    }

    /// 任务创建备注: "Mission créée par <name> (<role>)"
    pub fn creation_note(&self) -> String {
        let name = self.display_name.as_deref().unwrap_or("inconnu");
        format!("Mission créée par {} ({})", name, self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_note() {
        let actor = Actor::new(Role::AgencyChief, "Sousse").with_name("Amira Ben Ali");
        assert_eq!(
            actor.creation_note(),
            "Mission créée par Amira Ben Ali (Chef d'agence)"
        );
    }

    #[test]
    fn test_blank_agency_is_none() {
        let actor = Actor::new(Role::AgencyMember, "   ");
        assert!(actor.agency().is_none());
    }

    #[test]
    fn test_agency_falls_back_to_governorate() {
        let actor = Actor::new(Role::AgencyChief, "").with_governorate("Monastir");
        assert_eq!(actor.agency(), Some("Monastir"));

        let actor = Actor::new(Role::AgencyChief, "Sousse").with_governorate("Monastir");
        assert_eq!(actor.agency(), Some("Sousse"));
    }
}

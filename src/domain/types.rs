// ==========================================
// 揽收任务系统 - 领域类型定义
// ==========================================
// 职责: 任务状态、包裹状态、角色等封闭枚举
// 序列化格式: 与后端一致的法文状态标签
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 任务状态 (Mission Status)
// ==========================================
// 正向顺序: Pending → ToPickup → PickedUp → AtDepot → Completed
// Rejected 为司机拒单的终态（外部事件产生）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionStatus {
    #[serde(rename = "En attente")]
    Pending, // 待接单
    #[serde(rename = "À enlever")]
    ToPickup, // 待揽收
    #[serde(rename = "Enlevé")]
    PickedUp, // 已揽收
    #[serde(rename = "Au dépôt")]
    AtDepot, // 已到仓
    #[serde(rename = "Terminé")]
    Completed, // 已完成
    #[serde(rename = "Refusé par livreur")]
    Rejected, // 司机拒单
}

impl MissionStatus {
    /// 正向生命周期（不含 Rejected）
    pub const FORWARD_CHAIN: [MissionStatus; 5] = [
        MissionStatus::Pending,
        MissionStatus::ToPickup,
        MissionStatus::PickedUp,
        MissionStatus::AtDepot,
        MissionStatus::Completed,
    ];

    /// 状态标签（与后端存储一致）
    pub fn label(&self) -> &'static str {
        match self {
            MissionStatus::Pending => "En attente",
            MissionStatus::ToPickup => "À enlever",
            MissionStatus::PickedUp => "Enlevé",
            MissionStatus::AtDepot => "Au dépôt",
            MissionStatus::Completed => "Terminé",
            MissionStatus::Rejected => "Refusé par livreur",
        }
    }

    /// 从标签解析状态
    ///
    /// 未知标签返回 None（任务状态只允许封闭集合中的值）
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim() {
            "En attente" => Some(MissionStatus::Pending),
            "À enlever" => Some(MissionStatus::ToPickup),
            "Enlevé" => Some(MissionStatus::PickedUp),
            "Au dépôt" => Some(MissionStatus::AtDepot),
            "Terminé" => Some(MissionStatus::Completed),
            "Refusé par livreur" => Some(MissionStatus::Rejected),
            _ => None,
        }
    }

    /// 是否为终态（不可再流转、不可删除）
    pub fn is_terminal(&self) -> bool {
        matches!(self, MissionStatus::Completed | MissionStatus::Rejected)
    }

    /// 正向链中的下一状态
    pub fn next(&self) -> Option<MissionStatus> {
        match self {
            MissionStatus::Pending => Some(MissionStatus::ToPickup),
            MissionStatus::ToPickup => Some(MissionStatus::PickedUp),
            MissionStatus::PickedUp => Some(MissionStatus::AtDepot),
            MissionStatus::AtDepot => Some(MissionStatus::Completed),
            MissionStatus::Completed | MissionStatus::Rejected => None,
        }
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ==========================================
// 包裹状态 (Parcel Status)
// ==========================================
// 与任务状态共享词汇表；未知标签原样保留
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParcelStatus {
    Awaiting,           // En attente
    ToPickup,           // À enlever
    PickedUp,           // Enlevé
    AtDepot,            // Au dépôt
    InTransit,          // En cours
    ReturnedToDepot,    // RTN dépot
    Delivered,          // Livrés
    DeliveredPaid,      // Livrés payés
    Finished,           // Terminé
    ReturnedFinal,      // Retour définitif
    ReturnedClientDepot, // RTN client dépôt
    ReturnedToSender,   // Retour Expéditeur
    ReturnInShipment,   // Retour En Cours d'expédition
    ReturnReceived,     // Retour reçu
    Other(String),
}

impl ParcelStatus {
    pub fn label(&self) -> &str {
        match self {
            ParcelStatus::Awaiting => "En attente",
            ParcelStatus::ToPickup => "À enlever",
            ParcelStatus::PickedUp => "Enlevé",
            ParcelStatus::AtDepot => "Au dépôt",
            ParcelStatus::InTransit => "En cours",
            ParcelStatus::ReturnedToDepot => "RTN dépot",
            ParcelStatus::Delivered => "Livrés",
            ParcelStatus::DeliveredPaid => "Livrés payés",
            ParcelStatus::Finished => "Terminé",
            ParcelStatus::ReturnedFinal => "Retour définitif",
            ParcelStatus::ReturnedClientDepot => "RTN client dépôt",
            ParcelStatus::ReturnedToSender => "Retour Expéditeur",
            ParcelStatus::ReturnInShipment => "Retour En Cours d'expédition",
            ParcelStatus::ReturnReceived => "Retour reçu",
            ParcelStatus::Other(label) => label.as_str(),
        }
    }

    /// 从标签解析状态（不会失败）
    pub fn from_label(s: &str) -> Self {
        match s.trim() {
            "En attente" => ParcelStatus::Awaiting,
            "À enlever" => ParcelStatus::ToPickup,
            "Enlevé" => ParcelStatus::PickedUp,
            "Au dépôt" => ParcelStatus::AtDepot,
            "En cours" => ParcelStatus::InTransit,
            "RTN dépot" => ParcelStatus::ReturnedToDepot,
            "Livrés" => ParcelStatus::Delivered,
            "Livrés payés" => ParcelStatus::DeliveredPaid,
            "Terminé" => ParcelStatus::Finished,
            "Retour définitif" => ParcelStatus::ReturnedFinal,
            "RTN client dépôt" => ParcelStatus::ReturnedClientDepot,
            "Retour Expéditeur" => ParcelStatus::ReturnedToSender,
            "Retour En Cours d'expédition" => ParcelStatus::ReturnInShipment,
            "Retour reçu" => ParcelStatus::ReturnReceived,
            other => ParcelStatus::Other(other.to_string()),
        }
    }

    /// 是否属于退货类状态
    pub fn is_return(&self) -> bool {
        matches!(
            self,
            ParcelStatus::ReturnedToDepot
                | ParcelStatus::ReturnedFinal
                | ParcelStatus::ReturnedClientDepot
                | ParcelStatus::ReturnedToSender
                | ParcelStatus::ReturnInShipment
                | ParcelStatus::ReturnReceived
        )
    }

    /// 是否已签收
    pub fn is_delivered(&self) -> bool {
        matches!(self, ParcelStatus::Delivered | ParcelStatus::DeliveredPaid)
    }
}

impl Default for ParcelStatus {
    fn default() -> Self {
        ParcelStatus::Awaiting
    }
}

impl From<String> for ParcelStatus {
    fn from(s: String) -> Self {
        ParcelStatus::from_label(&s)
    }
}

impl From<ParcelStatus> for String {
    fn from(status: ParcelStatus) -> Self {
        status.label().to_string()
    }
}

impl fmt::Display for ParcelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ==========================================
// 角色 (Role)
// ==========================================
// "Admin" 与 "Administration" 两个标签都视为管理员
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Administration,
    AgencyChief,  // Chef d'agence
    AgencyMember, // Membre de l'agence
    Other(String),
}

impl Role {
    pub fn label(&self) -> &str {
        match self {
            Role::Admin => "Admin",
            Role::Administration => "Administration",
            Role::AgencyChief => "Chef d'agence",
            Role::AgencyMember => "Membre de l'agence",
            Role::Other(label) => label.as_str(),
        }
    }

    pub fn from_label(s: &str) -> Self {
        match s.trim() {
            "Admin" => Role::Admin,
            "Administration" => Role::Administration,
            "Chef d'agence" => Role::AgencyChief,
            "Membre de l'agence" => Role::AgencyMember,
            other => Role::Other(other.to_string()),
        }
    }

    /// 管理员（全部可见）
    pub fn is_administrator(&self) -> bool {
        matches!(self, Role::Admin | Role::Administration)
    }

    /// 分支机构角色（按所属分支过滤）
    pub fn is_agency_scoped(&self) -> bool {
        matches!(self, Role::AgencyChief | Role::AgencyMember)
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::from_label(&s)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.label().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mission_status_label_roundtrip() {
        for status in MissionStatus::FORWARD_CHAIN {
            assert_eq!(MissionStatus::from_label(status.label()), Some(status));
        }
        assert_eq!(
            MissionStatus::from_label("Refusé par livreur"),
            Some(MissionStatus::Rejected)
        );
        assert_eq!(MissionStatus::from_label("Inconnu"), None);
    }

    #[test]
    fn test_mission_status_serde_uses_labels() {
        let json = serde_json::to_string(&MissionStatus::AtDepot).unwrap();
        assert_eq!(json, "\"Au dépôt\"");
        let parsed: MissionStatus = serde_json::from_str("\"À enlever\"").unwrap();
        assert_eq!(parsed, MissionStatus::ToPickup);
    }

    #[test]
    fn test_forward_chain_next() {
        assert_eq!(MissionStatus::Pending.next(), Some(MissionStatus::ToPickup));
        assert_eq!(MissionStatus::AtDepot.next(), Some(MissionStatus::Completed));
        assert_eq!(MissionStatus::Completed.next(), None);
        assert_eq!(MissionStatus::Rejected.next(), None);
    }

    #[test]
    fn test_parcel_status_preserves_unknown_label() {
        let status = ParcelStatus::from_label("Perdu");
        assert_eq!(status, ParcelStatus::Other("Perdu".to_string()));
        assert_eq!(status.label(), "Perdu");
        assert!(ParcelStatus::from_label("Retour reçu").is_return());
        assert!(ParcelStatus::from_label("Livrés payés").is_delivered());
    }

    #[test]
    fn test_role_administrator_covers_both_labels() {
        assert!(Role::from_label("Admin").is_administrator());
        assert!(Role::from_label("Administration").is_administrator());
        assert!(!Role::from_label("Chef d'agence").is_administrator());
        assert!(Role::from_label("Membre de l'agence").is_agency_scoped());
        assert_eq!(Role::from_label("Livreur"), Role::Other("Livreur".to_string()));
    }
}

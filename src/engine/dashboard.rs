// ==========================================
// 揽收任务系统 - 看板统计与筛选
// ==========================================
// 职责: 任务集合的统计、状态筛选与搜索（纯投影）
// 说明: 每次集合变更后重新计算，不做增量维护
// ==========================================

use crate::domain::{Mission, MissionStats, MissionStatus};
use serde::{Deserialize, Serialize};

/// 统计: 总数 + En attente / Terminé / Refusé par livreur 三类计数
pub fn compute_stats(missions: &[Mission]) -> MissionStats {
    missions.iter().fold(
        MissionStats {
            total: missions.len(),
            ..MissionStats::default()
        },
        |mut stats, mission| {
            match mission.status {
                MissionStatus::Pending => stats.pending += 1,
                MissionStatus::Completed => stats.completed += 1,
                MissionStatus::Rejected => stats.rejected += 1,
                _ => {}
            }
            stats
        },
    )
}

/// 按状态筛选（None 表示全部）
pub fn filter_by_status(missions: &[Mission], status: Option<MissionStatus>) -> Vec<Mission> {
    match status {
        None => missions.to_vec(),
        Some(status) => missions
            .iter()
            .filter(|m| m.status == status)
            .cloned()
            .collect(),
    }
}

/// 搜索: 任务号 / 司机名 / 司机分支，大小写不敏感
pub fn search(missions: &[Mission], term: &str) -> Vec<Mission> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return missions.to_vec();
    }
    missions
        .iter()
        .filter(|m| {
            m.mission_number.to_lowercase().contains(&term)
                || m.driver_name().to_lowercase().contains(&term)
                || m.driver_agency().to_lowercase().contains(&term)
        })
        .cloned()
        .collect()
}

// ==========================================
// StatusFilter - 统计卡片筛选状态
// ==========================================
// 再次选择同一状态即清除筛选
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFilter {
    active: Option<MissionStatus>,
}

impl StatusFilter {
    pub fn active(&self) -> Option<MissionStatus> {
        self.active
    }

    pub fn toggle(&mut self, status: Option<MissionStatus>) -> Option<MissionStatus> {
        self.active = match (self.active, status) {
            (Some(current), Some(requested)) if current == requested => None,
            (_, requested) => requested,
        };
        self.active
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn apply(&self, missions: &[Mission]) -> Vec<Mission> {
        filter_by_status(missions, self.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Driver;
    use chrono::Utc;

    fn mission(id: i64, status: MissionStatus, driver: &str, agency: &str) -> Mission {
        Mission {
            id,
            mission_number: format!("PKP-20260101-{:04}", id),
            status,
            driver_id: id,
            driver: Some(Driver {
                id,
                name: driver.to_string(),
                agency: Some(agency.to_string()),
                governorate: None,
                car_number: None,
            }),
            request_ids: vec![],
            parcels: vec![],
            scheduled_at: None,
            created_at: Utc::now(),
            security_code: None,
            completion_code: None,
            notes: None,
        }
    }

    fn sample() -> Vec<Mission> {
        vec![
            mission(1, MissionStatus::Pending, "Karim", "Sousse"),
            mission(2, MissionStatus::Completed, "Hedi", "Tunis"),
            mission(3, MissionStatus::Rejected, "Sami", "Sfax"),
            mission(4, MissionStatus::AtDepot, "Nour", "Sousse"),
            mission(5, MissionStatus::Pending, "Ali", "Bizerte"),
        ]
    }

    #[test]
    fn test_stats_count_only_three_statuses() {
        let stats = compute_stats(&sample());
        assert_eq!(
            stats,
            MissionStats {
                total: 5,
                pending: 2,
                completed: 1,
                rejected: 1
            }
        );
        assert_eq!(compute_stats(&[]), MissionStats::default());
    }

    #[test]
    fn test_toggle_same_filter_twice_clears() {
        let missions = sample();
        let mut filter = StatusFilter::default();

        filter.toggle(Some(MissionStatus::Pending));
        assert_eq!(filter.apply(&missions).len(), 2);

        filter.toggle(Some(MissionStatus::Pending));
        assert_eq!(filter.active(), None);
        assert_eq!(filter.apply(&missions), missions);
    }

    #[test]
    fn test_toggle_switches_between_statuses() {
        let mut filter = StatusFilter::default();
        filter.toggle(Some(MissionStatus::Pending));
        assert_eq!(
            filter.toggle(Some(MissionStatus::Completed)),
            Some(MissionStatus::Completed)
        );
        assert_eq!(filter.toggle(None), None);
    }

    #[test]
    fn test_search_matches_number_driver_and_agency() {
        let missions = sample();
        assert_eq!(search(&missions, "karim").len(), 1);
        assert_eq!(search(&missions, "SOUSSE").len(), 2);
        assert_eq!(search(&missions, "0003")[0].id, 3);
        assert_eq!(search(&missions, "  ").len(), 5);
    }
}

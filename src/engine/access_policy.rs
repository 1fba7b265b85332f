// ==========================================
// 揽收任务系统 - 可见性策略引擎
// ==========================================
// 职责: 按操作人角色/分支过滤司机与揽收请求
// 红线: 纯函数，无副作用；操作人显式传入，不读全局会话
// ==========================================
// 规则:
// - 管理员 (Admin/Administration): 全部可见
// - 分支角色 (Chef/Membre d'agence): 仅本分支（大小写不敏感）
// - 其他角色 / 未登录: 不过滤（fail-open，待产品确认）
// ==========================================

use crate::domain::{AcceptedRequest, Actor, Driver, Role};
use crate::engine::agency_match::{agency_contains, agency_matches_fuzzy, same_agency};
use tracing::warn;

// ==========================================
// AccessPolicy
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    actor: Option<Actor>,
}

/// 角色判定结果
enum Scope<'a> {
    Everything,
    Agency(Option<&'a str>),
}

impl AccessPolicy {
    pub fn new(actor: Option<Actor>) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    fn scope(&self) -> Scope<'_> {
        match &self.actor {
            None => Scope::Everything,
            Some(actor) if actor.role.is_administrator() => Scope::Everything,
            Some(actor) if actor.role.is_agency_scoped() => Scope::Agency(actor.agency()),
            Some(actor) => {
                warn!(role = %actor.role, "未知角色，可见性不做过滤");
                Scope::Everything
            }
        }
    }

    /// 可见司机
    ///
    /// 分支角色未配置所属分支时，结果为空
    pub fn visible_drivers(&self, drivers: &[Driver]) -> Vec<Driver> {
        match self.scope() {
            Scope::Everything => drivers.to_vec(),
            Scope::Agency(None) => Vec::new(),
            Scope::Agency(Some(agency)) => drivers
                .iter()
                .filter(|d| same_agency(d.agency(), agency))
                .cloned()
                .collect(),
        }
    }

    /// 可见揽收请求（按发件分支）
    pub fn visible_requests(&self, requests: &[AcceptedRequest]) -> Vec<AcceptedRequest> {
        match self.scope() {
            Scope::Everything => requests.to_vec(),
            Scope::Agency(None) => Vec::new(),
            Scope::Agency(Some(agency)) => requests
                .iter()
                .filter(|r| same_agency(r.agency(), agency))
                .cloned()
                .collect(),
        }
    }

    /// 按分支名称交互式收窄司机列表（子串匹配）
    ///
    /// 分支名为空或未提供时返回按角色过滤后的结果
    pub fn drivers_in_agency(&self, drivers: &[Driver], agency: Option<&str>) -> Vec<Driver> {
        let visible = self.visible_drivers(drivers);
        match agency.map(str::trim).filter(|a| !a.is_empty()) {
            None => visible,
            Some(agency) => visible
                .into_iter()
                .filter(|d| agency_contains(d.agency(), agency))
                .collect(),
        }
    }

    /// 指定司机可承接的揽收请求
    ///
    /// - 管理员: 请求分支与司机分支相等或包含司机分支
    /// - 分支角色: 请求分支等于本分支，且与司机分支相等或包含
    pub fn requests_for_driver(
        &self,
        driver: &Driver,
        requests: &[AcceptedRequest],
    ) -> Vec<AcceptedRequest> {
        let driver_agency = driver.agency();
        match &self.actor {
            Some(actor) if actor.role.is_administrator() => requests
                .iter()
                .filter(|r| agency_matches_fuzzy(r.agency(), driver_agency))
                .cloned()
                .collect(),
            Some(actor) if actor.role.is_agency_scoped() => match actor.agency() {
                None => Vec::new(),
                Some(own) => requests
                    .iter()
                    .filter(|r| {
                        same_agency(r.agency(), own)
                            && agency_matches_fuzzy(r.agency(), driver_agency)
                    })
                    .cloned()
                    .collect(),
            },
            _ => requests.to_vec(),
        }
    }

    /// 分支下拉选项: 去重后的非空司机分支（保持首次出现顺序）
    pub fn agency_options(drivers: &[Driver]) -> Vec<String> {
        let mut options: Vec<String> = Vec::new();
        for agency in drivers.iter().map(Driver::agency).filter(|a| !a.trim().is_empty()) {
            if !options.iter().any(|o| o == agency) {
                options.push(agency.to_string());
            }
        }
        options
    }

    /// 看板统计可见: 管理员与分支负责人
    pub fn can_view_dashboard(&self) -> bool {
        self.actor
            .as_ref()
            .map(|a| a.role.is_administrator() || a.role == Role::AgencyChief)
            .unwrap_or(false)
    }

    /// 交互式分支筛选只对管理员开放
    pub fn can_narrow_by_agency(&self) -> bool {
        self.actor
            .as_ref()
            .map(|a| a.role.is_administrator())
            .unwrap_or(false)
    }
}

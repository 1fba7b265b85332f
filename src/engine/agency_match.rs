// ==========================================
// 揽收任务系统 - 分支名称模糊匹配
// ==========================================
// 背景: 各类记录中的分支命名不一致（如 "Entrepôt Sousse" 与 "Sousse"）
// 规则: 大小写不敏感的相等 / 包含判断，集中在此处便于测试
// ==========================================

/// 大小写不敏感相等
pub fn same_agency(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// `candidate` 是否包含 `needle`（大小写不敏感）
///
/// 空 `needle` 恒为 true（与子串语义一致）
pub fn agency_contains(candidate: &str, needle: &str) -> bool {
    candidate.to_lowercase().contains(&needle.to_lowercase())
}

/// 相等或包含: 请求分支与司机分支的模糊匹配
pub fn agency_matches_fuzzy(request_agency: &str, driver_agency: &str) -> bool {
    same_agency(request_agency, driver_agency) || agency_contains(request_agency, driver_agency)
}

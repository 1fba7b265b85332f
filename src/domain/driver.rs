// ==========================================
// 揽收任务系统 - 司机领域模型
// ==========================================
// 说明: 司机数据来自外部，引擎视为只读
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Driver - 司机
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub id: i64,
    pub name: String,
    pub agency: Option<String>,      // 所属分支
    pub governorate: Option<String>, // 省份（agency 缺失时的回退字段）
    pub car_number: Option<String>,  // 车牌号
}

impl Driver {
    /// 有效分支: agency 优先，缺失时回退到 governorate
    pub fn agency(&self) -> &str {
        self.agency
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .or(self.governorate.as_deref())
            .unwrap_or("")
    }
}

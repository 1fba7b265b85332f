// ==========================================
// 揽收任务系统 - 任务清单导出（CSV）
// ==========================================
// 一行一个包裹: 任务号, 任务状态, 司机, 运单号, 收件信息, 包裹状态
// ==========================================

use crate::domain::Mission;
use crate::repository::error::{RepositoryError, RepositoryResult};
use std::io::Write;

pub const MANIFEST_HEADERS: [&str; 6] = [
    "mission_number",
    "mission_status",
    "driver",
    "tracking_number",
    "recipient",
    "parcel_status",
];

/// 将任务清单写入任意 Writer
pub fn write_manifest<W: Write>(mission: &Mission, writer: W) -> RepositoryResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(MANIFEST_HEADERS).map_err(csv_error)?;

    for parcel in &mission.parcels {
        csv_writer
            .write_record([
                mission.mission_number.as_str(),
                mission.status.label(),
                mission.driver_name(),
                parcel.tracking_number.as_str(),
                parcel.recipient_label(),
                parcel.status.label(),
            ])
            .map_err(csv_error)?;
    }

    csv_writer
        .flush()
        .map_err(|e| RepositoryError::InternalError(format!("清单写出失败: {}", e)))?;
    Ok(())
}

/// 导出为字符串
pub fn export_manifest(mission: &Mission) -> RepositoryResult<String> {
    let mut buffer = Vec::new();
    write_manifest(mission, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| RepositoryError::InternalError(format!("清单编码失败: {}", e)))
}

fn csv_error(e: csv::Error) -> RepositoryError {
    RepositoryError::InternalError(format!("CSV 写入失败: {}", e))
}

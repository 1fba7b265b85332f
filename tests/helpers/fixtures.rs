// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

#![allow(dead_code)]

use chrono::Utc;
use pickup_missions::domain::{
    AcceptedRequest, Actor, Driver, Mission, MissionStatus, Parcel, ParcelStatus, Role,
};

// ==========================================
// Driver 构建器
// ==========================================

pub struct DriverBuilder {
    driver: Driver,
}

impl DriverBuilder {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            driver: Driver {
                id,
                name: name.to_string(),
                agency: None,
                governorate: None,
                car_number: None,
            },
        }
    }

    pub fn agency(mut self, agency: &str) -> Self {
        self.driver.agency = Some(agency.to_string());
        self
    }

    pub fn governorate(mut self, governorate: &str) -> Self {
        self.driver.governorate = Some(governorate.to_string());
        self
    }

    pub fn car(mut self, car_number: &str) -> Self {
        self.driver.car_number = Some(car_number.to_string());
        self
    }

    pub fn build(self) -> Driver {
        self.driver
    }
}

pub fn driver(id: i64, name: &str, agency: &str) -> Driver {
    DriverBuilder::new(id, name).agency(agency).build()
}

// ==========================================
// Parcel / Request
// ==========================================

pub fn parcel(id: i64, tracking: &str) -> Parcel {
    Parcel {
        id,
        tracking_number: tracking.to_string(),
        recipient_name: Some(format!("Client {}", id)),
        destination: Some("Tunis".to_string()),
        status: ParcelStatus::ToPickup,
    }
}

pub fn request(id: i64, agency: &str, parcels: Vec<Parcel>) -> AcceptedRequest {
    AcceptedRequest {
        id,
        sender_name: Some(format!("Expéditeur {}", id)),
        sender_agency: Some(agency.to_string()),
        parcel_count: parcels.len() as u32,
        parcels,
    }
}

// ==========================================
// Actor
// ==========================================

pub fn admin() -> Actor {
    Actor::new(Role::Admin, "Tunis").with_name("Salma Admin")
}

pub fn chief(agency: &str) -> Actor {
    Actor::new(Role::AgencyChief, agency).with_name("Amira")
}

pub fn member(agency: &str) -> Actor {
    Actor::new(Role::AgencyMember, agency).with_name("Youssef")
}

// ==========================================
// Mission
// ==========================================

pub fn mission(id: i64, status: MissionStatus, parcels: Vec<Parcel>) -> Mission {
    Mission {
        id,
        mission_number: format!("MOCK-{:04}", id),
        status,
        driver_id: 1,
        driver: Some(driver(1, "Karim", "Sousse")),
        request_ids: vec![],
        parcels,
        scheduled_at: None,
        created_at: Utc::now(),
        security_code: None,
        completion_code: None,
        notes: None,
    }
}

/// 标准场景目录: Sousse/Tunis 两名司机，三个请求
pub fn standard_directory() -> (Vec<Driver>, Vec<AcceptedRequest>) {
    let drivers = vec![
        driver(1, "Karim", "Sousse"),
        driver(2, "Hedi", "Tunis"),
        DriverBuilder::new(3, "Nour").governorate("Sousse").build(),
    ];
    let requests = vec![
        request(10, "Sousse", vec![parcel(100, "A1"), parcel(101, "A2")]),
        request(20, "Tunis", vec![parcel(200, "B1")]),
        request(30, "Entrepôt Sousse", vec![parcel(300, "C1")]),
    ];
    (drivers, requests)
}

//! Shared fixtures for petcare-core integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use petcare_core::{
    Actor, BookingRequest, Config, DayOfWeek, MemoryStore, PetCare, ServiceType, SqliteStore,
    Store,
};
use tempfile::TempDir;

/// A service graph plus whatever must outlive it.
pub struct Fixture {
    pub app: PetCare,
    _dir: Option<TempDir>,
}

pub fn memory() -> Fixture {
    Fixture {
        app: PetCare::new(Arc::new(MemoryStore::new()), Config::default()),
        _dir: None,
    }
}

pub fn sqlite() -> Fixture {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(&dir.path().join("petcare.db")).unwrap();
    let store: Arc<dyn Store> = Arc::new(store);
    Fixture {
        app: PetCare::new(store, Config::default()),
        _dir: Some(dir),
    }
}

/// Both store backends, so each scenario runs against each.
pub fn backends() -> Vec<(&'static str, Fixture)> {
    vec![("memory", memory()), ("sqlite", sqlite())]
}

/// 2026-03-02 is a Monday.
pub fn monday(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
}

pub fn sitter() -> Actor {
    Actor::sitter("sam")
}

pub fn owner(id: &str) -> Actor {
    Actor::owner(id)
}

/// Sam works Mondays 09:00-17:00.
pub fn open_mondays(app: &PetCare) {
    app.availability()
        .set_weekly_rule(
            &sitter(),
            "sam",
            DayOfWeek::Monday,
            "09:00-17:00".parse().unwrap(),
            true,
        )
        .unwrap();
}

pub fn walk(start: DateTime<Utc>, end: DateTime<Utc>) -> BookingRequest {
    BookingRequest {
        sitter_id: "sam".into(),
        pet_id: "rex".into(),
        service_type: ServiceType::Walking,
        start_date: start,
        end_date: end,
        price: 25.0,
        notes: None,
    }
}

use serde::Deserialize;
use time::OffsetDateTime;

use super::repo::EventType;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub event_date: OffsetDateTime,
    pub event_time: String,
    #[serde(default = "default_type")]
    pub event_type: EventType,
    pub speaker: String,
    #[serde(default)]
    pub registration_link: String,
    #[serde(default = "default_seats")]
    pub seats_available: i32,
}

fn default_type() -> EventType {
    EventType::Webinar
}

fn default_seats() -> i32 {
    100
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub event_date: Option<OffsetDateTime>,
    pub event_time: Option<String>,
    pub event_type: Option<EventType>,
    pub speaker: Option<String>,
    pub registration_link: Option<String>,
    pub seats_available: Option<i32>,
    pub is_active: Option<bool>,
}

use serde::Deserialize;

use super::repo::{CourseModule, ExperienceLevel};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    pub title: String,
    pub category: String,
    #[serde(default = "default_level")]
    pub experience_level: ExperienceLevel,
    pub short_description: String,
    pub long_description: String,
    #[serde(default)]
    pub curriculum: Vec<CourseModule>,
    pub price: f64,
    pub instructor: String,
}

fn default_level() -> ExperienceLevel {
    ExperienceLevel::Beginner
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub category: Option<String>,
    pub experience_level: Option<ExperienceLevel>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub curriculum: Option<Vec<CourseModule>>,
    pub price: Option<f64>,
    pub instructor: Option<String>,
    pub is_active: Option<bool>,
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

use crate::models::tag::Tag;

pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";

/// A project as shown in listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectSummary {
    pub id: i64,
    pub user: i64,
    pub name: String,
    pub pattern: Option<i64>,
    pub status: String,
    pub time_spent: Option<f64>,
}

/// Full project record.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectDetail {
    pub id: i64,
    pub user: i64,
    pub name: String,
    pub description: Option<String>,
    pub pattern: Option<i64>,
    pub hook_or_needle_size: Option<String>,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Hours spent on the project.
    pub time_spent: Option<f64>,
    pub yarn_types: Json<Vec<Tag>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    pub pattern: Option<i64>,
    #[serde(default)]
    pub yarn_types: Vec<i64>,
    #[validate(length(max = 50))]
    pub hook_or_needle_size: Option<String>,
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub pattern: Option<i64>,
    pub yarn_types: Option<Vec<i64>>,
    #[validate(length(max = 50))]
    pub hook_or_needle_size: Option<String>,
    #[validate(custom(function = validate_status))]
    pub status: Option<String>,
    pub end_date: Option<NaiveDate>,
    #[validate(range(min = 0.0, max = 9999.9))]
    pub time_spent: Option<f64>,
}

impl UpdateProjectRequest {
    /// Marking a project completed without an end date closes it today.
    pub fn fill_end_date(&mut self, today: NaiveDate) {
        if self.status.as_deref() == Some(STATUS_COMPLETED) && self.end_date.is_none() {
            self.end_date = Some(today);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.pattern.is_none()
            && self.yarn_types.is_none()
            && self.hook_or_needle_size.is_none()
            && self.status.is_none()
            && self.end_date.is_none()
            && self.time_spent.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct ProjectListParams {
    pub search: Option<String>,
    pub pattern_id: Option<i64>,
    pub user_id: Option<i64>,
    pub yarn_type: Option<i64>,
    pub status: Option<String>,
    /// Upper bound on hours spent.
    pub time_spent: Option<f64>,
}

fn validate_status(status: &str) -> Result<(), validator::ValidationError> {
    if status != STATUS_IN_PROGRESS && status != STATUS_COMPLETED {
        return Err(validator::ValidationError::new("invalid_status"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn completing_without_end_date_uses_today() {
        let mut req = UpdateProjectRequest {
            status: Some(STATUS_COMPLETED.to_string()),
            ..Default::default()
        };
        req.fill_end_date(day(2025, 3, 14));
        assert_eq!(req.end_date, Some(day(2025, 3, 14)));
    }

    #[test]
    fn explicit_end_date_is_kept() {
        let mut req = UpdateProjectRequest {
            status: Some(STATUS_COMPLETED.to_string()),
            end_date: Some(day(2025, 1, 1)),
            ..Default::default()
        };
        req.fill_end_date(day(2025, 3, 14));
        assert_eq!(req.end_date, Some(day(2025, 1, 1)));
    }

    #[test]
    fn in_progress_leaves_end_date_empty() {
        let mut req = UpdateProjectRequest {
            status: Some(STATUS_IN_PROGRESS.to_string()),
            ..Default::default()
        };
        req.fill_end_date(day(2025, 3, 14));
        assert_eq!(req.end_date, None);
        assert!(!req.is_empty());
        assert!(UpdateProjectRequest::default().is_empty());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let req = UpdateProjectRequest {
            status: Some("abandoned".to_string()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }
}

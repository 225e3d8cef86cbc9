//! Bot user models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Gender as reported by the VK `sex` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[default]
    Unknown,
    Female,
    Male,
}

impl Gender {
    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => Gender::Female,
            2 => Gender::Male,
            _ => Gender::Unknown,
        }
    }
}

/// A person who has written to the bot.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub vk_id: i64,
    pub first_name: String,
    pub last_name: String,

    /// 0 unknown, 1 female, 2 male; NULL when VK did not report it
    pub gender: Option<i64>,

    pub registration_date: DateTime<Utc>,
    pub is_blocked: bool,
}

impl User {
    /// Get the typed gender
    pub fn gender(&self) -> Gender {
        self.gender.map(Gender::from_i64).unwrap_or_default()
    }

    pub fn is_female(&self) -> bool {
        self.gender() == Gender::Female
    }

    pub fn is_male(&self) -> bool {
        self.gender() == Gender::Male
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Filters for listing users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub gender: Option<i64>,
    pub is_blocked: Option<bool>,
}

/// Aggregated user counters for the stats command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct UserStats {
    pub total: i64,
    pub blocked: i64,
    pub male: i64,
    pub female: i64,
}

impl UserStats {
    pub fn active(&self) -> i64 {
        self.total - self.blocked
    }

    pub fn unknown_gender(&self) -> i64 {
        self.total - self.male - self.female
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(gender: Option<i64>) -> User {
        User {
            id: 1,
            vk_id: 100,
            first_name: "Иван".to_string(),
            last_name: "Петров".to_string(),
            gender,
            registration_date: Utc::now(),
            is_blocked: false,
        }
    }

    #[test]
    fn test_gender_mapping() {
        assert!(user(Some(1)).is_female());
        assert!(user(Some(2)).is_male());
        assert_eq!(user(Some(0)).gender(), Gender::Unknown);
        assert_eq!(user(None).gender(), Gender::Unknown);
        assert_eq!(user(Some(7)).gender(), Gender::Unknown);
    }

    #[test]
    fn test_full_name() {
        assert_eq!(user(None).full_name(), "Иван Петров");
    }

    #[test]
    fn test_stats_derived_counts() {
        let stats = UserStats {
            total: 10,
            blocked: 3,
            male: 4,
            female: 5,
        };
        assert_eq!(stats.active(), 7);
        assert_eq!(stats.unknown_gender(), 1);
    }
}

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to find a chat partner
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequestMatchBody {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub preferences: PreferencesBody,
    #[serde(default)]
    #[serde(alias = "user_gender", rename = "userGender")]
    pub user_gender: Option<String>,
}

fn default_mode() -> String {
    "text".to_string()
}

/// Wire form of the matching preferences. Values are plain strings here and
/// parsed into the typed enums at the boundary, so unknown values surface as
/// explicit errors instead of deserialization failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesBody {
    #[serde(default = "default_gender_preference")]
    #[serde(alias = "gender_preference", rename = "genderPreference")]
    pub gender_preference: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    #[serde(alias = "age_range", rename = "ageRange")]
    pub age_range: Option<[u8; 2]>,
}

fn default_gender_preference() -> String {
    "any".to_string()
}

impl Default for PreferencesBody {
    fn default() -> Self {
        Self {
            gender_preference: default_gender_preference(),
            language: None,
            interests: Vec::new(),
            age_range: None,
        }
    }
}

/// Request to withdraw a pending match request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CancelMatchBody {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[serde(default = "default_mode")]
    pub mode: String,
}

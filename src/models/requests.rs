use crate::models::SwipeDirection;
use crate::services::DeviceReport;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to start a swipe session
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartSessionRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub device: Option<DeviceReport>,
}

/// Request to record a swipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecideRequest {
    pub direction: SwipeDirection,
}

/// Request sent when the swipe view comes back into focus
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeRequest {
    #[serde(default)]
    pub device: Option<DeviceReport>,
}

/// Request to switch to the device location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceLocationRequest {
    pub device: DeviceReport,
}

/// Request to switch to a custom location.
///
/// With `placeId` the picked city is looked up and saved; without it the
/// preference is simply toggled.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CustomLocationRequest {
    #[validate(length(min = 1))]
    #[serde(default, rename = "placeId")]
    pub place_id: Option<String>,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub description: Option<String>,
}

/// Query for city autocomplete
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AutocompleteQuery {
    #[validate(length(min = 1, max = 100))]
    pub input: String,
}

/// Query for the photo proxy
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PhotoQuery {
    #[validate(range(min = 1, max = 1600))]
    #[serde(default, rename = "maxwidth")]
    pub max_width: Option<u32>,
}

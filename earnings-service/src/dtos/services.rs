use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::ServiceChanges;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListServicesQuery {
    /// Include deactivated services
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateServiceRequest {
    #[validate(length(min = 1, max = 200, message = "Service name is required"))]
    #[schema(example = "Women's haircut")]
    pub service_name: String,

    pub description: Option<String>,

    #[schema(value_type = String, example = "45.00")]
    pub price: Decimal,

    #[validate(range(min = 1, message = "Duration must be positive"))]
    #[schema(example = 45)]
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateServiceRequest {
    #[validate(length(min = 1, max = 200, message = "Service name must not be empty"))]
    pub service_name: Option<String>,

    pub description: Option<String>,

    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,

    #[validate(range(min = 1, message = "Duration must be positive"))]
    pub duration_minutes: Option<i32>,

    pub is_active: Option<bool>,
}

impl From<UpdateServiceRequest> for ServiceChanges {
    fn from(req: UpdateServiceRequest) -> Self {
        Self {
            service_name: req.service_name.map(|n| n.trim().to_string()),
            description: req.description,
            price: req.price,
            duration_minutes: req.duration_minutes,
            is_active: req.is_active,
        }
    }
}

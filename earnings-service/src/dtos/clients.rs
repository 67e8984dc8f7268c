use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::ClientFilter;
use crate::services::ClientFields;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListClientsQuery {
    /// Matches name, phone or e-mail
    pub search: Option<String>,
    /// Only clients seen in the last 30 days
    pub recent_only: Option<bool>,
}

impl From<ListClientsQuery> for ClientFilter {
    fn from(q: ListClientsQuery) -> Self {
        Self {
            search: q.search,
            recent_only: q.recent_only.unwrap_or(false),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 200, message = "Client name is required"))]
    #[schema(example = "Maria Rossi")]
    pub client_name: String,

    #[validate(length(max = 50))]
    pub phone: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 200, message = "Client name must not be empty"))]
    pub client_name: Option<String>,

    #[validate(length(max = 50))]
    pub phone: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub notes: Option<String>,
}

impl CreateClientRequest {
    pub fn fields(&self) -> ClientFields<'_> {
        ClientFields {
            client_name: Some(self.client_name.trim()),
            phone: self.phone.as_deref(),
            email: self.email.as_deref(),
            notes: self.notes.as_deref(),
        }
    }
}

impl UpdateClientRequest {
    pub fn fields(&self) -> ClientFields<'_> {
        ClientFields {
            client_name: self.client_name.as_deref().map(str::trim),
            phone: self.phone.as_deref(),
            email: self.email.as_deref(),
            notes: self.notes.as_deref(),
        }
    }
}

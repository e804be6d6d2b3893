//! Type definitions for GraphQL API responses

use serde::{Deserialize, Serialize};

// ============================================================================
// User Types
// ============================================================================

/// The authenticated user as selected by `AppUserQuery`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl User {
    /// Name to show in the UI, falling back to email, then id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Fields of `HeaderRightWidget_user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderUser {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

// ============================================================================
// Query Responses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppUserQueryResponse {
    pub me: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeaderQueryResponse {
    pub me: Option<HeaderUser>,
}

//! User descriptors embedded in meet requests.

use serde::{Deserialize, Serialize};

use super::ids::ResourceId;

/// Role of a user in the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Penitent,
    Priest,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Penitent => "penitent",
            UserRole::Priest => "priest",
            UserRole::Admin => "admin",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "penitent" => Ok(UserRole::Penitent),
            "priest" => Ok(UserRole::Priest),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown user role: {other}")),
        }
    }
}

/// Public information about a user, as embedded in other resources.
///
/// The server only guarantees the id; names are omitted for the
/// current user's own side of a meet request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: ResourceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
}

impl UserInfo {
    pub fn new(id: ResourceId, name: impl Into<String>, surname: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            surname: Some(surname.into()),
        }
    }

    /// A user known only by id.
    pub fn anonymous(id: ResourceId) -> Self {
        Self {
            id,
            name: None,
            surname: None,
        }
    }

    pub fn display_name(&self) -> String {
        match (&self.name, &self.surname) {
            (Some(name), Some(surname)) => format!("{name} {surname}"),
            (Some(name), None) => name.clone(),
            _ => format!("User_{}", self.id),
        }
    }
}

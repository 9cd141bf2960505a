use serde::{Deserialize, Serialize};

use super::ids::ResourceId;

/// Pushed to a priest an hour before one of their recurrences starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriestAvailabilityNotification {
    /// Recurrence starting in one hour.
    pub recurrence_id: ResourceId,
    /// Name of the spot the recurrence belongs to.
    pub spot_name: String,
    /// Has the priest confirmed their availability?
    #[serde(default)]
    pub confirmed: bool,
}

impl PriestAvailabilityNotification {
    pub fn new(recurrence_id: ResourceId, spot_name: impl Into<String>) -> Self {
        Self {
            recurrence_id,
            spot_name: spot_name.into(),
            confirmed: false,
        }
    }
}

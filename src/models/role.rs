//! User roles and what each one may do.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    StationManager,
    Staff,
    Public,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::StationManager => "station_manager",
            Role::Staff => "staff",
            Role::Public => "public",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "super_admin" => Some(Role::SuperAdmin),
            "station_manager" => Some(Role::StationManager),
            "staff" => Some(Role::Staff),
            "public" => Some(Role::Public),
            _ => None,
        }
    }

    /// Roles that work at a station and therefore need one assigned.
    pub fn is_station_bound(&self) -> bool {
        matches!(self, Role::StationManager | Role::Staff)
    }
}

/// Role sets accepted by the route handlers.
pub mod access {
    use super::Role;

    pub const ADMIN: &[Role] = &[Role::SuperAdmin];
    pub const MANAGERS: &[Role] = &[Role::SuperAdmin, Role::StationManager];
    pub const OPERATORS: &[Role] = &[Role::SuperAdmin, Role::StationManager, Role::Staff];
    pub const ANYONE: &[Role] = &[
        Role::SuperAdmin,
        Role::StationManager,
        Role::Staff,
        Role::Public,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_storage_form() {
        for role in access::ANYONE {
            assert_eq!(Role::from_str(role.as_str()), Some(*role));
        }
        assert_eq!(Role::from_str("admin"), None);
    }

    #[test]
    fn test_wire_form_matches_storage_form() {
        let json = serde_json::to_string(&Role::StationManager).unwrap();
        assert_eq!(json, "\"station_manager\"");
    }
}

//! Keyword-based column role inference.
//!
//! Transport exports name their columns in Swedish and not always the same
//! way, so roles are found by case-insensitive substring tests over the
//! header. Everything here is a pure function of the column list.

use std::fmt;

use serde::Serialize;

use crate::error::{EngineError, Result};

/// Preferred start column, checked before the heuristic.
pub const PREFERRED_START_COLUMN: &str = "Uppdrag Starttid";
/// Preferred end column, checked before the heuristic.
pub const PREFERRED_END_COLUMN: &str = "Uppdrag Sluttid";
/// Default transporter id column for this export family.
pub const DEFAULT_TRANSPORTER_COLUMN: &str = "Sekundär Servicepersonal Id";

/// Semantic role a column can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    StartTime,
    EndTime,
    TransporterId,
    Category,
    StartLocation,
    EndLocation,
    Priority,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::StartTime => "start time",
            Role::EndTime => "end time",
            Role::TransporterId => "transporter id",
            Role::Category => "transport type",
            Role::StartLocation => "start location",
            Role::EndLocation => "end location",
            Role::Priority => "priority",
        };
        f.write_str(name)
    }
}

fn is_start_time(lower: &str) -> bool {
    lower.contains("start") && lower.contains("tid") && !lower.contains("önskad")
}

fn is_end_time(lower: &str) -> bool {
    (lower.contains("slut") || lower.contains("stop")) && lower.contains("tid")
}

fn is_category(lower: &str) -> bool {
    lower.contains("transportmedel")
        || (lower.contains("transport") && lower.contains("typ"))
        || lower.contains("uppdragstyp")
}

fn is_start_location(lower: &str) -> bool {
    lower.contains("startplats") && !lower.contains("id")
}

fn is_end_location(lower: &str) -> bool {
    lower.contains("slutplats") && !lower.contains("id")
}

fn is_priority(lower: &str) -> bool {
    lower.contains("prioritet")
}

fn first_matching<'a>(columns: &'a [String], pred: fn(&str) -> bool) -> Option<&'a str> {
    columns
        .iter()
        .find(|c| pred(&c.to_lowercase()))
        .map(String::as_str)
}

fn exact<'a>(columns: &'a [String], name: &str) -> Option<&'a str> {
    columns.iter().find(|c| c.as_str() == name).map(String::as_str)
}

/// Finds the column for a heuristic role.
///
/// The preferred exact name wins when present, otherwise the first column in
/// header order that satisfies the role's keyword rule. `TransporterId` has no
/// heuristic and always yields `None` here; see [`RoleAssignment::infer`].
pub fn find_column(columns: &[String], role: Role) -> Option<&str> {
    match role {
        Role::StartTime => exact(columns, PREFERRED_START_COLUMN)
            .or_else(|| first_matching(columns, is_start_time)),
        Role::EndTime => {
            exact(columns, PREFERRED_END_COLUMN).or_else(|| first_matching(columns, is_end_time))
        }
        Role::TransporterId => None,
        Role::Category => first_matching(columns, is_category),
        Role::StartLocation => first_matching(columns, is_start_location),
        Role::EndLocation => first_matching(columns, is_end_location),
        Role::Priority => first_matching(columns, is_priority),
    }
}

/// Column chosen for every role, or `None` where nothing matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoleAssignment {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub transporter_id: Option<String>,
    pub category: Option<String>,
    pub start_location: Option<String>,
    pub end_location: Option<String>,
    pub priority: Option<String>,
}

impl RoleAssignment {
    /// Resolves all roles against a header. The transporter column is
    /// configuration: it is only assigned if present verbatim.
    pub fn infer(columns: &[String], transporter_column: &str) -> Self {
        let owned = |role| find_column(columns, role).map(str::to_string);
        Self {
            start_time: owned(Role::StartTime),
            end_time: owned(Role::EndTime),
            transporter_id: exact(columns, transporter_column).map(str::to_string),
            category: owned(Role::Category),
            start_location: owned(Role::StartLocation),
            end_location: owned(Role::EndLocation),
            priority: owned(Role::Priority),
        }
    }

    pub fn get(&self, role: Role) -> Option<&str> {
        let slot = match role {
            Role::StartTime => &self.start_time,
            Role::EndTime => &self.end_time,
            Role::TransporterId => &self.transporter_id,
            Role::Category => &self.category,
            Role::StartLocation => &self.start_location,
            Role::EndLocation => &self.end_location,
            Role::Priority => &self.priority,
        };
        slot.as_deref()
    }

    /// Like [`get`](Self::get) but fails with a schema error naming the role.
    pub fn require(&self, role: Role) -> Result<&str> {
        self.get(role).ok_or(EngineError::Schema { role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_preferred_time_columns_win() {
        let cols = header(&[
            "Beställning Starttid",
            "Uppdrag Starttid",
            "Beställning Sluttid",
            "Uppdrag Sluttid",
        ]);
        assert_eq!(find_column(&cols, Role::StartTime), Some("Uppdrag Starttid"));
        assert_eq!(find_column(&cols, Role::EndTime), Some("Uppdrag Sluttid"));
    }

    #[test]
    fn test_start_time_skips_requested_time() {
        let cols = header(&["Önskad Starttid", "Faktisk Starttid", "Stopptid"]);
        assert_eq!(find_column(&cols, Role::StartTime), Some("Faktisk Starttid"));
        assert_eq!(find_column(&cols, Role::EndTime), Some("Stopptid"));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let cols = header(&["START_TID", "SLUT_TID", "PRIORITET"]);
        assert_eq!(find_column(&cols, Role::StartTime), Some("START_TID"));
        assert_eq!(find_column(&cols, Role::EndTime), Some("SLUT_TID"));
        assert_eq!(find_column(&cols, Role::Priority), Some("PRIORITET"));
    }

    #[test]
    fn test_category_variants() {
        assert_eq!(
            find_column(&header(&["a", "Transportmedel"]), Role::Category),
            Some("Transportmedel")
        );
        assert_eq!(
            find_column(&header(&["Transport Typ"]), Role::Category),
            Some("Transport Typ")
        );
        assert_eq!(
            find_column(&header(&["Uppdragstyp"]), Role::Category),
            Some("Uppdragstyp")
        );
        assert_eq!(find_column(&header(&["Typ"]), Role::Category), None);
    }

    #[test]
    fn test_location_excludes_id_columns() {
        let cols = header(&["Startplats Id", "Startplats", "Slutplats Id", "Slutplats"]);
        assert_eq!(find_column(&cols, Role::StartLocation), Some("Startplats"));
        assert_eq!(find_column(&cols, Role::EndLocation), Some("Slutplats"));
    }

    #[test]
    fn test_transporter_is_exact_configuration() {
        let cols = header(&["Servicepersonal Id", "Uppdrag Starttid"]);
        let roles = RoleAssignment::infer(&cols, DEFAULT_TRANSPORTER_COLUMN);
        assert_eq!(roles.transporter_id, None);
        assert!(matches!(
            roles.require(Role::TransporterId),
            Err(EngineError::Schema {
                role: Role::TransporterId
            })
        ));

        let roles = RoleAssignment::infer(&cols, "Servicepersonal Id");
        assert_eq!(roles.require(Role::TransporterId).unwrap(), "Servicepersonal Id");
    }

    #[test]
    fn test_missing_roles_are_none() {
        let roles = RoleAssignment::infer(&header(&["a", "b", "c"]), DEFAULT_TRANSPORTER_COLUMN);
        assert_eq!(roles, RoleAssignment::default());
    }
}

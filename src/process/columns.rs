// src/process/columns.rs
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Semantic column roles the index builder understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Vin,
    Unit,
    Ds,
    Dsp,
    Plate,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Vin => "vin",
            Role::Unit => "unit",
            Role::Ds => "ds",
            Role::Dsp => "dsp",
            Role::Plate => "plate",
        }
    }

    /// Column used when no header matches. Plate has none.
    pub fn fallback_position(&self) -> Option<usize> {
        match self {
            Role::Vin => Some(0),
            Role::Unit => Some(1),
            Role::Ds => Some(2),
            Role::Dsp => Some(3),
            Role::Plate => None,
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            Role::Vin => &*VIN_RE,
            Role::Unit => &*UNIT_RE,
            Role::Ds => &*DS_RE,
            Role::Dsp => &*DSP_RE,
            Role::Plate => &*PLATE_RE,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Patterns run against lower-cased headers.
static VIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bvin\b").unwrap());
static UNIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"unit|asset|vehicle[_\s-]?number").unwrap());
static DS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bds\b").unwrap());
static DSP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"dsp").unwrap());
static PLATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"plate").unwrap());

/// Column position for each role, resolved once per dataset load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnRoles {
    pub vin: usize,
    pub unit: usize,
    pub ds: usize,
    pub dsp: usize,
    pub plate: Option<usize>,
}

impl ColumnRoles {
    pub fn position(&self, role: Role) -> Option<usize> {
        match role {
            Role::Vin => Some(self.vin),
            Role::Unit => Some(self.unit),
            Role::Ds => Some(self.ds),
            Role::Dsp => Some(self.dsp),
            Role::Plate => self.plate,
        }
    }
}

fn find_header(lowered: &[String], role: Role) -> Option<usize> {
    let re = role.pattern();
    lowered.iter().position(|h| re.is_match(h))
}

/// Map header names to roles. The first matching header wins; unmatched
/// roles fall back to a fixed position, except plate which stays absent.
pub fn resolve(headers: &[String]) -> ColumnRoles {
    let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    let pick = |role: Role| -> usize {
        find_header(&lowered, role).unwrap_or_else(|| {
            let pos = role.fallback_position().unwrap_or(0);
            debug!(role = %role, pos, "no matching header; using fallback position");
            pos
        })
    };

    ColumnRoles {
        vin: pick(Role::Vin),
        unit: pick(Role::Unit),
        ds: pick(Role::Ds),
        dsp: pick(Role::Dsp),
        plate: find_header(&lowered, Role::Plate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn minimal_shape_resolves_by_name() {
        let roles = resolve(&headers(&["VIN", "Unit", "DS", "DSP"]));
        assert_eq!(
            roles,
            ColumnRoles {
                vin: 0,
                unit: 1,
                ds: 2,
                dsp: 3,
                plate: None
            }
        );
    }

    #[test]
    fn reordered_headers_with_plate() {
        let roles = resolve(&headers(&[
            "License Plate",
            "DSP Name",
            "Asset #",
            "Full VIN",
            "DS",
        ]));
        assert_eq!(roles.plate, Some(0));
        assert_eq!(roles.dsp, 1);
        assert_eq!(roles.unit, 2);
        assert_eq!(roles.vin, 3);
        assert_eq!(roles.ds, 4);
    }

    #[test]
    fn word_boundary_roles_do_not_match_inside_words() {
        // "vinyl" must not be the vin column, "dsp" must not be the ds column.
        let roles = resolve(&headers(&["vinyl", "dsp", "x", "y"]));
        assert_eq!(roles.vin, 0); // positional fallback
        assert_eq!(roles.ds, 2); // positional fallback
        assert_eq!(roles.dsp, 1);
    }

    #[test]
    fn vehicle_number_family() {
        for h in ["vehicle number", "Vehicle_Number", "vehicle-number", "vehiclenumber"] {
            let roles = resolve(&headers(&["vin", h]));
            assert_eq!(roles.unit, 1, "header {h}");
        }
        let roles = resolve(&headers(&["Vehicle Number", "VIN"]));
        assert_eq!(roles.unit, 0);
        assert_eq!(roles.vin, 1);
    }

    #[test]
    fn first_matching_header_wins() {
        let roles = resolve(&headers(&["vin", "unit a", "unit b"]));
        assert_eq!(roles.unit, 1);
    }

    #[test]
    fn fallback_positions_without_matches() {
        let roles = resolve(&headers(&["a", "b", "c", "d", "e"]));
        assert_eq!(
            roles,
            ColumnRoles {
                vin: 0,
                unit: 1,
                ds: 2,
                dsp: 3,
                plate: None
            }
        );
        assert_eq!(resolve(&[]).position(Role::Plate), None);
    }

    #[test]
    fn resolution_is_deterministic() {
        let h = headers(&["Plate", "VIN", "Unit"]);
        assert_eq!(resolve(&h), resolve(&h));
    }
}

// ---------------------------------------------------------------------------
// FacadeError: fatal spec errors and recovered geometry diagnostics
// ---------------------------------------------------------------------------

use std::fmt;

use serde::Serialize;

use crate::spec::BayAddress;

/// Everything that can go wrong while compiling a building.
///
/// `InvalidSpec` is fatal and returned from the compiler before any geometry
/// is built. The other variants are recovered per element and collected in
/// the compile report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FacadeError {
    /// Malformed reference or value, with a JSON-path into the building spec.
    InvalidSpec { path: String, reason: String },
    /// A window, spacer, belt, or roof element could not be placed.
    UnfittableGeometry { location: String, reason: String },
    /// A bay link walk revisited a bay.
    CyclicBayLink {
        bay: BayAddress,
        cycle: Vec<BayAddress>,
    },
    /// A merged span came out shorter than the minimum span length.
    DegenerateFace { face: usize, length: f32 },
}

impl FacadeError {
    pub fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        FacadeError::InvalidSpec {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn unfittable(location: impl Into<String>, reason: impl Into<String>) -> Self {
        FacadeError::UnfittableGeometry {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Fatal errors abort the whole compile.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FacadeError::InvalidSpec { .. })
    }
}

impl fmt::Display for FacadeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacadeError::InvalidSpec { path, reason } => {
                write!(f, "Invalid spec at {path}: {reason}")
            }
            FacadeError::UnfittableGeometry { location, reason } => {
                write!(f, "Unfittable geometry at {location}: {reason}")
            }
            FacadeError::CyclicBayLink { bay, cycle } => {
                let path: Vec<String> = cycle.iter().map(|b| b.to_string()).collect();
                write!(f, "Cyclic bay link from {bay}: {}", path.join(" -> "))
            }
            FacadeError::DegenerateFace { face, length } => {
                write!(f, "Degenerate span on face {face}: length {length:.4}")
            }
        }
    }
}

impl std::error::Error for FacadeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_spec_display_has_path() {
        let err = FacadeError::invalid("floors[2].layers[0].material", "unknown material 'x'");
        let msg = format!("{err}");
        assert!(msg.contains("floors[2].layers[0].material"), "got: {msg}");
        assert!(msg.contains("unknown material"), "got: {msg}");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_cycle_display_lists_path() {
        let a = BayAddress::new(0, 0, 0);
        let b = BayAddress::new(0, 0, 1);
        let err = FacadeError::CyclicBayLink {
            bay: a,
            cycle: vec![a, b, a],
        };
        let msg = format!("{err}");
        assert!(msg.contains("->"), "got: {msg}");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_recovered_kinds_are_not_fatal() {
        assert!(!FacadeError::unfittable("face 0", "too wide").is_fatal());
        assert!(!FacadeError::DegenerateFace {
            face: 1,
            length: 0.0
        }
        .is_fatal());
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let err = FacadeError::DegenerateFace {
            face: 3,
            length: 0.01,
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"kind\":\"degenerate_face\""), "got: {json}");
    }
}

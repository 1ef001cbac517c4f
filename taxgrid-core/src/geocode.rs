//! 12-character jurisdiction geocodes.
//!
//! Layout: 2-letter country, 2-digit state, then a district suffix.
//! State-level geocodes zero-fill the suffix (`US1700000000`).

pub const GEOCODE_LEN: usize = 12;
const STATE_PREFIX_LEN: usize = 4;
const STATE_SUFFIX: &str = "00000000";

/// Derive the state-level parent of a geocode.
///
/// `US08013A0025` -> `US0800000000`. Short inputs are zero-padded, so a state
/// geocode is its own parent.
pub fn parent_geocode(geocode: &str) -> String {
    let normalized = geocode.trim().to_uppercase();
    let prefix: String = normalized.chars().take(STATE_PREFIX_LEN).collect();
    format!("{:0<width$}", prefix, width = GEOCODE_LEN)
}

pub fn is_state_geocode(geocode: &str) -> bool {
    geocode.trim().ends_with(STATE_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_geocode_for_cities() {
        assert_eq!(parent_geocode("US08013A0025"), "US0800000000");
        assert_eq!(parent_geocode("US17031A0003"), "US1700000000");
        assert_eq!(parent_geocode("US22033A0009"), "US2200000000");
    }

    #[test]
    fn test_parent_geocode_for_states_is_identity() {
        assert_eq!(parent_geocode("US0800000000"), "US0800000000");
        assert_eq!(parent_geocode("US1700000000"), "US1700000000");
    }

    #[test]
    fn test_parent_geocode_short_inputs() {
        assert_eq!(parent_geocode("US08"), "US0800000000");
        assert_eq!(parent_geocode("AB"), "AB0000000000");
        assert_eq!(parent_geocode(" us08013a0025 "), "US0800000000");
    }

    #[test]
    fn test_is_state_geocode() {
        assert!(is_state_geocode("US1700000000"));
        assert!(!is_state_geocode("US17031A0003"));
    }
}

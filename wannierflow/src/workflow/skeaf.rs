//! Defaults of the SKEAF step and the electron count it needs.

use crate::config::Protocol;
use crate::core::Outputs;
use serde_json::{json, Value};

/// SKEAF parameters for a protocol, before user overrides.
#[must_use]
pub fn protocol_parameters(protocol: Protocol) -> Outputs {
    let num_interpolation = match protocol {
        Protocol::Fast => 50,
        Protocol::Moderate => 100,
        Protocol::Precise => 150,
    };

    let value = json!({
        "num_interpolation": num_interpolation,
        "starting_phi": 0.0,
        "starting_theta": 0.0,
        "ending_phi": 90.0,
        "ending_theta": 90.0,
        "num_rotation": 90,
        "min_extremal_frequency": 0.0001,
        "max_orbit_frequency_diff": 0.01,
        "max_orbit_coordinate_diff": 0.05,
        "near_wall_orbit": false,
    });
    match value {
        Value::Object(map) => map,
        _ => Outputs::new(),
    }
}

/// Overlays user parameters on the protocol defaults.
#[must_use]
pub fn overlay(mut defaults: Outputs, user: Option<&Value>) -> Outputs {
    if let Some(Value::Object(user)) = user {
        for (key, value) in user {
            defaults.insert(key.clone(), value.clone());
        }
    }
    defaults
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_defaults() {
        let fast = protocol_parameters(Protocol::Fast);
        let precise = protocol_parameters(Protocol::Precise);
        assert_eq!(fast["num_interpolation"], json!(50));
        assert_eq!(precise["num_interpolation"], json!(150));
        assert_eq!(fast["num_rotation"], json!(90));
    }

    #[test]
    fn test_overlay_replaces_only_given_keys() {
        let user = json!({"starting_phi": 10.0, "num_rotation": 30});
        let merged = overlay(protocol_parameters(Protocol::Moderate), Some(&user));
        assert_eq!(merged["starting_phi"], json!(10.0));
        assert_eq!(merged["num_rotation"], json!(30));
        assert_eq!(merged["ending_theta"], json!(90.0));

        let untouched = overlay(protocol_parameters(Protocol::Moderate), None);
        assert_eq!(untouched, protocol_parameters(Protocol::Moderate));
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LendingError;

/// One of the fixed pickup/drop-off points.
///
/// Both borrow and return locations come from this set; anything else is
/// rejected as invalid input before a write happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    Gym,
    Dome,
    Cafeteria,
}

impl Location {
    pub const ALL: [Location; 3] = [Location::Gym, Location::Dome, Location::Cafeteria];

    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Gym => "Gym",
            Location::Dome => "Dome",
            Location::Cafeteria => "Cafeteria",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = LendingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Gym" => Ok(Location::Gym),
            "Dome" => Ok(Location::Dome),
            "Cafeteria" => Ok(Location::Cafeteria),
            other => Err(LendingError::invalid(format!(
                "unknown location {other:?} (expected one of Gym, Dome, Cafeteria)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_location() {
        for loc in Location::ALL {
            assert_eq!(loc.as_str().parse::<Location>().unwrap(), loc);
        }
    }

    #[test]
    fn unknown_location_is_invalid_input() {
        let err = "Rooftop".parse::<Location>().unwrap_err();
        assert!(matches!(err, LendingError::InvalidInput(_)));
    }

    #[test]
    fn serializes_as_display_name() {
        let json = serde_json::to_string(&Location::Cafeteria).unwrap();
        assert_eq!(json, "\"Cafeteria\"");
    }
}

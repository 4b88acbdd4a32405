use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ItemNumber, Location};

/// Actor name recorded on a return when the item had no borrower on record.
///
/// The invariants make this unreachable in practice; it exists so a damaged
/// record still produces a well-formed activity entry.
pub const UNKNOWN_ACTOR: &str = "unknown";

/// Which of the two transitions an activity records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Borrow,
    Return,
}

/// One immutable entry in the activity log.
///
/// The id is assigned by the backend and is opaque to callers; it sorts
/// lexicographically in insertion order, which is what breaks timestamp ties
/// when listing recent activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub item_number: ItemNumber,
    pub actor_name: String,
    pub location: Location,
    pub timestamp: DateTime<Utc>,
}

/// Payload for appending a new activity entry; the backend assigns the id
/// and the timestamp.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub kind: ActivityKind,
    pub item_number: ItemNumber,
    pub actor_name: String,
    pub location: Location,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_matches_persisted_format() {
        let activity = Activity {
            id: "000000000042".into(),
            kind: ActivityKind::Borrow,
            item_number: 2,
            actor_name: "Nan".into(),
            location: Location::Cafeteria,
            timestamp: "2024-05-01T09:30:00Z".parse().unwrap(),
        };
        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["type"], "borrow");
        assert_eq!(json["itemNumber"], 2);
        assert_eq!(json["actorName"], "Nan");
        assert_eq!(json["location"], "Cafeteria");
        assert_eq!(json["timestamp"], "2024-05-01T09:30:00Z");
    }
}

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A logical broadcast channel: either a technician's direct-message inbox
/// or a named group. Rooms are derived from the directory, never stored.
///
/// Wire form is `direct:{technician_id}` / `group:{group_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    Direct(i64),
    Group(i64),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Direct(id) => write!(f, "direct:{id}"),
            Room::Group(id) => write!(f, "group:{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomParseError(String);

impl fmt::Display for RoomParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid room key: {}", self.0)
    }
}

impl std::error::Error for RoomParseError {}

impl FromStr for Room {
    type Err = RoomParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s.split_once(':').ok_or_else(|| RoomParseError(s.to_string()))?;
        let id: i64 = id.parse().map_err(|_| RoomParseError(s.to_string()))?;
        match kind {
            "direct" => Ok(Room::Direct(id)),
            "group" => Ok(Room::Group(id)),
            _ => Err(RoomParseError(s.to_string())),
        }
    }
}

impl Serialize for Room {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Room {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wire_form() {
        assert_eq!(Room::Direct(5).to_string(), "direct:5");
        assert_eq!(Room::Group(12).to_string(), "group:12");
        assert_eq!("direct:5".parse::<Room>().unwrap(), Room::Direct(5));
        assert_eq!("group:12".parse::<Room>().unwrap(), Room::Group(12));
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!("direct".parse::<Room>().is_err());
        assert!("direct:abc".parse::<Room>().is_err());
        assert!("voice:3".parse::<Room>().is_err());
        assert!("".parse::<Room>().is_err());
    }

    #[test]
    fn serde_uses_the_string_form() {
        let json = serde_json::to_string(&Room::Group(7)).unwrap();
        assert_eq!(json, "\"group:7\"");
        let room: Room = serde_json::from_str("\"direct:3\"").unwrap();
        assert_eq!(room, Room::Direct(3));
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// ABO/Rh blood type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BloodType {
    ONeg,
    OPos,
    ANeg,
    APos,
    BNeg,
    BPos,
    AbNeg,
    AbPos,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown blood type: {0:?}")]
pub struct UnknownBloodType(pub String);

impl BloodType {
    pub const ALL: [BloodType; 8] = [
        BloodType::ONeg,
        BloodType::OPos,
        BloodType::ANeg,
        BloodType::APos,
        BloodType::BNeg,
        BloodType::BPos,
        BloodType::AbNeg,
        BloodType::AbPos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ONeg => "O-",
            Self::OPos => "O+",
            Self::ANeg => "A-",
            Self::APos => "A+",
            Self::BNeg => "B-",
            Self::BPos => "B+",
            Self::AbNeg => "AB-",
            Self::AbPos => "AB+",
        }
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodType {
    type Err = UnknownBloodType;

    /// Accepts "ab+", " O- " and the typographic minus sign ("O−").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == '\u{2212}' { '-' } else { c })
            .collect::<String>()
            .to_ascii_uppercase();

        BloodType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| UnknownBloodType(s.to_string()))
    }
}

impl Serialize for BloodType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BloodType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loose_spellings() {
        assert_eq!("ab+".parse::<BloodType>().unwrap(), BloodType::AbPos);
        assert_eq!(" O- ".parse::<BloodType>().unwrap(), BloodType::ONeg);
        assert_eq!("O\u{2212}".parse::<BloodType>().unwrap(), BloodType::ONeg);
        assert!("C+".parse::<BloodType>().is_err());
        assert!("".parse::<BloodType>().is_err());
    }

    #[test]
    fn display_matches_parse() {
        for t in BloodType::ALL {
            assert_eq!(t.to_string().parse::<BloodType>().unwrap(), t);
        }
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&BloodType::AbNeg).unwrap();
        assert_eq!(json, "\"AB-\"");
        let back: BloodType = serde_json::from_str("\"b+\"").unwrap();
        assert_eq!(back, BloodType::BPos);
    }
}

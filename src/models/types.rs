//! Shared categorical types for survey records

use serde::{Deserialize, Serialize};

/// Gender as recorded in the household roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// Male gender
    Male,
    /// Female gender
    Female,
    /// Unknown or not specified
    Unknown,
}

impl From<&str> for Gender {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" | "1" | "hombre" => Self::Male,
            "f" | "female" | "2" | "mujer" => Self::Female,
            _ => Self::Unknown,
        }
    }
}

impl From<Option<&str>> for Gender {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Self::Unknown, Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_from_string() {
        assert_eq!(Gender::from("M"), Gender::Male);
        assert_eq!(Gender::from("male"), Gender::Male);
        assert_eq!(Gender::from(" F "), Gender::Female);
        assert_eq!(Gender::from("Mujer"), Gender::Female);
        assert_eq!(Gender::from("unknown"), Gender::Unknown);
        assert_eq!(Gender::from(None), Gender::Unknown);
    }
}

//! Length units for displaying distances

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error for an unsupported unit string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported unit of length: '{0}'")]
pub struct UnknownUnit(pub String);

/// Unit a proximity distance is reported in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UnitOfLength {
    #[default]
    Meters,
    Kilometers,
    Miles,
    Feet,
    Yards,
}

impl UnitOfLength {
    /// Number of meters in one unit
    pub fn meters_per_unit(self) -> f64 {
        match self {
            UnitOfLength::Meters => 1.0,
            UnitOfLength::Kilometers => 1_000.0,
            UnitOfLength::Miles => 1_609.344,
            UnitOfLength::Feet => 0.3048,
            UnitOfLength::Yards => 0.9144,
        }
    }

    /// Convert a distance in meters into this unit
    pub fn from_meters(self, meters: f64) -> f64 {
        meters / self.meters_per_unit()
    }

    /// Convert a distance in this unit back into meters
    pub fn to_meters(self, value: f64) -> f64 {
        value * self.meters_per_unit()
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnitOfLength::Meters => "m",
            UnitOfLength::Kilometers => "km",
            UnitOfLength::Miles => "mi",
            UnitOfLength::Feet => "ft",
            UnitOfLength::Yards => "yd",
        }
    }
}

impl FromStr for UnitOfLength {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "m" => Ok(UnitOfLength::Meters),
            "km" => Ok(UnitOfLength::Kilometers),
            "mi" => Ok(UnitOfLength::Miles),
            "ft" => Ok(UnitOfLength::Feet),
            "yd" => Ok(UnitOfLength::Yards),
            other => Err(UnknownUnit(other.to_string())),
        }
    }
}

impl TryFrom<String> for UnitOfLength {
    type Error = UnknownUnit;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<UnitOfLength> for String {
    fn from(unit: UnitOfLength) -> Self {
        unit.symbol().to_string()
    }
}

impl fmt::Display for UnitOfLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

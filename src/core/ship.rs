use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a ship in the regulated fleet.
///
/// Typically the IMO number or an operator-assigned fleet code.
///
/// # Examples
///
/// ```
/// use compliance_ledger::core::ship::ShipId;
///
/// let a = ShipId::new("IMO-9321483");
/// let b = ShipId::new("IMO-9450711");
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipId(String);

impl ShipId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation of this ship ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the identifier is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ShipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ShipId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

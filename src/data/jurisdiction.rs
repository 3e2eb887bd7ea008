//! Utility service territory codes.

use std::fmt;

use serde::Deserialize;

/// Lower-cased utility code (`pge`, `sce`, `sdge`).
///
/// Codes are trimmed and lower-cased on construction, so `"PGE"` from an
/// application table and `"pge"` from a schedule compare equal.
///
/// # Examples
///
/// ```
/// use csi_panel::data::Jurisdiction;
///
/// assert_eq!(Jurisdiction::new(" SDGE "), Jurisdiction::new("sdge"));
/// assert_eq!(Jurisdiction::new("SCE").as_str(), "sce");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(from = "String")]
pub struct Jurisdiction(String);

impl Jurisdiction {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The three investor-owned utilities covered by the CSI program.
    pub fn csi_utilities() -> [Jurisdiction; 3] {
        [Self::new("pge"), Self::new("sce"), Self::new("sdge")]
    }
}

impl From<String> for Jurisdiction {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<&str> for Jurisdiction {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

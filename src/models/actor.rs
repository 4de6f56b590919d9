use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Donor,
    Ngo,
    Delivery,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Donor => "DONOR",
            Role::Ngo => "NGO",
            Role::Delivery => "DELIVERY",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            // Donor accounts were historically called plain "user".
            "donor" | "user" => Ok(Role::Donor),
            "ngo" => Ok(Role::Ngo),
            "delivery" => Ok(Role::Delivery),
            other => Err(format!(
                "unknown role: {other}, expected donor/ngo/delivery"
            )),
        }
    }
}

/// Authenticated caller, supplied by the identity layer on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn donor(id: impl Into<String>) -> Self {
        Self::new(id, Role::Donor)
    }

    pub fn ngo(id: impl Into<String>) -> Self {
        Self::new(id, Role::Ngo)
    }

    pub fn delivery(id: impl Into<String>) -> Self {
        Self::new(id, Role::Delivery)
    }
}

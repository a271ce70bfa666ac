//! Session addressing.

use std::fmt;

/// Identifies one peer device: the key under which sessions are stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionAddress {
    /// Peer account identifier.
    pub name: String,
    /// Device index within the account.
    pub device: u32,
}

impl SessionAddress {
    /// Create an address for a peer device.
    pub fn new(name: impl Into<String>, device: u32) -> Self {
        Self {
            name: name.into(),
            device,
        }
    }
}

impl fmt::Display for SessionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let address = SessionAddress::new("15550001111", 3);
        assert_eq!(address.to_string(), "15550001111.3");
    }
}

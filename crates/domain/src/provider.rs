//! The fixed set of external fulfillment providers.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// An external print/ship vendor.
///
/// Adding a provider means adding a variant here plus a client in the
/// `providers` crate; no existing code branches on anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Printful,
    Gooten,
    Prodigi,
    Shapeways,
}

impl Provider {
    /// All supported providers.
    pub const ALL: [Provider; 4] = [
        Provider::Printful,
        Provider::Gooten,
        Provider::Prodigi,
        Provider::Shapeways,
    ];

    /// Returns the provider identifier as stored and routed on.
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Printful => "printful",
            Provider::Gooten => "gooten",
            Provider::Prodigi => "prodigi",
            Provider::Shapeways => "shapeways",
        }
    }

    /// Returns true if this provider lacks dependable webhooks and must
    /// be reconciled by polling.
    pub fn requires_polling(self) -> bool {
        matches!(self, Provider::Gooten)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|provider| provider.as_str() == s)
            .ok_or_else(|| DomainError::UnknownProvider(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_roundtrip() {
        for provider in Provider::ALL {
            let parsed: Provider = provider.as_str().parse().unwrap();
            assert_eq!(parsed, provider);
        }
        assert!("zazzle".parse::<Provider>().is_err());
    }

    #[test]
    fn only_gooten_requires_polling() {
        for provider in Provider::ALL {
            assert_eq!(provider.requires_polling(), provider == Provider::Gooten);
        }
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Provider::Printful).unwrap(), "\"printful\"");
    }
}

//! Coin ticker symbol: a fixed-size, `Copy` string of up to 8 ASCII bytes.

use std::fmt;

/// Maximum symbol length in bytes.
pub const MAX_COIN_LEN: usize = 8;

/// A coin ticker such as `BTC` or `XMR`.
///
/// Stored inline so it can be copied and hashed cheaply in the planner's maps.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coin {
    bytes: [u8; MAX_COIN_LEN],
    len: u8,
}

impl Coin {
    /// Create a coin from a ticker.
    ///
    /// # Panics
    ///
    /// Panics if `s` is empty, longer than [`MAX_COIN_LEN`] bytes, or not ASCII.
    /// Use [`Coin::try_new`] for untrusted input.
    #[track_caller]
    pub fn new(s: &str) -> Self {
        match Self::try_new(s) {
            Some(coin) => coin,
            None => panic!("invalid coin symbol: {s:?}"),
        }
    }

    /// Create a coin, returning `None` if the ticker doesn't fit.
    pub fn try_new(s: &str) -> Option<Self> {
        if s.is_empty() || s.len() > MAX_COIN_LEN || !s.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; MAX_COIN_LEN];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Some(Self {
            bytes,
            len: s.len() as u8,
        })
    }

    /// The ticker as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII is ever stored.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coin({})", self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Coin {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Coin {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Coin::try_new(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid coin symbol: {s:?}")))
    }
}

//! Target allocation (target.json or `--coins/--parts`) loading and validation.

use std::path::Path;

use chrono::{DateTime, Utc};
use coinbalance::{Coin, TargetWeights};
use serde::Deserialize;

use crate::error::{Error, Result};

/// A target allocation: relative weights per coin.
///
/// Weights are parts, not fractions: `{BTC: 4, ETH: 1}` means 80% / 20%.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetSpec {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub targets: Vec<TargetPosition>,
}

/// A single target entry: coin + weight.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetPosition {
    #[serde(alias = "symbol")]
    pub coin: String,
    pub weight: f64,
}

impl TargetSpec {
    /// Load and validate a target.json file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::TargetRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut spec: TargetSpec = serde_json::from_str(json)?;
        for t in &mut spec.targets {
            t.coin = t.coin.to_uppercase();
        }
        spec.validate()?;
        Ok(spec)
    }

    /// Build from parallel coin and part lists, as given on the command line.
    pub fn from_parts(coins: &[String], parts: &[f64]) -> Result<Self> {
        if coins.len() != parts.len() {
            return Err(Error::Target(format!(
                "{} coins but {} parts",
                coins.len(),
                parts.len()
            )));
        }
        let spec = Self {
            timestamp: None,
            targets: coins
                .iter()
                .zip(parts)
                .map(|(coin, weight)| TargetPosition {
                    coin: coin.to_uppercase(),
                    weight: *weight,
                })
                .collect(),
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Validate the target specification.
    fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(Error::Target("targets list is empty".into()));
        }

        let mut seen = std::collections::HashSet::new();
        for t in &self.targets {
            if Coin::try_new(&t.coin).is_none() {
                return Err(Error::Target(format!("invalid coin symbol '{}'", t.coin)));
            }
            if !seen.insert(&t.coin) {
                return Err(Error::Target(format!("duplicate coin: {}", t.coin)));
            }
            if !t.weight.is_finite() || t.weight < 0.0 {
                return Err(Error::Target(format!(
                    "weight for {} ({}) must be a non-negative number",
                    t.coin, t.weight
                )));
            }
        }

        if self.targets.iter().all(|t| t.weight == 0.0) {
            return Err(Error::Target("all weights are zero".into()));
        }

        Ok(())
    }

    /// Target coins, in file order.
    pub fn coins(&self) -> Vec<Coin> {
        self.targets.iter().filter_map(|t| Coin::try_new(&t.coin)).collect()
    }

    /// Weights for the planner.
    pub fn weights(&self) -> Result<TargetWeights> {
        let pairs = self
            .targets
            .iter()
            .filter_map(|t| Some((Coin::try_new(&t.coin)?, t.weight)));
        Ok(TargetWeights::from_pairs(pairs)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_json() -> &'static str {
        r#"{
            "timestamp": "2026-02-08T15:30:00Z",
            "targets": [
                { "coin": "BBR", "weight": 1 },
                { "coin": "XMR", "weight": 1 },
                { "coin": "BTC", "weight": 4 },
                { "coin": "ETH", "weight": 1 },
                { "coin": "NXT", "weight": 1 }
            ]
        }"#
    }

    #[test]
    fn parse_valid_target() {
        let spec = TargetSpec::from_json(valid_json()).unwrap();
        assert_eq!(spec.targets.len(), 5);
        assert_eq!(spec.targets[2].coin, "BTC");
        assert_eq!(spec.targets[2].weight, 4.0);
        assert!(spec.timestamp.is_some());
    }

    #[test]
    fn weights_conversion() {
        let spec = TargetSpec::from_json(valid_json()).unwrap();
        let w = spec.weights().unwrap();
        assert_eq!(w.len(), 5);
        assert_eq!(w.sum(), 8.0);
        assert_eq!(w.weight(&Coin::new("BTC")), 4.0);
    }

    #[test]
    fn symbol_alias_and_no_timestamp() {
        let json = r#"{ "targets": [ { "symbol": "ETH", "weight": 0.5 } ] }"#;
        let spec = TargetSpec::from_json(json).unwrap();
        assert_eq!(spec.coins(), vec![Coin::new("ETH")]);
        assert!(spec.timestamp.is_none());
    }

    #[test]
    fn from_parts_matches_counts() {
        let coins = vec!["bbr".to_string(), "BTC".to_string()];
        let spec = TargetSpec::from_parts(&coins, &[1.0, 1.0]).unwrap();
        assert_eq!(spec.coins(), vec![Coin::new("BBR"), Coin::new("BTC")]);

        let err = TargetSpec::from_parts(&coins, &[1.0]).unwrap_err();
        assert_eq!(err.to_string(), "target error: 2 coins but 1 parts");
    }

    #[test]
    fn json_symbols_are_uppercased() {
        let json = r#"{ "targets": [ { "coin": "eth", "weight": 1 },
                                     { "symbol": "Xmr", "weight": 1 } ] }"#;
        let spec = TargetSpec::from_json(json).unwrap();
        assert_eq!(spec.coins(), vec![Coin::new("ETH"), Coin::new("XMR")]);
        assert_eq!(spec.weights().unwrap().weight(&Coin::new("ETH")), 1.0);
    }

    #[test]
    fn reject_duplicates_differing_in_case() {
        let json = r#"{ "targets": [ { "coin": "eth", "weight": 1 },
                                     { "coin": "ETH", "weight": 2 } ] }"#;
        assert!(TargetSpec::from_json(json).is_err());
    }

    #[test]
    fn reject_empty_targets() {
        let json = r#"{"targets":[]}"#;
        assert!(TargetSpec::from_json(json).is_err());
    }

    #[test]
    fn reject_duplicate_coins() {
        let json = r#"{
            "targets": [
                { "coin": "ETH", "weight": 0.5 },
                { "coin": "ETH", "weight": 0.3 }
            ]
        }"#;
        assert!(TargetSpec::from_json(json).is_err());
    }

    #[test]
    fn reject_long_symbol() {
        let json = r#"{ "targets": [ { "coin": "TOOLONGNAME", "weight": 0.5 } ] }"#;
        assert!(TargetSpec::from_json(json).is_err());
    }

    #[test]
    fn reject_negative_weight() {
        let json = r#"{ "targets": [ { "coin": "ETH", "weight": -1 } ] }"#;
        assert!(TargetSpec::from_json(json).is_err());
    }

    #[test]
    fn reject_all_zero() {
        let json = r#"{ "targets": [ { "coin": "ETH", "weight": 0 },
                                     { "coin": "BTC", "weight": 0 } ] }"#;
        assert!(TargetSpec::from_json(json).is_err());
    }

    #[test]
    fn zero_weight_allowed_alongside_others() {
        let json = r#"{ "targets": [ { "coin": "ETH", "weight": 0 },
                                     { "coin": "BTC", "weight": 1 } ] }"#;
        let spec = TargetSpec::from_json(json).unwrap();
        assert_eq!(spec.weights().unwrap().weight(&Coin::new("ETH")), 0.0);
    }
}

/// Strips an exchange's quote-currency suffixes to get the base-asset key
/// used to join symbols across exchanges.
///
/// Suffixes are tried in the order given, so list the more specific ones
/// first (`USDT` before `USD`). Only one suffix is stripped, and only from the
/// end of the symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolNormalizer {
    suffixes: Vec<String>,
}

/// Result of normalizing one raw symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonical {
    pub key: String,
    /// Position of the matched suffix in the normalizer's list, `None` when
    /// nothing matched and the raw symbol became its own key.
    pub suffix_rank: Option<usize>,
}

impl SymbolNormalizer {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffixes: suffixes.into_iter().map(Into::into).collect(),
        }
    }

    /// True when the symbol ends in one of this exchange's suffixes and has
    /// something left over in front of it.
    pub fn recognizes(&self, raw: &str) -> bool {
        self.resolve(raw).suffix_rank.is_some()
    }

    pub fn resolve(&self, raw: &str) -> Canonical {
        for (rank, suffix) in self.suffixes.iter().enumerate() {
            match raw.strip_suffix(suffix.as_str()) {
                Some(base) if !base.is_empty() => {
                    return Canonical {
                        key: base.to_string(),
                        suffix_rank: Some(rank),
                    };
                }
                _ => continue,
            }
        }

        Canonical {
            key: raw.to_string(),
            suffix_rank: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(normalizer: &SymbolNormalizer, raw: &str) -> String {
        normalizer.resolve(raw).key
    }

    #[test]
    fn strips_binance_quote_suffixes() {
        let binance = SymbolNormalizer::new(["USDT", "BUSD"]);

        assert_eq!(key(&binance, "BTCUSDT"), "BTC");
        assert_eq!(key(&binance, "ETHBUSD"), "ETH");
        assert_eq!(key(&binance, "1000PEPEUSDT"), "1000PEPE");
    }

    #[test]
    fn strips_delta_quote_suffixes() {
        let delta = SymbolNormalizer::new(["USDT", "USD"]);

        assert_eq!(key(&delta, "BTCUSD"), "BTC");
        assert_eq!(key(&delta, "SOLUSDT"), "SOL");
    }

    #[test]
    fn longer_suffix_listed_first_wins() {
        let delta = SymbolNormalizer::new(["USDT", "USD"]);
        let resolved = delta.resolve("ETHUSDT");

        assert_eq!(resolved.key, "ETH");
        assert_eq!(resolved.suffix_rank, Some(0));
    }

    #[test]
    fn only_the_trailing_suffix_is_stripped() {
        let delta = SymbolNormalizer::new(["USDT", "USD"]);
        assert_eq!(key(&delta, "USDCUSD"), "USDC");
    }

    #[test]
    fn unmatched_symbol_is_its_own_key() {
        let binance = SymbolNormalizer::new(["USDT", "BUSD"]);
        let resolved = binance.resolve("BTCUSD_240329");

        assert_eq!(resolved.key, "BTCUSD_240329");
        assert_eq!(resolved.suffix_rank, None);
        assert!(!binance.recognizes("BTCUSD_240329"));
    }

    #[test]
    fn bare_suffix_is_kept_whole() {
        let binance = SymbolNormalizer::new(["USDT", "BUSD"]);

        assert_eq!(key(&binance, "USDT"), "USDT");
        assert!(!binance.recognizes("USDT"));
    }
}

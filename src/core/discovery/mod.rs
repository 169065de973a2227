//! Pair discovery: the out-of-scope title-matching process is treated as a
//! pluggable contract, not modeled here beyond the trait and
//! the pure similarity function the contract is allowed to rely on.

use async_trait::async_trait;

use crate::core::domain::MarketPair;
use crate::error::Result;

/// Produces the bootstrap set of tracked pairs. A real implementation
/// crawls both venues' open markets and matches titles within a time
/// window; this crate only needs the output contract.
#[async_trait]
pub trait PairSource: Send + Sync {
    async fn discover(&self) -> Result<Vec<MarketPair>>;
}

/// A fixed, pre-computed list of pairs — the only `PairSource` this crate
/// ships. Real discovery (venue crawling, title matching) is out of scope;
/// operators supply pairs via configuration until that lands.
pub struct StaticPairSource {
    pairs: Vec<MarketPair>,
}

impl StaticPairSource {
    #[must_use]
    pub fn new(pairs: Vec<MarketPair>) -> Self {
        Self { pairs }
    }
}

#[async_trait]
impl PairSource for StaticPairSource {
    async fn discover(&self) -> Result<Vec<MarketPair>> {
        Ok(self.pairs.clone())
    }
}

/// Normalizes a title for comparison: lowercase, punctuation stripped,
/// whitespace collapsed.
fn normalize(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Case/punctuation-insensitive token-Jaccard similarity in `[0.0, 1.0]`.
/// Symmetric; `similarity(x, x) == 1.0` for any non-empty `x`.
#[must_use]
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let tokens_a: std::collections::HashSet<String> = normalize(a).into_iter().collect();
    let tokens_b: std::collections::HashSet<String> = normalize(b).into_iter().collect();

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{Ticker, TokenId};

    #[test]
    fn similarity_of_identical_titles_is_one() {
        assert_eq!(title_similarity("Will X happen?", "Will X happen?"), 1.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = "Will the Fed cut rates in March?";
        let b = "Fed cuts rates in march";
        assert_eq!(title_similarity(a, b), title_similarity(b, a));
    }

    #[test]
    fn similarity_is_case_and_punctuation_insensitive() {
        let a = "Will X, Inc. win?";
        let b = "will x inc win";
        assert_eq!(title_similarity(a, b), 1.0);
    }

    #[test]
    fn disjoint_titles_have_zero_similarity() {
        assert_eq!(title_similarity("foo bar", "baz qux"), 0.0);
    }

    #[tokio::test]
    async fn static_source_returns_configured_pairs() {
        let pair = MarketPair::new(
            TokenId::new("yes"),
            TokenId::new("no"),
            "title",
            Ticker::new("KX-1"),
            "title",
        );
        let source = StaticPairSource::new(vec![pair.clone()]);
        let discovered = source.discover().await.unwrap();
        assert_eq!(discovered, vec![pair]);
    }
}

//! Intent Gate
//!
//! Keyword screen that keeps the assistant on its crypto beat. Follow-up
//! questions ("and on the hourly?") carry no keywords of their own, so the
//! recent dialogue is screened together with the question.

const CRYPTO_KEYWORDS: &[&str] = &[
    // Coins and tickers
    "btc", "bitcoin", "eth", "ethereum", "sol", "solana", "bnb", "xrp", "doge",
    "ada", "cardano", "dot", "polkadot", "link", "chainlink", "avax", "matic",
    "uni", "atom", "ltc", "trx", "sui", "near", "apt", "altcoin",
    // Market vocabulary
    "crypto", "coin", "token", "blockchain", "defi", "nft", "web3", "on-chain",
    "market", "price", "chart", "rally", "dip", "pump", "dump", "breakout",
    "bull", "bear", "halving", "mining", "staking", "gas fee",
    // Indicators and technicals
    "kline", "candle", "rsi", "macd", "bollinger", "ema", "moving average",
    "support", "resistance", "technical", "oversold", "overbought",
    // Derivatives
    "futures", "funding rate", "open interest", "leverage", "perp", "long", "short",
    "liquidation", "squeeze",
    // Sentiment and venues
    "fear", "greed", "sentiment", "whale", "etf", "grayscale",
    "exchange", "binance", "coinbase", "okx", "bybit", "usdt", "usdc", "stablecoin",
    // Horizons
    "short-term", "swing", "long-term", "intraday", "hourly", "daily", "weekly",
];

const REJECTION: &str = "I'm a crypto research assistant, focused on market \
analysis, technical indicators, and trade planning for cryptocurrencies.\n\n\
Your question looks outside that scope. Things I can help with:\n\
- Market direction for a coin (\"Where is BTC heading short-term?\")\n\
- Technical readings (\"Is the ETH RSI oversold on the hourly?\")\n\
- Market sentiment (\"What's the current fear and greed index?\")\n\
- Trade planning (\"Is this a reasonable dip to buy on SOL?\")\n\n\
Try me with a crypto question!";

/// Screen a question against the crypto topic gate.
///
/// Returns `Some(rejection_text)` for off-topic questions and `None` when
/// the question (or the surrounding dialogue) is on-topic.
pub fn screen(question: &str, recent_dialogue: &str) -> Option<String> {
    let context = format!(
        "{} {}",
        question.to_lowercase(),
        recent_dialogue.to_lowercase()
    );

    if CRYPTO_KEYWORDS.iter().any(|kw| context.contains(kw)) {
        None
    } else {
        Some(REJECTION.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_questions_pass() {
        assert!(screen("Analyze BTC short-term", "").is_none());
        assert!(screen("is the rsi oversold?", "").is_none());
        assert!(screen("what's the fear and greed index", "").is_none());
        assert!(screen("Should I buy this SUI dip?", "").is_none());
    }

    #[test]
    fn test_off_topic_rejected() {
        let rejection = screen("What's a good lasagna recipe?", "(no prior conversation)");
        assert!(rejection.is_some());
        assert!(rejection.unwrap().contains("crypto research assistant"));
    }

    #[test]
    fn test_follow_up_inherits_context() {
        // No keywords in the question itself, but the dialogue is on-topic
        let dialogue = "User: Analyze BTC short-term\nAssistant: BTC is consolidating...";
        assert!(screen("and what about tomorrow?", dialogue).is_none());
    }
}

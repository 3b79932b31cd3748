//! Symbol Resolution
//!
//! Users say "BTC", "bitcoin", or "btc,eth"; data sources want CoinGecko
//! coin ids or exchange perpetual pairs. These tables translate between the
//! two, passing unknown names through so new listings still work.

use crate::model::Interval;

/// Resolve user input to a quote-source coin id (e.g. "BTC" -> "bitcoin").
/// Unknown names pass through lowercased.
pub fn resolve_coin_id(name: &str) -> String {
    let key = name.trim().to_lowercase();
    match key.as_str() {
        "btc" | "bitcoin" | "xbt" => "bitcoin",
        "eth" | "ethereum" | "ether" => "ethereum",
        "sol" | "solana" => "solana",
        "bnb" | "binancecoin" => "binancecoin",
        "xrp" | "ripple" => "ripple",
        "doge" | "dogecoin" => "dogecoin",
        "ada" | "cardano" => "cardano",
        "avax" | "avalanche" => "avalanche-2",
        "dot" | "polkadot" => "polkadot",
        "link" | "chainlink" => "chainlink",
        "matic" | "polygon" => "matic-network",
        "uni" | "uniswap" => "uniswap",
        "atom" | "cosmos" => "cosmos",
        "ltc" | "litecoin" => "litecoin",
        "trx" | "tron" => "tron",
        "sui" => "sui",
        "near" => "near",
        "apt" | "aptos" => "aptos",
        _ => return key,
    }
    .to_string()
}

/// Resolve user input to an exchange USDT pair (e.g. "btc" -> "BTCUSDT").
/// Unknown names are upper-cased with "USDT" appended.
pub fn resolve_pair(name: &str) -> String {
    let key = name.trim().to_lowercase();
    let base = match key.as_str() {
        "btc" | "bitcoin" | "xbt" => "BTC",
        "eth" | "ethereum" | "ether" => "ETH",
        "sol" | "solana" => "SOL",
        "bnb" => "BNB",
        "xrp" | "ripple" => "XRP",
        "doge" | "dogecoin" => "DOGE",
        "ada" | "cardano" => "ADA",
        "avax" | "avalanche" => "AVAX",
        "dot" | "polkadot" => "DOT",
        "link" | "chainlink" => "LINK",
        "matic" | "polygon" => "MATIC",
        "uni" | "uniswap" => "UNI",
        "atom" | "cosmos" => "ATOM",
        "ltc" | "litecoin" => "LTC",
        "trx" | "tron" => "TRX",
        "near" => "NEAR",
        "apt" | "aptos" => "APT",
        "sui" => "SUI",
        _ => return format!("{}USDT", key.to_uppercase()),
    };
    format!("{}USDT", base)
}

/// Base asset of a USDT pair (e.g. "BTCUSDT" -> "BTC")
pub fn pair_base(pair: &str) -> &str {
    pair.strip_suffix("USDT").unwrap_or(pair)
}

/// Parse a query like "BTC 1h" or "eth, 4h" into (symbol, interval).
/// Missing parts default to BTC and the hourly chart.
pub fn parse_symbol_query(input: &str) -> (String, Interval) {
    let normalized = input.replace(',', " ");
    let mut parts = normalized.split_whitespace();

    let symbol = parts.next().unwrap_or("BTC").to_string();
    let interval = parts.next().map_or(Interval::default(), Interval::parse);

    (symbol, interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_coin_id() {
        assert_eq!(resolve_coin_id("BTC"), "bitcoin");
        assert_eq!(resolve_coin_id(" eth "), "ethereum");
        assert_eq!(resolve_coin_id("AVAX"), "avalanche-2");
        assert_eq!(resolve_coin_id("pepe"), "pepe");
    }

    #[test]
    fn test_resolve_pair() {
        assert_eq!(resolve_pair("btc"), "BTCUSDT");
        assert_eq!(resolve_pair("Polygon"), "MATICUSDT");
        assert_eq!(resolve_pair("pepe"), "PEPEUSDT");
    }

    #[test]
    fn test_pair_base() {
        assert_eq!(pair_base("BTCUSDT"), "BTC");
        assert_eq!(pair_base("WEIRD"), "WEIRD");
    }

    #[test]
    fn test_parse_symbol_query() {
        let (sym, interval) = parse_symbol_query("BTC 1h");
        assert_eq!(sym, "BTC");
        assert_eq!(interval, Interval::H1);

        let (sym, interval) = parse_symbol_query("eth, 4h");
        assert_eq!(sym, "eth");
        assert_eq!(interval, Interval::H4);

        let (sym, interval) = parse_symbol_query("SOL");
        assert_eq!(sym, "SOL");
        assert_eq!(interval, Interval::H1);

        let (sym, interval) = parse_symbol_query("");
        assert_eq!(sym, "BTC");
        assert_eq!(interval, Interval::H1);
    }
}

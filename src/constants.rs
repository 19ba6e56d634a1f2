// --- PRICE CACHE CONSTANTS ---
/// Seconds a cached quote is served before the feed is read again
pub const DEFAULT_PRICE_CACHE_TTL_SECS: u64 = 300;
/// Precision reported on quotes served from the fallback table
pub const FALLBACK_PRICE_DECIMALS: u8 = 8;
/// Per-request timeout applied to the JSON-RPC transport
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;
/// Public endpoint used when no RPC url is configured
pub const DEFAULT_ETHEREUM_RPC_URL: &str = "https://eth-mainnet.g.alchemy.com/v2/demo";

// --- CHAINLINK FEEDS (Ethereum mainnet, <SYMBOL>/USD) ---
pub const MAINNET_PRICE_FEEDS: [(&str, &str); 10] = [
    ("ETH", "0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419"),
    ("BTC", "0xF4030086522a5bEEa4988F8cA5B36dbC97BeE88c"),
    ("LINK", "0x2c1d072e956AFFC0D435Cb7AC38EF18d24d9127c"),
    ("USDC", "0x8fFfFfd4AfB6115b954Bd326cbe7B4BA576818f6"),
    ("USDT", "0x3E7d1eAB13ad0104d2750B8863b489D65364e32D"),
    ("DAI", "0xAed0c38402d19D19b40A5e30deBe78FB6d3e8F13"),
    ("MATIC", "0x7bAC85A8a13A4BcD8abb3eB7d6b4d632c5a57676"),
    ("AVAX", "0xFF3EEb22B5E3dE6e705b44749C2559d704923FD7"),
    ("BNB", "0x14e613AC84a31f709eadbdF89C6CC390fDc9540A"),
    ("ADA", "0xAE48c91dF1fE419994FFDa27da09D5aC69c30f55"),
];

// --- FALLBACK PRICES (USD) ---
pub const DEFAULT_FALLBACK_PRICES: [(&str, f64); 10] = [
    ("ETH", 3200.0),
    ("BTC", 67000.0),
    ("LINK", 14.0),
    ("USDC", 1.0),
    ("USDT", 1.0),
    ("DAI", 1.0),
    ("MATIC", 0.85),
    ("AVAX", 38.0),
    ("BNB", 315.0),
    ("ADA", 0.45),
];

// --- MARKET SNAPSHOT CONSTANTS ---
/// Assets included in the aggregate market snapshot
pub const MARKET_SNAPSHOT_ASSETS: [&str; 4] = ["ETH", "BTC", "LINK", "USDC"];
/// Approximate circulating supply used to estimate market cap
pub const MARKET_CAP_SUPPLY_MULTIPLIERS: [(&str, f64); 4] = [
    ("ETH", 120_000_000.0),
    ("BTC", 19_000_000.0),
    ("LINK", 617_000_000.0),
    ("USDC", 32_000_000_000.0),
];
pub const DEFAULT_SUPPLY_MULTIPLIER: f64 = 1_000_000.0;
/// Share of market cap reported as total value locked
pub const TVL_MARKET_CAP_RATIO: f64 = 0.15;

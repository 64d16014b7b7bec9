pub struct UniverseResources {
    pub pairs: &'static [&'static str],
}

pub struct UniverseConfig {
    pub benchmark: &'static str,
    pub max_pairs: usize,
    pub resources: UniverseResources,
}

/// Default symbols scanned by a market-wide request when none are given.
pub const UNIVERSE: UniverseConfig = UniverseConfig {
    benchmark: "BTCUSDT",
    max_pairs: 60,
    resources: UniverseResources {
        pairs: &[
            "BTCUSDT", "ETHUSDT", "SOLUSDT", "BNBUSDT", "XRPUSDT", "DOGEUSDT", "ADAUSDT",
            "AVAXUSDT", "LINKUSDT", "DOTUSDT", "LTCUSDT", "TRXUSDT", "BCHUSDT", "NEARUSDT",
            "APTUSDT", "ARBUSDT", "OPUSDT", "SUIUSDT", "INJUSDT", "ATOMUSDT", "PAXGUSDT",
        ],
    },
};

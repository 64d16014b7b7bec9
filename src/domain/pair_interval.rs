use {
    crate::{config::BINANCE_QUOTE_ASSETS, utils::TimeUtils},
    serde::{Deserialize, Serialize},
};

/// Cache key: one symbol sampled at one interval.
#[derive(Serialize, Deserialize, Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct PairInterval {
    pub name: String,
    pub interval_ms: i64,
}

impl PairInterval {
    pub fn new(name: impl Into<String>, interval_ms: i64) -> Self {
        Self {
            name: name.into().trim().to_uppercase(),
            interval_ms,
        }
    }

    pub(crate) fn get_base(text: &str) -> Option<&str> {
        let quote = Self::get_quote(text)?;
        text.strip_suffix(quote)
    }

    pub(crate) fn get_quote(text: &str) -> Option<&str> {
        BINANCE_QUOTE_ASSETS
            .iter()
            .find(|&&ext| text.ends_with(ext))
            .copied()
    }

    // The name we pass into the Binance API (not necessarily display name)
    pub(crate) fn bn_name(&self) -> &str {
        &self.name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn interval_label(&self) -> &'static str {
        TimeUtils::interval_to_string(self.interval_ms)
    }
}

impl std::fmt::Display for PairInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match (Self::get_base(&self.name), Self::get_quote(&self.name)) {
            (Some(base), Some(quote)) => {
                write!(f, "{}/{} @ {}", base, quote, self.interval_label())
            }
            _ => write!(f, "{} @ {}", self.name, self.interval_label()),
        }
    }
}

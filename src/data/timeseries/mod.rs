// The Binance kline wire format and REST page loader
pub mod bn_kline;

mod coin_price;

pub use coin_price::{CoinPrice, PriceComparisonResponse, PriceResponse};

pub mod all_mids;
pub mod hyperliquid;
pub mod price_provider;

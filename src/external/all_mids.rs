//! Price extraction from an `allMids` response.
//!
//! The upstream does not pin a single response shape, so the same payload is
//! run through an ordered list of strategies. Each one deserializes the bytes
//! into its own shape and either finds the coin or declares itself not
//! applicable; the first hit wins. When nothing matches, the error lists the
//! coins that were present.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::external::price_provider::PriceProviderError;

pub const SNIPPET_LEN: usize = 500;

/// `{ "BTC": "65000.1", ... }`
type FlatMids = HashMap<String, String>;

/// `{ "data": { "BTC": "65000.1" } }` or `{ "data": { "mids": { "BTC": "65000.1" } } }`
#[derive(Debug, Deserialize)]
struct WrappedMids {
    data: WrappedInner,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WrappedInner {
    Mids { mids: FlatMids },
    Flat(FlatMids),
}

impl WrappedInner {
    fn mids(&self) -> &FlatMids {
        match self {
            WrappedInner::Mids { mids } => mids,
            WrappedInner::Flat(mids) => mids,
        }
    }
}

/// `{ "mids": { "BTC": "65000.1" } }`
#[derive(Debug, Deserialize)]
struct MidsField {
    mids: FlatMids,
}

/// `{ "data": { "BTC": { "midPx": "65000.1", ... } } }`
#[derive(Debug, Deserialize)]
struct PerpData {
    data: HashMap<String, PerpInfo>,
}

#[derive(Debug, Deserialize)]
struct PerpInfo {
    #[serde(rename = "midPx")]
    mid_px: Option<String>,
}

#[derive(Debug)]
enum Lookup {
    /// Raw price string for the coin.
    Found(String),
    /// Payload has this shape but carries no usable price.
    Missing(String),
    NotApplicable,
}

struct Strategy {
    name: &'static str,
    lookup: fn(&[u8], &str, &mut BTreeSet<String>) -> Lookup,
}

const STRATEGIES: &[Strategy] = &[
    Strategy { name: "flat", lookup: lookup_flat },
    Strategy { name: "wrapped", lookup: lookup_wrapped },
    Strategy { name: "mids_field", lookup: lookup_mids_field },
    Strategy { name: "perp_info", lookup: lookup_perp_info },
];

/// Extract the mid price for `coin` from a raw `allMids` response body.
pub fn extract_mid_price(body: &[u8], coin: &str) -> Result<BigDecimal, PriceProviderError> {
    let mut seen = BTreeSet::new();

    for strategy in STRATEGIES {
        match (strategy.lookup)(body, coin, &mut seen) {
            Lookup::Found(raw) => {
                tracing::debug!("Matched {} in {} payload", coin, strategy.name);
                return parse_price(coin, &raw);
            }
            Lookup::Missing(reason) => {
                return Err(PriceProviderError::Parse {
                    coin: coin.to_string(),
                    reason,
                });
            }
            Lookup::NotApplicable => continue,
        }
    }

    if seen.is_empty() {
        match serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(body) {
            Ok(object) => seen.extend(object.keys().cloned()),
            Err(_) => {
                return Err(PriceProviderError::UnexpectedPayload {
                    coin: coin.to_string(),
                    snippet: snippet(body),
                });
            }
        }
    }

    Err(PriceProviderError::CoinNotFound {
        coin: coin.to_string(),
        available: seen.into_iter().collect(),
    })
}

/// First `SNIPPET_LEN` characters of a body, for error messages.
pub fn snippet(body: &[u8]) -> String {
    String::from_utf8_lossy(body).chars().take(SNIPPET_LEN).collect()
}

fn parse_price(coin: &str, raw: &str) -> Result<BigDecimal, PriceProviderError> {
    BigDecimal::from_str(raw.trim()).map_err(|e| PriceProviderError::Parse {
        coin: coin.to_string(),
        reason: format!("{:?} is not a decimal: {}", raw, e),
    })
}

/// Exact key first, then a case-insensitive scan.
fn find_key<'a, V>(map: &'a HashMap<String, V>, coin: &str) -> Option<&'a V> {
    if let Some(value) = map.get(coin) {
        return Some(value);
    }
    let wanted = coin.to_uppercase();
    map.iter()
        .find(|(key, _)| key.to_uppercase() == wanted)
        .map(|(_, value)| value)
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Option<T> {
    serde_json::from_slice(body).ok()
}

fn lookup_mids(mids: &FlatMids, coin: &str, seen: &mut BTreeSet<String>) -> Lookup {
    seen.extend(mids.keys().cloned());
    match find_key(mids, coin) {
        Some(raw) => Lookup::Found(raw.clone()),
        None => Lookup::NotApplicable,
    }
}

fn lookup_flat(body: &[u8], coin: &str, seen: &mut BTreeSet<String>) -> Lookup {
    match decode::<FlatMids>(body) {
        Some(mids) if !mids.is_empty() => lookup_mids(&mids, coin, seen),
        _ => Lookup::NotApplicable,
    }
}

fn lookup_wrapped(body: &[u8], coin: &str, seen: &mut BTreeSet<String>) -> Lookup {
    match decode::<WrappedMids>(body) {
        Some(wrapped) => lookup_mids(wrapped.data.mids(), coin, seen),
        None => Lookup::NotApplicable,
    }
}

fn lookup_mids_field(body: &[u8], coin: &str, seen: &mut BTreeSet<String>) -> Lookup {
    match decode::<MidsField>(body) {
        Some(field) => lookup_mids(&field.mids, coin, seen),
        None => Lookup::NotApplicable,
    }
}

fn lookup_perp_info(body: &[u8], coin: &str, seen: &mut BTreeSet<String>) -> Lookup {
    let Some(perp) = decode::<PerpData>(body) else {
        return Lookup::NotApplicable;
    };
    seen.extend(perp.data.keys().cloned());

    match find_key(&perp.data, coin) {
        Some(PerpInfo { mid_px: Some(raw) }) => Lookup::Found(raw.clone()),
        Some(PerpInfo { mid_px: None }) => Lookup::Missing("record has no midPx".to_string()),
        None => Lookup::NotApplicable,
    }
}

//! Payload carried through the external checkout session.
//!
//! No order exists while the customer is on the processor's hosted page, so
//! everything needed to build one later is serialized into the session's
//! metadata under [`ORDER_DATA_KEY`]. Payloads longer than one metadata value
//! continue under `order_data_1`, `order_data_2`, and so on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::orders::{RequestedItem, ShippingAddress};
use crate::CoreError;

pub const ORDER_DATA_KEY: &str = "order_data";

/// Longest metadata value the processor accepts, in characters.
pub const METADATA_VALUE_MAX_CHARS: usize = 500;

/// Most metadata keys the processor accepts on one session.
pub const METADATA_MAX_KEYS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutMetadata {
    pub user_id: Uuid,
    pub items: Vec<RequestedItem>,
    pub shipping_address: ShippingAddress,
}

impl CheckoutMetadata {
    /// Serializes the payload into metadata values of at most
    /// [`METADATA_VALUE_MAX_CHARS`] characters each.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the payload needs more than
    /// [`METADATA_MAX_KEYS`] values, or [`CoreError::Metadata`] if
    /// serialization fails.
    pub fn to_metadata(&self) -> Result<HashMap<String, String>, CoreError> {
        let json = serde_json::to_string(self).map_err(|e| CoreError::Metadata(e.to_string()))?;
        let chars: Vec<char> = json.chars().collect();
        let parts = chars.len().div_ceil(METADATA_VALUE_MAX_CHARS).max(1);
        if parts > METADATA_MAX_KEYS {
            return Err(CoreError::Validation(format!(
                "cart is too large to check out: {} items need {} characters of order metadata, \
                 at most {} are allowed",
                self.items.len(),
                chars.len(),
                METADATA_MAX_KEYS * METADATA_VALUE_MAX_CHARS
            )));
        }

        Ok(chars
            .chunks(METADATA_VALUE_MAX_CHARS)
            .enumerate()
            .map(|(i, chunk)| (part_key(i), chunk.iter().collect()))
            .collect())
    }

    /// Reads the payload back out of a session's metadata map.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Metadata`] if the key is missing or its value is
    /// not a valid payload.
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Result<Self, CoreError> {
        let mut raw = metadata
            .get(ORDER_DATA_KEY)
            .ok_or_else(|| CoreError::Metadata("missing order metadata".to_string()))?
            .clone();
        for part in (1..METADATA_MAX_KEYS).map_while(|i| metadata.get(&part_key(i))) {
            raw.push_str(part);
        }
        serde_json::from_str(&raw).map_err(|e| CoreError::Metadata(e.to_string()))
    }
}

fn part_key(index: usize) -> String {
    if index == 0 {
        ORDER_DATA_KEY.to_string()
    } else {
        format!("{ORDER_DATA_KEY}_{index}")
    }
}

//! Typed view over an OLM `<operator>.package.yaml` document.
//!
//! Only `channels[0].currentCSV` is validated and rewritten. The rest of the document
//! is carried as opaque YAML nodes so that re-encoding never drops or reorders content
//! the release does not touch.

use serde_yaml::{Mapping, Value};
use thiserror::Error;

const CHANNELS_KEY: &str = "channels";
const CURRENT_CSV_KEY: &str = "currentCSV";

/// Errors that can occur when reading or writing a package index document
#[derive(Debug, Error)]
pub enum IndexError {
    /// The text is not valid YAML.
    #[error("failed to decode the package index")]
    DecodeFailed(#[source] serde_yaml::Error),

    /// The document lacks a string `channels[0].currentCSV`.
    #[error("unexpected package index shape: {reason}")]
    UnexpectedShape { reason: String },

    /// The updated document could not be serialized.
    #[error("failed to encode the package index")]
    EncodeFailed(#[source] serde_yaml::Error),
}

/// A package index whose `channels[0].currentCSV` is known to exist.
///
/// The whole document is kept as decoded, so keys keep their order and tagged
/// values survive re-encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageIndex {
    document: Mapping,
}

impl PackageIndex {
    /// Decode and validate a package index document.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DecodeFailed`] if the text is not valid YAML and
    /// [`IndexError::UnexpectedShape`] if it is not a mapping with a `channels` list
    /// whose first entry is a mapping holding a string `currentCSV`.
    pub fn parse(text: &str) -> Result<Self, IndexError> {
        let document: Value = serde_yaml::from_str(text).map_err(IndexError::DecodeFailed)?;

        let Value::Mapping(document) = document else {
            return Err(IndexError::UnexpectedShape {
                reason: "the document is not a mapping".to_owned(),
            });
        };
        first_channel(&document).map_err(|reason| IndexError::UnexpectedShape { reason })?;

        Ok(Self { document })
    }

    /// The CSV the first channel currently points at
    #[must_use]
    pub fn current_csv(&self) -> &str {
        first_channel(&self.document)
            .ok()
            .and_then(|channel| channel.get(CURRENT_CSV_KEY))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Point the first channel at a new CSV
    pub fn set_current_csv(&mut self, csv: String) {
        let channel = self
            .document
            .get_mut(CHANNELS_KEY)
            .and_then(Value::as_sequence_mut)
            .and_then(|channels| channels.first_mut())
            .and_then(Value::as_mapping_mut);

        if let Some(channel) = channel {
            channel.insert(
                Value::String(CURRENT_CSV_KEY.to_owned()),
                Value::String(csv),
            );
        }
    }

    /// Top-level value, as decoded
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    /// Encode the document back to YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::EncodeFailed`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String, IndexError> {
        serde_yaml::to_string(&self.document).map_err(IndexError::EncodeFailed)
    }
}

/// The first channel entry, once it is known to hold a string `currentCSV`
fn first_channel(document: &Mapping) -> Result<&Mapping, String> {
    let channels = match document.get(CHANNELS_KEY) {
        Some(Value::Sequence(channels)) => channels,
        Some(_) => return Err(format!("`{CHANNELS_KEY}` is not a list")),
        None => return Err(format!("missing key `{CHANNELS_KEY}`")),
    };

    let channel = match channels.first() {
        Some(Value::Mapping(channel)) => channel,
        Some(_) => return Err(format!("`{CHANNELS_KEY}[0]` is not a mapping")),
        None => return Err(format!("`{CHANNELS_KEY}` is empty")),
    };

    match channel.get(CURRENT_CSV_KEY) {
        Some(Value::String(_)) => Ok(channel),
        Some(_) => Err(format!(
            "`{CHANNELS_KEY}[0].{CURRENT_CSV_KEY}` is not a string"
        )),
        None => Err(format!("`{CHANNELS_KEY}[0]`: missing key `{CURRENT_CSV_KEY}`")),
    }
}

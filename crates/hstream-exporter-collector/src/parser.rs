//! Decoding of tabular admin command responses.
//!
//! Admin commands answer with a JSON envelope whose `content` field holds a
//! table:
//!
//! ```text
//! | server_host | stream_name | appends_1min |   <- headers
//! |   server1   |     s1      |    1829      |   <- rows[0]
//! ```

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::{catalog::SERVER_HOST_LABEL, error::ParseError};

/// A flattened `column -> value` view of a response table.
pub type StatsRecord = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResponseTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResponseTable {
    /// Folds every row into one record keyed by header; later rows overwrite
    /// earlier ones.
    pub fn flatten(&self) -> StatsRecord {
        let mut record = StatsRecord::with_capacity(self.headers.len() + 1);
        for row in &self.rows {
            for (header, value) in self.headers.iter().zip(row) {
                record.insert(header.clone(), value.clone());
            }
        }
        record
    }

    /// Flattens the table and tags it with the host it was scraped from.
    pub fn into_record(self, host: &str) -> StatsRecord {
        let mut record = self.flatten();
        record.insert(SERVER_HOST_LABEL.to_string(), host.to_string());
        record
    }

    fn validate(&self) -> Result<(), ParseError> {
        let expected = self.headers.len();
        match self.rows.iter().position(|row| row.len() != expected) {
            Some(row) => Err(ParseError::RowLengthMismatch {
                row,
                expected,
                actual: self.rows[row].len(),
            }),
            None => Ok(()),
        }
    }
}

/// Decodes an admin command response into its table.
pub fn parse_response(response: &str) -> Result<ResponseTable, ParseError> {
    let mut envelope: HashMap<String, Value> =
        serde_json::from_str(response).map_err(ParseError::Json)?;
    let content = envelope
        .remove("content")
        .ok_or(ParseError::MissingContentField)?;

    let table: ResponseTable = serde_json::from_value(content).map_err(ParseError::Json)?;
    table.validate()?;
    Ok(table)
}

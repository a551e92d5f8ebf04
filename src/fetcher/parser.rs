//! SENAMHI response parser
//!
//! This module provides stateless parsing functions for converting SENAMHI
//! API JSON responses into [`RawReading`] structs. Both endpoint shapes are
//! handled here so the HTTP fetcher stays free of JSON details.

use crate::{Granularity, RawReading, StationFilter};
use serde_json::Value;

/// Stateless parser for SENAMHI API responses
pub struct SenamhiParser;

impl SenamhiParser {
    /// Extract readings from a decoded response body.
    ///
    /// Daily responses carry their rows directly under `content`. Monthly
    /// responses nest them one level deeper, under `content[0].detalle`.
    ///
    /// A body that decodes but lacks the expected structure yields an empty
    /// vector rather than an error: the API answers with an empty or
    /// reshaped body on keys it has no data for, and that is a valid
    /// "nothing reported" result.
    ///
    /// # Arguments
    /// * `body` - Decoded JSON response body
    /// * `granularity` - Which endpoint shape to expect
    ///
    /// # Returns
    /// Readings in API response order
    pub fn extract_readings(body: &Value, granularity: Granularity) -> Vec<RawReading> {
        let rows = match granularity {
            Granularity::Daily => body.get("content").and_then(Value::as_array),
            Granularity::Monthly => body
                .get("content")
                .and_then(Value::as_array)
                .and_then(|content| content.first())
                .and_then(|first| first.get("detalle"))
                .and_then(Value::as_array),
        };

        match rows {
            Some(rows) => rows.iter().filter_map(Self::parse_entry).collect(),
            None => Vec::new(),
        }
    }

    /// Keep only the readings whose station name is in the filter.
    ///
    /// Matching is by exact station name. Response order is preserved.
    pub fn filter_stations(readings: Vec<RawReading>, filter: &StationFilter) -> Vec<RawReading> {
        readings
            .into_iter()
            .filter(|reading| filter.contains(&reading.nom_esta))
            .collect()
    }

    /// Parse a single response row. Non-object rows are skipped.
    fn parse_entry(entry: &Value) -> Option<RawReading> {
        if !entry.is_object() {
            return None;
        }

        Some(RawReading {
            cod_zonal: Self::field(entry, "codZonal"),
            cod_esta: Self::field(entry, "codEsta"),
            nom_esta: Self::field(entry, "nomEsta"),
            uni_hidrografica: Self::field(entry, "uniHidrografica"),
            nom_depa: Self::field(entry, "nomDepa"),
            nom_cuenca: Self::field(entry, "nomCuenca"),
            nom_sector: Self::field(entry, "nomSector"),
            dato: Self::field(entry, "dato"),
            dato_ant: Self::field(entry, "datoAnt"),
            unidad: Self::field(entry, "unidad"),
            dat_anomalia: Self::field(entry, "datAnomalia"),
            uni_anomalia: Self::field(entry, "uniAnomalia"),
            tendencia: Self::field(entry, "tendencia"),
            umbral_rojo: Self::field(entry, "umbralRojo"),
            cuerpo_agua: Self::field(entry, "cuerpoAgua"),
        })
    }

    /// Read one field as a string.
    ///
    /// The API is loose about scalar types: numeric columns arrive both
    /// quoted and bare depending on the row. Strings, numbers and booleans
    /// are all stringified; missing or null fields become "".
    fn field(entry: &Value, name: &str) -> String {
        match entry.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }
}

//! CSV output writer implementation

use crate::{Granularity, StationRecord};
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use super::{OutputError, OutputResult, OutputWriter, RecordsWriter};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// CSV row for a daily reading.
///
/// Column order follows the daily endpoint's payload; the month-only
/// `datoAnt` column is absent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DailyRow<'a> {
    fecha: String,
    cod_zonal: &'a str,
    cod_esta: &'a str,
    nom_esta: &'a str,
    uni_hidrografica: &'a str,
    nom_depa: &'a str,
    nom_cuenca: &'a str,
    nom_sector: &'a str,
    dato: &'a str,
    unidad: &'a str,
    dat_anomalia: &'a str,
    uni_anomalia: &'a str,
    tendencia: &'a str,
    umbral_rojo: &'a str,
    cuerpo_agua: &'a str,
}

impl<'a> From<&'a StationRecord> for DailyRow<'a> {
    fn from(record: &'a StationRecord) -> Self {
        let reading = &record.reading;
        Self {
            fecha: record.fecha.format("%Y-%m-%d").to_string(),
            cod_zonal: &reading.cod_zonal,
            cod_esta: &reading.cod_esta,
            nom_esta: &reading.nom_esta,
            uni_hidrografica: &reading.uni_hidrografica,
            nom_depa: &reading.nom_depa,
            nom_cuenca: &reading.nom_cuenca,
            nom_sector: &reading.nom_sector,
            dato: &reading.dato,
            unidad: &reading.unidad,
            dat_anomalia: &reading.dat_anomalia,
            uni_anomalia: &reading.uni_anomalia,
            tendencia: &reading.tendencia,
            umbral_rojo: &reading.umbral_rojo,
            cuerpo_agua: &reading.cuerpo_agua,
        }
    }
}

/// CSV row for a monthly reading.
///
/// Column order follows the monthly endpoint's payload: `datoAnt` sits
/// after `dato`, and the daily-only `nomCuenca` column is absent. The date
/// renders as the first of the month.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MonthlyRow<'a> {
    fecha: String,
    cod_zonal: &'a str,
    cod_esta: &'a str,
    nom_esta: &'a str,
    uni_hidrografica: &'a str,
    nom_depa: &'a str,
    nom_sector: &'a str,
    dato: &'a str,
    dato_ant: &'a str,
    unidad: &'a str,
    dat_anomalia: &'a str,
    uni_anomalia: &'a str,
    tendencia: &'a str,
    umbral_rojo: &'a str,
    cuerpo_agua: &'a str,
}

impl<'a> From<&'a StationRecord> for MonthlyRow<'a> {
    fn from(record: &'a StationRecord) -> Self {
        let reading = &record.reading;
        Self {
            fecha: record.fecha.format("%Y-%m-%d").to_string(),
            cod_zonal: &reading.cod_zonal,
            cod_esta: &reading.cod_esta,
            nom_esta: &reading.nom_esta,
            uni_hidrografica: &reading.uni_hidrografica,
            nom_depa: &reading.nom_depa,
            nom_sector: &reading.nom_sector,
            dato: &reading.dato,
            dato_ant: &reading.dato_ant,
            unidad: &reading.unidad,
            dat_anomalia: &reading.dat_anomalia,
            uni_anomalia: &reading.uni_anomalia,
            tendencia: &reading.tendencia,
            umbral_rojo: &reading.umbral_rojo,
            cuerpo_agua: &reading.cuerpo_agua,
        }
    }
}

/// CSV writer for station records
pub struct CsvRecordsWriter {
    writer: Writer<BufWriter<File>>,
    granularity: Granularity,
    records_written: u64,
}

impl CsvRecordsWriter {
    /// Create a new CSV records writer
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `granularity` - Selects the daily or monthly column set
    ///
    /// # Returns
    /// New CsvRecordsWriter with default buffer size
    pub fn new<P: AsRef<Path>>(path: P, granularity: Granularity) -> OutputResult<Self> {
        Self::new_with_buffer_size(path, granularity, DEFAULT_BUFFER_SIZE)
    }

    /// Create a new CSV records writer with custom buffer size
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `granularity` - Selects the daily or monthly column set
    /// * `buffer_size` - Size of write buffer in bytes
    ///
    /// # Returns
    /// New CsvRecordsWriter with specified buffer size
    pub fn new_with_buffer_size<P: AsRef<Path>>(
        path: P,
        granularity: Granularity,
        buffer_size: usize,
    ) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV writer: path={}", path.display());

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    OutputError::IoError(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;

        let buf_writer = BufWriter::with_capacity(buffer_size, file);
        let csv_writer = Writer::from_writer(buf_writer);

        // Headers will be written automatically by csv::Writer when using serialize()
        debug!("CSV writer created (headers will be written on first serialize)");

        Ok(Self {
            writer: csv_writer,
            granularity,
            records_written: 0,
        })
    }

    /// Get number of records written so far
    pub fn records_written(&self) -> u64 {
        self.records_written
    }
}

impl RecordsWriter for CsvRecordsWriter {
    /// Write a single record, using the column set picked at creation
    fn write_record(&mut self, record: &StationRecord) -> OutputResult<()> {
        match self.granularity {
            Granularity::Daily => self
                .writer
                .serialize(DailyRow::from(record))
                .map_err(|e| OutputError::CsvError(format!("Failed to write record: {}", e)))?,
            Granularity::Monthly => self
                .writer
                .serialize(MonthlyRow::from(record))
                .map_err(|e| OutputError::CsvError(format!("Failed to write record: {}", e)))?,
        }

        self.records_written += 1;

        // Flush periodically (every 1000 records)
        if self.records_written % 1000 == 0 {
            self.flush()?;
            debug!("Progress: {} records written", self.records_written);
        }

        Ok(())
    }
}

impl OutputWriter for CsvRecordsWriter {
    /// Flush buffered data to disk
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }

    /// Close the writer and finalize output
    fn close(mut self) -> OutputResult<()> {
        debug!(
            "Closing CSV writer: {} total records written",
            self.records_written
        );

        // Final flush
        self.flush()?;

        // Get inner writer and sync to disk
        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {}", e)))?;

        let file = buf_writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get file handle: {}", e)))?;

        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))?;

        info!(
            "CSV writer closed successfully: {} records written",
            self.records_written
        );
        Ok(())
    }
}

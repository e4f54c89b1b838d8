use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use mobiprice_core::{PhoneRecord, PriceError};

use crate::error::IoResult;

/// Read phone records from CSV with a header row naming the fields.
///
/// Column order is free; every feature column plus `price_range` must be
/// present. Malformed rows and rows that fail validation are reported as
/// `InvalidInput` with their 1-based data row number.
pub fn read_records<R: Read>(reader: R) -> IoResult<Vec<PhoneRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut records = Vec::new();

    for (i, result) in rdr.deserialize::<PhoneRecord>().enumerate() {
        let row = i + 1;
        let record = result.map_err(|e| PriceError::InvalidInput(format!("row {row}: {e}")))?;
        record
            .validate()
            .map_err(|e| PriceError::InvalidInput(format!("row {row}: {e}")))?;
        records.push(record);
    }
    Ok(records)
}

pub fn read_records_csv<P: AsRef<Path>>(path: P) -> IoResult<Vec<PhoneRecord>> {
    read_records(File::open(path)?)
}

/// Write records with a header row in canonical feature order.
pub fn write_records<W: Write>(writer: W, records: &[PhoneRecord]) -> IoResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_records_csv<P: AsRef<Path>>(path: P, records: &[PhoneRecord]) -> IoResult<()> {
    write_records(File::create(path)?, records)
}

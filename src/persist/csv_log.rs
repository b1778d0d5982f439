//! CSV session logs: header row of field names, one row per sample.

use std::io::{Read, Write};

use super::PersistError;
use crate::protocol::{parse_sample, Sample, FIELD_NAMES};

/// Write `records` as a CSV log.
pub fn write_csv<W: Write>(writer: W, records: &[Sample]) -> Result<(), PersistError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(FIELD_NAMES)?;
    for record in records {
        csv_writer.write_record(record.to_fields())?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Read a CSV log written by [`write_csv`].
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Sample>, PersistError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?;
    if !headers.iter().eq(FIELD_NAMES) {
        return Err(PersistError::InvalidLog(format!(
            "unexpected header: {}",
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let mut samples = Vec::new();
    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        let line = record.iter().collect::<Vec<_>>().join(",");
        let sample = parse_sample(&line)
            .map_err(|e| PersistError::InvalidLog(format!("row {}: {}", row + 1, e)))?;
        samples.push(sample);
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Mode;

    #[test]
    fn test_write_csv_layout() {
        let records = vec![
            parse_sample("1.0,24.5,24.75,0,0,50,25,120,0,23.5,REFLOW").unwrap(),
            parse_sample("2.0,25,25,0,0,52,26,130,0,23.5,REFLOW").unwrap(),
        ];
        let mut out = Vec::new();
        write_csv(&mut out, &records).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Time,Temp0,Temp1,Temp2,Temp3,Set,Actual,Heat,Fan,ColdJ,Mode");
        assert_eq!(lines[1], "1.0,24.5,24.75,0.0,0.0,50.0,25.0,120.0,0.0,23.5,REFLOW");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_empty_log_has_header_only() {
        let mut out = Vec::new();
        write_csv(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_read_back() {
        let records = vec![parse_sample("3.5,1,2,3,4,5,6,7,8,9,BAKE").unwrap()];
        let mut out = Vec::new();
        write_csv(&mut out, &records).unwrap();

        let read = read_csv(out.as_slice()).unwrap();
        assert_eq!(read, records);
        assert_eq!(read[0].mode, Some(Mode::Bake));
    }

    #[test]
    fn test_read_rejects_foreign_header() {
        let result = read_csv("a,b,c\n1,2,3\n".as_bytes());
        assert!(matches!(result, Err(PersistError::InvalidLog(_))));
    }
}

//! csv export of a store snapshot
//!
//! one column per known channel in canonical order, one row per record.
//! a channel the record did not carry is written as an empty cell.

use crate::domain::Channel;
use crate::error::HubResult;
use crate::store::Snapshot;

pub const EXPORT_FILE_NAME: &str = "sensor_data.csv";
pub const EXPORT_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

pub fn to_csv(snapshot: &Snapshot) -> HubResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(Channel::ALL.iter().map(|c| c.as_str()))?;

    for record in &snapshot.records {
        let row = Channel::ALL
            .iter()
            .map(|c| record.get(*c).map(|r| r.to_string()).unwrap_or_default());
        writer.write_record(row)?;
    }

    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Batch, Reading};
    use crate::store::TimeSeriesStore;

    fn lines(bytes: Vec<u8>) -> Vec<String> {
        String::from_utf8(bytes).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn test_empty_snapshot_exports_header_only() {
        let out = lines(to_csv(&Snapshot::default()).unwrap());
        assert_eq!(out, vec!["time,tilt,temperature,humidity,fire,shock,vibration,sound"]);
    }

    #[test]
    fn test_rows_stay_aligned_with_partial_batches() {
        let mut store = TimeSeriesStore::new();
        store.append(
            Batch::new()
                .with(Channel::Time, Reading::Timestamp("2024-01-01 00:00:00".into()))
                .with(Channel::Tilt, Reading::Value(45.0))
                .with(Channel::Temperature, Reading::Value(20.5)),
        );
        store.append(
            Batch::new()
                .with(Channel::Time, Reading::Timestamp("2024-01-01 00:00:01".into()))
                .with(Channel::Temperature, Reading::Value(21.0)),
        );

        let out = lines(to_csv(&store.snapshot()).unwrap());
        assert_eq!(out.len(), 3);
        assert_eq!(out[1], "2024-01-01 00:00:00,45,20.5,,,,,");
        assert_eq!(out[2], "2024-01-01 00:00:01,,21,,,,,");
    }
}

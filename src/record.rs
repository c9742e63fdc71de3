// src/record.rs

use csv::ByteRecord;
use serde::{Deserialize, Serialize};

/// One row of the baby-names dataset as it is stored in `BabyNames`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    pub name: String,
    pub sex: String,
}

impl NameRecord {
    pub fn new(name: impl Into<String>, sex: impl Into<String>) -> Self {
        NameRecord {
            name: name.into(),
            sex: sex.into(),
        }
    }
}

/// The `Name` and `Sex` cells of one CSV row. Every other column in the file
/// is ignored.
#[derive(Debug, Default)]
pub struct CsvNameRow {
    pub name: Option<String>,
    pub sex: Option<String>,
}

impl CsvNameRow {
    /// Pick the two cells by header position. Bytes that are not valid UTF-8
    /// are replaced rather than dropping the row.
    pub fn from_byte_record(
        record: &ByteRecord,
        name_col: Option<usize>,
        sex_col: Option<usize>,
    ) -> Self {
        let cell = |col: Option<usize>| {
            col.and_then(|i| record.get(i))
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        };
        CsvNameRow {
            name: cell(name_col),
            sex: cell(sex_col),
        }
    }

    /// Only rows carrying a non-empty `Name` and `Sex` become records.
    pub fn into_record(self) -> Option<NameRecord> {
        let name = self.name.filter(|s| !s.is_empty())?;
        let sex = self.sex.filter(|s| !s.is_empty())?;
        Some(NameRecord { name, sex })
    }
}

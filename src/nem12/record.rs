use crate::nem12::timestamp::{parse_in_zone, DateLayout, TimestampError};
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use thiserror::Error;

/// First and last field positions holding interval values in a 300 record.
pub const FIRST_INTERVAL_FIELD: usize = 2;
pub const LAST_INTERVAL_FIELD: usize = 49;

/// Number of interval values decoded from every 300 record.
pub const INTERVAL_SLOTS: usize = LAST_INTERVAL_FIELD - FIRST_INTERVAL_FIELD + 1;

const MSATS_LOAD_FIELD: usize = 54;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecordError {
    #[error("invalid record indicator: '{0}'")]
    InvalidIndicator(String),

    #[error("record {indicator} has {len} fields, field {index} is missing")]
    MissingField {
        indicator: i64,
        index: usize,
        len: usize,
    },

    #[error("record {indicator} field {index}: {source}")]
    Timestamp {
        indicator: i64,
        index: usize,
        #[source]
        source: TimestampError,
    },

    #[error("invalid interval value '{value}' in field {index}")]
    IntervalValue { index: usize, value: String },

    #[error("invalid interval length '{0}'")]
    IntervalLength(String),
}

/// One decoded NEM12 line.
///
/// Every variant keeps the fields it was parsed from, so failures can be
/// reported against the original text.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Header(HeaderRecord),
    MeterConfig(MeterConfigRecord),
    IntervalData(IntervalDataRecord),
    MeterRead(MeterReadRecord),
    EndOfFile(EndOfFileRecord),
    Unknown(UnknownRecord),
}

/// 100: file header.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRecord {
    pub content: Vec<String>,
    pub version_header: String,
    pub created_at: DateTime<Tz>,
    pub from_participant: String,
    pub to_participant: String,
}

/// 200: NMI data details. Sets the meter context for the 300 records after it.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterConfigRecord {
    pub content: Vec<String>,
    pub nmi: String,
    pub nmi_configuration: String,
    pub register_id: String,
    pub nmi_suffix: String,
    pub mdm_data_stream_identifier: String,
    pub meter_serial_number: String,
    pub uom: String,
    /// Minutes per interval slot.
    pub interval_length: u32,
    /// Kept as the raw CCYYMMDD text.
    pub next_scheduled_read_date: String,
}

/// 300: one day of interval data.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalDataRecord {
    pub content: Vec<String>,
    pub interval_date: NaiveDate,
    /// Midnight at the start of `interval_date` in the parse time zone.
    pub day_start: DateTime<Tz>,
    pub interval_values: Vec<f64>,
    pub quality_method: String,
    pub reason_code: String,
    pub reason_description: String,
    pub updated_at: DateTime<Tz>,
    pub msats_load_at: Option<DateTime<Tz>>,
}

/// 500: B2B details.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterReadRecord {
    pub content: Vec<String>,
    pub trans_code: String,
    pub ret_service_order: String,
    pub read_at: DateTime<Tz>,
    pub index_read: String,
}

/// 900: end of data.
#[derive(Debug, Clone, PartialEq)]
pub struct EndOfFileRecord {
    pub content: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnknownRecord {
    pub content: Vec<String>,
    pub indicator: i64,
}

impl Record {
    /// Parse the comma-split fields of one line, resolving date fields in `tz`.
    pub fn parse(content: &[String], tz: Tz) -> Result<Record, RecordError> {
        let indicator = parse_indicator(content)?;
        let fields = Fields { content, indicator };

        let record = match indicator {
            100 => Record::Header(HeaderRecord::parse(&fields, tz)?),
            200 => Record::MeterConfig(MeterConfigRecord::parse(&fields)?),
            300 => Record::IntervalData(IntervalDataRecord::parse(&fields, tz)?),
            500 => Record::MeterRead(MeterReadRecord::parse(&fields, tz)?),
            900 => Record::EndOfFile(EndOfFileRecord {
                content: content.to_vec(),
            }),
            other => Record::Unknown(UnknownRecord {
                content: content.to_vec(),
                indicator: other,
            }),
        };

        Ok(record)
    }

    /// Split a raw line on `,` and parse it.
    pub fn parse_line(line: &str, tz: Tz) -> Result<Record, RecordError> {
        Self::parse(&split_line(line), tz)
    }

    pub fn indicator(&self) -> i64 {
        match self {
            Record::Header(_) => 100,
            Record::MeterConfig(_) => 200,
            Record::IntervalData(_) => 300,
            Record::MeterRead(_) => 500,
            Record::EndOfFile(_) => 900,
            Record::Unknown(r) => r.indicator,
        }
    }

    pub fn content(&self) -> &[String] {
        match self {
            Record::Header(r) => &r.content,
            Record::MeterConfig(r) => &r.content,
            Record::IntervalData(r) => &r.content,
            Record::MeterRead(r) => &r.content,
            Record::EndOfFile(r) => &r.content,
            Record::Unknown(r) => &r.content,
        }
    }
}

/// Split one line into its fields. Empty fields, trailing ones included, are kept.
pub fn split_line(line: &str) -> Vec<String> {
    line.split(',').map(str::to_string).collect()
}

/// Read the record indicator of an already split line.
pub fn parse_indicator(content: &[String]) -> Result<i64, RecordError> {
    let raw = content.first().map(String::as_str).unwrap_or_default();
    raw.trim()
        .parse()
        .map_err(|_| RecordError::InvalidIndicator(raw.to_string()))
}

/// Bounds-checked access to the fields of one record.
struct Fields<'a> {
    content: &'a [String],
    indicator: i64,
}

impl<'a> Fields<'a> {
    fn get(&self, index: usize) -> Result<&'a str, RecordError> {
        self.content
            .get(index)
            .map(String::as_str)
            .ok_or(RecordError::MissingField {
                indicator: self.indicator,
                index,
                len: self.content.len(),
            })
    }

    fn string(&self, index: usize) -> Result<String, RecordError> {
        self.get(index).map(str::to_string)
    }

    fn timestamp(&self, index: usize, layout: DateLayout, tz: Tz) -> Result<DateTime<Tz>, RecordError> {
        let value = self.get(index)?;
        parse_in_zone(value, layout, tz).map_err(|source| RecordError::Timestamp {
            indicator: self.indicator,
            index,
            source,
        })
    }

    /// A timestamp field that may be absent or blank.
    fn optional_timestamp(
        &self,
        index: usize,
        layout: DateLayout,
        tz: Tz,
    ) -> Result<Option<DateTime<Tz>>, RecordError> {
        match self.content.get(index) {
            Some(value) if !value.trim().is_empty() => self.timestamp(index, layout, tz).map(Some),
            _ => Ok(None),
        }
    }
}

impl HeaderRecord {
    fn parse(fields: &Fields<'_>, tz: Tz) -> Result<Self, RecordError> {
        Ok(Self {
            content: fields.content.to_vec(),
            version_header: fields.string(1)?,
            created_at: fields.timestamp(2, DateLayout::DateTime12, tz)?,
            from_participant: fields.string(3)?,
            to_participant: fields.string(4)?,
        })
    }
}

impl MeterConfigRecord {
    fn parse(fields: &Fields<'_>) -> Result<Self, RecordError> {
        let raw_length = fields.get(8)?;
        let interval_length = raw_length
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|minutes| *minutes > 0)
            .ok_or_else(|| RecordError::IntervalLength(raw_length.to_string()))?;

        Ok(Self {
            content: fields.content.to_vec(),
            nmi: fields.string(1)?,
            nmi_configuration: fields.string(2)?,
            register_id: fields.string(3)?,
            nmi_suffix: fields.string(4)?,
            mdm_data_stream_identifier: fields.string(5)?,
            meter_serial_number: fields.string(6)?,
            uom: fields.string(7)?,
            interval_length,
            next_scheduled_read_date: fields.string(9)?,
        })
    }
}

impl IntervalDataRecord {
    fn parse(fields: &Fields<'_>, tz: Tz) -> Result<Self, RecordError> {
        let day_start = fields.timestamp(1, DateLayout::Date8, tz)?;

        let mut interval_values = Vec::with_capacity(INTERVAL_SLOTS);
        for index in FIRST_INTERVAL_FIELD..=LAST_INTERVAL_FIELD {
            let raw = fields.get(index)?;
            let value = raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| RecordError::IntervalValue {
                    index,
                    value: raw.to_string(),
                })?;
            interval_values.push(value);
        }

        Ok(Self {
            content: fields.content.to_vec(),
            interval_date: day_start.date_naive(),
            day_start,
            interval_values,
            quality_method: fields.string(50)?,
            reason_code: fields.string(51)?,
            reason_description: fields.string(52)?,
            updated_at: fields.timestamp(53, DateLayout::DateTime14, tz)?,
            msats_load_at: fields.optional_timestamp(MSATS_LOAD_FIELD, DateLayout::DateTime14, tz)?,
        })
    }
}

impl MeterReadRecord {
    fn parse(fields: &Fields<'_>, tz: Tz) -> Result<Self, RecordError> {
        Ok(Self {
            content: fields.content.to_vec(),
            trans_code: fields.string(1)?,
            ret_service_order: fields.string(2)?,
            read_at: fields.timestamp(3, DateLayout::DateTime14, tz)?,
            index_read: fields.string(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    const SYDNEY: Tz = chrono_tz::Australia::Sydney;

    const LINE_300: &str = "300,20050304,0,0,0,0,0,0,0,0,0,0,0,0,0.335,0.667,0.790,1.023,1.145,1.777,1.563,1.344,1.087,1.453,0.996,1.125,1.435,1.263,1.085,1.487,1.278,0.768,0.878,0.754,0.476,1.045,1.132,0.896,0.879,0.679,0.887,0.784,0.954,0.712,0.599,0.593,0.674,0.799,0.232,0.612,A,,,20050310121004,20050310182204";

    fn fixed(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    #[test]
    fn test_parse_header() {
        let line = "100,NEM12,200506081149,UNITEDDP,NEMMCO";
        let record = Record::parse_line(line, SYDNEY).unwrap();
        assert_eq!(record.indicator(), 100);
        assert_eq!(record.content(), split_line(line).as_slice());

        let Record::Header(header) = record else {
            panic!("expected header record");
        };
        assert_eq!(header.version_header, "NEM12");
        assert_eq!(header.created_at, fixed("2005-06-08T11:49:00+10:00"));
        assert_eq!(header.from_participant, "UNITEDDP");
        assert_eq!(header.to_participant, "NEMMCO");
    }

    #[test]
    fn test_parse_meter_config() {
        let line = "200,NEM1201009,E1E2,1,E1,N1,01009,kWh,30,20050610";
        let record = Record::parse_line(line, SYDNEY).unwrap();
        assert_eq!(record.indicator(), 200);

        let Record::MeterConfig(config) = record else {
            panic!("expected meter config record");
        };
        assert_eq!(config.nmi, "NEM1201009");
        assert_eq!(config.nmi_configuration, "E1E2");
        assert_eq!(config.register_id, "1");
        assert_eq!(config.nmi_suffix, "E1");
        assert_eq!(config.mdm_data_stream_identifier, "N1");
        assert_eq!(config.meter_serial_number, "01009");
        assert_eq!(config.uom, "kWh");
        assert_eq!(config.interval_length, 30);
        assert_eq!(config.next_scheduled_read_date, "20050610");
    }

    #[test]
    fn test_parse_interval_data() {
        let record = Record::parse_line(LINE_300, SYDNEY).unwrap();
        assert_eq!(record.indicator(), 300);

        let Record::IntervalData(data) = record else {
            panic!("expected interval data record");
        };
        assert_eq!(data.interval_date, NaiveDate::from_ymd_opt(2005, 3, 4).unwrap());
        assert_eq!(data.day_start, fixed("2005-03-04T00:00:00+11:00"));
        assert_eq!(data.interval_values.len(), INTERVAL_SLOTS);
        assert_eq!(data.interval_values[0], 0.0);
        assert_eq!(data.interval_values[12], 0.335);
        assert_eq!(data.interval_values[47], 0.612);
        assert_eq!(data.quality_method, "A");
        assert_eq!(data.reason_code, "");
        assert_eq!(data.reason_description, "");
        assert_eq!(data.updated_at, fixed("2005-03-10T12:10:04+11:00"));
        assert_eq!(data.msats_load_at, Some(fixed("2005-03-10T18:22:04+11:00").with_timezone(&SYDNEY)));
    }

    #[test]
    fn test_interval_data_without_msats_field() {
        let line = LINE_300.rsplit_once(',').unwrap().0;
        let Record::IntervalData(data) = Record::parse_line(line, SYDNEY).unwrap() else {
            panic!("expected interval data record");
        };
        assert!(data.msats_load_at.is_none());
    }

    #[test]
    fn test_interval_data_with_blank_msats_field() {
        let line = format!("{},", LINE_300.rsplit_once(',').unwrap().0);
        let Record::IntervalData(data) = Record::parse_line(&line, SYDNEY).unwrap() else {
            panic!("expected interval data record");
        };
        assert!(data.msats_load_at.is_none());
    }

    #[test]
    fn test_interval_data_non_numeric_value() {
        let line = LINE_300.replacen("0.335", "abc", 1);
        let err = Record::parse_line(&line, SYDNEY).unwrap_err();
        assert_eq!(
            err,
            RecordError::IntervalValue {
                index: 14,
                value: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_interval_data_too_few_fields() {
        let err = Record::parse_line("300,20050304,0,0,0", SYDNEY).unwrap_err();
        assert_eq!(
            err,
            RecordError::MissingField {
                indicator: 300,
                index: 5,
                len: 5
            }
        );
    }

    #[test]
    fn test_interval_data_bad_date() {
        let line = LINE_300.replacen("20050304", "20050231", 1);
        let err = Record::parse_line(&line, SYDNEY).unwrap_err();
        assert!(matches!(err, RecordError::Timestamp { indicator: 300, index: 1, .. }));
    }

    #[test]
    fn test_parse_meter_read() {
        let line = "500,O,S01009,20050310121004,";
        let record = Record::parse_line(line, SYDNEY).unwrap();
        assert_eq!(record.indicator(), 500);

        let Record::MeterRead(read) = record else {
            panic!("expected meter read record");
        };
        assert_eq!(read.trans_code, "O");
        assert_eq!(read.ret_service_order, "S01009");
        assert_eq!(read.read_at, fixed("2005-03-10T12:10:04+11:00"));
        assert_eq!(read.index_read, "");
    }

    #[test]
    fn test_parse_end_of_file() {
        let record = Record::parse_line("900", SYDNEY).unwrap();
        assert_eq!(record.indicator(), 900);
        assert!(matches!(record, Record::EndOfFile(_)));
    }

    #[test]
    fn test_unknown_indicator_passes_through() {
        let line = "999,some,thing";
        let record = Record::parse_line(line, SYDNEY).unwrap();
        assert_eq!(record.indicator(), 999);
        let Record::Unknown(unknown) = record else {
            panic!("expected unknown record");
        };
        assert_eq!(unknown.content, vec!["999", "some", "thing"]);
    }

    #[test]
    fn test_invalid_indicator() {
        let err = Record::parse_line("abc,1,2", SYDNEY).unwrap_err();
        assert_eq!(err, RecordError::InvalidIndicator("abc".to_string()));

        let err = Record::parse_line("", SYDNEY).unwrap_err();
        assert_eq!(err, RecordError::InvalidIndicator(String::new()));
    }

    #[test]
    fn test_header_missing_field() {
        let err = Record::parse_line("100,NEM12,200506081149,UNITEDDP", SYDNEY).unwrap_err();
        assert_eq!(
            err,
            RecordError::MissingField {
                indicator: 100,
                index: 4,
                len: 4
            }
        );
    }

    #[test]
    fn test_meter_config_invalid_interval_length() {
        for length in ["", "abc", "0", "-5", "7.5"] {
            let line = format!("200,NEM1201009,E1E2,1,E1,N1,01009,kWh,{},20050610", length);
            let err = Record::parse_line(&line, SYDNEY).unwrap_err();
            assert_eq!(err, RecordError::IntervalLength(length.to_string()));
        }
    }

    #[test]
    fn test_reparse_of_content_is_equal() {
        let lines = [
            "100,NEM12,200506081149,UNITEDDP,NEMMCO",
            "200,NEM1201009,E1E2,1,E1,N1,01009,kWh,30,20050610",
            LINE_300,
            "500,O,S01009,20050310121004,",
            "900",
        ];
        for line in lines {
            let record = Record::parse_line(line, SYDNEY).unwrap();
            let again = Record::parse(record.content(), SYDNEY).unwrap();
            assert_eq!(record, again);
        }
    }

    #[test]
    fn test_trailing_empty_fields_preserved() {
        assert_eq!(split_line("500,O,,"), vec!["500", "O", "", ""]);
    }
}

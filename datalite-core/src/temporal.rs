use crate::{Error, Result, truncate_long};
use time::{
    Date, PrimitiveDateTime, Time, format_description::BorrowedFormatItem,
    macros::format_description,
};

// Temporal values are stored as text, written with the first format of each list.
const DATE_FORMATS: &[&[BorrowedFormatItem<'static>]] =
    &[format_description!("[year]-[month]-[day]")];
const TIME_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[hour]:[minute]:[second].[subsecond]"),
    format_description!("[hour]:[minute]:[second]"),
    format_description!("[hour]:[minute]"),
];
const TIMESTAMP_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
];

macro_rules! temporal_codec {
    ($format:ident, $parse:ident, $ty:ty, $formats:ident, $name:literal) => {
        pub fn $format(value: &$ty) -> Result<String> {
            value
                .format($formats[0])
                .map_err(|e| Error::msg(format!("Cannot format {} `{}`: {}", $name, value, e)))
        }

        pub fn $parse(input: &str) -> Result<$ty> {
            let input = input.trim();
            $formats
                .iter()
                .find_map(|format| <$ty>::parse(input, *format).ok())
                .ok_or_else(|| {
                    Error::msg(format!(
                        "Cannot parse `{}` as a {}",
                        truncate_long!(input),
                        $name
                    ))
                })
        }
    };
}

temporal_codec!(format_date, parse_date, Date, DATE_FORMATS, "date");
temporal_codec!(format_time, parse_time, Time, TIME_FORMATS, "time");
temporal_codec!(
    format_timestamp,
    parse_timestamp,
    PrimitiveDateTime,
    TIMESTAMP_FORMATS,
    "timestamp"
);

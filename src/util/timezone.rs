use chrono::{DateTime, Datelike, TimeZone, Utc};
use chrono_tz::Tz;
use time::{
    Date, Month, OffsetDateTime, UtcOffset,
    error::InvalidFormatDescription,
    format_description::{self, OwnedFormatItem},
};

pub const DEFAULT_DATE_FORMAT: &str = "[month padding:none]/[day padding:none]/[year]";

pub fn localized_datetime(time: OffsetDateTime, tz: Tz) -> DateTime<Tz> {
    let utc = time.to_offset(UtcOffset::UTC);
    let seconds = utc.unix_timestamp();
    let nanos: u32 = utc.nanosecond();
    let datetime_utc = DateTime::<Utc>::from_timestamp(seconds, nanos)
        .or_else(|| DateTime::<Utc>::from_timestamp(seconds, 0))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    tz.from_utc_datetime(&datetime_utc.naive_utc())
}

/// Calendar date of `time` as seen in `tz`; falls back to the UTC date.
pub fn localized_date(time: OffsetDateTime, tz: Tz) -> Date {
    let localized = localized_datetime(time, tz);
    let converted = u8::try_from(localized.month())
        .ok()
        .and_then(|month| Month::try_from(month).ok())
        .zip(u8::try_from(localized.day()).ok())
        .and_then(|(month, day)| Date::from_calendar_date(localized.year(), month, day).ok());
    converted.unwrap_or_else(|| time.to_offset(UtcOffset::UTC).date())
}

/// Parse a `time` format description once so it can be reused per render.
pub fn parse_date_format(pattern: &str) -> Result<OwnedFormatItem, InvalidFormatDescription> {
    format_description::parse_owned::<1>(pattern)
}

#[derive(Debug, Clone)]
pub struct DateDisplay {
    timezone: Tz,
    format: OwnedFormatItem,
}

impl DateDisplay {
    pub fn new(timezone: Tz, format: OwnedFormatItem) -> Self {
        Self { timezone, format }
    }

    /// Local calendar date rendered with the configured format.
    pub fn format(&self, time: OffsetDateTime) -> String {
        let date = localized_date(time, self.timezone);
        date.format(&self.format)
            .unwrap_or_else(|_| date.to_string())
    }

    /// RFC 3339 timestamp in the configured zone, for `<time datetime>`.
    pub fn iso(&self, time: OffsetDateTime) -> String {
        localized_datetime(time, self.timezone).to_rfc3339()
    }
}

impl Default for DateDisplay {
    fn default() -> Self {
        let format = parse_date_format(DEFAULT_DATE_FORMAT)
            .unwrap_or_else(|_| OwnedFormatItem::Compound(Box::new([])));
        Self::new(Tz::UTC, format)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn default_format_matches_us_locale_style() {
        let display = DateDisplay::default();
        assert_eq!(display.format(datetime!(2024-03-05 09:00 UTC)), "3/5/2024");
    }

    #[test]
    fn timezone_shifts_the_calendar_date() {
        let format = parse_date_format("[year]-[month]-[day]").expect("valid format");
        let display = DateDisplay::new(chrono_tz::Asia::Tokyo, format);
        assert_eq!(display.format(datetime!(2024-03-05 20:00 UTC)), "2024-03-06");
        assert!(display.iso(datetime!(2024-03-05 20:00 UTC)).ends_with("+09:00"));
    }

    #[test]
    fn invalid_format_is_reported() {
        assert!(parse_date_format("[not-a-component]").is_err());
    }
}

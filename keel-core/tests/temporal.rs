#[cfg(test)]
mod tests {
    use keel_core::{
        AsValue, Value, ZERO_TIMESTAMP, format_time, format_timestamp, scan_date, scan_time,
        scan_timestamp, scan_timestamptz,
    };
    use time::{
        PrimitiveDateTime,
        macros::{date, datetime, time},
    };

    fn text(value: &str) -> Value {
        Value::Varchar(Some(value.into()))
    }

    #[test]
    fn timestamp_layouts() {
        let expected = datetime!(2024-05-17 13:45:10);
        for layout in [
            "2024-05-17 13:45:10",
            "2024-05-17T13:45:10",
            "2024-05-17T13:45:10Z",
            "2024-05-17 15:45:10+02:00",
        ] {
            assert_eq!(scan_timestamp(&text(layout)).unwrap(), expected, "{layout}");
        }
        assert_eq!(
            scan_timestamp(&text("2024-05-17 13:45:10.250")).unwrap(),
            datetime!(2024-05-17 13:45:10.25)
        );
        assert_eq!(
            scan_timestamp(&text("2024-05-17")).unwrap(),
            datetime!(2024-05-17 0:00)
        );
        assert!(scan_timestamp(&text("yesterday")).is_err());
    }

    #[test]
    fn timestamp_from_bytes_and_epoch() {
        let bytes = Value::Blob(Some(b"2001-02-03 04:05:06".to_vec().into()));
        assert_eq!(
            scan_timestamp(&bytes).unwrap(),
            datetime!(2001-02-03 04:05:06)
        );
        assert_eq!(
            scan_timestamp(&Value::Int64(Some(86_400))).unwrap(),
            datetime!(1970-01-02 0:00)
        );
        assert_eq!(
            scan_timestamptz(&Value::Int64(Some(0))).unwrap(),
            datetime!(1970-01-01 0:00 UTC)
        );
    }

    #[test]
    fn zero_sentinel() {
        assert_eq!(
            scan_timestamp(&text("0000-00-00 00:00:00")).unwrap(),
            ZERO_TIMESTAMP
        );
        assert_eq!(scan_timestamp(&text("0000-00-00")).unwrap(), ZERO_TIMESTAMP);
        assert_eq!(scan_date(&text("0000-00-00")).unwrap(), ZERO_TIMESTAMP.date());
        assert_eq!(
            PrimitiveDateTime::try_from_value(text("0000-00-00 00:00:00")).unwrap(),
            ZERO_TIMESTAMP
        );
        assert!(Value::Timestamp(Some(ZERO_TIMESTAMP)).is_zero());
    }

    #[test]
    fn native_values_convert_between_kinds() {
        let moment = datetime!(2030-12-31 23:59:59);
        assert_eq!(
            scan_date(&Value::Timestamp(Some(moment))).unwrap(),
            date!(2030 - 12 - 31)
        );
        assert_eq!(
            scan_time(&Value::Timestamp(Some(moment))).unwrap(),
            time!(23:59:59)
        );
        assert_eq!(
            scan_timestamptz(&Value::Timestamp(Some(moment))).unwrap(),
            moment.assume_utc()
        );
        assert!(scan_date(&Value::Boolean(Some(true))).is_err());
    }

    #[test]
    fn times() {
        assert_eq!(scan_time(&text("08:30")).unwrap(), time!(08:30));
        assert_eq!(scan_time(&text("08:30:15")).unwrap(), time!(08:30:15));
        assert_eq!(
            scan_time(&text("08:30:15.5")).unwrap(),
            time!(08:30:15.5)
        );
        assert!(scan_time(&text("25:00")).is_err());
    }

    #[test]
    fn formatting_parses_back() {
        let moment = datetime!(2022-02-02 02:02:02.123456);
        let formatted = format_timestamp(&moment);
        assert_eq!(formatted, "2022-02-02 02:02:02.123456");
        assert_eq!(scan_timestamp(&text(&formatted)).unwrap(), moment);
        assert_eq!(format_time(&time!(07:00)), "07:00:00.000000");
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Mutex};
    use strata_core::{
        Clock, DataError, IdGenerator, MAX_SEQUENCE, Value, decode_date, decode_date_str,
        decode_value, min_id_for_date, min_id_for_time,
    };
    use time::{
        Duration, PrimitiveDateTime,
        macros::{date, datetime},
    };

    /// Clock standing still until asked to sleep.
    struct FakeClock {
        now: Mutex<PrimitiveDateTime>,
        sleeps: Mutex<u32>,
    }

    impl FakeClock {
        fn at(now: PrimitiveDateTime) -> Self {
            Self {
                now: Mutex::new(now),
                sleeps: Mutex::new(0),
            }
        }
        fn advance(&self, duration: Duration) {
            *self.now.lock().unwrap() += duration;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> PrimitiveDateTime {
            *self.now.lock().unwrap()
        }
        fn sleep(&self, duration: std::time::Duration) {
            *self.sleeps.lock().unwrap() += 1;
            self.advance(Duration::try_from(duration).unwrap());
        }
    }

    fn sequence(id: i64) -> i64 {
        id / 100 % 100_000
    }

    #[test]
    fn identifier_layout() {
        let generator =
            IdGenerator::with_clock(7, FakeClock::at(datetime!(2023-11-15 10:00:00))).unwrap();
        let (first, issued_at) = generator.next_id();
        assert_eq!(first, 231115_36000_00000_07);
        assert_eq!(issued_at, datetime!(2023-11-15 10:00:00));
        assert_eq!(first.to_string().len(), 18);
        let (second, _) = generator.next_id();
        assert_eq!(second, 231115_36000_00001_07);
    }

    #[test]
    fn identifier_monotonic() {
        let generator =
            IdGenerator::with_clock(3, FakeClock::at(datetime!(2024-02-29 23:59:58.5))).unwrap();
        let mut last = 0;
        for i in 0..1_000 {
            if i == 500 {
                generator.clock().advance(Duration::seconds(1));
            }
            let (id, _) = generator.next_id();
            assert!(id > last, "{} is not greater than {}", id, last);
            last = id;
        }
        assert_eq!(sequence(last), 499);
    }

    #[test]
    fn identifier_decodes_today() {
        let generator = IdGenerator::new(1).unwrap();
        let (id, issued_at) = generator.next_id();
        let decoded = decode_date(id).unwrap();
        assert_eq!(decoded.date(), issued_at.date());
        assert_eq!(decoded.hour(), issued_at.hour());
        assert_eq!(decoded.minute(), issued_at.minute());
        assert_eq!(decoded.second(), issued_at.second());
    }

    #[test]
    fn identifier_overflow_waits() {
        let generator =
            IdGenerator::with_clock(0, FakeClock::at(datetime!(2023-11-15 10:00:00.25))).unwrap();
        let mut last = 0;
        for _ in 0..=MAX_SEQUENCE {
            last = generator.next_id().0;
        }
        assert_eq!(sequence(last), MAX_SEQUENCE as i64);
        assert_eq!(*generator.clock().sleeps.lock().unwrap(), 0);
        let (next, issued_at) = generator.next_id();
        assert_eq!(*generator.clock().sleeps.lock().unwrap(), 1);
        assert_eq!(issued_at.second(), 1);
        assert_eq!(sequence(next), 0);
        assert_eq!(next, 231115_36001_00000_00);
        assert!(next > last);
    }

    #[test]
    fn identifier_point_in_time() {
        let generator =
            IdGenerator::with_clock(7, FakeClock::at(datetime!(2023-11-15 10:00:00))).unwrap();
        let today = generator.next_id_at(date!(2023 - 11 - 15)).unwrap();
        assert_eq!(today, 231115_36000_00000_07);
        let past = generator.next_id_at(date!(2023 - 01 - 02)).unwrap();
        assert_eq!(past, 230102_36000_00000_57);
        let past = generator.next_id_at(date!(2022 - 06 - 30)).unwrap();
        assert_eq!(past, 220630_36000_00001_57);
        // The two counters are independent
        let (current, _) = generator.next_id();
        assert_eq!(current, 231115_36000_00001_07);
        assert_eq!(
            decode_date(past).unwrap(),
            datetime!(2022-06-30 10:00:00)
        );
    }

    #[test]
    fn identifier_point_in_time_overflow() {
        let generator =
            IdGenerator::with_clock(2, FakeClock::at(datetime!(2024-03-01 08:00:00.5))).unwrap();
        let day = date!(2023 - 11 - 15);
        let mut issued = HashSet::new();
        let mut issue = |count: u32| {
            for _ in 0..count {
                let id = generator.next_id_at(day).unwrap();
                assert!(issued.insert(id), "{} was issued twice", id);
            }
        };
        // First run fills 08:00:00, the overflow moves to 08:00:01
        issue(MAX_SEQUENCE + 1);
        assert_eq!(*generator.clock().sleeps.lock().unwrap(), 0);
        issue(5);
        assert_eq!(*generator.clock().sleeps.lock().unwrap(), 1);
        // Second run continues in 08:00:02 and overflows there
        generator.clock().advance(Duration::seconds(1));
        assert_eq!(generator.clock().now().second(), 2);
        issue(MAX_SEQUENCE + 1 - 5);
        issue(10);
        assert_eq!(*generator.clock().sleeps.lock().unwrap(), 2);
        assert_eq!(generator.clock().now().second(), 3);
        // A second with no identifiers issued yet starts over without waiting
        issue(MAX_SEQUENCE + 1 - 10);
        generator.clock().advance(Duration::seconds(1));
        issue(1);
        assert_eq!(*generator.clock().sleeps.lock().unwrap(), 2);
        assert_eq!(issued.len(), 3 * (MAX_SEQUENCE as usize + 1) + 1);
    }

    #[test]
    fn identifier_year_range() {
        let generator =
            IdGenerator::with_clock(1, FakeClock::at(datetime!(2023-11-15 10:00:00))).unwrap();
        let out_of_range = |error: anyhow::Error| {
            assert!(matches!(
                error.downcast_ref::<DataError>(),
                Some(DataError::InvalidArgument(..))
            ));
        };
        out_of_range(generator.next_id_at(date!(1999 - 12 - 31)).unwrap_err());
        out_of_range(generator.next_id_at(date!(2100 - 01 - 01)).unwrap_err());
        out_of_range(min_id_for_date(date!(1999 - 12 - 31)).unwrap_err());
        out_of_range(min_id_for_time(datetime!(2100-01-01 00:00:00)).unwrap_err());
        let early = generator.next_id_at(date!(2005 - 03 - 09)).unwrap();
        assert_eq!(early, 50309_36000_00000_51);
        assert_eq!(decode_date(early).unwrap(), datetime!(2005-03-09 10:00:00));
        assert_eq!(
            decode_value(&Value::Int64(Some(early))).unwrap(),
            datetime!(2005-03-09 10:00:00)
        );
    }

    #[test]
    fn identifier_node_range() {
        let error = IdGenerator::new(50).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<DataError>(),
            Some(DataError::InvalidArgument(..))
        ));
        assert!(IdGenerator::new(49).is_ok());
    }

    #[test]
    fn identifier_min_for_date() {
        assert_eq!(
            min_id_for_date(date!(2023 - 11 - 15)).unwrap(),
            231115_00000_00000_00
        );
        assert_eq!(
            min_id_for_time(datetime!(2023-11-15 00:01:40.7)).unwrap(),
            231115_00100_00000_00
        );
        assert_eq!(
            decode_date(min_id_for_date(date!(2023 - 11 - 15)).unwrap()).unwrap(),
            datetime!(2023-11-15 00:00:00)
        );
    }

    #[test]
    fn identifier_invalid() {
        let invalid = |v: &str| {
            let error = decode_date_str(v).unwrap_err();
            assert!(
                matches!(
                    error.downcast_ref::<DataError>(),
                    Some(DataError::InvalidIdentifier(..))
                ),
                "{} should be invalid",
                v
            );
        };
        invalid("23111536000000000");
        invalid("2311153600000000007");
        invalid("23111536000000000a");
        invalid("231315360000000007");
        invalid("230230360000000007");
        invalid("231115900000000007");
        invalid("");
        assert!(decode_date_str("231115360000000007").is_ok());
    }

    #[test]
    fn identifier_from_value() {
        assert_eq!(
            decode_value(&Value::Int64(Some(231115_36000_00000_07))).unwrap(),
            datetime!(2023-11-15 10:00:00)
        );
        assert_eq!(
            decode_value(&Value::Varchar(Some("231115360000000007".into()))).unwrap(),
            datetime!(2023-11-15 10:00:00)
        );
        assert!(decode_value(&Value::Null).is_err());
    }

    #[test]
    fn unique_id() {
        let id = IdGenerator::new_unique_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|v| v.is_ascii_digit() || v.is_ascii_uppercase()));
        assert_ne!(id, IdGenerator::new_unique_id());
    }
}

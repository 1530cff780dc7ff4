use crate::{DataError, Result, Value};
use std::{
    sync::{Mutex, PoisonError},
    thread,
};
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Highest sequence number issued within one second.
pub const MAX_SEQUENCE: u32 = 99_999;
/// Node tags at or above this value belong to point-in-time generators.
pub const POINT_IN_TIME_NODE: u8 = 50;
/// Digits of an identifier.
pub const IDENTIFIER_LENGTH: usize = 18;

/// Source of the local wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> PrimitiveDateTime;
    fn sleep(&self, duration: std::time::Duration);
}

/// Local time of the process, UTC when the offset cannot be determined.
#[derive(Default, Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        PrimitiveDateTime::new(now.date(), now.time())
    }
    fn sleep(&self, duration: std::time::Duration) {
        thread::sleep(duration);
    }
}

#[derive(Default, Debug)]
struct Counter {
    sequence: u32,
    reset_at: Option<PrimitiveDateTime>,
    issued_at: Option<PrimitiveDateTime>,
}

/// Issues 18 digits identifiers: `YYMMDD`, seconds since midnight (5), sequence (5) and
/// node tag (2).
///
/// Identifiers issued for the current time are ordered. The ones issued for another day
/// ([`IdGenerator::next_id_at`]) take the date from the argument but the time of day from the
/// clock, and use their own counter with the node tag shifted by 50.
#[derive(Debug)]
pub struct IdGenerator<C: Clock = SystemClock> {
    node: u8,
    clock: C,
    current: Mutex<Counter>,
    point_in_time: Mutex<Counter>,
}

impl IdGenerator<SystemClock> {
    pub fn new(node: u8) -> Result<Self> {
        Self::with_clock(node, SystemClock)
    }

    /// Random 128-bit identifier, as 32 upper-case hexadecimal digits.
    pub fn new_unique_id() -> String {
        Uuid::new_v4().simple().to_string().to_uppercase()
    }
}

impl<C: Clock> IdGenerator<C> {
    pub fn with_clock(node: u8, clock: C) -> Result<Self> {
        if node >= POINT_IN_TIME_NODE {
            return Err(DataError::InvalidArgument(format!(
                "The node tag must be between 0 and {}, found {}",
                POINT_IN_TIME_NODE - 1,
                node
            ))
            .raise());
        }
        Ok(Self {
            node,
            clock,
            current: Default::default(),
            point_in_time: Default::default(),
        })
    }

    pub fn node(&self) -> u8 {
        self.node
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// New identifier for the current time, together with the time it encodes.
    ///
    /// Blocks the calling thread until the next second when the sequence of the current
    /// one is exhausted.
    pub fn next_id(&self) -> (i64, PrimitiveDateTime) {
        let mut counter = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            let now = self.clock.now();
            let second = truncate_to_second(now);
            if counter.reset_at != Some(second) {
                counter.sequence = 0;
                counter.reset_at = Some(second);
            } else if counter.sequence > MAX_SEQUENCE {
                log::warn!(
                    "Identifier sequence exhausted at {}, waiting for the next second",
                    second
                );
                self.clock.sleep(until_next_second(now));
                continue;
            }
            let id = encode(now, counter.sequence, self.node);
            counter.sequence += 1;
            return (id, now);
        }
    }

    /// New identifier encoding `date`, today falls back to [`IdGenerator::next_id`].
    ///
    /// The sequence is shared by every date and restarts only in a second in which no
    /// point-in-time identifier was issued yet.
    pub fn next_id_at(&self, date: Date) -> Result<i64> {
        check_year(date)?;
        if date == self.clock.now().date() {
            return Ok(self.next_id().0);
        }
        let mut counter = self
            .point_in_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut now = self.clock.now();
        if counter.sequence > MAX_SEQUENCE {
            while counter
                .issued_at
                .is_some_and(|v| truncate_to_second(now) <= v)
            {
                log::warn!(
                    "Point-in-time sequence exhausted at {}, waiting for the next second",
                    truncate_to_second(now)
                );
                self.clock.sleep(until_next_second(now));
                now = self.clock.now();
            }
            counter.sequence = 0;
            counter.reset_at = Some(truncate_to_second(now));
        }
        let at = PrimitiveDateTime::new(date, now.time());
        let id = encode(at, counter.sequence, self.node + POINT_IN_TIME_NODE);
        counter.sequence += 1;
        counter.issued_at = Some(truncate_to_second(now));
        Ok(id)
    }
}

fn check_year(date: Date) -> Result<()> {
    if !(2000..=2099).contains(&date.year()) {
        return Err(DataError::InvalidArgument(format!(
            "Identifiers encode dates between 2000 and 2099, found {}",
            date
        ))
        .raise());
    }
    Ok(())
}

fn truncate_to_second(time: PrimitiveDateTime) -> PrimitiveDateTime {
    time.replace_nanosecond(0).unwrap_or(time)
}

fn until_next_second(now: PrimitiveDateTime) -> std::time::Duration {
    std::time::Duration::from_nanos(1_000_000_000 - now.nanosecond() as u64)
        + std::time::Duration::from_millis(1)
}

fn encode(time: PrimitiveDateTime, sequence: u32, node: u8) -> i64 {
    let date = time.date();
    let yymmdd =
        (date.year() % 100) as i64 * 10_000 + u8::from(date.month()) as i64 * 100 + date.day() as i64;
    let seconds = time.time() - Time::MIDNIGHT;
    yymmdd * 1_000_000_000_000
        + seconds.whole_seconds() * 10_000_000
        + sequence as i64 * 100
        + node as i64
}

/// Smallest identifier of a day, useful as a lower bound when filtering by date.
pub fn min_id_for_date(date: Date) -> Result<i64> {
    check_year(date)?;
    Ok(encode(date.midnight(), 0, 0))
}

/// Smallest identifier issued at `time` (to the second).
pub fn min_id_for_time(time: PrimitiveDateTime) -> Result<i64> {
    check_year(time.date())?;
    Ok(encode(time, 0, 0))
}

/// Time encoded in the identifier (date and seconds since midnight).
pub fn decode_date(id: i64) -> Result<PrimitiveDateTime> {
    decode_date_str(&format!("{:018}", id))
}

pub fn decode_date_str(id: &str) -> Result<PrimitiveDateTime> {
    let invalid = || DataError::InvalidIdentifier(id.into()).raise();
    if id.len() != IDENTIFIER_LENGTH || !id.bytes().all(|v| v.is_ascii_digit()) {
        return Err(invalid());
    }
    let number = |range: std::ops::Range<usize>| id[range].parse::<u32>().map_err(|_| invalid());
    let year = 2000 + number(0..2)? as i32;
    let month = Month::try_from(number(2..4)? as u8).map_err(|_| invalid())?;
    let day = number(4..6)? as u8;
    let seconds = number(6..11)?;
    if seconds >= 86_400 {
        return Err(invalid());
    }
    let date = Date::from_calendar_date(year, month, day).map_err(|_| invalid())?;
    Ok(date.midnight() + Duration::seconds(seconds as i64))
}

/// Decodes an identifier held by a value, integer or text.
pub fn decode_value(value: &Value) -> Result<PrimitiveDateTime> {
    match value {
        Value::Varchar(Some(v)) => decode_date_str(v.trim()),
        Value::Decimal(Some(v)) => decode_date_str(&format!("{:0>18}", v.trunc().to_string())),
        v => match v.as_i128() {
            Some(v) => decode_date_str(&format!("{:018}", v)),
            None => Err(DataError::InvalidIdentifier(format!("{:?}", v)).raise()),
        },
    }
}

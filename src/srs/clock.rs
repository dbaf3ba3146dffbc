//! Canonical study clock.
//!
//! Every scheduling and due-set computation receives its notion of "today"
//! and "now" from a [`StudyClock`] instead of reading ambient system time.
//! The calendar day is taken in one fixed offset (UTC unless configured),
//! so two learners in different timezones share the same day boundary.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudyClock {
  pub today: NaiveDate,
  pub now: DateTime<Utc>,
  offset: FixedOffset,
}

impl StudyClock {
  /// Clock for an instant, with the calendar day taken in `offset`.
  pub fn at(now: DateTime<Utc>, offset: FixedOffset) -> Self {
    Self {
      today: now.with_timezone(&offset).date_naive(),
      now,
      offset,
    }
  }

  /// Current time, calendar day in UTC.
  pub fn utc_now() -> Self {
    Self::at(Utc::now(), Utc.fix())
  }

  /// Current time, calendar day in a fixed offset given in minutes east of UTC.
  ///
  /// Out-of-range offsets fall back to UTC.
  pub fn with_offset_minutes(minutes: i32) -> Self {
    let offset = minutes
      .checked_mul(60)
      .and_then(FixedOffset::east_opt)
      .unwrap_or_else(|| {
        tracing::warn!("UTC offset of {} minutes out of range, using UTC", minutes);
        Utc.fix()
      });
    Self::at(Utc::now(), offset)
  }

  /// Deterministic clock pinned to midnight UTC of `today` (tests, replays).
  pub fn fixed(today: NaiveDate) -> Self {
    Self {
      today,
      now: today.and_time(NaiveTime::default()).and_utc(),
      offset: Utc.fix(),
    }
  }

  /// Offset the calendar day is taken in.
  pub fn offset(&self) -> FixedOffset {
    self.offset
  }

  /// Instant at which `today` began in the clock's offset.
  pub fn day_start(&self) -> DateTime<Utc> {
    let local_midnight = self.today.and_time(NaiveTime::MIN);
    local_midnight
      .checked_sub_signed(TimeDelta::seconds(i64::from(self.offset.local_minus_utc())))
      .unwrap_or(NaiveDateTime::MIN)
      .and_utc()
  }

  /// Date `days` after today, saturating at the calendar maximum.
  pub fn days_from_today(&self, days: u32) -> NaiveDate {
    self
      .today
      .checked_add_days(Days::new(u64::from(days)))
      .unwrap_or(NaiveDate::MAX)
  }

  /// Same clock advanced by whole days (simulating later sittings).
  pub fn advance_days(&self, days: u32) -> Self {
    Self {
      today: self.days_from_today(days),
      now: self.now + chrono::Duration::days(i64::from(days)),
      offset: self.offset,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn test_fixed_clock_is_midnight_utc() {
    let clock = StudyClock::fixed(date(2025, 1, 31));
    assert_eq!(clock.today, date(2025, 1, 31));
    assert_eq!(clock.now.date_naive(), date(2025, 1, 31));
    assert_eq!(clock.now.timestamp() % 86_400, 0);
  }

  #[test]
  fn test_days_from_today_crosses_month() {
    let clock = StudyClock::fixed(date(2025, 1, 31));
    assert_eq!(clock.days_from_today(0), date(2025, 1, 31));
    assert_eq!(clock.days_from_today(1), date(2025, 2, 1));
    assert_eq!(clock.days_from_today(29), date(2025, 3, 1));
  }

  #[test]
  fn test_days_from_today_saturates() {
    let clock = StudyClock::fixed(NaiveDate::MAX);
    assert_eq!(clock.days_from_today(10), NaiveDate::MAX);
  }

  #[test]
  fn test_offset_shifts_calendar_day() {
    let instant = date(2025, 6, 1).and_hms_opt(23, 30, 0).unwrap().and_utc();

    let utc = StudyClock::at(instant, FixedOffset::east_opt(0).unwrap());
    assert_eq!(utc.today, date(2025, 6, 1));

    let east = StudyClock::at(instant, FixedOffset::east_opt(2 * 3600).unwrap());
    assert_eq!(east.today, date(2025, 6, 2));

    let west = StudyClock::at(instant, FixedOffset::west_opt(5 * 3600).unwrap());
    assert_eq!(west.today, date(2025, 6, 1));
  }

  #[test]
  fn test_day_start_in_offset() {
    let instant = date(2025, 6, 1).and_hms_opt(23, 30, 0).unwrap().and_utc();
    let east = StudyClock::at(instant, FixedOffset::east_opt(2 * 3600).unwrap());
    // 2025-06-02 00:00 at +02:00
    assert_eq!(east.day_start(), date(2025, 6, 1).and_hms_opt(22, 0, 0).unwrap().and_utc());

    let fixed = StudyClock::fixed(date(2025, 1, 31));
    assert_eq!(fixed.day_start(), fixed.now);
  }

  #[test]
  fn test_out_of_range_offset_uses_utc_day_start() {
    let clock = StudyClock::with_offset_minutes(100 * 60);
    assert_eq!(clock.offset(), Utc.fix());
    assert_eq!(clock.day_start(), clock.today.and_time(NaiveTime::MIN).and_utc());

    let clock = StudyClock::with_offset_minutes(i32::MAX);
    assert_eq!(clock.offset(), Utc.fix());
  }

  #[test]
  fn test_advance_days_moves_both_fields() {
    let clock = StudyClock::fixed(date(2025, 1, 1)).advance_days(3);
    assert_eq!(clock.today, date(2025, 1, 4));
    assert_eq!(clock.now.date_naive(), date(2025, 1, 4));
  }
}

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  Local,
  Months,
  NaiveDate,
  NaiveDateTime,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

pub const DAY_FORMAT: &str = "%Y-%m-%d";

const SHORT_DAY_FORMAT: &str =
  "%d.%m.%y";

const MONTH_NAMES_SHORT: [&str; 12] = [
  "Jan", "Feb", "Mar", "Apr", "May",
  "Jun", "Jul", "Aug", "Sep", "Oct",
  "Nov", "Dec"
];

/// Parses a wire date into a calendar
/// day. Timestamps are accepted and
/// their time of day is dropped.
pub fn parse_day(
  raw: &str
) -> Option<NaiveDate> {
  let token = raw.trim();
  if token.is_empty() {
    return None;
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, DAY_FORMAT
    )
  {
    return Some(date);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Some(dt.date_naive());
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Some(ndt.date());
    }
  }

  None
}

/// Inclusive day count between two
/// wire dates; `end = None` counts up to
/// `today`. Either date failing to parse
/// yields 0.
pub fn days_between(
  start: &str,
  end: Option<&str>,
  today: NaiveDate
) -> i64 {
  let Some(first) = parse_day(start)
  else {
    return 0;
  };
  let second = match end {
    | Some(raw) => {
      match parse_day(raw) {
        | Some(day) => day,
        | None => return 0
      }
    }
    | None => today
  };

  (second - first).num_days().abs() + 1
}

/// Coarse display duration: 30-day
/// months and 365-day years.
pub fn humanize_duration(
  days: i64
) -> String {
  if days < 30 {
    return format!("{days} days");
  }

  if days < 365 {
    let months = days / 30;
    let remaining_days = days % 30;
    return if remaining_days > 0 {
      format!(
        "{months} months, \
         {remaining_days} days"
      )
    } else {
      format!("{months} months")
    };
  }

  let years = days / 365;
  let remaining_months =
    (days % 365) / 30;
  if remaining_months > 0 {
    format!(
      "{years} years, \
       {remaining_months} months"
    )
  } else {
    format!("{years} years")
  }
}

pub fn format_day(
  raw: Option<&str>
) -> String {
  raw
    .and_then(parse_day)
    .map(|day| {
      day
        .format(SHORT_DAY_FORMAT)
        .to_string()
    })
    .unwrap_or_default()
}

pub fn format_period(
  start: &str,
  end: Option<&str>
) -> String {
  let end_label = match end {
    | Some(_) => format_day(end),
    | None => "now".to_string()
  };
  format!(
    "{} - {}",
    format_day(Some(start)),
    end_label
  )
}

pub fn month_label(
  month_index: u32
) -> &'static str {
  MONTH_NAMES_SHORT
    .get(month_index as usize)
    .copied()
    .unwrap_or("?")
}

pub fn first_of_month(
  day: NaiveDate
) -> NaiveDate {
  day.with_day(1).unwrap_or(day)
}

pub fn last_of_month(
  day: NaiveDate
) -> NaiveDate {
  first_of_month(day)
    .checked_add_months(Months::new(1))
    .and_then(|next| next.pred_opt())
    .unwrap_or(day)
}

/// First day of the month `months`
/// away from `day`'s month.
pub fn shift_month_start(
  day: NaiveDate,
  months: i32
) -> NaiveDate {
  let first = first_of_month(day);
  let shifted = if months >= 0 {
    first.checked_add_months(
      Months::new(months.unsigned_abs())
    )
  } else {
    first.checked_sub_months(
      Months::new(months.unsigned_abs())
    )
  };
  shifted.unwrap_or(first)
}

/// Number of calendar months touched
/// by `[from, to]`, both ends included.
pub fn months_spanned(
  from: NaiveDate,
  to: NaiveDate
) -> i64 {
  i64::from(to.year() - from.year())
    * 12
    + i64::from(to.month0())
    - i64::from(from.month0())
    + 1
}

#[tracing::instrument(skip(now))]
pub fn resolve_today(
  timezone: Option<&str>,
  now: DateTime<Utc>
) -> NaiveDate {
  if let Some(raw) = timezone
    && let Some(tz) =
      parse_timezone(raw, "config")
  {
    return now
      .with_timezone(&tz)
      .date_naive();
  }

  now.with_timezone(&Local).date_naive()
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "resolved timezone for today"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id; \
         using local time"
      );
      None
    }
  }
}

/// Date input accepted at the add-item
/// boundary.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return today
        .succ_opt()
        .ok_or_else(|| {
          anyhow!(
            "no day after {today}"
          )
        });
    }
    | "yesterday" => {
      return today
        .pred_opt()
        .ok_or_else(|| {
          anyhow!(
            "no day before {today}"
          )
        });
    }
    | _ => {}
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dwm])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let negative = caps
      .name("sign")
      .is_some_and(|m| m.as_str() == "-");
    let num: u32 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let shifted = match unit {
      | "d" | "w" => {
        let days = if unit == "w" {
          i64::from(num) * 7
        } else {
          i64::from(num)
        };
        let delta = Duration::days(
          if negative { -days } else { days }
        );
        today.checked_add_signed(delta)
      }
      | "m" => {
        if negative {
          today.checked_sub_months(
            Months::new(num)
          )
        } else {
          today.checked_add_months(
            Months::new(num)
          )
        }
      }
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };

    return shifted.ok_or_else(|| {
      anyhow!(
        "relative date out of range: \
         {input}"
      )
    });
  }

  parse_day(token)
    .ok_or_else(|| {
      anyhow!(
        "unrecognized date: {input}"
      )
    })
    .with_context(|| {
      "supported formats: \
       today/tomorrow/yesterday, \
       +Nd/-Nd, +Nw/-Nw, +Nm/-Nm, \
       YYYY-MM-DD, RFC3339, \
       YYYY-MM-DDTHH:MM"
    })
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::*;

  fn day(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn days_between_counts_both_ends() {
    let today = day(2024, 1, 20);
    assert_eq!(
      days_between(
        "2024-01-10",
        Some("2024-01-10"),
        today
      ),
      1
    );
    assert_eq!(
      days_between(
        "2024-01-10",
        Some("2024-01-20"),
        today
      ),
      11
    );
    assert_eq!(
      days_between(
        "2024-01-10",
        None,
        today
      ),
      11
    );
  }

  #[test]
  fn days_between_ignores_argument_order()
  {
    let today = day(2024, 1, 1);
    assert_eq!(
      days_between(
        "2024-03-01",
        Some("2024-02-28"),
        today
      ),
      3
    );
  }

  #[test]
  fn days_between_is_zero_for_garbage() {
    let today = day(2024, 1, 1);
    assert_eq!(
      days_between(
        "not-a-date",
        None,
        today
      ),
      0
    );
    assert_eq!(
      days_between(
        "2024-01-01",
        Some("2024-13-40"),
        today
      ),
      0
    );
  }

  #[test]
  fn humanize_duration_thresholds() {
    assert_eq!(
      humanize_duration(1),
      "1 days"
    );
    assert_eq!(
      humanize_duration(29),
      "29 days"
    );
    assert_eq!(
      humanize_duration(30),
      "1 months"
    );
    assert_eq!(
      humanize_duration(45),
      "1 months, 15 days"
    );
    assert_eq!(
      humanize_duration(364),
      "12 months, 4 days"
    );
    assert_eq!(
      humanize_duration(365),
      "1 years"
    );
    assert_eq!(
      humanize_duration(400),
      "1 years, 1 months"
    );
    assert_eq!(
      humanize_duration(760),
      "2 years, 1 months"
    );
  }

  #[test]
  fn format_day_uses_two_digit_year() {
    assert_eq!(
      format_day(Some("2024-03-05")),
      "05.03.24"
    );
    assert_eq!(format_day(None), "");
    assert_eq!(
      format_day(Some("garbage")),
      ""
    );
  }

  #[test]
  fn format_period_marks_ongoing() {
    assert_eq!(
      format_period("2024-01-10", None),
      "10.01.24 - now"
    );
    assert_eq!(
      format_period(
        "2024-01-10",
        Some("2024-02-01")
      ),
      "10.01.24 - 01.02.24"
    );
  }

  #[test]
  fn parse_day_drops_time_of_day() {
    assert_eq!(
      parse_day("2024-06-01T23:59:00Z"),
      Some(day(2024, 6, 1))
    );
    assert_eq!(
      parse_day("2024-06-01T08:30"),
      Some(day(2024, 6, 1))
    );
    assert_eq!(parse_day("  "), None);
  }

  #[test]
  fn month_helpers_handle_year_edges() {
    assert_eq!(
      shift_month_start(
        day(2024, 1, 31),
        -1
      ),
      day(2023, 12, 1)
    );
    assert_eq!(
      shift_month_start(
        day(2024, 11, 15),
        2
      ),
      day(2025, 1, 1)
    );
    assert_eq!(
      last_of_month(day(2024, 2, 10)),
      day(2024, 2, 29)
    );
    assert_eq!(
      months_spanned(
        day(2023, 11, 30),
        day(2024, 2, 1)
      ),
      4
    );
  }

  #[test]
  fn parse_date_expr_relative_forms() {
    let today = day(2024, 1, 31);
    assert_eq!(
      parse_date_expr("today", today)
        .expect("today"),
      today
    );
    assert_eq!(
      parse_date_expr("-1d", today)
        .expect("-1d"),
      day(2024, 1, 30)
    );
    assert_eq!(
      parse_date_expr("+2w", today)
        .expect("+2w"),
      day(2024, 2, 14)
    );
    assert_eq!(
      parse_date_expr("+1m", today)
        .expect("+1m"),
      day(2024, 2, 29)
    );
    assert_eq!(
      parse_date_expr(
        "2023-05-06",
        today
      )
      .expect("iso"),
      day(2023, 5, 6)
    );
    assert!(
      parse_date_expr("someday", today)
        .is_err()
    );
  }

  #[test]
  fn resolve_today_honours_timezone() {
    let now = Utc
      .with_ymd_and_hms(
        2024, 1, 1, 2, 0, 0
      )
      .single()
      .expect("valid now");
    assert_eq!(
      resolve_today(
        Some("America/Mexico_City"),
        now
      ),
      day(2023, 12, 31)
    );
    assert_eq!(
      resolve_today(
        Some("Asia/Tokyo"),
        now
      ),
      day(2024, 1, 1)
    );
  }
}

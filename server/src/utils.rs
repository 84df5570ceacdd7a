use pueblo_shared::{format_vec3, parse_vec3};
use spacetimedb::{ScheduleAt, TimeDuration, Timestamp};

/// Seconds between two timestamps, `None` if `last` is in the future.
pub fn elapsed_secs(now: Timestamp, last: Timestamp) -> Option<f32> {
    now.time_duration_since(last)
        .map(|dur| dur.to_micros() as f32 / 1_000_000.0)
}

pub fn interval_from_secs(secs: u32) -> ScheduleAt {
    ScheduleAt::Interval(TimeDuration::from_micros(i64::from(secs.max(1)) * 1_000_000))
}

/// Checks a `"x, y, z"` field and returns it in canonical form.
pub fn canonical_vec3(field: &str, value: &str) -> Result<String, String> {
    parse_vec3(value)
        .map(|v| format_vec3(&v))
        .map_err(|err| format!("`{field}`: {err}"))
}

use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};

pub trait SystemTimeExt {
    /// `Mon dd HH:MM` in local time, as printed by `ls -l`
    fn to_listing_time(&self) -> String;
}

impl SystemTimeExt for SystemTime {
    fn to_listing_time(&self) -> String {
        DateTime::<Local>::from(*self)
            .format("%b %e %H:%M")
            .to_string()
    }
}

pub trait DurationExt {
    /// `h:mm:ss`, hours unbounded
    fn to_clock_string(&self) -> String;
}

impl DurationExt for Duration {
    fn to_clock_string(&self) -> String {
        let seconds = self.as_secs();
        format!(
            "{}:{:02}:{:02}",
            seconds / 3600,
            seconds / 60 % 60,
            seconds % 60
        )
    }
}

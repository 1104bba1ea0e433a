use chrono::{Local, NaiveDate, NaiveTime};

/// Source of the current wall-clock date and time used for booking
/// validation. Injected into the scheduling service so tests can pin "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> (NaiveDate, NaiveTime);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> (NaiveDate, NaiveTime) {
        let now = Local::now().naive_local();
        (now.date(), now.time())
    }
}

#[cfg(test)]
#[derive(Clone, Copy, Debug)]
pub struct FixedClock {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> (NaiveDate, NaiveTime) {
        (self.date, self.time)
    }
}

use chrono::{DateTime, Datelike, Local, Utc};

/// Source of "now" for quota periods and history timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    /// Zero-based month, as stored in `lastExportMonth`.
    fn current_month(&self) -> u32 {
        self.now().month0()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

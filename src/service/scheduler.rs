use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{Days, NaiveDate, NaiveTime};
use tracing::{error, info};

use crate::clock::Clock;
use crate::error::EngineError;

use super::attendance::AttendanceLedger;

const RETRY_AFTER_FAILURE: Duration = Duration::from_secs(60);

/// Fires the end-of-day auto checkout once per calendar date, at or after
/// `fire_at` on the injected clock.
pub struct AutoCheckoutScheduler {
    ledger: Arc<AttendanceLedger>,
    clock: Arc<dyn Clock>,
    fire_at: NaiveTime,
    last_run: Mutex<Option<NaiveDate>>,
}

impl AutoCheckoutScheduler {
    pub fn new(ledger: Arc<AttendanceLedger>, clock: Arc<dyn Clock>, fire_at: NaiveTime) -> Self {
        Self {
            ledger,
            clock,
            fire_at,
            last_run: Mutex::new(None),
        }
    }

    fn last_run(&self) -> Option<NaiveDate> {
        *self.last_run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs the checkout if it is due and has not run today. Records left
    /// open on earlier days are closed in the same run. Returns the number
    /// of records closed, or `None` when nothing was due.
    pub async fn run_due(&self) -> Result<Option<usize>, EngineError> {
        let now = self.clock.now();
        let today = now.date();
        if now.time() < self.fire_at || self.last_run() == Some(today) {
            return Ok(None);
        }

        let stale = self.ledger.close_stale(today).await?;
        let closed = self.ledger.auto_checkout_for(today).await?;
        *self.last_run.lock().unwrap_or_else(PoisonError::into_inner) = Some(today);
        Ok(Some(stale + closed))
    }

    /// Time left until the next firing.
    pub fn until_next_run(&self) -> Duration {
        let now = self.clock.now();
        let today = now.date();
        let fire_today = today.and_time(self.fire_at);

        let next = if now < fire_today {
            fire_today
        } else if self.last_run() != Some(today) {
            return Duration::ZERO;
        } else {
            match today.checked_add_days(Days::new(1)) {
                Some(tomorrow) => tomorrow.and_time(self.fire_at),
                None => return RETRY_AFTER_FAILURE,
            }
        };
        (next - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Runs forever on the actix runtime.
    pub async fn run(self: Arc<Self>) {
        info!(fire_at = %self.fire_at, "Auto checkout scheduler started");
        if let Err(e) = self.ledger.close_stale(self.clock.today()).await {
            error!(error = %e, "Closing stale attendance failed");
        }
        loop {
            actix_web::rt::time::sleep(self.until_next_run()).await;
            match self.run_due().await {
                Ok(Some(closed)) => info!(closed, "Auto checkout ran"),
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "Auto checkout failed");
                    actix_web::rt::time::sleep(RETRY_AFTER_FAILURE).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::service::attendance::{DayRules, end_of_day};
    use crate::config::EngineSettings;
    use crate::model::attendance::AttendanceStatus;
    use crate::store::{AttendanceStore, memory::MemoryStore};
    use chrono::NaiveDateTime;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn setup() -> (AutoCheckoutScheduler, Arc<AttendanceLedger>, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        store.add_employee(1, "Ana");
        let clock = Arc::new(ManualClock::at(at(5, 9, 0)));
        let ledger = Arc::new(AttendanceLedger::new(
            store.clone(),
            store.clone(),
            clock.clone(),
            DayRules::from(&EngineSettings::default()),
        ));
        let scheduler = AutoCheckoutScheduler::new(
            ledger.clone(),
            clock.clone(),
            NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
        );
        (scheduler, ledger, store, clock)
    }

    #[actix_web::test]
    async fn fires_once_per_day_at_fire_time() {
        let (scheduler, ledger, store, clock) = setup();
        ledger.check_in(1).await.unwrap();

        assert_eq!(scheduler.run_due().await.unwrap(), None);
        assert_eq!(scheduler.until_next_run(), Duration::from_secs((14 * 60 + 59) * 60));

        clock.set(at(5, 23, 59));
        assert_eq!(scheduler.until_next_run(), Duration::ZERO);
        assert_eq!(scheduler.run_due().await.unwrap(), Some(1));
        assert_eq!(scheduler.run_due().await.unwrap(), None);
        assert_eq!(scheduler.until_next_run(), Duration::from_secs(24 * 60 * 60));

        let record = store.find_attendance(1, clock.today()).await.unwrap().unwrap();
        assert_eq!(record.check_out, Some(at(5, 23, 59) + chrono::Duration::seconds(59)));
        assert_eq!(record.status, AttendanceStatus::Present);
    }

    #[actix_web::test]
    async fn next_day_fires_again() {
        let (scheduler, _ledger, _store, clock) = setup();
        clock.set(at(5, 23, 59));
        assert_eq!(scheduler.run_due().await.unwrap(), Some(0));

        clock.set(at(6, 12, 0));
        assert_eq!(scheduler.run_due().await.unwrap(), None);
        clock.set(at(6, 23, 59));
        assert_eq!(scheduler.run_due().await.unwrap(), Some(0));
    }

    #[actix_web::test]
    async fn missed_day_is_closed_on_the_next_run() {
        let (scheduler, ledger, store, clock) = setup();
        ledger.check_in(1).await.unwrap();

        // the process was down over the 5th's fire time
        clock.set(at(6, 9, 30));
        ledger.check_in(1).await.unwrap();
        assert_eq!(ledger.close_stale(clock.today()).await.unwrap(), 1);
        let missed = store.find_attendance(1, at(5, 0, 0).date()).await.unwrap().unwrap();
        assert_eq!(missed.check_out, Some(end_of_day(missed.date)));

        clock.set(at(7, 8, 0));
        ledger.check_in(1).await.unwrap();
        clock.set(at(7, 23, 59));
        // the 6th and the 7th
        assert_eq!(scheduler.run_due().await.unwrap(), Some(2));
        let sixth = store.find_attendance(1, at(6, 0, 0).date()).await.unwrap().unwrap();
        assert_eq!(sixth.check_out, Some(end_of_day(sixth.date)));
    }
}

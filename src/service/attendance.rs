use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::EngineSettings;
use crate::error::EngineError;
use crate::model::leave_request::LeaveType;
use crate::model::attendance::{
    AttendanceRecord, AttendanceState, AttendanceStatus, DayAttendance, MonthlyAttendanceSummary,
    NewAttendance, WeeklyAttendanceSummary,
};
use crate::store::{AttendanceStore, EmployeeDirectory};

use super::calendar::MonthCalendar;

/// Rules that turn a closed day into a status.
#[derive(Debug, Clone, Copy)]
pub struct DayRules {
    pub half_day_threshold_minutes: i64,
    pub standard_work_minutes: i64,
    pub late_after: Option<NaiveTime>,
}

impl From<&EngineSettings> for DayRules {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            half_day_threshold_minutes: settings.half_day_threshold_minutes,
            standard_work_minutes: settings.standard_work_minutes,
            late_after: settings.late_after,
        }
    }
}

impl DayRules {
    pub fn classify(&self, record: &AttendanceRecord) -> AttendanceStatus {
        let Some(check_in) = record.check_in else {
            return AttendanceStatus::Absent;
        };
        if record.check_out.is_none() {
            return AttendanceStatus::Present;
        }
        if record.worked_minutes() < self.half_day_threshold_minutes {
            return AttendanceStatus::HalfDay;
        }
        match self.late_after {
            Some(limit) if check_in.time() > limit => AttendanceStatus::Late,
            _ => AttendanceStatus::Present,
        }
    }

    pub fn overtime_minutes(&self, record: &AttendanceRecord) -> i64 {
        (record.worked_minutes() - self.standard_work_minutes).max(0)
    }
}

/// Last instant of a calendar day, used when closing forgotten check-outs.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
}

/// Owns the daily NO_RECORD -> OPEN -> CLOSED state machine.
pub struct AttendanceLedger {
    store: Arc<dyn AttendanceStore>,
    employees: Arc<dyn EmployeeDirectory>,
    clock: Arc<dyn Clock>,
    rules: DayRules,
}

impl AttendanceLedger {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        employees: Arc<dyn EmployeeDirectory>,
        clock: Arc<dyn Clock>,
        rules: DayRules,
    ) -> Self {
        Self {
            store,
            employees,
            clock,
            rules,
        }
    }

    pub fn rules(&self) -> &DayRules {
        &self.rules
    }

    pub async fn check_in(&self, employee_id: u64) -> Result<AttendanceRecord, EngineError> {
        self.employees.require_employee(employee_id).await?;

        let now = self.clock.now();
        let date = now.date();
        if self.store.find_attendance(employee_id, date).await?.is_some() {
            return Err(EngineError::AlreadyCheckedIn(date));
        }

        // the unique key still decides a race between two check-ins
        let record = self
            .store
            .insert_attendance(NewAttendance {
                employee_id,
                date,
                check_in: now,
            })
            .await?;

        info!(employee_id, %date, "Checked in");
        Ok(record)
    }

    pub async fn check_out(&self, employee_id: u64) -> Result<AttendanceRecord, EngineError> {
        let now = self.clock.now();
        let date = now.date();
        let record = self.open_record(employee_id, date).await?;

        let closed = self.close(record, now).await?;
        match closed {
            Some(record) => {
                info!(employee_id, %date, status = %record.status, worked = record.worked_minutes(), "Checked out");
                Ok(record)
            }
            None => Err(EngineError::AlreadyCheckedOut(date)),
        }
    }

    /// Adds break time to today's open record.
    pub async fn record_break(&self, employee_id: u64, minutes: i64) -> Result<AttendanceRecord, EngineError> {
        if minutes <= 0 {
            return Err(EngineError::Validation("break minutes must be positive".into()));
        }
        let date = self.clock.today();
        let record = self.open_record(employee_id, date).await?;

        if !self.store.add_break_minutes(record.id, minutes).await? {
            return Err(EngineError::AlreadyCheckedOut(date));
        }
        debug!(employee_id, minutes, "Break recorded");

        Ok(AttendanceRecord {
            break_minutes: record.break_minutes + minutes,
            ..record
        })
    }

    /// Closes every record of today still missing a check-out.
    pub async fn auto_checkout_end_of_day(&self) -> Result<usize, EngineError> {
        self.auto_checkout_for(self.clock.today()).await
    }

    /// Closes every open record of `date` at the end of that day. Records
    /// already closed are left alone, so running it again closes nothing.
    pub async fn auto_checkout_for(&self, date: NaiveDate) -> Result<usize, EngineError> {
        let open = self.store.list_open_attendance(date).await?;
        let closed = self.close_at_end_of_day(open).await;

        info!(%date, closed, "Auto checkout finished");
        Ok(closed)
    }

    /// Closes records still open from days before `today`, each at the end
    /// of its own day. Catches up after a missed auto checkout.
    pub async fn close_stale(&self, today: NaiveDate) -> Result<usize, EngineError> {
        let stale = self.store.list_open_attendance_before(today).await?;
        if stale.is_empty() {
            return Ok(0);
        }
        let closed = self.close_at_end_of_day(stale).await;

        warn!(%today, closed, "Closed attendance left open on earlier days");
        Ok(closed)
    }

    async fn close_at_end_of_day(&self, records: Vec<AttendanceRecord>) -> usize {
        let mut closed = 0;
        for record in records {
            let (employee_id, date) = (record.employee_id, record.date);
            match self.close(record, end_of_day(date)).await {
                Ok(Some(_)) => closed += 1,
                Ok(None) => debug!(employee_id, %date, "Record closed concurrently, skipping"),
                Err(e) => warn!(error = %e, employee_id, %date, "Auto checkout failed"),
            }
        }
        closed
    }

    /// Puts every working day into exactly one of present, on leave or
    /// absent. An attended record wins over leave on the same date.
    pub async fn monthly_summary(
        &self,
        employee_id: u64,
        calendar: &MonthCalendar,
        leave_days: &BTreeMap<NaiveDate, LeaveType>,
    ) -> Result<MonthlyAttendanceSummary, EngineError> {
        let records = self
            .store
            .list_attendance(employee_id, calendar.first, calendar.last)
            .await?;
        let today = self.clock.today();

        let mut summary = MonthlyAttendanceSummary {
            employee_id,
            month: calendar.period.month,
            year: calendar.period.year,
            working_days: calendar.working_days(),
            ..Default::default()
        };

        for record in &records {
            summary.worked_minutes += record.worked_minutes();
            if record.state() == AttendanceState::Closed {
                summary.overtime_minutes += self.rules.overtime_minutes(record);
            }
        }

        for date in &calendar.working_dates {
            match records.iter().find(|r| r.date == *date) {
                Some(record) if record.status.is_attended() => {
                    summary.present_days += 1;
                    match record.status {
                        AttendanceStatus::HalfDay => summary.half_days += 1,
                        AttendanceStatus::Late => summary.late_days += 1,
                        _ => {}
                    }
                }
                _ => match leave_days.get(date) {
                    Some(leave_type) => {
                        summary.on_leave_days += 1;
                        if leave_type.is_paid() {
                            summary.paid_leave_days += 1;
                        } else {
                            summary.unpaid_leave_days += 1;
                        }
                    }
                    None if *date <= today => summary.absent_days += 1,
                    None => {}
                },
            }
        }

        Ok(summary)
    }

    pub async fn weekly_summary(
        &self,
        employee_id: u64,
        week_start: NaiveDate,
        working_dates: &BTreeSet<NaiveDate>,
        leave_dates: &BTreeSet<NaiveDate>,
    ) -> Result<WeeklyAttendanceSummary, EngineError> {
        let week_end = week_start
            .checked_add_days(Days::new(6))
            .ok_or_else(|| EngineError::Validation("week start out of range".into()))?;
        let records = self
            .store
            .list_attendance(employee_id, week_start, week_end)
            .await?;
        let today = self.clock.today();

        let days: Vec<DayAttendance> = week_start
            .iter_days()
            .take(7)
            .map(|date| {
                let record = records.iter().find(|r| r.date == date);
                let status = match record {
                    Some(r) => Some(r.status),
                    None if leave_dates.contains(&date) => Some(AttendanceStatus::OnLeave),
                    None if working_dates.contains(&date) && date <= today => Some(AttendanceStatus::Absent),
                    None => None,
                };
                DayAttendance {
                    date,
                    status,
                    worked_minutes: record.map(AttendanceRecord::worked_minutes).unwrap_or(0),
                }
            })
            .collect();

        Ok(WeeklyAttendanceSummary {
            employee_id,
            week_start,
            week_end,
            present_days: days
                .iter()
                .filter(|d| d.status.is_some_and(AttendanceStatus::is_attended))
                .count() as u32,
            worked_minutes: days.iter().map(|d| d.worked_minutes).sum(),
            days,
        })
    }

    async fn open_record(&self, employee_id: u64, date: NaiveDate) -> Result<AttendanceRecord, EngineError> {
        let record = self
            .store
            .find_attendance(employee_id, date)
            .await?
            .ok_or(EngineError::NotCheckedIn(date))?;
        if record.state() == AttendanceState::Closed {
            return Err(EngineError::AlreadyCheckedOut(date));
        }
        Ok(record)
    }

    /// OPEN -> CLOSED. `None` when another caller closed it first.
    async fn close(
        &self,
        record: AttendanceRecord,
        at: NaiveDateTime,
    ) -> Result<Option<AttendanceRecord>, EngineError> {
        // check-out never precedes check-in
        let check_out = record.check_in.map_or(at, |check_in| at.max(check_in));
        let mut closed = AttendanceRecord {
            check_out: Some(check_out),
            ..record
        };
        closed.status = self.rules.classify(&closed);

        if self
            .store
            .close_attendance(closed.id, check_out, closed.status)
            .await?
        {
            Ok(Some(closed))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ErrorKind;
    use crate::model::payroll::PayPeriod;
    use crate::service::calendar::CalendarResolver;
    use crate::store::memory::MemoryStore;
    use chrono::{Duration, Weekday};

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn setup(rules: DayRules) -> (AttendanceLedger, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        store.add_employee(1, "Ana");
        store.add_employee(2, "Ben");
        // Monday 5 January 2026
        let clock = Arc::new(ManualClock::at(at(5, 9, 0)));
        let ledger = AttendanceLedger::new(store.clone(), store.clone(), clock.clone(), rules);
        (ledger, store, clock)
    }

    fn default_rules() -> DayRules {
        DayRules::from(&EngineSettings::default())
    }

    #[actix_web::test]
    async fn three_hour_day_is_half_day() {
        let (ledger, _, clock) = setup(default_rules());
        ledger.check_in(1).await.unwrap();
        clock.advance(Duration::hours(3));

        let record = ledger.check_out(1).await.unwrap();
        assert_eq!(record.status, AttendanceStatus::HalfDay);
        assert_eq!(record.worked_minutes(), 180);
    }

    #[actix_web::test]
    async fn nine_hour_day_is_present() {
        let (ledger, _, clock) = setup(default_rules());
        ledger.check_in(1).await.unwrap();
        clock.advance(Duration::hours(9));

        let record = ledger.check_out(1).await.unwrap();
        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(default_rules().overtime_minutes(&record), 60);
    }

    #[actix_web::test]
    async fn exactly_threshold_is_present() {
        let (ledger, _, clock) = setup(default_rules());
        ledger.check_in(1).await.unwrap();
        clock.advance(Duration::minutes(240));
        assert_eq!(ledger.check_out(1).await.unwrap().status, AttendanceStatus::Present);

        ledger.check_in(2).await.unwrap();
        clock.advance(Duration::minutes(239));
        assert_eq!(ledger.check_out(2).await.unwrap().status, AttendanceStatus::HalfDay);
    }

    #[actix_web::test]
    async fn breaks_reduce_worked_time() {
        let (ledger, _, clock) = setup(default_rules());
        ledger.check_in(1).await.unwrap();
        clock.advance(Duration::hours(2));
        ledger.record_break(1, 30).await.unwrap();
        clock.advance(Duration::hours(2));

        let record = ledger.check_out(1).await.unwrap();
        assert_eq!(record.worked_minutes(), 210);
        assert_eq!(record.status, AttendanceStatus::HalfDay);
    }

    #[actix_web::test]
    async fn double_check_in_conflicts() {
        let (ledger, store, _) = setup(default_rules());
        ledger.check_in(1).await.unwrap();
        let err = ledger.check_in(1).await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyCheckedIn(_)));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.attendance_count(), 1);
    }

    #[actix_web::test]
    async fn concurrent_check_ins_yield_one_record() {
        let (ledger, store, _) = setup(default_rules());
        let (a, b) = futures::join!(ledger.check_in(1), ledger.check_in(1));
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(store.attendance_count(), 1);
    }

    #[actix_web::test]
    async fn check_out_errors() {
        let (ledger, _, clock) = setup(default_rules());
        assert!(matches!(ledger.check_out(1).await, Err(EngineError::NotCheckedIn(_))));

        ledger.check_in(1).await.unwrap();
        clock.advance(Duration::hours(8));
        ledger.check_out(1).await.unwrap();
        assert!(matches!(ledger.check_out(1).await, Err(EngineError::AlreadyCheckedOut(_))));
        assert!(matches!(ledger.record_break(1, 10).await, Err(EngineError::AlreadyCheckedOut(_))));
    }

    #[actix_web::test]
    async fn unknown_employee_cannot_check_in() {
        let (ledger, _, _) = setup(default_rules());
        let err = ledger.check_in(99).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[actix_web::test]
    async fn late_arrival_is_flagged_when_configured() {
        let rules = DayRules {
            late_after: NaiveTime::from_hms_opt(9, 30, 0),
            ..default_rules()
        };
        let (ledger, _, clock) = setup(rules);
        clock.set(at(5, 10, 0));
        ledger.check_in(1).await.unwrap();
        clock.advance(Duration::hours(8));
        assert_eq!(ledger.check_out(1).await.unwrap().status, AttendanceStatus::Late);
    }

    #[actix_web::test]
    async fn auto_checkout_closes_open_records_once() {
        let (ledger, store, clock) = setup(default_rules());
        ledger.check_in(1).await.unwrap();
        clock.set(at(5, 22, 0));
        ledger.check_in(2).await.unwrap();

        clock.set(at(5, 23, 59));
        assert_eq!(ledger.auto_checkout_end_of_day().await.unwrap(), 2);

        let early = store.find_attendance(1, at(5, 0, 0).date()).await.unwrap().unwrap();
        assert_eq!(early.check_out, Some(end_of_day(early.date)));
        assert_eq!(early.status, AttendanceStatus::Present);
        let late = store.find_attendance(2, at(5, 0, 0).date()).await.unwrap().unwrap();
        assert_eq!(late.status, AttendanceStatus::HalfDay);

        assert_eq!(ledger.auto_checkout_end_of_day().await.unwrap(), 0);
        let again = store.find_attendance(1, at(5, 0, 0).date()).await.unwrap().unwrap();
        assert_eq!(again, early);
    }

    #[actix_web::test]
    async fn monthly_summary_counts_working_days() {
        let (ledger, store, clock) = setup(default_rules());
        // Mon 5: full day, Tue 6: half day, Wed 7: on leave, Thu 8: absent
        ledger.check_in(1).await.unwrap();
        clock.advance(Duration::hours(10));
        ledger.check_out(1).await.unwrap();

        clock.set(at(6, 9, 0));
        ledger.check_in(1).await.unwrap();
        clock.advance(Duration::hours(2));
        ledger.check_out(1).await.unwrap();

        clock.set(at(8, 18, 0));
        let calendar = CalendarResolver::new(store.clone(), vec![Weekday::Sat, Weekday::Sun])
            .resolve(PayPeriod::new(2026, 1).unwrap())
            .await
            .unwrap();
        let leave: BTreeMap<_, _> = [(at(7, 0, 0).date(), LeaveType::Sick)].into_iter().collect();

        let summary = ledger.monthly_summary(1, &calendar, &leave).await.unwrap();
        assert_eq!(summary.working_days, 22);
        assert_eq!(summary.present_days, 2);
        assert_eq!(summary.half_days, 1);
        assert_eq!(summary.on_leave_days, 1);
        assert_eq!(summary.paid_leave_days, 1);
        // 1, 2 and 8 January are past working days without a record
        assert_eq!(summary.absent_days, 3);
        assert_eq!(summary.worked_minutes, 720);
        assert_eq!(summary.overtime_minutes, 120);
    }

    #[actix_web::test]
    async fn weekly_summary_lists_seven_days() {
        let (ledger, _, clock) = setup(default_rules());
        ledger.check_in(1).await.unwrap();
        clock.advance(Duration::hours(8));
        ledger.check_out(1).await.unwrap();
        clock.set(at(7, 12, 0));

        let week_start = at(5, 0, 0).date();
        let working: BTreeSet<_> = week_start.iter_days().take(5).collect();
        let summary = ledger
            .weekly_summary(1, week_start, &working, &BTreeSet::new())
            .await
            .unwrap();

        assert_eq!(summary.days.len(), 7);
        assert_eq!(summary.week_end, at(11, 0, 0).date());
        assert_eq!(summary.days[0].status, Some(AttendanceStatus::Present));
        assert_eq!(summary.days[1].status, Some(AttendanceStatus::Absent));
        // Thursday is still ahead
        assert_eq!(summary.days[3].status, None);
        assert_eq!(summary.present_days, 1);
        assert_eq!(summary.worked_minutes, 480);
    }
}

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

use crate::error::EngineError;
use crate::model::payroll::PayPeriod;
use crate::store::HolidayCalendar;

/// First and last day of the month.
pub fn month_bounds(period: PayPeriod) -> Result<(NaiveDate, NaiveDate), EngineError> {
    let first = NaiveDate::from_ymd_opt(period.year, period.month, 1)
        .ok_or_else(|| EngineError::Validation(format!("invalid period {:02}/{}", period.month, period.year)))?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .ok_or_else(|| EngineError::Configuration("calendar overflow".into()))?;
    Ok((first, last))
}

/// Working-day calendar of one month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthCalendar {
    pub period: PayPeriod,
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub working_dates: BTreeSet<NaiveDate>,
}

impl MonthCalendar {
    pub fn total_days(&self) -> u32 {
        self.last.day()
    }

    pub fn working_days(&self) -> u32 {
        self.working_dates.len() as u32
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.working_dates.contains(&date)
    }
}

pub struct CalendarResolver {
    holidays: Arc<dyn HolidayCalendar>,
    weekend: Vec<Weekday>,
}

impl CalendarResolver {
    pub fn new(holidays: Arc<dyn HolidayCalendar>, weekend: Vec<Weekday>) -> Self {
        Self { holidays, weekend }
    }

    pub async fn resolve(&self, period: PayPeriod) -> Result<MonthCalendar, EngineError> {
        let (first, last) = month_bounds(period)?;
        let holidays: BTreeSet<NaiveDate> = self.holidays.holidays_in(period).await?.into_iter().collect();

        let working_dates = first
            .iter_days()
            .take_while(|d| *d <= last)
            .filter(|d| !self.weekend.contains(&d.weekday()) && !holidays.contains(d))
            .collect();

        Ok(MonthCalendar {
            period,
            first,
            last,
            working_dates,
        })
    }

    /// Working dates in `[from, to]`, which may span several months.
    pub async fn working_dates_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeSet<NaiveDate>, EngineError> {
        let mut dates = BTreeSet::new();
        let mut cursor = from.with_day(1).unwrap_or(from);
        while cursor <= to {
            let calendar = self.resolve(PayPeriod::new(cursor.year(), cursor.month())?).await?;
            dates.extend(
                calendar
                    .working_dates
                    .into_iter()
                    .filter(|d| *d >= from && *d <= to),
            );
            cursor = calendar
                .last
                .succ_opt()
                .ok_or_else(|| EngineError::Configuration("calendar overflow".into()))?;
        }
        Ok(dates)
    }
}

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime};

use super::*;
use crate::model::payroll::PayrollStatus;

/// Every store trait over one mutex-guarded state. Each operation runs
/// entirely under the lock, so checks and writes are atomic per call.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    employees: HashMap<u64, Employee>,
    holidays: BTreeSet<NaiveDate>,
    attendance: Vec<AttendanceRecord>,
    leaves: Vec<LeaveRecord>,
    salaries: HashMap<u64, SalaryStructure>,
    payrolls: Vec<PayrollRecord>,
    deductions: HashMap<u64, Vec<PayrollDeduction>>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_employee(&self, id: u64, first_name: &str) {
        self.state.lock().unwrap().employees.insert(
            id,
            Employee {
                id,
                employee_code: format!("EMP-{id:03}"),
                first_name: first_name.to_string(),
                last_name: "Tester".to_string(),
                email: format!("{}@company.test", first_name.to_lowercase()),
                status: "active".to_string(),
            },
        );
    }

    pub fn add_holiday(&self, date: NaiveDate) {
        self.state.lock().unwrap().holidays.insert(date);
    }

    pub fn payroll_count(&self) -> usize {
        self.state.lock().unwrap().payrolls.len()
    }

    pub fn attendance_count(&self) -> usize {
        self.state.lock().unwrap().attendance.len()
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn insert_attendance(&self, new: NewAttendance) -> StoreResult<AttendanceRecord> {
        let mut state = self.state.lock().unwrap();
        if state
            .attendance
            .iter()
            .any(|r| r.employee_id == new.employee_id && r.date == new.date)
        {
            return Err(EngineError::AlreadyCheckedIn(new.date));
        }
        let record = AttendanceRecord {
            id: state.next_id(),
            employee_id: new.employee_id,
            date: new.date,
            check_in: Some(new.check_in),
            check_out: None,
            break_minutes: 0,
            status: AttendanceStatus::Present,
        };
        state.attendance.push(record.clone());
        Ok(record)
    }

    async fn find_attendance(&self, employee_id: u64, date: NaiveDate) -> StoreResult<Option<AttendanceRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .attendance
            .iter()
            .find(|r| r.employee_id == employee_id && r.date == date)
            .cloned())
    }

    async fn close_attendance(
        &self,
        id: u64,
        check_out: NaiveDateTime,
        status: AttendanceStatus,
    ) -> StoreResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .attendance
            .iter_mut()
            .find(|r| r.id == id && r.check_out.is_none())
        {
            Some(record) => {
                record.check_out = Some(check_out);
                record.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_break_minutes(&self, id: u64, minutes: i64) -> StoreResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .attendance
            .iter_mut()
            .find(|r| r.id == id && r.check_out.is_none())
        {
            Some(record) => {
                record.break_minutes += minutes;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_open_attendance(&self, date: NaiveDate) -> StoreResult<Vec<AttendanceRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .attendance
            .iter()
            .filter(|r| r.date == date && r.check_out.is_none())
            .cloned()
            .collect())
    }

    async fn list_open_attendance_before(&self, date: NaiveDate) -> StoreResult<Vec<AttendanceRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .attendance
            .iter()
            .filter(|r| r.date < date && r.check_out.is_none())
            .cloned()
            .collect())
    }

    async fn list_attendance(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let state = self.state.lock().unwrap();
        let mut records: Vec<_> = state
            .attendance
            .iter()
            .filter(|r| r.employee_id == employee_id && r.date >= from && r.date <= to)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.date);
        Ok(records)
    }
}

#[async_trait]
impl LeaveStore for MemoryStore {
    async fn insert_leave(&self, new: NewLeave) -> StoreResult<LeaveRecord> {
        let mut state = self.state.lock().unwrap();
        let record = LeaveRecord {
            id: state.next_id(),
            employee_id: new.employee_id,
            start_date: new.start_date,
            end_date: new.end_date,
            leave_type: new.leave_type,
            status: LeaveStatus::Pending,
            day_count: new.day_count,
        };
        state.leaves.push(record.clone());
        Ok(record)
    }

    async fn find_leave(&self, id: u64) -> StoreResult<Option<LeaveRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.leaves.iter().find(|l| l.id == id).cloned())
    }

    async fn update_leave_span(
        &self,
        id: u64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        leave_type: LeaveType,
        day_count: i64,
    ) -> StoreResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .leaves
            .iter_mut()
            .find(|l| l.id == id && l.status == LeaveStatus::Pending)
        {
            Some(leave) => {
                leave.start_date = start_date;
                leave.end_date = end_date;
                leave.leave_type = leave_type;
                leave.day_count = day_count;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_leave_status(&self, id: u64, from: LeaveStatus, to: LeaveStatus) -> StoreResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state.leaves.iter_mut().find(|l| l.id == id && l.status == from) {
            Some(leave) => {
                leave.status = to;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_leaves(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
        status: LeaveStatus,
    ) -> StoreResult<Vec<LeaveRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .leaves
            .iter()
            .filter(|l| {
                l.employee_id == employee_id
                    && l.status == status
                    && l.start_date <= to
                    && l.end_date >= from
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SalaryStore for MemoryStore {
    async fn find_salary(&self, employee_id: u64) -> StoreResult<Option<SalaryStructure>> {
        Ok(self.state.lock().unwrap().salaries.get(&employee_id).cloned())
    }

    async fn upsert_salary(&self, salary: &SalaryStructure) -> StoreResult<()> {
        self.state
            .lock()
            .unwrap()
            .salaries
            .insert(salary.employee_id, salary.clone());
        Ok(())
    }
}

#[async_trait]
impl PayrollStore for MemoryStore {
    async fn find_payroll(&self, id: u64) -> StoreResult<Option<PayrollRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.payrolls.iter().find(|p| p.id == id).cloned())
    }

    async fn find_payroll_for(&self, employee_id: u64, period: PayPeriod) -> StoreResult<Option<PayrollRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .payrolls
            .iter()
            .find(|p| p.employee_id == employee_id && p.period() == period)
            .cloned())
    }

    async fn payroll_deductions(&self, payroll_id: u64) -> StoreResult<Vec<PayrollDeduction>> {
        let state = self.state.lock().unwrap();
        Ok(state.deductions.get(&payroll_id).cloned().unwrap_or_default())
    }

    async fn insert_payroll(&self, new: NewPayroll) -> StoreResult<PayrollRecord> {
        let mut state = self.state.lock().unwrap();
        if state
            .payrolls
            .iter()
            .any(|p| p.employee_id == new.employee_id && p.period() == new.period)
        {
            return Err(EngineError::DuplicatePayroll {
                employee_id: new.employee_id,
                month: new.period.month,
                year: new.period.year,
            });
        }
        let id = state.next_id();
        let figures = new.figures;
        let record = PayrollRecord {
            id,
            employee_id: new.employee_id,
            month: new.period.month,
            year: new.period.year,
            working_days: figures.working_days,
            present_days: figures.present_days,
            paid_leave_days: figures.paid_leave_days,
            unpaid_leave_days: figures.unpaid_leave_days,
            overtime_minutes: figures.overtime_minutes,
            gross_salary: figures.gross_salary,
            total_deductions: figures.total_deductions,
            net_salary: figures.net_salary,
            status: PayrollStatus::Generated,
            generated_at: new.generated_at,
            approved_by: None,
            approved_at: None,
            version: 1,
        };
        state.payrolls.push(record.clone());
        state.deductions.insert(id, figures.deductions);
        Ok(record)
    }

    async fn change_status(&self, change: StatusChange) -> StoreResult<Option<PayrollRecord>> {
        let mut state = self.state.lock().unwrap();
        let Some(record) = state
            .payrolls
            .iter_mut()
            .find(|p| p.id == change.payroll_id && p.version == change.expected_version)
        else {
            return Ok(None);
        };
        record.status = change.status;
        if change.approved_by.is_some() {
            record.approved_by = change.approved_by;
            record.approved_at = change.approved_at;
        }
        record.version += 1;
        Ok(Some(record.clone()))
    }

    async fn replace_figures(
        &self,
        payroll_id: u64,
        expected_version: u32,
        figures: PayrollFigures,
        generated_at: NaiveDateTime,
    ) -> StoreResult<Option<PayrollRecord>> {
        let mut state = self.state.lock().unwrap();
        let Some(record) = state
            .payrolls
            .iter_mut()
            .find(|p| p.id == payroll_id && p.version == expected_version)
        else {
            return Ok(None);
        };
        record.working_days = figures.working_days;
        record.present_days = figures.present_days;
        record.paid_leave_days = figures.paid_leave_days;
        record.unpaid_leave_days = figures.unpaid_leave_days;
        record.overtime_minutes = figures.overtime_minutes;
        record.gross_salary = figures.gross_salary;
        record.total_deductions = figures.total_deductions;
        record.net_salary = figures.net_salary;
        record.status = PayrollStatus::Generated;
        record.generated_at = generated_at;
        record.version += 1;
        let record = record.clone();
        state.deductions.insert(payroll_id, figures.deductions);
        Ok(Some(record))
    }
}

#[async_trait]
impl EmployeeDirectory for MemoryStore {
    async fn find_employee(&self, id: u64) -> StoreResult<Option<Employee>> {
        Ok(self.state.lock().unwrap().employees.get(&id).cloned())
    }
}

#[async_trait]
impl HolidayCalendar for MemoryStore {
    async fn holidays_in(&self, period: PayPeriod) -> StoreResult<Vec<NaiveDate>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .holidays
            .iter()
            .filter(|d| d.year() == period.year && d.month() == period.month)
            .copied()
            .collect())
    }
}

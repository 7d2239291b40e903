use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySql, MySqlPool, Transaction};

use super::*;
use crate::error::is_unique_violation;
use crate::model::payroll::{DeductionType, PayrollStatus};
use crate::service::calendar::month_bounds;

/// MySQL backend for every store trait. Uniqueness comes from the schema's
/// unique keys; status changes are compare-and-swap on `version`.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn parse_column<T>(value: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(value).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    employee_id: u64,
    date: NaiveDate,
    check_in: Option<NaiveDateTime>,
    check_out: Option<NaiveDateTime>,
    break_minutes: i64,
    status: String,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = sqlx::Error;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(AttendanceRecord {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            check_in: row.check_in,
            check_out: row.check_out,
            break_minutes: row.break_minutes,
            status: parse_column(&row.status)?,
        })
    }
}

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    employee_id: u64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    leave_type: String,
    status: String,
    day_count: i64,
}

impl TryFrom<LeaveRow> for LeaveRecord {
    type Error = sqlx::Error;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        Ok(LeaveRecord {
            id: row.id,
            employee_id: row.employee_id,
            start_date: row.start_date,
            end_date: row.end_date,
            leave_type: parse_column(&row.leave_type)?,
            status: parse_column(&row.status)?,
            day_count: row.day_count,
        })
    }
}

#[derive(FromRow)]
struct SalaryRow {
    employee_id: u64,
    basic: Decimal,
    hra: Decimal,
    allowance: Decimal,
    pf_percent: Decimal,
    tax_percent: Decimal,
}

impl From<SalaryRow> for SalaryStructure {
    fn from(row: SalaryRow) -> Self {
        SalaryStructure {
            employee_id: row.employee_id,
            basic: row.basic,
            hra: row.hra,
            allowance: row.allowance,
            pf_percent: row.pf_percent,
            tax_percent: row.tax_percent,
        }
    }
}

#[derive(FromRow)]
struct PayrollRow {
    id: u64,
    employee_id: u64,
    month: u32,
    year: i32,
    working_days: u32,
    present_days: u32,
    paid_leave_days: u32,
    unpaid_leave_days: u32,
    overtime_minutes: i64,
    gross_salary: Decimal,
    total_deductions: Decimal,
    net_salary: Decimal,
    status: String,
    generated_at: NaiveDateTime,
    approved_by: Option<u64>,
    approved_at: Option<NaiveDateTime>,
    version: u32,
}

impl TryFrom<PayrollRow> for PayrollRecord {
    type Error = sqlx::Error;

    fn try_from(row: PayrollRow) -> Result<Self, Self::Error> {
        Ok(PayrollRecord {
            id: row.id,
            employee_id: row.employee_id,
            month: row.month,
            year: row.year,
            working_days: row.working_days,
            present_days: row.present_days,
            paid_leave_days: row.paid_leave_days,
            unpaid_leave_days: row.unpaid_leave_days,
            overtime_minutes: row.overtime_minutes,
            gross_salary: row.gross_salary,
            total_deductions: row.total_deductions,
            net_salary: row.net_salary,
            status: parse_column(&row.status)?,
            generated_at: row.generated_at,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            version: row.version,
        })
    }
}

#[derive(FromRow)]
struct DeductionRow {
    deduction_type: String,
    amount: Decimal,
}

const ATTENDANCE_COLUMNS: &str =
    "id, employee_id, date, check_in, check_out, break_minutes, status";
const LEAVE_COLUMNS: &str =
    "id, employee_id, start_date, end_date, leave_type, status, day_count";
const PAYROLL_COLUMNS: &str = r#"
    id, employee_id, month, year, working_days, present_days, paid_leave_days,
    unpaid_leave_days, overtime_minutes, gross_salary, total_deductions, net_salary,
    status, generated_at, approved_by, approved_at, version
"#;

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn insert_attendance(&self, new: NewAttendance) -> StoreResult<AttendanceRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance (employee_id, date, check_in, break_minutes, status)
            VALUES (?, ?, ?, 0, ?)
            "#,
        )
        .bind(new.employee_id)
        .bind(new.date)
        .bind(new.check_in)
        .bind(AttendanceStatus::Present.as_ref())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(AttendanceRecord {
                id: done.last_insert_id(),
                employee_id: new.employee_id,
                date: new.date,
                check_in: Some(new.check_in),
                check_out: None,
                break_minutes: 0,
                status: AttendanceStatus::Present,
            }),
            // Duplicate check-in for same day
            Err(e) if is_unique_violation(&e) => Err(EngineError::AlreadyCheckedIn(new.date)),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_attendance(&self, employee_id: u64, date: NaiveDate) -> StoreResult<Option<AttendanceRecord>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE employee_id = ? AND date = ?");
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AttendanceRecord::try_from).transpose()?)
    }

    async fn close_attendance(
        &self,
        id: u64,
        check_out: NaiveDateTime,
        status: AttendanceStatus,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out = ?, status = ?
            WHERE id = ?
            AND check_out IS NULL
            "#,
        )
        .bind(check_out)
        .bind(status.as_ref())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn add_break_minutes(&self, id: u64, minutes: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET break_minutes = break_minutes + ?
            WHERE id = ?
            AND check_out IS NULL
            "#,
        )
        .bind(minutes)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_open_attendance(&self, date: NaiveDate) -> StoreResult<Vec<AttendanceRecord>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE date = ? AND check_out IS NULL");
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn list_open_attendance_before(&self, date: NaiveDate) -> StoreResult<Vec<AttendanceRecord>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE date < ? AND check_out IS NULL");
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn list_attendance(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE employee_id = ? AND date BETWEEN ? AND ? ORDER BY date"
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect::<Result<_, _>>()?)
    }
}

#[async_trait]
impl LeaveStore for MySqlStore {
    async fn insert_leave(&self, new: NewLeave) -> StoreResult<LeaveRecord> {
        let done = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, start_date, end_date, leave_type, status, day_count)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.employee_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.leave_type.as_ref())
        .bind(LeaveStatus::Pending.as_ref())
        .bind(new.day_count)
        .execute(&self.pool)
        .await?;

        Ok(LeaveRecord {
            id: done.last_insert_id(),
            employee_id: new.employee_id,
            start_date: new.start_date,
            end_date: new.end_date,
            leave_type: new.leave_type,
            status: LeaveStatus::Pending,
            day_count: new.day_count,
        })
    }

    async fn find_leave(&self, id: u64) -> StoreResult<Option<LeaveRecord>> {
        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
        let row = sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(LeaveRecord::try_from).transpose()?)
    }

    async fn update_leave_span(
        &self,
        id: u64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        leave_type: LeaveType,
        day_count: i64,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET start_date = ?, end_date = ?, leave_type = ?, day_count = ?
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .bind(leave_type.as_ref())
        .bind(day_count)
        .bind(id)
        .bind(LeaveStatus::Pending.as_ref())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_leave_status(&self, id: u64, from: LeaveStatus, to: LeaveStatus) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE leave_requests SET status = ? WHERE id = ? AND status = ?")
            .bind(to.as_ref())
            .bind(id)
            .bind(from.as_ref())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_leaves(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
        status: LeaveStatus,
    ) -> StoreResult<Vec<LeaveRecord>> {
        let sql = format!(
            r#"
            SELECT {LEAVE_COLUMNS}
            FROM leave_requests
            WHERE employee_id = ?
            AND status = ?
            AND start_date <= ?
            AND end_date >= ?
            "#
        );
        let rows = sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(employee_id)
            .bind(status.as_ref())
            .bind(to)
            .bind(from)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(LeaveRecord::try_from)
            .collect::<Result<_, _>>()?)
    }
}

#[async_trait]
impl SalaryStore for MySqlStore {
    async fn find_salary(&self, employee_id: u64) -> StoreResult<Option<SalaryStructure>> {
        let row = sqlx::query_as::<_, SalaryRow>(
            r#"
            SELECT employee_id, basic, hra, allowance, pf_percent, tax_percent
            FROM salary_structures
            WHERE employee_id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SalaryStructure::from))
    }

    async fn upsert_salary(&self, salary: &SalaryStructure) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO salary_structures
                (employee_id, basic, hra, allowance, pf_percent, tax_percent)
            VALUES (?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                basic = VALUES(basic),
                hra = VALUES(hra),
                allowance = VALUES(allowance),
                pf_percent = VALUES(pf_percent),
                tax_percent = VALUES(tax_percent)
            "#,
        )
        .bind(salary.employee_id)
        .bind(salary.basic)
        .bind(salary.hra)
        .bind(salary.allowance)
        .bind(salary.pf_percent)
        .bind(salary.tax_percent)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

async fn insert_deductions(
    tx: &mut Transaction<'_, MySql>,
    payroll_id: u64,
    deductions: &[PayrollDeduction],
) -> Result<(), sqlx::Error> {
    for deduction in deductions {
        sqlx::query("INSERT INTO payroll_deductions (payroll_id, deduction_type, amount) VALUES (?, ?, ?)")
            .bind(payroll_id)
            .bind(deduction.deduction_type.as_ref())
            .bind(deduction.amount)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn fetch_payroll<'e, E>(executor: E, id: u64) -> Result<Option<PayrollRecord>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {PAYROLL_COLUMNS} FROM payroll WHERE id = ?");
    let row = sqlx::query_as::<_, PayrollRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    row.map(PayrollRecord::try_from).transpose()
}

#[async_trait]
impl PayrollStore for MySqlStore {
    async fn find_payroll(&self, id: u64) -> StoreResult<Option<PayrollRecord>> {
        Ok(fetch_payroll(&self.pool, id).await?)
    }

    async fn find_payroll_for(&self, employee_id: u64, period: PayPeriod) -> StoreResult<Option<PayrollRecord>> {
        let sql = format!("SELECT {PAYROLL_COLUMNS} FROM payroll WHERE employee_id = ? AND month = ? AND year = ?");
        let row = sqlx::query_as::<_, PayrollRow>(&sql)
            .bind(employee_id)
            .bind(period.month)
            .bind(period.year)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(PayrollRecord::try_from).transpose()?)
    }

    async fn payroll_deductions(&self, payroll_id: u64) -> StoreResult<Vec<PayrollDeduction>> {
        let rows = sqlx::query_as::<_, DeductionRow>(
            "SELECT deduction_type, amount FROM payroll_deductions WHERE payroll_id = ? ORDER BY id",
        )
        .bind(payroll_id)
        .fetch_all(&self.pool)
        .await?;

        let mut deductions = Vec::with_capacity(rows.len());
        for row in rows {
            deductions.push(PayrollDeduction {
                deduction_type: parse_column::<DeductionType>(&row.deduction_type)?,
                amount: row.amount,
            });
        }
        Ok(deductions)
    }

    async fn insert_payroll(&self, new: NewPayroll) -> StoreResult<PayrollRecord> {
        let duplicate = || EngineError::DuplicatePayroll {
            employee_id: new.employee_id,
            month: new.period.month,
            year: new.period.year,
        };
        let figures = &new.figures;

        // dropping `tx` on any early return rolls the whole unit back
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO payroll
                (employee_id, month, year, working_days, present_days, paid_leave_days,
                 unpaid_leave_days, overtime_minutes, gross_salary, total_deductions,
                 net_salary, status, generated_at, version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(new.employee_id)
        .bind(new.period.month)
        .bind(new.period.year)
        .bind(figures.working_days)
        .bind(figures.present_days)
        .bind(figures.paid_leave_days)
        .bind(figures.unpaid_leave_days)
        .bind(figures.overtime_minutes)
        .bind(figures.gross_salary)
        .bind(figures.total_deductions)
        .bind(figures.net_salary)
        .bind(PayrollStatus::Generated.as_ref())
        .bind(new.generated_at)
        .execute(&mut *tx)
        .await;

        let payroll_id = match inserted {
            Ok(done) => done.last_insert_id(),
            Err(e) if is_unique_violation(&e) => return Err(duplicate()),
            Err(e) => return Err(e.into()),
        };

        insert_deductions(&mut tx, payroll_id, &figures.deductions).await?;

        let record = fetch_payroll(&mut *tx, payroll_id)
            .await?
            .ok_or_else(|| EngineError::not_found("payroll", payroll_id))?;
        tx.commit().await?;
        Ok(record)
    }

    async fn change_status(&self, change: StatusChange) -> StoreResult<Option<PayrollRecord>> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE payroll
            SET status = ?,
                approved_by = COALESCE(?, approved_by),
                approved_at = COALESCE(?, approved_at),
                version = version + 1
            WHERE id = ?
            AND version = ?
            "#,
        )
        .bind(change.status.as_ref())
        .bind(change.approved_by)
        .bind(change.approved_at)
        .bind(change.payroll_id)
        .bind(change.expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        let record = fetch_payroll(&mut *tx, change.payroll_id).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn replace_figures(
        &self,
        payroll_id: u64,
        expected_version: u32,
        figures: PayrollFigures,
        generated_at: NaiveDateTime,
    ) -> StoreResult<Option<PayrollRecord>> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE payroll
            SET working_days = ?, present_days = ?, paid_leave_days = ?, unpaid_leave_days = ?,
                overtime_minutes = ?, gross_salary = ?, total_deductions = ?, net_salary = ?,
                status = ?, generated_at = ?, version = version + 1
            WHERE id = ?
            AND version = ?
            "#,
        )
        .bind(figures.working_days)
        .bind(figures.present_days)
        .bind(figures.paid_leave_days)
        .bind(figures.unpaid_leave_days)
        .bind(figures.overtime_minutes)
        .bind(figures.gross_salary)
        .bind(figures.total_deductions)
        .bind(figures.net_salary)
        .bind(PayrollStatus::Generated.as_ref())
        .bind(generated_at)
        .bind(payroll_id)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("DELETE FROM payroll_deductions WHERE payroll_id = ?")
            .bind(payroll_id)
            .execute(&mut *tx)
            .await?;
        insert_deductions(&mut tx, payroll_id, &figures.deductions).await?;

        let record = fetch_payroll(&mut *tx, payroll_id).await?;
        tx.commit().await?;
        Ok(record)
    }
}

#[async_trait]
impl EmployeeDirectory for MySqlStore {
    async fn find_employee(&self, id: u64) -> StoreResult<Option<Employee>> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, employee_code, first_name, last_name, email, status
            FROM employees
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }
}

#[async_trait]
impl HolidayCalendar for MySqlStore {
    async fn holidays_in(&self, period: PayPeriod) -> StoreResult<Vec<NaiveDate>> {
        let (first, last) = month_bounds(period)?;

        let dates = sqlx::query_scalar::<_, NaiveDate>(
            "SELECT holiday_date FROM holidays WHERE holiday_date BETWEEN ? AND ? ORDER BY holiday_date",
        )
        .bind(first)
        .bind(last)
        .fetch_all(&self.pool)
        .await?;
        Ok(dates)
    }
}

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::attendance::{AttendanceEvent, AttendanceStatus, StatusPolicy, TimeRecord, round2};
use crate::model::employee::Employee;

pub const MAX_RANGE_DAYS: i64 = 366;
/// Working days a monthly salary is spread over when deriving an hourly rate.
pub const WORKING_DAYS_PER_MONTH: f64 = 22.0;

#[derive(Debug, Error, PartialEq)]
pub enum ReportError {
    #[error("start date {start} is after end date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("report range of {0} days exceeds the {MAX_RANGE_DAYS}-day limit")]
    RangeTooLong(i64),
}

/// Inclusive date range of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReportRange {
    #[schema(value_type = String, format = Date, example = "2024-05-01")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2024-05-31")]
    pub end_date: NaiveDate,
}

impl ReportRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, ReportError> {
        let range = Self {
            start_date,
            end_date,
        };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        if self.start_date > self.end_date {
            return Err(ReportError::InvertedRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        let days = (self.end_date - self.start_date).num_days() + 1;
        if days > MAX_RANGE_DAYS {
            return Err(ReportError::RangeTooLong(days));
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Monday to Friday dates inside the range.
    pub fn scheduled_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start_date
            .iter_days()
            .take_while(move |d| *d <= self.end_date)
            .filter(|d| is_scheduled_day(*d))
    }
}

pub fn is_scheduled_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// One employee with the attendance events the caller fetched for them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmployeeAttendance {
    pub employee: Employee,
    #[serde(default)]
    pub events: Vec<AttendanceEvent>,
}

impl EmployeeAttendance {
    /// First event per date inside the range.
    fn days_in(&self, range: &ReportRange) -> BTreeMap<NaiveDate, &AttendanceEvent> {
        let mut days = BTreeMap::new();
        for event in self.events.iter().filter(|e| range.contains(e.date())) {
            days.entry(event.date()).or_insert(event);
        }
        days
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReportFilter {
    pub employee_id: Option<u64>,
    pub department: Option<String>,
}

impl ReportFilter {
    pub fn matches(&self, employee: &Employee) -> bool {
        self.employee_id.is_none_or(|id| id == employee.id)
            && self
                .department
                .as_deref()
                .is_none_or(|d| d.eq_ignore_ascii_case(&employee.department))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceRow {
    pub employee_id: u64,
    pub employee_name: String,
    pub department: String,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub work_hours: Option<f64>,
    pub check_in: TimeRecord,
    pub check_out: Option<TimeRecord>,
}

/// Every event in range with its derived status, ordered by date then employee.
pub fn attendance_rows(
    roster: &[EmployeeAttendance],
    range: &ReportRange,
    filter: &ReportFilter,
    policy: &StatusPolicy,
) -> Vec<AttendanceRow> {
    let mut rows: Vec<AttendanceRow> = roster
        .iter()
        .filter(|entry| filter.matches(&entry.employee))
        .flat_map(|entry| {
            entry
                .events
                .iter()
                .filter(|e| range.contains(e.date()))
                .map(move |e| AttendanceRow {
                    employee_id: entry.employee.id,
                    employee_name: entry.employee.name.clone(),
                    department: entry.employee.department.clone(),
                    date: e.date(),
                    status: e.status(policy),
                    work_hours: e.work_hours(),
                    check_in: e.check_in_record().clone(),
                    check_out: e.check_out_record().cloned(),
                })
        })
        .collect();
    rows.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.employee_id.cmp(&b.employee_id))
            .then(a.check_in.time.cmp(&b.check_in.time))
    });
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    pub employee_id: u64,
    pub employee_name: String,
    pub department: String,
    pub total_days: u32,
    pub present_days: u32,
    pub late_days: u32,
    pub absent_days: u32,
    pub present_percentage: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct DayCounts {
    total: u32,
    present: u32,
    late: u32,
    absent: u32,
}

fn count_days(entry: &EmployeeAttendance, range: &ReportRange, policy: &StatusPolicy) -> DayCounts {
    let attended = entry.days_in(range);
    let mut counts = DayCounts::default();
    for day in range.scheduled_days() {
        counts.total += 1;
        match attended.get(&day).map(|e| e.status(policy)) {
            None => counts.absent += 1,
            Some(AttendanceStatus::Late) => counts.late += 1,
            Some(_) => counts.present += 1,
        }
    }
    counts
}

pub fn summarize(
    roster: &[EmployeeAttendance],
    range: &ReportRange,
    filter: &ReportFilter,
    policy: &StatusPolicy,
) -> Vec<AttendanceSummary> {
    roster
        .iter()
        .filter(|entry| filter.matches(&entry.employee))
        .map(|entry| {
            let c = count_days(entry, range, policy);
            let present_percentage = if c.total == 0 {
                0.0
            } else {
                round2(f64::from(c.present + c.late) / f64::from(c.total) * 100.0)
            };
            AttendanceSummary {
                employee_id: entry.employee.id,
                employee_name: entry.employee.name.clone(),
                department: entry.employee.department.clone(),
                total_days: c.total,
                present_days: c.present,
                late_days: c.late,
                absent_days: c.absent,
                present_percentage,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SalaryLine {
    pub employee_id: u64,
    pub name: String,
    pub department: String,
    pub total_working_hours: f64,
    pub expected_working_hours: f64,
    pub missing_hours: f64,
    pub salary_per_hour: f64,
    pub total_salary: f64,
    pub total_deduction: f64,
    pub final_salary: f64,
    pub total_days: u32,
    pub present_days: u32,
    pub late_days: u32,
    pub absent_days: u32,
}

impl SalaryLine {
    pub fn compute(entry: &EmployeeAttendance, range: &ReportRange, policy: &StatusPolicy) -> Self {
        let employee = &entry.employee;
        let counts = count_days(entry, range, policy);
        let shift_hours = employee.shift.hours();

        let worked: f64 = entry
            .days_in(range)
            .values()
            .filter_map(|e| e.work_hours())
            .sum();
        let expected = f64::from(counts.total) * shift_hours;
        let rate = if shift_hours > 0.0 {
            employee.monthly_salary / (WORKING_DAYS_PER_MONTH * shift_hours)
        } else {
            0.0
        };
        let missing = (expected - worked).max(0.0);
        let total_salary = expected * rate;
        let deduction = missing * rate;

        Self {
            employee_id: employee.id,
            name: employee.name.clone(),
            department: employee.department.clone(),
            total_working_hours: round2(worked),
            expected_working_hours: round2(expected),
            missing_hours: round2(missing),
            salary_per_hour: round2(rate),
            total_salary: round2(total_salary),
            total_deduction: round2(deduction),
            final_salary: round2(total_salary - deduction),
            total_days: counts.total,
            present_days: counts.present,
            late_days: counts.late,
            absent_days: counts.absent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DepartmentSalary {
    pub department: String,
    pub total_employees: u32,
    pub total_salary: f64,
    pub total_deductions: f64,
    pub total_final_salary: f64,
    pub employees: Vec<SalaryLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct SalaryTotals {
    pub total_employees: u32,
    pub total_salary: f64,
    pub total_deductions: f64,
    pub total_final_salary: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SalaryReport {
    pub range: ReportRange,
    pub overall: SalaryTotals,
    pub departments: Vec<DepartmentSalary>,
}

pub fn salary_report(
    roster: &[EmployeeAttendance],
    range: &ReportRange,
    filter: &ReportFilter,
    policy: &StatusPolicy,
) -> SalaryReport {
    let mut grouped: BTreeMap<String, Vec<SalaryLine>> = BTreeMap::new();
    for entry in roster.iter().filter(|e| filter.matches(&e.employee)) {
        grouped
            .entry(entry.employee.department.clone())
            .or_default()
            .push(SalaryLine::compute(entry, range, policy));
    }

    let departments: Vec<DepartmentSalary> = grouped
        .into_iter()
        .map(|(department, employees)| DepartmentSalary {
            department,
            total_employees: employees.len() as u32,
            total_salary: round2(employees.iter().map(|l| l.total_salary).sum()),
            total_deductions: round2(employees.iter().map(|l| l.total_deduction).sum()),
            total_final_salary: round2(employees.iter().map(|l| l.final_salary).sum()),
            employees,
        })
        .collect();

    let overall = departments
        .iter()
        .fold(SalaryTotals::default(), |acc, d| SalaryTotals {
            total_employees: acc.total_employees + d.total_employees,
            total_salary: round2(acc.total_salary + d.total_salary),
            total_deductions: round2(acc.total_deductions + d.total_deductions),
            total_final_salary: round2(acc.total_final_salary + d.total_final_salary),
        });

    SalaryReport {
        range: *range,
        overall,
        departments,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DashboardStats {
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub total_employees: u32,
    pub active_employees: u32,
    pub today_attendance: u32,
    pub present_today: u32,
    pub late_today: u32,
    pub absent_today: u32,
}

pub fn dashboard_stats(
    roster: &[EmployeeAttendance],
    date: NaiveDate,
    policy: &StatusPolicy,
) -> DashboardStats {
    let mut stats = DashboardStats {
        date,
        total_employees: roster.len() as u32,
        active_employees: 0,
        today_attendance: 0,
        present_today: 0,
        late_today: 0,
        absent_today: 0,
    };
    let mut seen = BTreeSet::new();

    for entry in roster {
        if entry.employee.active {
            stats.active_employees += 1;
        }
        let today = entry.events.iter().find(|e| e.date() == date);
        stats.today_attendance += entry.events.iter().filter(|e| e.date() == date).count() as u32;

        match today {
            Some(e) if seen.insert(entry.employee.id) => match e.status(policy) {
                AttendanceStatus::Late => stats.late_today += 1,
                _ => stats.present_today += 1,
            },
            Some(_) => {}
            None if entry.employee.active => stats.absent_today += 1,
            None => {}
        }
    }
    stats
}

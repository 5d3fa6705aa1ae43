use crate::model::Task;
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

pub const WEEKDAY_HEADERS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// One rendered month: a run of leading blanks (grid slots before day 1,
/// Sunday-first) followed by one cell per day, each carrying that day's
/// tasks in priority order.
#[derive(Debug, Clone)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub leading_blanks: u32,
    pub days: Vec<DayCell>,
}

#[derive(Debug, Clone)]
pub struct DayCell {
    pub date: NaiveDate,
    pub tasks: Vec<Task>,
}

impl MonthGrid {
    pub fn title(&self) -> String {
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch"));
        format!("{} {}", first.format("%B"), self.year)
    }

    pub fn cell_for(&self, date: NaiveDate) -> Option<&DayCell> {
        self.days.iter().find(|cell| cell.date == date)
    }
}

/// Recomputed in full on every navigation; no incremental updates.
pub fn month_grid(year: i32, month: u32, tasks: &[Task]) -> MonthGrid {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch"));
    let days = days_in_month(first.year(), first.month());
    let leading_blanks = first.weekday().num_days_from_sunday();

    let mut buckets: HashMap<NaiveDate, Vec<Task>> = HashMap::new();
    for task in tasks {
        if task.completed {
            continue;
        }
        if let Some(due) = task.due_date {
            buckets.entry(due).or_default().push(task.clone());
        }
    }

    let cells = (1..=days)
        .filter_map(|day| NaiveDate::from_ymd_opt(first.year(), first.month(), day))
        .map(|date| {
            let mut tasks = buckets.remove(&date).unwrap_or_default();
            tasks.sort_by_key(|t| t.priority.rank());
            DayCell { date, tasks }
        })
        .collect();

    MonthGrid {
        year: first.year(),
        month: first.month(),
        leading_blanks,
        days: cells,
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.and_then(|d| d.pred_opt()).map(|d| d.day()).unwrap_or(28)
}

pub fn prev_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn task(id: &str, due: Option<&str>, priority: Priority, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            name: format!("task {}", id),
            subject: "Math".to_string(),
            due_date: due.map(date),
            priority,
            completed,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn grid_shape_matches_the_month() {
        // March 2024 has 31 days and begins on a Friday.
        let grid = month_grid(2024, 3, &[]);
        assert_eq!(grid.days.len(), 31);
        assert_eq!(grid.leading_blanks, 5);
        assert_eq!(grid.title(), "March 2024");
        // Leap February.
        assert_eq!(month_grid(2024, 2, &[]).days.len(), 29);
        assert_eq!(month_grid(2023, 2, &[]).days.len(), 28);
    }

    #[test]
    fn every_dated_active_task_lands_in_exactly_one_cell() {
        let tasks = vec![
            task("1", Some("2024-03-05"), Priority::Low, false),
            task("2", Some("2024-03-05"), Priority::High, false),
            task("3", Some("2024-03-31"), Priority::Medium, false),
            task("4", Some("2024-04-01"), Priority::High, false),
            task("5", None, Priority::High, false),
            task("6", Some("2024-03-10"), Priority::High, true),
        ];
        let grid = month_grid(2024, 3, &tasks);
        let mut seen = Vec::new();
        for cell in &grid.days {
            for t in &cell.tasks {
                assert_eq!(t.due_date, Some(cell.date));
                seen.push(t.id.clone());
            }
        }
        seen.sort();
        // Out-of-month, undated, and completed tasks never appear.
        assert_eq!(seen, vec!["1", "2", "3"]);
    }

    #[test]
    fn day_buckets_sort_by_priority_and_stay_stable() {
        let tasks = vec![
            task("a", Some("2024-03-05"), Priority::Low, false),
            task("b", Some("2024-03-05"), Priority::Medium, false),
            task("c", Some("2024-03-05"), Priority::High, false),
            task("d", Some("2024-03-05"), Priority::Medium, false),
        ];
        let grid = month_grid(2024, 3, &tasks);
        let cell = grid.cell_for(date("2024-03-05")).unwrap();
        let ids: Vec<&str> = cell.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "d", "a"]);
    }

    #[test]
    fn navigation_wraps_at_year_boundaries() {
        assert_eq!(prev_month(2024, 1), (2023, 12));
        assert_eq!(next_month(2024, 12), (2025, 1));
        assert_eq!(prev_month(2024, 7), (2024, 6));
        assert_eq!(next_month(2024, 7), (2024, 8));
    }

    #[test]
    fn days_in_month_handles_every_length() {
        assert_eq!(days_in_month(2024, 1), 31);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2100, 2), 28);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }
}

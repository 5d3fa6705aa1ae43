use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type TaskId = String;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn parse(input: &str) -> Option<Priority> {
        match input.trim().to_lowercase().as_str() {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub subject: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub ts: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: content.into(),
            ts: Utc::now(),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PlannerError {
    #[error("task name is required")]
    NameRequired,
    #[error("subject is required")]
    SubjectRequired,
    #[error("due date is required")]
    DueDateRequired,
    #[error("priority is required")]
    PriorityRequired,
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("subject already exists: {0}")]
    DuplicateSubject(String),
    #[error("subject not found: {0}")]
    SubjectNotFound(String),
}

impl PlannerError {
    /// Which form field a validation error points at, so the UI can
    /// refocus it.
    pub fn field(&self) -> Option<TaskField> {
        match self {
            PlannerError::NameRequired => Some(TaskField::Name),
            PlannerError::SubjectRequired => Some(TaskField::Subject),
            PlannerError::DueDateRequired => Some(TaskField::Due),
            PlannerError::PriorityRequired => Some(TaskField::Priority),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TaskField {
    Name,
    Subject,
    Due,
    Priority,
}

#[derive(Debug, Clone, Default)]
pub struct Planner {
    pub tasks: Vec<Task>,
    pub subjects: Vec<String>,
    pub colors: HashMap<String, String>,
}

pub struct NewTask {
    pub name: String,
    pub subject: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<Priority>,
}

impl Planner {
    pub fn new(tasks: Vec<Task>, subjects: Vec<String>, colors: HashMap<String, String>) -> Self {
        Planner {
            tasks,
            subjects,
            colors,
        }
    }

    pub fn add_task(&mut self, id: TaskId, new: NewTask) -> Result<&Task, PlannerError> {
        if new.name.trim().is_empty() {
            return Err(PlannerError::NameRequired);
        }
        if new.subject.trim().is_empty() {
            return Err(PlannerError::SubjectRequired);
        }
        let due = new.due_date.ok_or(PlannerError::DueDateRequired)?;
        let priority = new.priority.ok_or(PlannerError::PriorityRequired)?;
        self.tasks.push(Task {
            id,
            name: new.name.trim().to_string(),
            subject: new.subject,
            due_date: Some(due),
            priority,
            completed: false,
            created_at: Utc::now(),
        });
        Ok(self.tasks.last().expect("just pushed"))
    }

    /// Marks a task completed. A missing id is a silent no-op: the
    /// double-event race resolves by letting the first mutation win.
    pub fn complete_task(&mut self, id: &str) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.completed = true;
                true
            }
            None => false,
        }
    }

    pub fn delete_task(&mut self, id: &str) -> Result<(), PlannerError> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Err(PlannerError::TaskNotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn add_subject(&mut self, name: &str) -> Result<(), PlannerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlannerError::SubjectRequired);
        }
        if self.subjects.iter().any(|s| s == name) {
            return Err(PlannerError::DuplicateSubject(name.to_string()));
        }
        let idx = self
            .subjects
            .binary_search(&name.to_string())
            .unwrap_or_else(|i| i);
        self.subjects.insert(idx, name.to_string());
        self.colors
            .entry(name.to_string())
            .or_insert_with(|| crate::color::color_for(name));
        Ok(())
    }

    /// Removes a subject and cascades to every task referencing it.
    /// Returns how many tasks went with it.
    pub fn delete_subject(&mut self, name: &str) -> Result<usize, PlannerError> {
        let before = self.subjects.len();
        self.subjects.retain(|s| s != name);
        if self.subjects.len() == before {
            return Err(PlannerError::SubjectNotFound(name.to_string()));
        }
        let tasks_before = self.tasks.len();
        self.tasks.retain(|t| t.subject != name);
        self.colors.remove(name);
        Ok(tasks_before - self.tasks.len())
    }

    pub fn set_color(&mut self, subject: &str, hex: &str) -> Result<(), PlannerError> {
        if !self.subjects.iter().any(|s| s == subject) {
            return Err(PlannerError::SubjectNotFound(subject.to_string()));
        }
        self.colors.insert(subject.to_string(), hex.to_string());
        Ok(())
    }

    pub fn color_of(&self, subject: &str) -> Option<&str> {
        self.colors.get(subject).map(String::as_str)
    }

    pub fn active_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.completed)
    }

    /// Non-completed tasks grouped by subject, subjects in list order,
    /// tasks in storage order within each group.
    pub fn board(&self) -> Vec<(&str, Vec<&Task>)> {
        self.subjects
            .iter()
            .map(|subject| {
                let tasks = self
                    .active_tasks()
                    .filter(|t| &t.subject == subject)
                    .collect();
                (subject.as_str(), tasks)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
    Overdue,
    DueToday,
    DueTomorrow,
    Upcoming,
}

pub fn due_status(due: NaiveDate, today: NaiveDate) -> DueStatus {
    if due < today {
        DueStatus::Overdue
    } else if due == today {
        DueStatus::DueToday
    } else if due == today + Duration::days(1) {
        DueStatus::DueTomorrow
    } else {
        DueStatus::Upcoming
    }
}

pub fn due_label(due: NaiveDate, today: NaiveDate) -> String {
    let formatted = due.format("%a, %b %-d, %Y");
    match due_status(due, today) {
        DueStatus::Overdue => format!("Overdue - {}", formatted),
        DueStatus::DueToday => "Due Today".to_string(),
        DueStatus::DueTomorrow => "Due Tomorrow".to_string(),
        DueStatus::Upcoming => formatted.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn task(id: &str, subject: &str, due: &str, priority: Priority) -> Task {
        Task {
            id: id.to_string(),
            name: format!("task {}", id),
            subject: subject.to_string(),
            due_date: Some(date(due)),
            priority,
            completed: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn add_task_requires_every_field() {
        let mut planner = Planner::default();
        let missing_name = planner.add_task(
            "1".into(),
            NewTask {
                name: "  ".into(),
                subject: "Math".into(),
                due_date: Some(date("2024-05-01")),
                priority: Some(Priority::High),
            },
        );
        assert_eq!(missing_name.unwrap_err(), PlannerError::NameRequired);

        let missing_due = planner.add_task(
            "1".into(),
            NewTask {
                name: "Essay".into(),
                subject: "Math".into(),
                due_date: None,
                priority: Some(Priority::High),
            },
        );
        assert_eq!(missing_due.unwrap_err(), PlannerError::DueDateRequired);
        assert!(planner.tasks.is_empty());
    }

    #[test]
    fn subjects_stay_sorted_and_unique() {
        let mut planner = Planner::default();
        for name in ["Math", "Art", "Zoology", "Biology"] {
            planner.add_subject(name).unwrap();
        }
        assert_eq!(planner.subjects, vec!["Art", "Biology", "Math", "Zoology"]);
        assert_eq!(
            planner.add_subject("Math").unwrap_err(),
            PlannerError::DuplicateSubject("Math".into())
        );
        planner.delete_subject("Biology").unwrap();
        assert_eq!(planner.subjects, vec!["Art", "Math", "Zoology"]);
    }

    #[test]
    fn subject_dedup_is_case_sensitive() {
        let mut planner = Planner::default();
        planner.add_subject("math").unwrap();
        planner.add_subject("Math").unwrap();
        assert_eq!(planner.subjects, vec!["Math", "math"]);
    }

    #[test]
    fn delete_subject_cascades_to_its_tasks_only() {
        let mut planner = Planner::default();
        planner.add_subject("Math").unwrap();
        planner.add_subject("English").unwrap();
        planner.tasks = vec![
            task("1", "Math", "2024-01-01", Priority::High),
            task("2", "English", "2024-01-02", Priority::Low),
            task("3", "Math", "2024-01-03", Priority::Medium),
            task("4", "Math", "2024-01-04", Priority::Low),
        ];
        let removed = planner.delete_subject("Math").unwrap();
        assert_eq!(removed, 3);
        assert_eq!(planner.tasks.len(), 1);
        assert_eq!(planner.tasks[0].subject, "English");
        assert!(planner.colors.get("Math").is_none());
    }

    #[test]
    fn delete_subject_requires_existing_name() {
        let mut planner = Planner::default();
        assert_eq!(
            planner.delete_subject("Ghost").unwrap_err(),
            PlannerError::SubjectNotFound("Ghost".into())
        );
    }

    #[test]
    fn complete_is_silent_on_missing_id() {
        let mut planner = Planner::default();
        planner.tasks = vec![task("1", "Math", "2024-01-01", Priority::High)];
        assert!(planner.complete_task("1"));
        assert!(planner.tasks[0].completed);
        assert!(!planner.complete_task("nope"));
        assert_eq!(planner.tasks.len(), 1);
    }

    #[test]
    fn delete_task_reports_missing_id() {
        let mut planner = Planner::default();
        planner.tasks = vec![task("1", "Math", "2024-01-01", Priority::High)];
        assert!(planner.delete_task("2").is_err());
        planner.delete_task("1").unwrap();
        assert!(planner.tasks.is_empty());
    }

    #[test]
    fn board_excludes_completed_and_keeps_storage_order() {
        let mut planner = Planner::default();
        planner.add_subject("Math").unwrap();
        planner.tasks = vec![
            task("1", "Math", "2024-01-03", Priority::Low),
            task("2", "Math", "2024-01-01", Priority::High),
            task("3", "Math", "2024-01-02", Priority::Medium),
        ];
        planner.complete_task("3");
        let board = planner.board();
        assert_eq!(board.len(), 1);
        let ids: Vec<&str> = board[0].1.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn due_labels_match_calendar_comparison() {
        let today = date("2024-01-02");
        assert_eq!(
            due_label(date("2024-01-01"), today),
            "Overdue - Mon, Jan 1, 2024"
        );
        assert_eq!(due_label(date("2024-01-02"), today), "Due Today");
        assert_eq!(due_label(date("2024-01-03"), today), "Due Tomorrow");
        assert_eq!(due_label(date("2024-02-15"), today), "Thu, Feb 15, 2024");
    }

    #[test]
    fn stored_task_defaults_apply_on_load() {
        let raw =
            r#"{"id":"1","name":"Essay","subject":"English","created_at":"2024-01-01T00:00:00Z"}"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.completed);
        assert!(task.due_date.is_none());
    }
}

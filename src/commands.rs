use crate::calendar::{self, WEEKDAY_HEADERS};
use crate::chat;
use crate::model::{due_label, ChatMessage, NewTask, Planner, Priority, Role, Task};
use crate::storage::{self, Store};
use crate::ui;
use anyhow::{anyhow, bail, Result};
use chrono::{Datelike, Local, NaiveDate, Utc};
use rand::{distributions::Alphanumeric, Rng};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};

pub fn add(name: String, subject: String, due: String, priority: String) -> Result<()> {
    let store = Store::open()?;
    let mut planner = load_planner(&store);
    let due_date = parse_due(&due)?;
    let priority =
        Priority::parse(&priority).ok_or_else(|| anyhow!("invalid priority: {}", priority))?;
    if !planner.subjects.iter().any(|s| s == &subject) {
        planner.add_subject(&subject)?;
        store.save(storage::SUBJECTS, &planner.subjects)?;
        store.save(storage::SUBJECT_COLORS, &planner.colors)?;
    }
    let id = generate_id();
    planner.add_task(
        id.clone(),
        NewTask {
            name,
            subject: subject.clone(),
            due_date: Some(due_date),
            priority: Some(priority),
        },
    )?;
    store.save(storage::TASKS, &planner.tasks)?;
    println!("Added task {} to {}", id, subject);
    Ok(())
}

pub fn list(subject: Option<String>) -> Result<()> {
    let store = Store::open()?;
    let planner = load_planner(&store);
    let today = Local::now().date_naive();
    let board = planner.board();
    if board.iter().all(|(_, tasks)| tasks.is_empty()) {
        println!("No active tasks. Add one with `studyhall add`.");
        return Ok(());
    }
    for (name, tasks) in board {
        if let Some(ref filter) = subject {
            if name != filter.as_str() {
                continue;
            }
        }
        println!("{}", name);
        if tasks.is_empty() {
            println!("  (empty)");
        }
        for task in tasks {
            print_task(task, today);
        }
        println!();
    }
    Ok(())
}

pub fn complete(task_id: String) -> Result<()> {
    let store = Store::open()?;
    let mut planner = load_planner(&store);
    if !planner.complete_task(&task_id) {
        bail!("task {} not found", task_id);
    }
    store.save(storage::TASKS, &planner.tasks)?;
    println!("Completed task {}", task_id);
    Ok(())
}

pub fn delete(task_id: String) -> Result<()> {
    let store = Store::open()?;
    let mut planner = load_planner(&store);
    planner.delete_task(&task_id)?;
    store.save(storage::TASKS, &planner.tasks)?;
    println!("Deleted task {}", task_id);
    Ok(())
}

pub fn subject_add(name: String) -> Result<()> {
    let store = Store::open()?;
    let mut planner = load_planner(&store);
    planner.add_subject(&name)?;
    store.save(storage::SUBJECTS, &planner.subjects)?;
    store.save(storage::SUBJECT_COLORS, &planner.colors)?;
    let color = planner.color_of(&name).unwrap_or("#ffffff").to_string();
    println!("Added subject {} ({})", name, color);
    Ok(())
}

pub fn subject_delete(name: String, yes: bool) -> Result<()> {
    let store = Store::open()?;
    let mut planner = load_planner(&store);
    if !planner.subjects.iter().any(|s| s == &name) {
        bail!("subject {} not found", name);
    }
    let affected = planner.tasks.iter().filter(|t| t.subject == name).count();
    if !yes && !confirm(&format!("Delete {} and its {} task(s)?", name, affected))? {
        println!("Canceled");
        return Ok(());
    }
    let removed = planner.delete_subject(&name)?;
    store.save(storage::TASKS, &planner.tasks)?;
    store.save(storage::SUBJECTS, &planner.subjects)?;
    store.save(storage::SUBJECT_COLORS, &planner.colors)?;
    println!("Deleted subject {} and {} task(s)", name, removed);
    Ok(())
}

pub fn subject_color(name: String, hex: String) -> Result<()> {
    let store = Store::open()?;
    let mut planner = load_planner(&store);
    if crate::color::parse_hex(&hex).is_none() {
        bail!("invalid hex color: {}", hex);
    }
    planner.set_color(&name, &hex)?;
    store.save(storage::SUBJECT_COLORS, &planner.colors)?;
    println!("Set color of {} to {}", name, hex);
    Ok(())
}

pub fn subject_list() -> Result<()> {
    let store = Store::open()?;
    let planner = load_planner(&store);
    if planner.subjects.is_empty() {
        println!("No subjects yet. Add one with `studyhall subject add`.");
        return Ok(());
    }
    for name in &planner.subjects {
        let count = planner
            .active_tasks()
            .filter(|t| &t.subject == name)
            .count();
        println!(
            "{}  {}  ({} active)",
            name,
            planner.color_of(name).unwrap_or("-"),
            count
        );
    }
    Ok(())
}

pub fn calendar(year: Option<i32>, month: Option<u32>) -> Result<()> {
    let store = Store::open()?;
    let planner = load_planner(&store);
    let today = Local::now().date_naive();
    let year = year.unwrap_or_else(|| today.year());
    let month = month.unwrap_or_else(|| today.month());
    if !(1..=12).contains(&month) {
        bail!("month must be between 1 and 12");
    }
    let grid = calendar::month_grid(year, month, &planner.tasks);
    println!("{}", grid.title());
    for header in WEEKDAY_HEADERS {
        print!("{:>5}", header);
    }
    println!();
    let mut slot = 0;
    for _ in 0..grid.leading_blanks {
        print!("{:>5}", "");
        slot += 1;
    }
    for cell in &grid.days {
        if cell.tasks.is_empty() {
            print!("{:>5}", cell.date.day());
        } else {
            print!("{:>5}", format!("{}*{}", cell.date.day(), cell.tasks.len()));
        }
        slot += 1;
        if slot % 7 == 0 {
            println!();
        }
    }
    if slot % 7 != 0 {
        println!();
    }
    for cell in &grid.days {
        for task in &cell.tasks {
            println!(
                "{}  [{}] {} ({}, {})",
                cell.date,
                task.id,
                task.name,
                task.subject,
                task.priority.label()
            );
        }
    }
    Ok(())
}

pub fn chat(message: String) -> Result<()> {
    let store = Store::open()?;
    let mut history: Vec<ChatMessage> = store.load(storage::CHAT_HISTORY, Vec::new());
    chat::send(&store, &mut history, &message)?;
    if let Some(reply) = history.iter().rev().find(|m| m.role == Role::Assistant) {
        println!("{}", reply.content);
    }
    Ok(())
}

pub fn chat_clear() -> Result<()> {
    let store = Store::open()?;
    store.save(storage::CHAT_HISTORY, &Vec::<ChatMessage>::new())?;
    println!("Chat history cleared");
    Ok(())
}

pub fn config(api_key: Option<String>, model: Option<String>, theme: Option<String>) -> Result<()> {
    let store = Store::open()?;
    let mut changed = false;
    if let Some(key) = api_key {
        store.save(storage::API_KEY, &key)?;
        changed = true;
    }
    if let Some(model) = model {
        store.save(storage::CHAT_MODEL, &model)?;
        changed = true;
    }
    if let Some(theme) = theme {
        if theme != "light" && theme != "dark" {
            bail!("theme must be light or dark");
        }
        store.save(storage::THEME, &theme)?;
        changed = true;
    }
    if changed {
        println!("Settings saved");
    } else {
        let key: String = store.load(storage::API_KEY, String::new());
        let model: String = store.load(storage::CHAT_MODEL, chat::DEFAULT_MODEL.to_string());
        let theme: String = store.load(storage::THEME, "dark".to_string());
        println!("api key: {}", if key.is_empty() { "(unset)" } else { "(set)" });
        println!("model:   {}", model);
        println!("theme:   {}", theme);
        println!("store:   {}", store.path().display());
    }
    Ok(())
}

pub fn tui() -> Result<()> {
    let store = Store::open()?;
    let planner = load_planner(&store);
    ui::run(planner, store)
}

pub fn load_planner(store: &Store) -> Planner {
    let tasks: Vec<Task> = store.load(storage::TASKS, Vec::new());
    let subjects: Vec<String> = store.load(storage::SUBJECTS, Vec::new());
    let colors: HashMap<String, String> = store.load(storage::SUBJECT_COLORS, HashMap::new());
    Planner::new(tasks, subjects, colors)
}

pub fn parse_due(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| anyhow!("invalid date format (use YYYY-MM-DD): {}", trimmed))
}

pub fn generate_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(char::from)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn print_task(task: &Task, today: NaiveDate) {
    let badge = task
        .due_date
        .map(|due| due_label(due, today))
        .unwrap_or_default();
    println!(
        "  - [{}] {} ({}) {}",
        task.id,
        task.name,
        task.priority.label(),
        badge
    );
}

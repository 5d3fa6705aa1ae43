use crate::calendar::{self, MonthGrid, WEEKDAY_HEADERS};
use crate::chat;
use crate::color;
use crate::commands::{generate_id, parse_due};
use crate::model::{
    due_label, due_status, ChatMessage, DueStatus, NewTask, Planner, Priority, Role, Task,
    TaskField,
};
use crate::storage::{self, Store};
use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

const STATUS_TTL: Duration = Duration::from_secs(4);

pub fn run(planner: Planner, store: Store) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(planner, store);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    planner: Planner,
    store: Store,
    view: ViewMode,
    theme: Theme,
    mode: Mode,
    status: Option<(String, Instant)>,
    selected_subject: usize,
    selected_task: usize,
    cal_year: i32,
    cal_month: u32,
    cal_day: u32,
    history: Vec<ChatMessage>,
    chat_input: FieldValue,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum ViewMode {
    Board,
    Calendar,
    Chat,
}

impl ViewMode {
    fn label(&self) -> &'static str {
        match self {
            ViewMode::Board => "Board",
            ViewMode::Calendar => "Calendar",
            ViewMode::Chat => "Chat",
        }
    }
}

enum Mode {
    Normal,
    Creating(TaskForm),
    SubjectPrompt(FieldValue),
    ColorPrompt { subject: String, field: FieldValue },
    ConfirmDeleteSubject { subject: String },
    DayModal { date: NaiveDate },
}

/// Every state mutation funnels through one of these, so the handlers
/// stay testable apart from the widget tree.
enum Action {
    Complete(String),
    Delete(String),
    AddSubject(String),
    DeleteSubject(String),
    SetColor(String, String),
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Theme {
    Light,
    Dark,
}

impl Theme {
    fn from_key(value: &str) -> Theme {
        if value == "light" {
            Theme::Light
        } else {
            Theme::Dark
        }
    }

    fn key(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    fn toggled(&self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    fn bg(&self) -> Color {
        match self {
            Theme::Light => Color::Rgb(245, 245, 240),
            Theme::Dark => Color::Rgb(16, 18, 24),
        }
    }

    fn fg(&self) -> Color {
        match self {
            Theme::Light => Color::Rgb(40, 40, 46),
            Theme::Dark => Color::Gray,
        }
    }

    fn dim(&self) -> Color {
        match self {
            Theme::Light => Color::Rgb(130, 130, 140),
            Theme::Dark => Color::DarkGray,
        }
    }
}

struct TaskForm {
    name: FieldValue,
    subject: FieldValue,
    due: FieldValue,
    priority: FieldValue,
    field: TaskField,
}

impl TaskForm {
    fn new(subject: Option<&str>) -> Self {
        TaskForm {
            name: FieldValue::new(""),
            subject: FieldValue::new(subject.unwrap_or("")),
            due: FieldValue::new(""),
            priority: FieldValue::new("medium"),
            field: TaskField::Name,
        }
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            TaskField::Name => &mut self.name,
            TaskField::Subject => &mut self.subject,
            TaskField::Due => &mut self.due,
            TaskField::Priority => &mut self.priority,
        }
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            TaskField::Name => TaskField::Subject,
            TaskField::Subject => TaskField::Due,
            TaskField::Due => TaskField::Priority,
            TaskField::Priority => TaskField::Name,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            TaskField::Name => TaskField::Priority,
            TaskField::Subject => TaskField::Name,
            TaskField::Due => TaskField::Subject,
            TaskField::Priority => TaskField::Due,
        };
    }
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_grapheme(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_grapheme(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_grapheme(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl App {
    fn new(planner: Planner, store: Store) -> Self {
        let today = Local::now().date_naive();
        let theme: String = store.load(storage::THEME, "dark".to_string());
        let history: Vec<ChatMessage> = store.load(storage::CHAT_HISTORY, Vec::new());
        App {
            planner,
            theme: Theme::from_key(&theme),
            store,
            view: ViewMode::Board,
            mode: Mode::Normal,
            status: None,
            selected_subject: 0,
            selected_task: 0,
            cal_year: today.year(),
            cal_month: today.month(),
            cal_day: today.day(),
            history,
            chat_input: FieldValue::new(""),
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            self.expire_status();
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key)? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Creating(_) => self.handle_form_key(key),
            Mode::SubjectPrompt(_) | Mode::ColorPrompt { .. } => self.handle_prompt_key(key),
            Mode::ConfirmDeleteSubject { .. } => self.handle_confirm_key(key),
            Mode::DayModal { .. } => self.handle_modal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        if self.view == ViewMode::Chat {
            return self.handle_chat_key(key);
        }
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('1') => {
                self.set_view(ViewMode::Board);
                return Ok(false);
            }
            KeyCode::Char('2') => {
                self.set_view(ViewMode::Calendar);
                return Ok(false);
            }
            KeyCode::Char('3') => {
                self.set_view(ViewMode::Chat);
                return Ok(false);
            }
            KeyCode::Char('T') => {
                self.toggle_theme();
                return Ok(false);
            }
            KeyCode::Char('n') => {
                let subject = self.current_subject().map(str::to_string);
                self.mode = Mode::Creating(TaskForm::new(subject.as_deref()));
                self.set_status("New task (Tab moves, Enter saves, Esc cancels)");
                return Ok(false);
            }
            _ => {}
        }
        match self.view {
            ViewMode::Board => self.handle_board_key(key),
            ViewMode::Calendar => self.handle_calendar_key(key),
            ViewMode::Chat => Ok(false),
        }
    }

    fn handle_board_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => {
                if self.selected_subject > 0 {
                    self.selected_subject -= 1;
                    self.selected_task = 0;
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.selected_subject + 1 < self.planner.subjects.len() {
                    self.selected_subject += 1;
                    self.selected_task = 0;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.selected_task > 0 {
                    self.selected_task -= 1;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let count = self.current_column_len();
                if self.selected_task + 1 < count {
                    self.selected_task += 1;
                }
            }
            KeyCode::Char('c') => {
                if let Some(id) = self.current_task_id() {
                    self.apply(Action::Complete(id))?;
                } else {
                    self.set_status("No task selected");
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.current_task_id() {
                    self.apply(Action::Delete(id))?;
                } else {
                    self.set_status("No task selected");
                }
            }
            KeyCode::Char('a') => {
                self.mode = Mode::SubjectPrompt(FieldValue::new(""));
                self.set_status("New subject name (Enter saves, Esc cancels)");
            }
            KeyCode::Char('X') => {
                if let Some(subject) = self.current_subject().map(str::to_string) {
                    self.mode = Mode::ConfirmDeleteSubject { subject };
                } else {
                    self.set_status("No subject selected");
                }
            }
            KeyCode::Char('o') => {
                if let Some(subject) = self.current_subject().map(str::to_string) {
                    let current = self.planner.color_of(&subject).unwrap_or("").to_string();
                    self.mode = Mode::ColorPrompt {
                        subject,
                        field: FieldValue::new(&current),
                    };
                    self.set_status("Hex color, e.g. #aaccee (Enter saves, Esc cancels)");
                } else {
                    self.set_status("No subject selected");
                }
            }
            _ => {}
        }
        self.clamp_board_selection();
        Ok(false)
    }

    fn handle_calendar_key(&mut self, key: KeyEvent) -> Result<bool> {
        let days = calendar::days_in_month(self.cal_year, self.cal_month);
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => {
                if self.cal_day > 1 {
                    self.cal_day -= 1;
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.cal_day < days {
                    self.cal_day += 1;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.cal_day = self.cal_day.saturating_sub(7).max(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.cal_day = (self.cal_day + 7).min(days);
            }
            KeyCode::Char('[') => {
                let (y, m) = calendar::prev_month(self.cal_year, self.cal_month);
                self.set_month(y, m);
            }
            KeyCode::Char(']') => {
                let (y, m) = calendar::next_month(self.cal_year, self.cal_month);
                self.set_month(y, m);
            }
            KeyCode::Char('t') => {
                let today = Local::now().date_naive();
                self.cal_year = today.year();
                self.cal_month = today.month();
                self.cal_day = today.day();
            }
            KeyCode::Enter => {
                if let Some(date) =
                    NaiveDate::from_ymd_opt(self.cal_year, self.cal_month, self.cal_day)
                {
                    self.mode = Mode::DayModal { date };
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_chat_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Esc => self.set_view(ViewMode::Board),
            KeyCode::Enter => self.send_chat_message()?,
            KeyCode::Backspace => self.chat_input.backspace(),
            KeyCode::Left => self.chat_input.move_left(),
            KeyCode::Right => self.chat_input.move_right(),
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.history.clear();
                let history = self.history.clone();
                self.persist(storage::CHAT_HISTORY, &history, "Chat history cleared");
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.chat_input.clear();
            }
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    self.chat_input.insert_char(c);
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<bool> {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let mut close_form = false;
        if let Mode::Creating(form) = &mut mode {
            match key.code {
                KeyCode::Esc => {
                    close_form = true;
                    self.set_status("Canceled");
                }
                KeyCode::Tab | KeyCode::Down => form.next_field(),
                KeyCode::BackTab | KeyCode::Up => form.prev_field(),
                KeyCode::Left => form.active_field_mut().move_left(),
                KeyCode::Right => form.active_field_mut().move_right(),
                KeyCode::Backspace => form.active_field_mut().backspace(),
                KeyCode::Enter => close_form = self.submit_task_form(form)?,
                KeyCode::Char(c) => {
                    if !key
                        .modifiers
                        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                    {
                        form.active_field_mut().insert_char(c);
                    }
                }
                _ => {}
            }
        }
        self.mode = if close_form { Mode::Normal } else { mode };
        Ok(false)
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Result<bool> {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let mut close = false;
        match &mut mode {
            Mode::SubjectPrompt(field) => match key.code {
                KeyCode::Esc => {
                    close = true;
                    self.set_status("Canceled");
                }
                KeyCode::Enter => {
                    let name = field.value.trim().to_string();
                    self.apply(Action::AddSubject(name))?;
                    close = true;
                }
                KeyCode::Backspace => field.backspace(),
                KeyCode::Left => field.move_left(),
                KeyCode::Right => field.move_right(),
                KeyCode::Char(c) => field.insert_char(c),
                _ => {}
            },
            Mode::ColorPrompt { subject, field } => match key.code {
                KeyCode::Esc => {
                    close = true;
                    self.set_status("Canceled");
                }
                KeyCode::Enter => {
                    let hex = field.value.trim().to_string();
                    if color::parse_hex(&hex).is_none() {
                        self.set_status(format!("Invalid hex color: {}", hex));
                    } else {
                        let subject = subject.clone();
                        self.apply(Action::SetColor(subject, hex))?;
                        close = true;
                    }
                }
                KeyCode::Backspace => field.backspace(),
                KeyCode::Left => field.move_left(),
                KeyCode::Right => field.move_right(),
                KeyCode::Char(c) => field.insert_char(c),
                _ => {}
            },
            _ => {}
        }
        self.mode = if close { Mode::Normal } else { mode };
        Ok(false)
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<bool> {
        let subject = match &self.mode {
            Mode::ConfirmDeleteSubject { subject } => subject.clone(),
            _ => return Ok(false),
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.mode = Mode::Normal;
                self.apply(Action::DeleteSubject(subject))?;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.set_status("Delete canceled");
                self.mode = Mode::Normal;
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_modal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => {
                self.mode = Mode::Normal;
            }
            _ => {}
        }
        Ok(false)
    }

    fn apply(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Complete(id) => {
                // Missing id means another handler already removed it.
                if self.planner.complete_task(&id) {
                    let tasks = self.planner.tasks.clone();
                    self.persist(storage::TASKS, &tasks, "Task completed");
                }
                self.clamp_board_selection();
            }
            Action::Delete(id) => match self.planner.delete_task(&id) {
                Ok(()) => {
                    let tasks = self.planner.tasks.clone();
                    self.persist(storage::TASKS, &tasks, "Task deleted");
                    self.clamp_board_selection();
                }
                Err(err) => self.set_status(format!("{}", err)),
            },
            Action::AddSubject(name) => match self.planner.add_subject(&name) {
                Ok(()) => {
                    let subjects = self.planner.subjects.clone();
                    let colors = self.planner.colors.clone();
                    if self.try_save(storage::SUBJECTS, &subjects)
                        && self.try_save(storage::SUBJECT_COLORS, &colors)
                    {
                        self.set_status(format!("Added subject {}", name));
                    }
                }
                Err(err) => self.set_status(format!("{}", err)),
            },
            Action::DeleteSubject(name) => match self.planner.delete_subject(&name) {
                Ok(removed) => {
                    let tasks = self.planner.tasks.clone();
                    let subjects = self.planner.subjects.clone();
                    let colors = self.planner.colors.clone();
                    if self.try_save(storage::TASKS, &tasks)
                        && self.try_save(storage::SUBJECTS, &subjects)
                        && self.try_save(storage::SUBJECT_COLORS, &colors)
                    {
                        self.set_status(format!(
                            "Deleted subject {} and {} task(s)",
                            name, removed
                        ));
                    }
                    self.clamp_board_selection();
                }
                Err(err) => self.set_status(format!("{}", err)),
            },
            Action::SetColor(subject, hex) => match self.planner.set_color(&subject, &hex) {
                Ok(()) => {
                    let colors = self.planner.colors.clone();
                    self.persist(
                        storage::SUBJECT_COLORS,
                        &colors,
                        format!("Set color of {}", subject),
                    );
                }
                Err(err) => self.set_status(format!("{}", err)),
            },
        }
        Ok(())
    }

    fn submit_task_form(&mut self, form: &mut TaskForm) -> Result<bool> {
        let due_date = match parse_due(&form.due.value) {
            Ok(date) => Some(date),
            Err(err) if !form.due.value.trim().is_empty() => {
                self.set_status(format!("{}", err));
                form.field = TaskField::Due;
                return Ok(false);
            }
            Err(_) => None,
        };
        let priority = if form.priority.value.trim().is_empty() {
            None
        } else {
            match Priority::parse(&form.priority.value) {
                Some(p) => Some(p),
                None => {
                    self.set_status(format!("Invalid priority: {}", form.priority.value));
                    form.field = TaskField::Priority;
                    return Ok(false);
                }
            }
        };
        let subject = form.subject.value.trim().to_string();
        let new = NewTask {
            name: form.name.value.clone(),
            subject: subject.clone(),
            due_date,
            priority,
        };
        let known = self.planner.subjects.iter().any(|s| s == &subject);
        let id = generate_id();
        match self.planner.add_task(id, new) {
            Ok(_) => {
                if !known {
                    // The picker allows new names; register the subject
                    // with its default color.
                    let _ = self.planner.add_subject(&subject);
                    let subjects = self.planner.subjects.clone();
                    let colors = self.planner.colors.clone();
                    self.try_save(storage::SUBJECTS, &subjects);
                    self.try_save(storage::SUBJECT_COLORS, &colors);
                }
                let tasks = self.planner.tasks.clone();
                self.persist(storage::TASKS, &tasks, "Task added");
                Ok(true)
            }
            Err(err) => {
                // Refocus the first invalid field, as the error names it.
                if let Some(field) = err.field() {
                    form.field = field;
                }
                self.set_status(format!("{}", err));
                Ok(false)
            }
        }
    }

    fn send_chat_message(&mut self) -> Result<()> {
        let input = self.chat_input.value.trim().to_string();
        if input.is_empty() {
            self.set_status("Message is empty");
            return Ok(());
        }
        self.chat_input.clear();
        self.set_status("Sending...");
        // Blocks until the completion settles; remote failures come back
        // as assistant-role text, so only store writes can error here.
        match chat::send(&self.store, &mut self.history, &input) {
            Ok(()) => self.status = None,
            Err(err) => self.set_status(format!("Could not save chat: {}", err)),
        }
        Ok(())
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        let key = self.theme.key().to_string();
        self.persist(storage::THEME, &key, format!("Theme: {}", key));
    }

    fn persist<T: serde::Serialize>(&mut self, key: &str, value: &T, ok: impl Into<String>) {
        if self.try_save(key, value) {
            self.set_status(ok);
        }
    }

    fn try_save<T: serde::Serialize>(&mut self, key: &str, value: &T) -> bool {
        match self.store.save(key, value) {
            Ok(()) => true,
            Err(err) => {
                self.set_status(format!("Save failed: {}", err));
                false
            }
        }
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some((msg.into(), Instant::now()));
    }

    fn expire_status(&mut self) {
        if let Some((_, since)) = &self.status {
            if since.elapsed() > STATUS_TTL {
                self.status = None;
            }
        }
    }

    fn set_view(&mut self, view: ViewMode) {
        if self.view != view {
            self.view = view;
            self.set_status(format!("Switched to {} view", view.label()));
        }
    }

    fn set_month(&mut self, year: i32, month: u32) {
        self.cal_year = year;
        self.cal_month = month;
        self.cal_day = self.cal_day.min(calendar::days_in_month(year, month));
    }

    fn current_subject(&self) -> Option<&str> {
        self.planner
            .subjects
            .get(self.selected_subject)
            .map(String::as_str)
    }

    fn current_column_len(&self) -> usize {
        match self.current_subject() {
            Some(subject) => self
                .planner
                .active_tasks()
                .filter(|t| t.subject == subject)
                .count(),
            None => 0,
        }
    }

    fn current_task_id(&self) -> Option<String> {
        let subject = self.current_subject()?;
        self.planner
            .active_tasks()
            .filter(|t| t.subject == subject)
            .nth(self.selected_task)
            .map(|t| t.id.clone())
    }

    fn clamp_board_selection(&mut self) {
        if self.planner.subjects.is_empty() {
            self.selected_subject = 0;
            self.selected_task = 0;
            return;
        }
        self.selected_subject = self.selected_subject.min(self.planner.subjects.len() - 1);
        let count = self.current_column_len();
        self.selected_task = self.selected_task.min(count.saturating_sub(1));
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(8),
                Constraint::Length(3),
            ])
            .split(f.size());

        f.render_widget(
            Block::default().style(Style::default().bg(self.theme.bg())),
            f.size(),
        );
        self.draw_header(f, layout[0]);
        match self.view {
            ViewMode::Board => self.draw_board(f, layout[1]),
            ViewMode::Calendar => self.draw_calendar(f, layout[1]),
            ViewMode::Chat => self.draw_chat(f, layout[1]),
        }
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::Creating(form) => self.draw_form(f, form),
            Mode::SubjectPrompt(field) => self.draw_prompt(f, "New Subject", field),
            Mode::ColorPrompt { subject, field } => {
                let title = format!("Color for {}", subject);
                self.draw_prompt(f, &title, field);
            }
            Mode::ConfirmDeleteSubject { subject } => self.draw_confirm(f, subject),
            Mode::DayModal { date } => self.draw_day_modal(f, *date),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let title = Line::from(vec![
            Span::styled(
                "studyhall ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("view {}", self.view.label().to_lowercase()),
                Style::default().fg(Color::Magenta),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("theme {}", self.theme.key()),
                Style::default().fg(self.theme.dim()),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.store.path().display()),
                Style::default().fg(self.theme.dim()),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(self.theme.dim()));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_board(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        if self.planner.subjects.is_empty() {
            let msg = Paragraph::new("No subjects yet. Press a to add one.")
                .alignment(Alignment::Center)
                .style(Style::default().fg(self.theme.fg()))
                .block(Block::default().borders(Borders::ALL).title("Board"));
            f.render_widget(msg, area);
            return;
        }

        let today = Local::now().date_naive();
        let board = self.planner.board();
        let chunk_constraints = board
            .iter()
            .map(|_| Constraint::Percentage((100 / board.len() as u16).max(1)))
            .collect::<Vec<_>>();
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(chunk_constraints)
            .split(area);

        for (idx, (subject, tasks)) in board.iter().enumerate() {
            let accent = hex_color(self.planner.color_of(subject), Color::Cyan);
            let selected_here = idx == self.selected_subject;
            let items: Vec<ListItem> = if tasks.is_empty() {
                vec![ListItem::new(Line::from(Span::styled(
                    "(no active tasks)",
                    Style::default().fg(self.theme.dim()),
                )))]
            } else {
                tasks
                    .iter()
                    .enumerate()
                    .map(|(t_idx, task)| {
                        task_item(
                            task,
                            today,
                            self.theme,
                            selected_here && t_idx == self.selected_task,
                        )
                    })
                    .collect()
            };

            let title = format!("{} ({})", subject, tasks.len());
            let block = Block::default()
                .title(Span::styled(
                    title,
                    Style::default().fg(accent).add_modifier(if selected_here {
                        Modifier::BOLD | Modifier::UNDERLINED
                    } else {
                        Modifier::BOLD
                    }),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent));
            f.render_widget(List::new(items).block(block), chunks[idx]);
        }
    }

    fn draw_calendar(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let grid = calendar::month_grid(self.cal_year, self.cal_month, &self.planner.tasks);
        let mut lines = Vec::new();
        lines.push(Line::from(Span::styled(
            grid.title(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )));
        let header_spans: Vec<Span<'static>> = WEEKDAY_HEADERS
            .iter()
            .map(|h| Span::styled(format!("{:^8}", h), Style::default().fg(self.theme.dim())))
            .collect();
        lines.push(Line::from(header_spans));
        lines.extend(self.calendar_rows(&grid));

        lines.push(Line::from(""));
        if let Some(cell) = self.selected_cell(&grid) {
            lines.push(Line::from(Span::styled(
                format!(
                    "{} — {} task(s), Enter for details",
                    cell.date.format("%a, %b %-d, %Y"),
                    cell.tasks.len()
                ),
                Style::default().fg(self.theme.fg()),
            )));
        }

        let block = Block::default()
            .title(Span::styled(
                "Calendar",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.dim()));
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn calendar_rows(&self, grid: &MonthGrid) -> Vec<Line<'static>> {
        let mut rows = Vec::new();
        let mut spans: Vec<Span<'static>> = Vec::new();
        for _ in 0..grid.leading_blanks {
            spans.push(Span::raw(" ".repeat(8)));
        }
        for cell in &grid.days {
            let chip_count = cell.tasks.len();
            let text = if chip_count > 0 {
                format!("{:>3}({:>2}) ", cell.date.day(), chip_count)
            } else {
                format!("{:>3}     ", cell.date.day())
            };
            let accent = cell
                .tasks
                .first()
                .and_then(|t| self.planner.color_of(&t.subject))
                .map(|hex| hex_color(Some(hex), Color::LightYellow));
            let mut style = Style::default().fg(match accent {
                Some(color) => color,
                None => self.theme.dim(),
            });
            if cell.date.day() == self.cal_day {
                style = style
                    .bg(Color::Cyan)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD);
            }
            spans.push(Span::styled(text, style));
            if spans.len() % 7 == 0 {
                rows.push(Line::from(std::mem::take(&mut spans)));
            }
        }
        if !spans.is_empty() {
            rows.push(Line::from(spans));
        }
        rows
    }

    fn selected_cell<'a>(&self, grid: &'a MonthGrid) -> Option<&'a calendar::DayCell> {
        NaiveDate::from_ymd_opt(self.cal_year, self.cal_month, self.cal_day)
            .and_then(|date| grid.cell_for(date))
    }

    fn draw_chat(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(4), Constraint::Length(3)])
            .split(area);

        let mut lines = Vec::new();
        if self.history.is_empty() {
            lines.push(Line::from(Span::styled(
                "No messages yet. Type below and press Enter.",
                Style::default().fg(self.theme.dim()),
            )));
        }
        for message in &self.history {
            let (label, color) = match message.role {
                Role::User => ("you", Color::Cyan),
                Role::Assistant => ("assistant", Color::LightGreen),
            };
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{:>10}  ", label),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    message.content.clone(),
                    Style::default().fg(self.theme.fg()),
                ),
            ]));
        }
        let viewport = chunks[0].height.saturating_sub(2) as usize;
        let scroll = lines.len().saturating_sub(viewport) as u16;
        let transcript = Paragraph::new(lines)
            .block(
                Block::default()
                    .title("Chat")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.dim())),
            )
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0));
        f.render_widget(transcript, chunks[0]);

        let input = Paragraph::new(self.chat_input.with_caret())
            .style(Style::default().fg(self.theme.fg()))
            .block(
                Block::default()
                    .title("Message (Enter sends, Ctrl+L clears history, Esc leaves)")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            );
        f.render_widget(input, chunks[1]);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let hints = match self.view {
            ViewMode::Board => {
                "1/2/3 views  n new task  c complete  d delete  a add subject  X delete subject  o color  T theme  q quit"
            }
            ViewMode::Calendar => {
                "1/2/3 views  arrows move  [/] month  t today  Enter day details  q quit"
            }
            ViewMode::Chat => "Enter send  Ctrl+L clear history  Esc back",
        };
        let mut lines = vec![Line::from(Span::styled(
            hints,
            Style::default().fg(self.theme.dim()),
        ))];
        if let Some((status, _)) = &self.status {
            lines.push(Line::from(Span::styled(
                status.clone(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )));
        }
        let block = Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(self.theme.dim()));
        f.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_form(&self, f: &mut ratatui::Frame<'_>, form: &TaskForm) {
        let area = centered_rect(60, 50, f.size());
        let mut fields = Vec::new();
        fields.extend(field_line("Name", &form.name, form.field == TaskField::Name));
        fields.extend(field_line(
            "Subject",
            &form.subject,
            form.field == TaskField::Subject,
        ));
        fields.extend(field_line(
            "Due (YYYY-MM-DD)",
            &form.due,
            form.field == TaskField::Due,
        ));
        fields.extend(field_line(
            "Priority (high/medium/low)",
            &form.priority,
            form.field == TaskField::Priority,
        ));
        fields.push(Line::from(""));
        fields.push(Line::from(Span::styled(
            "Tab next field  Enter save  Esc cancel",
            Style::default().fg(self.theme.dim()),
        )));
        let dialog = Paragraph::new(fields)
            .block(
                Block::default()
                    .title(Span::styled(
                        "New Task",
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan))
                    .style(Style::default().bg(self.theme.bg())),
            )
            .wrap(Wrap { trim: true });
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_prompt(&self, f: &mut ratatui::Frame<'_>, title: &str, field: &FieldValue) {
        let area = centered_rect(50, 20, f.size());
        let body = vec![
            Line::from(field.with_caret()),
            Line::from(""),
            Line::from(Span::styled(
                "Enter save  Esc cancel",
                Style::default().fg(self.theme.dim()),
            )),
        ];
        let dialog = Paragraph::new(body).block(
            Block::default()
                .title(Span::styled(
                    title.to_string(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .style(Style::default().bg(self.theme.bg())),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, subject: &str) {
        let area = centered_rect(50, 30, f.size());
        let affected = self
            .planner
            .tasks
            .iter()
            .filter(|t| t.subject == subject)
            .count();
        let body = vec![
            Line::from(Span::styled(
                format!("Delete \"{}\" and its {} task(s)?", subject, affected),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    "Confirm Delete",
                    Style::default()
                        .fg(Color::LightRed)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed))
                .style(Style::default().bg(self.theme.bg())),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_day_modal(&self, f: &mut ratatui::Frame<'_>, date: NaiveDate) {
        let area = centered_rect(60, 50, f.size());
        let grid = calendar::month_grid(date.year(), date.month(), &self.planner.tasks);
        let mut body = Vec::new();
        match grid.cell_for(date) {
            Some(cell) if !cell.tasks.is_empty() => {
                for task in &cell.tasks {
                    let accent = hex_color(self.planner.color_of(&task.subject), Color::Cyan);
                    body.push(Line::from(vec![
                        Span::styled("▎", Style::default().fg(accent)),
                        Span::styled(
                            truncate_text(&task.name, 40),
                            Style::default()
                                .fg(self.theme.fg())
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::raw("  "),
                        Span::styled(task.subject.clone(), Style::default().fg(accent)),
                        Span::raw("  "),
                        Span::styled(
                            task.priority.label().to_string(),
                            Style::default().fg(priority_color(task.priority)),
                        ),
                    ]));
                }
            }
            _ => {
                body.push(Line::from(Span::styled(
                    "No tasks due this day",
                    Style::default().fg(self.theme.dim()),
                )));
            }
        }
        body.push(Line::from(""));
        body.push(Line::from(Span::styled(
            "Esc closes",
            Style::default().fg(self.theme.dim()),
        )));
        let dialog = Paragraph::new(body).block(
            Block::default()
                .title(Span::styled(
                    date.format("%a, %b %-d, %Y").to_string(),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .style(Style::default().bg(self.theme.bg())),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(out))?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn task_item(task: &Task, today: NaiveDate, theme: Theme, selected: bool) -> ListItem<'static> {
    let mut spans = Vec::new();
    spans.push(Span::styled(
        format!("{} ", priority_marker(task.priority)),
        Style::default().fg(priority_color(task.priority)),
    ));
    spans.push(Span::styled(
        truncate_text(&task.name, 32),
        Style::default()
            .fg(theme.fg())
            .add_modifier(Modifier::BOLD),
    ));
    if let Some(due) = task.due_date {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            due_label(due, today),
            Style::default().fg(badge_color(due, today)),
        ));
    }
    let mut item = ListItem::new(Line::from(spans));
    if selected {
        item = item.style(
            Style::default()
                .bg(Color::Rgb(252, 214, 112))
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
    }
    item
}

fn badge_color(due: NaiveDate, today: NaiveDate) -> Color {
    match due_status(due, today) {
        DueStatus::Overdue => Color::LightRed,
        DueStatus::DueToday => Color::Yellow,
        DueStatus::DueTomorrow => Color::LightCyan,
        DueStatus::Upcoming => Color::Gray,
    }
}

fn priority_marker(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "!!",
        Priority::Medium => " !",
        Priority::Low => "  ",
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::LightRed,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Gray,
    }
}

fn hex_color(hex: Option<&str>, fallback: Color) -> Color {
    hex.and_then(color::parse_hex)
        .map(|(r, g, b)| Color::Rgb(r, g, b))
        .unwrap_or(fallback)
}

fn field_line(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    vec![Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(text, value_style),
    ])]
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    for ch in text.chars() {
        if out.chars().count() >= max.saturating_sub(3) {
            out.push_str("...");
            break;
        }
        out.push(ch);
    }
    if out.chars().count() > max {
        out.truncate(max);
    }
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn prev_grapheme(cursor: usize, text: &str) -> usize {
    if cursor == 0 {
        return 0;
    }
    let mut prev = 0;
    for (idx, _) in text.char_indices() {
        if idx >= cursor {
            break;
        }
        prev = idx;
    }
    prev
}

fn next_grapheme(cursor: usize, text: &str) -> usize {
    for (idx, ch) in text.char_indices() {
        if idx > cursor {
            return idx;
        }
        if idx == cursor {
            return cursor + ch.len_utf8();
        }
    }
    text.len()
}

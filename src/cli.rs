use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "studyhall", version, about = "Terminal study planner with calendar and chat")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    Add {
        /// Task name
        name: String,
        /// Subject the task belongs to
        #[arg(long, short = 's')]
        subject: String,
        /// Due date in YYYY-MM-DD format
        #[arg(long)]
        due: String,
        /// Priority: high, medium, or low
        #[arg(long, short = 'p', default_value = "medium")]
        priority: String,
    },
    /// List active tasks grouped by subject
    List {
        /// Filter by subject
        #[arg(long)]
        subject: Option<String>,
    },
    /// Mark a task completed
    Complete {
        /// Task id
        task_id: String,
    },
    /// Delete a task
    Delete {
        /// Task id
        task_id: String,
    },
    /// Manage subjects
    Subject {
        #[command(subcommand)]
        command: SubjectCommand,
    },
    /// Print a month calendar of due tasks
    Calendar {
        /// Year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
        /// Month 1-12 (defaults to the current month)
        #[arg(long)]
        month: Option<u32>,
    },
    /// Send a chat message and print the reply
    Chat {
        /// The message to send
        message: String,
    },
    /// Clear the stored chat history
    ChatClear,
    /// Show or update settings
    Config {
        /// Completion API key
        #[arg(long)]
        api_key: Option<String>,
        /// Completion model id
        #[arg(long)]
        model: Option<String>,
        /// Theme: light or dark
        #[arg(long)]
        theme: Option<String>,
    },
    /// Launch the interactive TUI
    Tui,
}

#[derive(Subcommand, Debug)]
pub enum SubjectCommand {
    /// Add a subject
    Add {
        /// Subject name
        name: String,
    },
    /// Delete a subject and every task in it
    Delete {
        /// Subject name
        name: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Set a subject's display color
    Color {
        /// Subject name
        name: String,
        /// Hex color, e.g. #aaccee
        hex: String,
    },
    /// List subjects with their colors
    List,
}

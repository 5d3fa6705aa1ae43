mod calendar;
mod chat;
mod cli;
mod color;
mod commands;
mod model;
mod storage;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Add {
            name,
            subject,
            due,
            priority,
        } => commands::add(name, subject, due, priority),
        cli::Command::List { subject } => commands::list(subject),
        cli::Command::Complete { task_id } => commands::complete(task_id),
        cli::Command::Delete { task_id } => commands::delete(task_id),
        cli::Command::Subject { command } => match command {
            cli::SubjectCommand::Add { name } => commands::subject_add(name),
            cli::SubjectCommand::Delete { name, yes } => commands::subject_delete(name, yes),
            cli::SubjectCommand::Color { name, hex } => commands::subject_color(name, hex),
            cli::SubjectCommand::List => commands::subject_list(),
        },
        cli::Command::Calendar { year, month } => commands::calendar(year, month),
        cli::Command::Chat { message } => commands::chat(message),
        cli::Command::ChatClear => commands::chat_clear(),
        cli::Command::Config {
            api_key,
            model,
            theme,
        } => commands::config(api_key, model, theme),
        cli::Command::Tui => commands::tui(),
    }
}

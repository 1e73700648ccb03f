//! Command implementations for the CLI interface.
//!
//! This module contains the command handlers behind every subcommand:
//! catalog administration and assignment for headquarters, the board and
//! status transitions for subordinate units, and the paginated progress
//! table.

use std::fs;
use std::io;

use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::error::Error;
use crate::fields::{format_status, ProgressStatus, Role, TargetType};
use crate::pager::ProgressPager;
use crate::session::Session;
use crate::store::FileStore;
use crate::sync::TaskAction;
use crate::task::{next_task_id, Task, TaskRow};
use crate::units;

#[derive(Subcommand)]
pub enum Commands {
    /// Seed an empty store with the starter catalogs and assignments.
    Init,

    /// List a class's task catalog.
    Tasks {
        /// Unit class: branch | regional-council.
        #[arg(long, value_enum, default_value_t = TargetType::Branch)]
        class: TargetType,
    },

    /// Add a catalog task (headquarters).
    TaskAdd {
        /// Task title.
        title: String,
        /// Longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Display position within the class (defaults to the end).
        #[arg(long)]
        sort_order: Option<i64>,
        /// Unit class the task targets.
        #[arg(long, value_enum, default_value_t = TargetType::Branch)]
        class: TargetType,
    },

    /// Edit a catalog task (headquarters).
    TaskUpdate {
        /// Task id.
        id: String,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New description.
        #[arg(long)]
        desc: Option<String>,
        /// New display position.
        #[arg(long)]
        sort_order: Option<i64>,
    },

    /// Delete a catalog task (headquarters). Progress history is kept.
    TaskDelete {
        /// Task id.
        id: String,
    },

    /// Assign or unassign a task for one unit (headquarters).
    Assign {
        /// Unit id (branch number or council mnemonic).
        target_id: String,
        /// Task id of the matching class.
        task_id: String,
        /// Unit class.
        #[arg(long, value_enum, default_value_t = TargetType::Branch)]
        class: TargetType,
        /// Remove the task instead of adding it.
        #[arg(long)]
        off: bool,
    },

    /// Show which tasks are assigned to each unit (headquarters).
    Assignments {
        /// Unit class: branch | regional-council.
        #[arg(long, value_enum, default_value_t = TargetType::Branch)]
        class: TargetType,
    },

    /// Show the unit's board, grouped by status (subordinate roles).
    Board,

    /// Move an assigned task to a new status (subordinate roles).
    Status {
        /// Task id.
        task_id: String,
        /// New status: not-started | in-progress | done.
        #[arg(value_enum)]
        status: ProgressStatus,
    },

    /// Page through every unit's progress (headquarters).
    Progress {
        /// Stop after this many pages.
        #[arg(long)]
        pages: Option<usize>,
        /// Prompt between pages: n = next, p = previous, q = quit.
        #[arg(long, short)]
        interactive: bool,
    },

    /// List the unit catalog for a class.
    Units {
        /// Unit class: branch | regional-council.
        #[arg(long, value_enum, default_value_t = TargetType::Branch)]
        class: TargetType,
    },

    /// Import catalog tasks from a CSV file (headquarters).
    Import {
        /// Input CSV path with an id,title,description,sort_order header.
        input: String,
        /// Unit class the rows target.
        #[arg(long, value_enum, default_value_t = TargetType::Branch)]
        class: TargetType,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn fail(err: Error) -> ! {
    eprintln!("{err}");
    std::process::exit(1);
}

/// Seed the starter data: two tasks per class and the initial
/// assignments for branches 11 and 13 and the Kanto council.
pub fn cmd_init(session: &mut Session<FileStore>) {
    if !session.catalog(TargetType::Branch).is_empty()
        || !session.catalog(TargetType::RegionalCouncil).is_empty()
    {
        eprintln!("Store already contains a task catalog; init skipped.");
        std::process::exit(1);
    }
    let seeds = [
        ("task01", "支部向けタスクA", "支部向けタスクAの説明", 1, TargetType::Branch),
        ("task02", "支部向けタスクB", "支部向けタスクBの説明", 2, TargetType::Branch),
        ("rc_task01", "地協向けタスクX", "地協向けタスクXの説明", 1, TargetType::RegionalCouncil),
        ("rc_task02", "地協向けタスクY", "地協向けタスクYの説明", 2, TargetType::RegionalCouncil),
    ];
    for (id, title, description, sort_order, target_type) in seeds {
        let task = Task {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            sort_order,
            target_type,
        };
        if let Err(e) = session.task_change(task, TaskAction::Add) {
            fail(e);
        }
    }
    let assignments = [
        (TargetType::Branch, "11", "task01"),
        (TargetType::Branch, "13", "task01"),
        (TargetType::Branch, "13", "task02"),
        (TargetType::RegionalCouncil, "kanto", "rc_task01"),
    ];
    for (class, unit, task_id) in assignments {
        if let Err(e) = session.set_assignment(class, unit, task_id, true) {
            fail(e);
        }
    }
    println!("Seeded {} tasks and {} assignments.", seeds.len(), assignments.len());
}

/// Print one class's catalog in display order.
pub fn cmd_tasks(session: &Session<FileStore>, class: TargetType) {
    println!("{:<12} {:<6} {:<30} {}", "ID", "Order", "Title", "Description");
    for t in session.catalog(class) {
        println!(
            "{:<12} {:<6} {:<30} {}",
            t.id,
            t.sort_order,
            truncate(&t.title, 30),
            t.description
        );
    }
}

pub fn cmd_task_add(
    session: &mut Session<FileStore>,
    class: TargetType,
    title: String,
    desc: Option<String>,
    sort_order: Option<i64>,
) {
    let id = next_task_id(session.catalog(class), class);
    let sort_order = sort_order.unwrap_or(session.catalog(class).len() as i64 + 1);
    let task = Task {
        id: id.clone(),
        title,
        description: desc.unwrap_or_default(),
        sort_order,
        target_type: class,
    };
    match session.task_change(task, TaskAction::Add) {
        Ok(()) => println!("Added {id}"),
        Err(e) => fail(e),
    }
}

pub fn cmd_task_update(
    session: &mut Session<FileStore>,
    id: String,
    title: Option<String>,
    desc: Option<String>,
    sort_order: Option<i64>,
) {
    let Some(mut task) = find_task(session, &id) else {
        eprintln!("No task with id {id}");
        std::process::exit(1);
    };
    if let Some(title) = title {
        task.title = title;
    }
    if let Some(desc) = desc {
        task.description = desc;
    }
    if let Some(sort_order) = sort_order {
        task.sort_order = sort_order;
    }
    match session.task_change(task, TaskAction::Update) {
        Ok(()) => println!("Updated {id}"),
        Err(e) => fail(e),
    }
}

pub fn cmd_task_delete(session: &mut Session<FileStore>, id: String) {
    let Some(task) = find_task(session, &id) else {
        eprintln!("No task with id {id}");
        std::process::exit(1);
    };
    match session.task_change(task, TaskAction::Delete) {
        Ok(()) => println!("Deleted {id} (progress history kept)"),
        Err(e) => fail(e),
    }
}

fn find_task(session: &Session<FileStore>, id: &str) -> Option<Task> {
    session
        .catalog(TargetType::Branch)
        .iter()
        .chain(session.catalog(TargetType::RegionalCouncil).iter())
        .find(|t| t.id == id)
        .cloned()
}

pub fn cmd_assign(
    session: &mut Session<FileStore>,
    class: TargetType,
    target_id: String,
    task_id: String,
    off: bool,
) {
    let assigned = !off;
    match session.set_assignment(class, &target_id, &task_id, assigned) {
        Ok(()) if assigned => println!("Assigned {task_id} to {class} {target_id}"),
        Ok(()) => println!("Unassigned {task_id} from {class} {target_id}"),
        Err(e) => fail(e),
    }
}

/// Print the assignment matrix for one class: every unit holding a
/// record and its assigned task ids.
pub fn cmd_assignments(session: &Session<FileStore>, class: TargetType) {
    if session.role() != Role::Headquarters {
        eprintln!("assignments requires --role headquarters");
        std::process::exit(1);
    }
    println!("{:<10} {:<12} {}", "Unit", "Name", "Assigned tasks");
    for a in session.assignments() {
        if a.target_type != class {
            continue;
        }
        let name = units::unit_name(class, &a.target_id).unwrap_or("-");
        let ids: Vec<&str> = a.assigned_task_ids.iter().map(|s| s.as_str()).collect();
        println!("{:<10} {:<12} {}", a.target_id, name, ids.join(", "));
    }
}

/// Print the unit's board: assigned tasks grouped by status, then the
/// overall completion.
pub fn cmd_board(session: &Session<FileStore>) {
    let Some(class) = session.role().target_type() else {
        eprintln!("board requires a subordinate role (--role branch or --role regional-council)");
        std::process::exit(1);
    };
    let Some(unit) = session.unit_id() else {
        eprintln!("board requires --unit");
        std::process::exit(1);
    };
    let name = units::unit_name(class, unit).unwrap_or(unit);
    println!("Board for {name} ({class} {unit})");
    if session.tasks_for_board().is_empty() {
        println!("No tasks assigned.");
        return;
    }
    for status in [
        ProgressStatus::NotStarted,
        ProgressStatus::InProgress,
        ProgressStatus::Done,
    ] {
        println!("\n{}:", format_status(status));
        for t in session.tasks_for_board() {
            if session.status_of(&t.id) != status {
                continue;
            }
            let date = session
                .find_progress(class, unit, &t.id)
                .and_then(|p| p.date)
                .map(|d| d.to_string())
                .unwrap_or_default();
            println!("  {:<12} {:<30} {}", t.id, truncate(&t.title, 30), date);
        }
    }
    let (done, total) = session.completion();
    let pct = ((done as f64 / total as f64) * 100.0).round() as i64;
    println!("\nProgress: {done}/{total} ({pct}%)");
}

pub fn cmd_status(session: &mut Session<FileStore>, task_id: String, status: ProgressStatus) {
    match session.set_status(&task_id, status) {
        Ok(()) => println!("{task_id} → {status}"),
        Err(e) => fail(e),
    }
}

/// Walk the progress table page by page, either straight through or
/// with an interactive prompt.
pub fn cmd_progress(session: &Session<FileStore>, pages: Option<usize>, interactive: bool) {
    if session.role() != Role::Headquarters {
        eprintln!("progress table requires --role headquarters");
        std::process::exit(1);
    }
    let mut pager = ProgressPager::new();
    if let Err(e) = pager.initial(&session.store) {
        fail(e);
    }
    if interactive {
        browse_progress(session, &mut pager);
        return;
    }
    let max_pages = pages.unwrap_or(usize::MAX);
    let mut page_no = 1;
    loop {
        print_progress_page(session, &pager, page_no);
        if page_no >= max_pages {
            break;
        }
        match pager.next(&session.store) {
            Ok(true) => page_no += 1,
            Ok(false) => break,
            Err(e) => fail(e),
        }
    }
}

fn browse_progress(session: &Session<FileStore>, pager: &mut ProgressPager) {
    use std::io::Write;
    let mut page_no = 1;
    loop {
        print_progress_page(session, pager, page_no);
        let next = if pager.has_next() { "[n]ext " } else { "" };
        let prev = if pager.has_prev() { "[p]rev " } else { "" };
        print!("{next}{prev}[q]uit: ");
        io::stdout().flush().unwrap();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            return;
        }
        match input.trim() {
            "n" => match pager.next(&session.store) {
                Ok(true) => page_no += 1,
                Ok(false) => println!("No next page."),
                Err(e) => fail(e),
            },
            "p" => match pager.prev(&session.store) {
                Ok(true) => page_no -= 1,
                Ok(false) => println!("No previous page."),
                Err(e) => fail(e),
            },
            "q" | "" => return,
            other => println!("Unknown input '{other}'"),
        }
    }
}

fn print_progress_page(session: &Session<FileStore>, pager: &ProgressPager, page_no: usize) {
    println!("Page {page_no}");
    println!(
        "{:<18} {:<10} {:<30} {:<12} {:<12} {}",
        "Type", "Unit", "Task", "Status", "Date", "Note"
    );
    for p in pager.page() {
        let title = session
            .catalog(p.target_type)
            .iter()
            .find(|t| t.id == p.task_id)
            .map(|t| t.title.as_str())
            .unwrap_or(p.task_id.as_str());
        println!(
            "{:<18} {:<10} {:<30} {:<12} {:<12} {}",
            p.target_type,
            p.target_id,
            truncate(title, 30),
            format_status(p.status),
            p.date.map(|d| d.to_string()).unwrap_or_default(),
            p.note.as_deref().unwrap_or("")
        );
    }
}

/// Import catalog rows from a CSV file through the ordinary task write
/// path: existing ids update, new ids add.
pub fn cmd_import(session: &mut Session<FileStore>, input: String, class: TargetType) {
    let csv_content = match fs::read_to_string(&input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Failed to read CSV file '{input}': {e}");
            std::process::exit(1);
        }
    };

    let lines: Vec<&str> = csv_content.lines().collect();
    if lines.is_empty() {
        eprintln!("CSV file is empty");
        std::process::exit(1);
    }
    let expected_header = "id,title,description,sort_order";
    if lines[0].trim() != expected_header {
        eprintln!(
            "Invalid CSV header. Expected:\n{expected_header}\nGot:\n{}",
            lines[0]
        );
        std::process::exit(1);
    }

    let mut rows = Vec::new();
    let mut skipped = 0;
    for (line_num, line) in lines.iter().skip(1).enumerate() {
        let line_num = line_num + 2; // header is line 1
        if line.trim().is_empty() {
            continue;
        }
        let fields = parse_csv_line(line);
        if fields.len() != 4 {
            eprintln!(
                "Warning: Line {line_num} has {} fields, expected 4. Skipping.",
                fields.len()
            );
            skipped += 1;
            continue;
        }
        let mut it = fields.into_iter();
        rows.push(TaskRow {
            id: it.next(),
            title: it.next(),
            description: it.next(),
            sort_order: it.next(),
        });
    }

    match session.import_rows(rows, class) {
        Ok((added, updated)) => {
            println!("Imported {added} new and {updated} updated task(s); skipped {skipped}.")
        }
        Err(e) => fail(e),
    }
}

/// Simple CSV line parser that handles quoted fields.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Escaped quote
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                fields.push(current_field);
                current_field = String::new();
            }
            _ => {
                current_field.push(ch);
            }
        }
    }
    fields.push(current_field);
    fields
}

/// List valid unit ids for a class, for picking a `--unit`.
pub fn cmd_units(class: TargetType) {
    match class {
        TargetType::Branch => {
            println!("{:<6} {:<12} {}", "ID", "Name", "Prefecture");
            for b in units::branches() {
                println!("{:<6} {:<12} {}", b.id, b.name, b.prefecture);
            }
        }
        TargetType::RegionalCouncil => {
            println!("{:<10} {}", "ID", "Name");
            for rc in units::regional_councils() {
                println!("{:<10} {}", rc.id, rc.name);
            }
        }
    }
}

pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "ut", &mut io::stdout());
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_line() {
        assert_eq!(
            parse_csv_line("task01,Title,Desc,1"),
            vec!["task01", "Title", "Desc", "1"]
        );
        assert_eq!(
            parse_csv_line(r#"task01,"Title, with comma","He said ""hi""",2"#),
            vec!["task01", "Title, with comma", r#"He said "hi""#, "2"]
        );
        assert_eq!(parse_csv_line(",,,"), vec!["", "", "", ""]);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly-10", 10), "exactly-10");
        assert_eq!(truncate("a-very-long-title", 10), "a-very-lo…");
    }
}

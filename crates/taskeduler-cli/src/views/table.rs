use chrono::{DateTime, Utc};
use chrono_humanize::Humanize;
use chrono_tz::Tz;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use taskeduler_core::timezone::format_in_timezone;

#[derive(Debug, Clone)]
pub struct ViewTask {
    pub name: String,
    pub frequency: String,
    pub rules: String,
    pub timezone: Option<Tz>,
    pub entrypoint: String,
    /// Error text when the definition cannot be scheduled
    pub next_execution: Result<DateTime<Utc>, String>,
}

pub fn task_table(tasks: &[ViewTask]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Name",
        "Frequency",
        "Rules",
        "Timezone",
        "Entrypoint",
        "Next Execution",
    ]);

    for task in tasks {
        let mut row = Row::new();
        let mut name_cell = Cell::new(&task.name).add_attribute(Attribute::Bold);
        if task.next_execution.is_err() {
            name_cell = name_cell.fg(Color::Red);
        }
        row.add_cell(name_cell);
        row.add_cell(Cell::new(&task.frequency));
        row.add_cell(Cell::new(&task.rules));
        row.add_cell(Cell::new(
            task.timezone.map_or_else(|| "-".to_string(), |tz| tz.name().to_string()),
        ));
        row.add_cell(Cell::new(&task.entrypoint));

        let next_cell = match (&task.next_execution, &task.timezone) {
            (Ok(next), Some(tz)) => Cell::new(format!(
                "{} ({})",
                format_in_timezone(*next, tz),
                next.humanize()
            )),
            (Ok(next), None) => Cell::new(next.humanize()),
            (Err(reason), _) => Cell::new(reason).fg(Color::Red),
        };
        row.add_cell(next_cell);
        table.add_row(row);
    }

    table
}

pub fn display_tasks(tasks: &[ViewTask]) {
    if tasks.is_empty() {
        println!("No tasks configured.");
        return;
    }
    println!("{}", task_table(tasks));
}

pub fn preview_table(executions: &[DateTime<Utc>], timezone: &Tz) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Local Time", "UTC", "In"]);

    for (index, execution) in executions.iter().enumerate() {
        let mut row = Row::new();
        row.add_cell(Cell::new(index + 1));
        row.add_cell(Cell::new(format_in_timezone(*execution, timezone)));
        row.add_cell(Cell::new(execution.format("%Y-%m-%d %H:%M").to_string()).fg(Color::DarkGrey));
        row.add_cell(Cell::new(execution.humanize()));
        table.add_row(row);
    }

    table
}

pub fn display_preview(name: &str, executions: &[DateTime<Utc>], timezone: &Tz) {
    println!("Upcoming executions of '{}' ({}):", name, timezone.name());
    println!("{}", preview_table(executions, timezone));
}

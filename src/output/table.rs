#![forbid(unsafe_code)]

use std::io;

use crate::task::model::Task;

#[derive(Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cols: impl IntoIterator<Item = impl Into<String>>) {
        self.rows.push(cols.into_iter().map(Into::into).collect());
    }

    pub fn print(&self) -> io::Result<()> {
        let mut out = io::stdout().lock();
        self.write_to(&mut out)
    }

    pub fn write_csv(&self) -> io::Result<()> {
        let mut wtr = csv::Writer::from_writer(io::stdout().lock());
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_to(&self, mut out: impl io::Write) -> io::Result<()> {
        let mut widths = vec![0usize; self.headers.len()];
        for (i, h) in self.headers.iter().enumerate() {
            widths[i] = widths[i].max(visible_width(h));
        }
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if i >= widths.len() {
                    widths.push(0);
                }
                widths[i] = widths[i].max(visible_width(cell));
            }
        }

        writeln!(&mut out, "{}", format_row(&self.headers, &widths))?;
        for row in &self.rows {
            writeln!(&mut out, "{}", format_row(row, &widths))?;
        }
        Ok(())
    }
}

/// Standard task listing columns.
#[must_use]
pub fn task_table(tasks: &[Task]) -> Table {
    let mut table = Table::new(["ID", "STATUS", "ORDER", "TITLE", "DUE", "TAGS"]);
    for task in tasks {
        table.row([
            short_id(&task.id),
            task.status.to_string(),
            task.order.to_string(),
            task.title.clone(),
            task.due_date.clone().unwrap_or_else(|| "-".to_owned()),
            format_tags(task),
        ]);
    }
    table
}

#[must_use]
pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

#[must_use]
pub fn format_tags(task: &Task) -> String {
    if task.tags.is_empty() {
        return "-".to_owned();
    }
    task.tags
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn visible_width(s: &str) -> usize {
    s.chars().count()
}

fn format_row(row: &[String], widths: &[usize]) -> String {
    let mut out = String::new();
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        let w = widths
            .get(i)
            .copied()
            .unwrap_or_else(|| visible_width(cell));
        out.push_str(cell);
        let pad = w.saturating_sub(visible_width(cell));
        for _ in 0..pad {
            out.push(' ');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::test_support::task;
    use crate::task::model::{TaskStatus, TaskTag};

    #[test]
    fn task_rows_render_placeholders_for_missing_fields() {
        let t = task("0123456789abcdef", TaskStatus::Todo, 1);
        let table = task_table(&[t]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], "01234567");
        assert_eq!(table.rows[0][4], "-");
        assert_eq!(table.rows[0][5], "-");
    }

    #[test]
    fn tags_join_in_display_order() {
        let mut t = task("a", TaskStatus::Done, 1);
        t.tags = vec![TaskTag::Bug, TaskTag::Review];
        assert_eq!(format_tags(&t), "bug,review");
    }
}

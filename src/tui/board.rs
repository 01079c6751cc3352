#![forbid(unsafe_code)]

//! Interactive board view. Keyboard gestures map directly onto reconciler
//! events: grabbing a card starts a [`DragGesture`], column moves while
//! grabbed fire drag-over previews, and dropping fires drag-end whose
//! writes are spawned fire-and-forget against the store.

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};

use crate::board::BoardState;
use crate::board::drag::{DragGesture, DropTarget, StoreWrite, drag_end, drag_over};
use crate::error::KanriError;
use crate::store::TaskStore;
use crate::task::model::{
    Task, TaskDraft, TaskPatch, TaskStatus, parse_tags, validate_due_date, validate_title,
};
use crate::tui;

#[derive(Debug, Clone)]
pub struct BoardOptions {
    pub titles: [String; 3],
    pub confirm_delete: bool,
    pub icons: bool,
    /// Owner filter for store reads/creates; `None` when auth is disabled.
    pub owner: Option<String>,
    /// Shown in the header when signed in.
    pub session_email: Option<String>,
}

pub fn run(store: Arc<dyn TaskStore>, opts: BoardOptions) -> Result<(), KanriError> {
    if !tui::is_tty() {
        return Err(KanriError::Other(
            "the board view requires a TTY".to_owned(),
        ));
    }

    let terminal = tui::init_terminal()?;
    let mut guard = TerminalGuard::new(terminal);
    let mut app = App::new(store, opts);
    app.reload();

    loop {
        let terminal = guard
            .terminal
            .as_mut()
            .ok_or_else(|| KanriError::Other("terminal unavailable".to_owned()))?;
        terminal
            .draw(|f| draw(f, &app))
            .map_err(|e| KanriError::Other(format!("failed to draw board: {e}")))?;

        if event::poll(Duration::from_millis(50))
            .map_err(|e| KanriError::Other(format!("failed to poll events: {e}")))?
        {
            let ev = event::read()
                .map_err(|e| KanriError::Other(format!("failed to read event: {e}")))?;
            if let Event::Key(key) = ev {
                if key.kind != event::KeyEventKind::Press {
                    continue;
                }
                if app.handle_key(key) {
                    return Ok(());
                }
            }
        }
    }
}

struct App {
    store: Arc<dyn TaskStore>,
    opts: BoardOptions,
    board: BoardState,
    cursor_column: usize,
    cursor_row: usize,
    gesture: Option<DragGesture>,
    dialog: Option<Dialog>,
    notice: Option<String>,
}

enum Dialog {
    Form(TaskForm),
    ConfirmDelete { task_id: String, title: String },
}

struct TaskForm {
    /// `None` while creating, the task id while editing.
    task_id: Option<String>,
    fields: [String; 4],
    focus: usize,
    error: Option<String>,
}

impl TaskForm {
    const LABELS: [&'static str; 4] = ["Title", "Description", "Due (YYYY-MM-DD)", "Tags"];

    fn create() -> Self {
        Self {
            task_id: None,
            fields: Default::default(),
            focus: 0,
            error: None,
        }
    }

    fn edit(task: &Task) -> Self {
        let tags = task
            .tags
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(",");
        Self {
            task_id: Some(task.id.clone()),
            fields: [
                task.title.clone(),
                task.description.clone(),
                task.due_date.clone().unwrap_or_default(),
                tags,
            ],
            focus: 0,
            error: None,
        }
    }
}

impl App {
    fn new(store: Arc<dyn TaskStore>, opts: BoardOptions) -> Self {
        let board = BoardState::empty(opts.titles.clone());
        Self {
            store,
            opts,
            board,
            cursor_column: 0,
            cursor_row: 0,
            gesture: None,
            dialog: None,
            notice: None,
        }
    }

    fn reload(&mut self) {
        let tasks = self.store.list(self.opts.owner.as_deref());
        self.board.replace_tasks(tasks);
        self.gesture = None;
        self.clamp_cursor();
    }

    fn column_id(&self) -> TaskStatus {
        TaskStatus::ALL[self.cursor_column]
    }

    fn clamp_cursor(&mut self) {
        let len = self.board.column(self.column_id()).tasks.len();
        if self.cursor_row >= len {
            self.cursor_row = len.saturating_sub(1);
        }
    }

    fn selected_task(&self) -> Option<&Task> {
        self.board.column(self.column_id()).tasks.get(self.cursor_row)
    }

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }
        if self.dialog.is_some() {
            self.handle_dialog_key(key);
            return false;
        }
        if self.gesture.is_some() {
            self.handle_gesture_key(key);
            return false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Left | KeyCode::Char('h') => {
                self.cursor_column = self.cursor_column.saturating_sub(1);
                self.clamp_cursor();
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.cursor_column = (self.cursor_column + 1).min(TaskStatus::ALL.len() - 1);
                self.clamp_cursor();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor_row = self.cursor_row.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.board.column(self.column_id()).tasks.len();
                if len > 0 {
                    self.cursor_row = (self.cursor_row + 1).min(len - 1);
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(task) = self.selected_task() {
                    self.gesture = DragGesture::begin(&self.board, &task.id);
                    self.notice = None;
                }
            }
            KeyCode::Char('n') => {
                self.dialog = Some(Dialog::Form(TaskForm::create()));
            }
            KeyCode::Char('e') => {
                if let Some(task) = self.selected_task() {
                    self.dialog = Some(Dialog::Form(TaskForm::edit(task)));
                }
            }
            KeyCode::Char('d') => {
                if let Some(task) = self.selected_task() {
                    if self.opts.confirm_delete {
                        self.dialog = Some(Dialog::ConfirmDelete {
                            task_id: task.id.clone(),
                            title: task.title.clone(),
                        });
                    } else {
                        let id = task.id.clone();
                        self.delete_task(&id);
                    }
                }
            }
            KeyCode::Char('r') => {
                self.reload();
                self.notice = Some("reloaded".to_owned());
            }
            _ => {}
        }
        false
    }

    /// Keys while a card is grabbed. Column moves are drag-over previews;
    /// nothing is persisted until the drop.
    fn handle_gesture_key(&mut self, key: KeyEvent) {
        let Some(gesture) = self.gesture.clone() else {
            return;
        };
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.hover_adjacent(&gesture, -1),
            KeyCode::Right | KeyCode::Char('l') => self.hover_adjacent(&gesture, 1),
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor_row = self.cursor_row.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.board.column(self.column_id()).tasks.len();
                if len > 0 {
                    self.cursor_row = (self.cursor_row + 1).min(len - 1);
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                // Drop onto whatever the cursor rests on: a task position in
                // the column, or the column body when it is empty.
                let over = match self.selected_task() {
                    Some(task) => DropTarget::Task(task.id.clone()),
                    None => DropTarget::Column(self.column_id()),
                };
                let writes = drag_end(&mut self.board, &gesture, Some(&over));
                self.persist(writes);
                self.gesture = None;
                self.follow_task(gesture.task_id());
            }
            KeyCode::Esc => {
                // Dropped outside any droppable area: nothing is persisted
                // and the optimistic preview is discarded.
                let writes = drag_end(&mut self.board, &gesture, None);
                debug_assert!(writes.is_empty());
                self.reload();
                self.notice = Some("move cancelled".to_owned());
            }
            _ => {}
        }
    }

    fn hover_adjacent(&mut self, gesture: &DragGesture, direction: isize) {
        let next = self.cursor_column.saturating_add_signed(direction);
        if next >= TaskStatus::ALL.len() {
            return;
        }
        self.cursor_column = next;
        let over = DropTarget::Column(self.column_id());
        drag_over(&mut self.board, gesture, Some(&over));
        self.follow_task(gesture.task_id());
    }

    /// Puts the cursor on the dragged task wherever it now sits.
    fn follow_task(&mut self, task_id: &str) {
        if let Some(column) = self.board.column_of_task(task_id)
            && let Some(row) = self.board.index_in_column(column, task_id)
        {
            self.cursor_column = TaskStatus::ALL.iter().position(|s| *s == column).unwrap_or(0);
            self.cursor_row = row;
        } else {
            self.clamp_cursor();
        }
    }

    /// Fire-and-forget persistence of drag-end writes: the board was already
    /// updated optimistically, the UI never waits, failures only log. No
    /// rollback on failure.
    fn persist(&mut self, writes: Vec<StoreWrite>) {
        if writes.is_empty() {
            return;
        }
        self.notice = Some(format!("saving {} change(s)", writes.len()));
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            for write in writes {
                if store.update(&write.task_id, write.patch).is_none() {
                    eprintln!("board write failed for task {}", write.task_id);
                }
            }
        });
    }

    fn delete_task(&mut self, id: &str) {
        if self.store.delete(id) {
            self.notice = Some("task deleted".to_owned());
        } else {
            self.notice = Some("delete failed".to_owned());
        }
        self.reload();
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) {
        match self.dialog.take() {
            Some(Dialog::ConfirmDelete { task_id, title }) => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.delete_task(&task_id),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    // Declined: no backend call, no state change.
                    self.notice = Some("delete cancelled".to_owned());
                }
                _ => self.dialog = Some(Dialog::ConfirmDelete { task_id, title }),
            },
            Some(Dialog::Form(mut form)) => match key.code {
                KeyCode::Esc => {}
                KeyCode::Tab | KeyCode::Down => {
                    form.focus = (form.focus + 1) % form.fields.len();
                    self.dialog = Some(Dialog::Form(form));
                }
                KeyCode::BackTab | KeyCode::Up => {
                    form.focus = (form.focus + form.fields.len() - 1) % form.fields.len();
                    self.dialog = Some(Dialog::Form(form));
                }
                KeyCode::Backspace => {
                    form.fields[form.focus].pop();
                    self.dialog = Some(Dialog::Form(form));
                }
                KeyCode::Char(c) => {
                    form.fields[form.focus].push(c);
                    self.dialog = Some(Dialog::Form(form));
                }
                KeyCode::Enter => match self.submit_form(&form) {
                    Ok(()) => {
                        self.reload();
                        self.notice = Some("task saved".to_owned());
                    }
                    Err(e) => {
                        form.error = Some(e.to_string());
                        self.dialog = Some(Dialog::Form(form));
                    }
                },
                _ => self.dialog = Some(Dialog::Form(form)),
            },
            None => {}
        }
    }

    /// Boundary validation for the form; the core never sees bad input.
    fn submit_form(&self, form: &TaskForm) -> Result<(), KanriError> {
        let title = form.fields[0].trim().to_owned();
        validate_title(&title)?;
        let due = form.fields[2].trim();
        let due_date = if due.is_empty() {
            None
        } else {
            validate_due_date(due)?;
            Some(due.to_owned())
        };
        let tag_field = form.fields[3].trim().to_owned();
        let tags = if tag_field.is_empty() {
            Vec::new()
        } else {
            parse_tags(std::slice::from_ref(&tag_field))?
        };
        let description = form.fields[1].trim().to_owned();

        match &form.task_id {
            None => {
                let draft = TaskDraft {
                    title,
                    description,
                    due_date,
                    tags,
                };
                if self
                    .store
                    .create(draft, self.opts.owner.as_deref())
                    .is_none()
                {
                    return Err(KanriError::Other("create failed".to_owned()));
                }
            }
            Some(id) => {
                let patch = TaskPatch {
                    title: Some(title),
                    description: Some(description),
                    due_date: Some(due_date),
                    tags: Some(tags),
                    ..TaskPatch::default()
                };
                if self.store.update(id, patch).is_none() {
                    return Err(KanriError::Other("update failed".to_owned()));
                }
            }
        }
        Ok(())
    }
}

fn draw(f: &mut Frame<'_>, app: &App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, outer[0], app);
    draw_columns(f, outer[1], app);
    draw_footer(f, outer[2], app);

    if let Some(dialog) = &app.dialog {
        draw_dialog(f, dialog);
    }
}

fn draw_header(f: &mut Frame<'_>, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        " kanri ",
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(email) = &app.opts.session_email {
        spans.push(Span::raw(format!("— {email}")));
    }
    if let Some(notice) = &app.notice {
        spans.push(Span::styled(
            format!("  {notice}"),
            Style::default().fg(Color::Yellow),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_columns(f: &mut Frame<'_>, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(area);

    let grabbed_id = app.gesture.as_ref().map(|g| g.task_id().to_owned());

    for (i, column) in app.board.columns().iter().enumerate() {
        let is_active = i == app.cursor_column;
        let items: Vec<ListItem<'_>> = column
            .tasks
            .iter()
            .enumerate()
            .map(|(row, task)| {
                let grabbed = grabbed_id.as_deref() == Some(task.id.as_str());
                let selected = is_active && row == app.cursor_row;
                task_item(task, selected, grabbed, app.opts.icons)
            })
            .collect();

        let border_style = if is_active {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(format!(" {} ({}) ", column.title, column.tasks.len())),
        );
        f.render_widget(list, chunks[i]);
    }
}

fn task_item(task: &Task, selected: bool, grabbed: bool, icons: bool) -> ListItem<'static> {
    let marker = if grabbed {
        if icons { "◆ " } else { "* " }
    } else {
        "  "
    };
    let mut spans = vec![
        Span::raw(marker.to_owned()),
        Span::styled(task.title.clone(), Style::default().fg(Color::White)),
    ];
    if let Some(due) = &task.due_date {
        spans.push(Span::styled(
            format!(" due:{due}"),
            Style::default().fg(Color::Magenta),
        ));
    }
    for tag in &task.tags {
        spans.push(Span::styled(
            format!(" [{tag}]"),
            Style::default().fg(Color::Green),
        ));
    }

    let mut style = Style::default();
    if selected {
        style = style.add_modifier(Modifier::REVERSED);
    }
    if grabbed {
        style = style.fg(Color::Yellow);
    }
    ListItem::new(Line::from(spans)).style(style)
}

fn draw_footer(f: &mut Frame<'_>, area: Rect, app: &App) {
    let hints = if app.dialog.is_some() {
        "tab: next field  enter: save  esc: close"
    } else if app.gesture.is_some() {
        "h/l: move column  j/k: pick position  enter: drop  esc: cancel"
    } else {
        "h/j/k/l: navigate  space: grab  n: new  e: edit  d: delete  r: reload  q: quit"
    };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            hints,
            Style::default().fg(Color::DarkGray),
        ))),
        area,
    );
}

fn draw_dialog(f: &mut Frame<'_>, dialog: &Dialog) {
    let area = centered_rect(f.area(), 60, 12);
    f.render_widget(Clear, area);

    match dialog {
        Dialog::ConfirmDelete { title, .. } => {
            let text = format!("Delete task \"{title}\"?\n\ny: delete    n/esc: keep");
            f.render_widget(
                Paragraph::new(text)
                    .wrap(Wrap { trim: true })
                    .block(Block::default().borders(Borders::ALL).title(" confirm ")),
                area,
            );
        }
        Dialog::Form(form) => {
            let mut lines = Vec::new();
            for (i, label) in TaskForm::LABELS.iter().enumerate() {
                let marker = if i == form.focus { "> " } else { "  " };
                lines.push(Line::from(vec![
                    Span::raw(marker),
                    Span::styled(format!("{label}: "), Style::default().fg(Color::Cyan)),
                    Span::raw(form.fields[i].clone()),
                ]));
            }
            if let Some(error) = &form.error {
                lines.push(Line::from(Span::styled(
                    error.clone(),
                    Style::default().fg(Color::Red),
                )));
            }
            let title = if form.task_id.is_some() {
                " edit task "
            } else {
                " new task "
            };
            f.render_widget(
                Paragraph::new(lines)
                    .block(Block::default().borders(Borders::ALL).title(title)),
                area,
            );
        }
    }
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

struct TerminalGuard {
    terminal: Option<ratatui::Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>>,
}

impl TerminalGuard {
    fn new(
        terminal: ratatui::Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>,
    ) -> Self {
        Self {
            terminal: Some(terminal),
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Some(terminal) = self.terminal.take() {
            let _ = tui::restore_terminal(terminal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::test_support::task;
    use crate::store::memory::MemoryTaskStore;

    fn app_with_one_task() -> App {
        let store: Arc<dyn TaskStore> = Arc::new(MemoryTaskStore::with_tasks(vec![task(
            "t1",
            TaskStatus::Todo,
            1,
        )]));
        let opts = BoardOptions {
            titles: [
                "TODO".to_owned(),
                "IN PROGRESS".to_owned(),
                "DONE".to_owned(),
            ],
            confirm_delete: true,
            icons: false,
            owner: None,
            session_email: None,
        };
        let mut app = App::new(store, opts);
        app.reload();
        app
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn declining_the_delete_dialog_issues_no_store_call() {
        let mut app = app_with_one_task();
        app.handle_key(key(KeyCode::Char('d')));
        assert!(matches!(app.dialog, Some(Dialog::ConfirmDelete { .. })));

        app.handle_key(key(KeyCode::Char('n')));
        assert!(app.dialog.is_none());
        assert_eq!(app.store.list(None).len(), 1);
        assert_eq!(app.board.task_count(), 1);
    }

    #[test]
    fn escape_declines_the_delete_dialog_too() {
        let mut app = app_with_one_task();
        app.handle_key(key(KeyCode::Char('d')));
        app.handle_key(key(KeyCode::Esc));

        assert!(app.dialog.is_none());
        assert_eq!(app.store.list(None).len(), 1);
    }

    #[test]
    fn confirming_the_delete_dialog_removes_the_task() {
        let mut app = app_with_one_task();
        app.handle_key(key(KeyCode::Char('d')));
        app.handle_key(key(KeyCode::Char('y')));

        assert!(app.dialog.is_none());
        assert!(app.store.list(None).is_empty());
        assert_eq!(app.board.task_count(), 0);
    }
}

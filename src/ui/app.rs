use std::mem;

use anyhow::{Context, Result};
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table as TableWidget, Wrap};
use ratatui::Frame;
use rusqlite::Connection;
use tracing::info;

use crate::db::{
    add_entry, add_reminder, add_user, clear_table, delete_entries_by_author,
    delete_entries_cascade_by_author, delete_entry, delete_entry_cascade, delete_reminder,
    delete_reminders_by_date, delete_reminders_by_status, delete_user, delete_user_cascade,
    delete_user_cascade_by, delete_users_by, fetch_entries, fetch_reminders, fetch_user_entries,
    fetch_user_reminders, fetch_users, find_entry, find_reminder, find_user, generate_entries,
    generate_reminders, generate_users, purge_all, search, update_entry, update_reminder,
    update_user, DataError,
};
use crate::models::{Entry, Reminder, Table, User, UserAttr};

use super::forms::{
    attr_prompt, parse_count, parse_edited_entry, parse_edited_reminder, parse_edited_user,
    parse_new_entry, parse_new_reminder, parse_new_user, parse_reminder_date,
    parse_reminder_status, parse_search, parse_single_id, parse_single_text, Confirm, Form,
    PendingAction,
};
use super::helpers::{centered_rect, needs_cascade, surface_error};
use super::screens::{
    fit_cell, menu_choice, Action, DeleteOption, ResultTable, COLUMN_WIDTH, MAIN_MENU,
    SEARCH_MENU,
};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
const HEADER_HEIGHT: u16 = 3;
/// Rows moved by PageUp / PageDown in a result table.
const PAGE: isize = 10;

/// High-level navigation states.
enum Screen {
    Main,
    PickTable(Action),
    DeleteOptions(Table),
    Search,
    Results(ResultTable),
}

/// What a submitted form is for. Edit variants carry the row being edited so
/// cleared fields can fall back to its values.
enum FormKind {
    AddUser,
    AddEntry,
    AddReminder,
    EditUser(User),
    EditEntry(Entry),
    EditReminder(Reminder),
    LookupId { action: Action, table: Table },
    UserEntries,
    UserReminders,
    DeleteUsersBy(UserAttr),
    DeleteByAuthor,
    DeleteByDate,
    DeleteByStatus,
    Search,
    Generate(Table),
}

/// Fine-grained modes layered over the current screen.
enum Mode {
    Normal,
    Form { kind: FormKind, form: Form },
    Confirm(Confirm),
}

/// Where a successful form submission leads.
enum Transition {
    Done(String),
    Show(ResultTable),
    Open(FormKind, Form),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state: the open connection plus what is on screen.
pub struct App {
    conn: Connection,
    limit: u32,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(conn: Connection, limit: u32) -> Self {
        Self {
            conn,
            limit,
            screen: Screen::Main,
            mode: Mode::Normal,
            status: None,
        }
    }

    /// Close the database connection. Called once the event loop ends.
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, err)| err)
            .context("failed to close database connection")?;
        info!("database connection closed");
        Ok(())
    }

    /// Route a key press to the active mode. Returns `true` when the user
    /// asked to exit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::Form { kind, form } => self.handle_form(code, kind, form)?,
            Mode::Confirm(confirm) => self.handle_confirm(code, confirm)?,
        };

        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let screen = mem::replace(&mut self.screen, Screen::Main);
        let (screen, mode) = match screen {
            Screen::Main => self.handle_main_menu(code, exit),
            Screen::PickTable(action) => self.handle_pick_table(code, action),
            Screen::DeleteOptions(table) => self.handle_delete_options(code, table),
            Screen::Search => self.handle_search_menu(code),
            Screen::Results(mut table) => match code {
                KeyCode::Up => {
                    table.scroll(-1);
                    (Screen::Results(table), Mode::Normal)
                }
                KeyCode::Down => {
                    table.scroll(1);
                    (Screen::Results(table), Mode::Normal)
                }
                KeyCode::PageUp => {
                    table.scroll(-PAGE);
                    (Screen::Results(table), Mode::Normal)
                }
                KeyCode::PageDown => {
                    table.scroll(PAGE);
                    (Screen::Results(table), Mode::Normal)
                }
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('0') | KeyCode::Char('q') => {
                    self.clear_status();
                    (Screen::Main, Mode::Normal)
                }
                _ => (Screen::Results(table), Mode::Normal),
            },
        };
        self.screen = screen;
        Ok(mode)
    }

    fn handle_main_menu(&mut self, code: KeyCode, exit: &mut bool) -> (Screen, Mode) {
        let KeyCode::Char(ch) = code else {
            return (Screen::Main, Mode::Normal);
        };
        if ch == 'q' {
            *exit = true;
            return (Screen::Main, Mode::Normal);
        }

        self.clear_status();
        match menu_choice(ch, MAIN_MENU.len()) {
            Some(0) => (Screen::PickTable(Action::View), Mode::Normal),
            Some(1) => (Screen::PickTable(Action::Add), Mode::Normal),
            Some(2) => (Screen::PickTable(Action::Delete), Mode::Normal),
            Some(3) => (Screen::PickTable(Action::Edit), Mode::Normal),
            Some(4) => (Screen::Search, Mode::Normal),
            Some(5) => (Screen::PickTable(Action::Generate), Mode::Normal),
            Some(6) => (Screen::Main, Mode::Confirm(Confirm::purge_all())),
            Some(_) => {
                *exit = true;
                (Screen::Main, Mode::Normal)
            }
            None => {
                self.set_status("Choose an option from the menu.", StatusKind::Error);
                (Screen::Main, Mode::Normal)
            }
        }
    }

    fn handle_pick_table(&mut self, code: KeyCode, action: Action) -> (Screen, Mode) {
        let back = if action == Action::Find {
            Screen::Search
        } else {
            Screen::Main
        };
        let table = match code {
            KeyCode::Esc | KeyCode::Char('0') => {
                self.clear_status();
                return (back, Mode::Normal);
            }
            KeyCode::Char(ch) => match menu_choice(ch, Table::ALL.len()) {
                Some(index) => Table::ALL[index],
                None => return (Screen::PickTable(action), Mode::Normal),
            },
            _ => return (Screen::PickTable(action), Mode::Normal),
        };

        let stay = Screen::PickTable(action);
        match action {
            Action::View => match self.view_table(table) {
                Ok(results) => (Screen::Results(results), Mode::Normal),
                Err(err) => {
                    self.set_status(surface_error(&err), StatusKind::Error);
                    (stay, Mode::Normal)
                }
            },
            Action::Add => {
                let (kind, form) = match table {
                    Table::User => (FormKind::AddUser, Form::add_user()),
                    Table::Entry => (FormKind::AddEntry, Form::add_entry()),
                    Table::Reminder => (FormKind::AddReminder, Form::add_reminder()),
                };
                (stay, Mode::Form { kind, form })
            }
            Action::Delete => (Screen::DeleteOptions(table), Mode::Normal),
            Action::Edit | Action::Find => {
                let title = format!("{} {}", action.title(), table);
                let form = Form::id_prompt(title, table);
                (stay, Mode::Form {
                    kind: FormKind::LookupId { action, table },
                    form,
                })
            }
            Action::Generate => (
                stay,
                Mode::Form {
                    kind: FormKind::Generate(table),
                    form: Form::generate(table),
                },
            ),
        }
    }

    fn handle_delete_options(&mut self, code: KeyCode, table: Table) -> (Screen, Mode) {
        let options = DeleteOption::for_table(table);
        let option = match code {
            KeyCode::Esc | KeyCode::Char('0') => {
                return (Screen::PickTable(Action::Delete), Mode::Normal);
            }
            KeyCode::Char(ch) => match menu_choice(ch, options.len()) {
                Some(index) => options[index],
                None => return (Screen::DeleteOptions(table), Mode::Normal),
            },
            _ => return (Screen::DeleteOptions(table), Mode::Normal),
        };

        let (kind, form) = match option {
            DeleteOption::ById => (
                FormKind::LookupId {
                    action: Action::Delete,
                    table,
                },
                Form::id_prompt(format!("Delete {table} By Id"), table),
            ),
            DeleteOption::ByUsername => (
                FormKind::DeleteUsersBy(UserAttr::Username),
                attr_prompt(UserAttr::Username),
            ),
            DeleteOption::ByEmail => (
                FormKind::DeleteUsersBy(UserAttr::Email),
                attr_prompt(UserAttr::Email),
            ),
            DeleteOption::ByAuthor => (
                FormKind::DeleteByAuthor,
                Form::text_prompt("Delete Entries By Author", "Author username"),
            ),
            DeleteOption::ByDate => (FormKind::DeleteByDate, Form::reminder_date()),
            DeleteOption::ByStatus => (FormKind::DeleteByStatus, Form::reminder_status()),
            DeleteOption::ClearTable => {
                return (
                    Screen::DeleteOptions(table),
                    Mode::Confirm(Confirm::clear_table(table)),
                );
            }
        };
        (Screen::DeleteOptions(table), Mode::Form { kind, form })
    }

    fn handle_search_menu(&mut self, code: KeyCode) -> (Screen, Mode) {
        let choice = match code {
            KeyCode::Esc | KeyCode::Char('0') => return (Screen::Main, Mode::Normal),
            KeyCode::Char(ch) => menu_choice(ch, SEARCH_MENU.len()),
            _ => None,
        };
        let mode = match choice {
            Some(0) => Mode::Form {
                kind: FormKind::Search,
                form: Form::search(),
            },
            Some(1) => return (Screen::PickTable(Action::Find), Mode::Normal),
            Some(2) => Mode::Form {
                kind: FormKind::UserEntries,
                form: Form::id_prompt("Entries Of User", Table::User),
            },
            Some(3) => Mode::Form {
                kind: FormKind::UserReminders,
                form: Form::id_prompt("Reminders Of User", Table::User),
            },
            _ => Mode::Normal,
        };
        (Screen::Search, mode)
    }

    fn handle_form(&mut self, code: KeyCode, kind: FormKind, mut form: Form) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Tab | KeyCode::Down => {
                form.next_field();
                Ok(Mode::Form { kind, form })
            }
            KeyCode::BackTab | KeyCode::Up => {
                form.prev_field();
                Ok(Mode::Form { kind, form })
            }
            KeyCode::Backspace => {
                form.backspace();
                Ok(Mode::Form { kind, form })
            }
            KeyCode::Enter => match self.submit(&kind, &form) {
                Ok(Transition::Done(message)) => {
                    self.set_status(message, StatusKind::Info);
                    self.screen = Screen::Main;
                    Ok(Mode::Normal)
                }
                Ok(Transition::Show(results)) => {
                    self.clear_status();
                    self.screen = Screen::Results(results);
                    Ok(Mode::Normal)
                }
                Ok(Transition::Open(kind, form)) => Ok(Mode::Form { kind, form }),
                Err(err) => {
                    let message = surface_error(&err);
                    if needs_cascade(&err) {
                        if let Some(action) = cascade_for(&kind, &form) {
                            self.set_status(message.clone(), StatusKind::Error);
                            return Ok(Mode::Confirm(Confirm::cascade(message, action)));
                        }
                    }
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                    Ok(Mode::Form { kind, form })
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
                Ok(Mode::Form { kind, form })
            }
            _ => Ok(Mode::Form { kind, form }),
        }
    }

    fn handle_confirm(&mut self, code: KeyCode, mut confirm: Confirm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Cancelled; nothing was deleted.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Backspace => {
                confirm.input.pop();
                Ok(Mode::Confirm(confirm))
            }
            KeyCode::Char(ch) => {
                confirm.input.push(ch);
                Ok(Mode::Confirm(confirm))
            }
            KeyCode::Enter => {
                if !confirm.accepted() {
                    self.set_status(
                        "Confirmation did not match; nothing was deleted.",
                        StatusKind::Error,
                    );
                    return Ok(Mode::Normal);
                }
                match self.run_pending(&confirm.action) {
                    Ok(message) => {
                        self.set_status(message, StatusKind::Info);
                        self.screen = Screen::Main;
                    }
                    Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
                }
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::Confirm(confirm)),
        }
    }

    fn view_table(&self, table: Table) -> Result<ResultTable> {
        let title = format!("First {} {}", self.limit, table.plural());
        let results = match table {
            Table::User => ResultTable::users(title, &fetch_users(&self.conn, self.limit)?),
            Table::Entry => ResultTable::entries(title, &fetch_entries(&self.conn, self.limit)?),
            Table::Reminder => {
                ResultTable::reminders(title, &fetch_reminders(&self.conn, self.limit)?)
            }
        };
        Ok(results)
    }

    fn submit(&self, kind: &FormKind, form: &Form) -> Result<Transition> {
        let conn = &self.conn;
        let transition = match kind {
            FormKind::AddUser => {
                let (id, username, email, password) = parse_new_user(form)?;
                let user = add_user(conn, id, &username, &email, &password)?;
                Transition::Done(format!("User {} added.", user.id))
            }
            FormKind::AddEntry => {
                let (id, title, text, user_id) = parse_new_entry(form)?;
                let entry = add_entry(conn, id, &title, &text, user_id)?;
                Transition::Done(format!("Entry {} added.", entry.id))
            }
            FormKind::AddReminder => {
                let (id, entry_id, remind_at, active) = parse_new_reminder(form)?;
                let reminder = add_reminder(conn, id, entry_id, remind_at, active)?;
                Transition::Done(format!("Reminder {} added.", reminder.id))
            }
            FormKind::EditUser(current) => {
                let edited = parse_edited_user(form, current)?;
                update_user(conn, current.id, &edited)?;
                Transition::Done(format!("User {} updated.", edited.id))
            }
            FormKind::EditEntry(current) => {
                let edited = parse_edited_entry(form, current)?;
                update_entry(conn, current.id, &edited)?;
                Transition::Done(format!("Entry {} updated.", edited.id))
            }
            FormKind::EditReminder(current) => {
                let edited = parse_edited_reminder(form, current)?;
                update_reminder(conn, current.id, &edited)?;
                Transition::Done(format!("Reminder {} updated.", edited.id))
            }
            FormKind::LookupId { action, table } => {
                let id = parse_single_id(form)?;
                self.lookup(*action, *table, id)?
            }
            FormKind::UserEntries => {
                let listing = fetch_user_entries(conn, parse_single_id(form)?)?;
                Transition::Show(ResultTable::user_entries(&listing))
            }
            FormKind::UserReminders => {
                let listing = fetch_user_reminders(conn, parse_single_id(form)?)?;
                Transition::Show(ResultTable::user_reminders(&listing))
            }
            FormKind::DeleteUsersBy(attr) => {
                let deleted = delete_users_by(conn, *attr, &parse_single_text(form)?)?;
                Transition::Done(format!("Deleted {deleted} user(s)."))
            }
            FormKind::DeleteByAuthor => {
                let deleted = delete_entries_by_author(conn, &parse_single_text(form)?)?;
                Transition::Done(format!("Deleted {deleted} entr(ies)."))
            }
            FormKind::DeleteByDate => {
                let deleted = delete_reminders_by_date(conn, parse_reminder_date(form)?)?;
                Transition::Done(format!("Deleted {deleted} reminder(s)."))
            }
            FormKind::DeleteByStatus => {
                let deleted = delete_reminders_by_status(conn, parse_reminder_status(form)?)?;
                Transition::Done(format!("Deleted {deleted} reminder(s)."))
            }
            FormKind::Search => {
                let filters = parse_search(form)?;
                let outcome = search(conn, &filters)?;
                Transition::Show(ResultTable::search(&outcome, &filters))
            }
            FormKind::Generate(table) => {
                let count = parse_count(form)?;
                let generated = match table {
                    Table::User => generate_users(conn, count)?,
                    Table::Entry => generate_entries(conn, count)?,
                    Table::Reminder => generate_reminders(conn, count)?,
                };
                Transition::Done(generated.to_string())
            }
        };
        Ok(transition)
    }

    /// Resolve an id prompt: show the row, open its edit form, or delete it.
    fn lookup(&self, action: Action, table: Table, id: i64) -> Result<Transition> {
        let conn = &self.conn;
        let not_found = || DataError::NotFound { table, id };
        let title = format!("{table} {id}");

        let transition = match (action, table) {
            (Action::Delete, Table::User) => {
                delete_user(conn, id)?;
                Transition::Done(format!("User {id} deleted."))
            }
            (Action::Delete, Table::Entry) => {
                delete_entry(conn, id)?;
                Transition::Done(format!("Entry {id} deleted."))
            }
            (Action::Delete, Table::Reminder) => {
                delete_reminder(conn, id)?;
                Transition::Done(format!("Reminder {id} deleted."))
            }
            (Action::Edit, Table::User) => {
                let user = find_user(conn, id)?.ok_or_else(not_found)?;
                let form = Form::edit_user(&user);
                Transition::Open(FormKind::EditUser(user), form)
            }
            (Action::Edit, Table::Entry) => {
                let entry = find_entry(conn, id)?.ok_or_else(not_found)?;
                let form = Form::edit_entry(&entry);
                Transition::Open(FormKind::EditEntry(entry), form)
            }
            (Action::Edit, Table::Reminder) => {
                let reminder = find_reminder(conn, id)?.ok_or_else(not_found)?;
                let form = Form::edit_reminder(&reminder);
                Transition::Open(FormKind::EditReminder(reminder), form)
            }
            (_, Table::User) => {
                let user = find_user(conn, id)?.ok_or_else(not_found)?;
                Transition::Show(ResultTable::users(title, &[user]))
            }
            (_, Table::Entry) => {
                let entry = find_entry(conn, id)?.ok_or_else(not_found)?;
                Transition::Show(ResultTable::entries(title, &[entry]))
            }
            (_, Table::Reminder) => {
                let reminder = find_reminder(conn, id)?.ok_or_else(not_found)?;
                Transition::Show(ResultTable::reminders(title, &[reminder]))
            }
        };
        Ok(transition)
    }

    fn run_pending(&self, action: &PendingAction) -> Result<String> {
        let conn = &self.conn;
        let message = match action {
            PendingAction::ClearTable(table) => {
                let removed = clear_table(conn, *table)?;
                if removed.total() == 0 {
                    format!("{table} table was already empty.")
                } else {
                    format!("{table} table cleared: removed {removed}.")
                }
            }
            PendingAction::PurgeAll => {
                let removed = purge_all(conn)?;
                if removed.total() == 0 {
                    "The database was already empty.".to_string()
                } else {
                    format!("All data deleted: removed {removed}.")
                }
            }
            PendingAction::CascadeUser(id) => {
                let removed = delete_user_cascade(conn, *id)?;
                format!("User {id} deleted with dependents: removed {removed}.")
            }
            PendingAction::CascadeUserBy(attr, value) => {
                let removed = delete_user_cascade_by(conn, *attr, value)?;
                format!("Users with {attr} '{value}' deleted: removed {removed}.")
            }
            PendingAction::CascadeEntry(id) => {
                let removed = delete_entry_cascade(conn, *id)?;
                format!("Entry {id} deleted with reminders: removed {removed}.")
            }
            PendingAction::CascadeEntriesByAuthor(username) => {
                let removed = delete_entries_cascade_by_author(conn, username)?;
                format!("Entries by '{username}' deleted: removed {removed}.")
            }
        };
        Ok(message)
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(footer_height),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);
        match &self.screen {
            Screen::Main => self.draw_menu(frame, chunks[1], "Main Menu", &MAIN_MENU, false),
            Screen::PickTable(action) => {
                let labels = Table::ALL.map(Table::plural);
                self.draw_menu(frame, chunks[1], action.title(), &labels, true);
            }
            Screen::DeleteOptions(table) => {
                let labels: Vec<&str> = DeleteOption::for_table(*table)
                    .iter()
                    .map(|option| option.label())
                    .collect();
                let title = format!("Delete {}", table.plural());
                self.draw_menu(frame, chunks[1], &title, &labels, true);
            }
            Screen::Search => self.draw_menu(frame, chunks[1], "Search", &SEARCH_MENU, true),
            Screen::Results(results) => self.draw_results(frame, chunks[1], results),
        }
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::Form { form, .. } => self.draw_form(frame, area, form),
            Mode::Confirm(confirm) => self.draw_confirm(frame, area, confirm),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let title = Line::from(vec![
            Span::styled(
                "journal-admin",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  users / entries / reminders"),
        ]);
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(paragraph, area);
    }

    fn draw_menu(&self, frame: &mut Frame, area: Rect, title: &str, items: &[&str], back: bool) {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let mut lines: Vec<Line> = items
            .iter()
            .enumerate()
            .map(|(index, label)| {
                Line::from(vec![
                    Span::styled(format!(" {}. ", index + 1), key_style),
                    Span::raw(label.to_string()),
                ])
            })
            .collect();
        if back {
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled(" 0. ", key_style),
                Span::raw("Back"),
            ]));
        }

        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_results(&self, frame: &mut Frame, area: Rect, results: &ResultTable) {
        let block = Block::default()
            .title(results.title.clone())
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if results.rows.is_empty() {
            let message = Paragraph::new(results.empty_message())
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            frame.render_widget(message, inner);
            return;
        }

        let note_height = u16::from(results.note.is_some());
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(note_height)])
            .split(inner);

        let header = Row::new(results.headers.iter().map(|header| Cell::from(fit_cell(header))))
            .style(Style::default().add_modifier(Modifier::BOLD));
        let visible = chunks[0].height.saturating_sub(1) as usize;
        let rows = results.visible_rows(visible).iter().map(|row| {
            Row::new(row.iter().map(|value| Cell::from(fit_cell(value))))
        });
        let widths = vec![Constraint::Length(COLUMN_WIDTH); results.headers.len()];
        let table = TableWidget::new(rows, widths).header(header).column_spacing(1);
        frame.render_widget(table, chunks[0]);

        if let Some(note) = &results.note {
            let note = Paragraph::new(Span::styled(
                note.clone(),
                Style::default().fg(Color::Gray),
            ));
            frame.render_widget(note, chunks[1]);
        }
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        match (&self.screen, &self.mode) {
            (_, Mode::Form { .. }) => Line::from(vec![
                Span::styled("[Tab]", key_style),
                Span::raw(" Next field   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Submit   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Cancel"),
            ]),
            (_, Mode::Confirm(_)) => Line::from(vec![
                Span::styled("[Enter]", key_style),
                Span::raw(" Confirm   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Cancel"),
            ]),
            (Screen::Main, _) => Line::from(vec![
                Span::styled("[1-8]", key_style),
                Span::raw(" Choose   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
            (Screen::Results(_), _) => Line::from(vec![
                Span::styled("[↑↓ PgUp PgDn]", key_style),
                Span::raw(" Scroll   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Main menu"),
            ]),
            _ => Line::from(vec![
                Span::styled("[1-9]", key_style),
                Span::raw(" Choose   "),
                Span::styled("[0/Esc]", key_style),
                Span::raw(" Back"),
            ]),
        }
    }

    fn draw_form(&self, frame: &mut Frame, area: Rect, form: &Form) {
        let popup_area = centered_rect(70, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(form.title.clone())
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = form.build_lines();
        lines.push(Line::from(""));
        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to submit • Tab to switch field • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        frame.render_widget(Paragraph::new(lines), inner);

        let (column, row) = form.cursor_offset();
        frame.set_cursor_position((inner.x + column, inner.y + row));
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, confirm: &Confirm) {
        let popup_area = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup_area);

        let title_style = if confirm.exact {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let block = Block::default()
            .title(Span::styled(confirm.title, title_style))
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = confirm
            .lines
            .iter()
            .map(|line| Line::from(line.clone()))
            .collect();
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            confirm.prompt(),
            Style::default().fg(Color::Gray),
        )));
        let input_row = lines.len() as u16;
        lines.push(Line::from(format!("> {}", confirm.input)));

        frame.render_widget(Paragraph::new(lines), inner);

        let cursor_x = inner.x + 2 + confirm.input.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y + input_row));
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }
}

/// The cascade that would complete a delete refused because of dependents.
fn cascade_for(kind: &FormKind, form: &Form) -> Option<PendingAction> {
    match kind {
        FormKind::LookupId {
            action: Action::Delete,
            table: Table::User,
        } => parse_single_id(form).ok().map(PendingAction::CascadeUser),
        FormKind::LookupId {
            action: Action::Delete,
            table: Table::Entry,
        } => parse_single_id(form).ok().map(PendingAction::CascadeEntry),
        FormKind::DeleteUsersBy(attr) => parse_single_text(form)
            .ok()
            .map(|value| PendingAction::CascadeUserBy(*attr, value)),
        FormKind::DeleteByAuthor => parse_single_text(form)
            .ok()
            .map(PendingAction::CascadeEntriesByAuthor),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::*;
    use crate::db::{count_rows, open_in_memory};

    fn app() -> Result<App> {
        Ok(App::new(open_in_memory()?, 10))
    }

    fn press(app: &mut App, keys: &[KeyCode]) -> Result<bool> {
        let mut exit = false;
        for key in keys {
            exit = app.handle_key(*key)?;
        }
        Ok(exit)
    }

    fn type_text(app: &mut App, text: &str) -> Result<()> {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch))?;
        }
        Ok(())
    }

    fn status_text(app: &App) -> String {
        app.status
            .as_ref()
            .map(|status| status.text.clone())
            .unwrap_or_default()
    }

    fn seed_user_with_entry(app: &App) -> Result<()> {
        add_user(&app.conn, None, "ann", "ann@x.io", "pw")?;
        add_entry(&app.conn, None, "Monday", "notes", 1)?;
        Ok(())
    }

    #[test]
    fn adding_a_user_through_the_menu() -> Result<()> {
        let mut app = app()?;
        press(&mut app, &[KeyCode::Char('2'), KeyCode::Char('1'), KeyCode::Tab])?;
        type_text(&mut app, "ann")?;
        app.handle_key(KeyCode::Tab)?;
        type_text(&mut app, "ann@x.io")?;
        app.handle_key(KeyCode::Tab)?;
        type_text(&mut app, "pw")?;
        app.handle_key(KeyCode::Enter)?;

        let user = find_user(&app.conn, 1)?.ok_or_else(|| anyhow::anyhow!("user missing"))?;
        assert_eq!(user.username, "ann");
        assert_eq!(status_text(&app), "User 1 added.");
        assert!(matches!(app.mode, Mode::Normal));
        assert!(matches!(app.screen, Screen::Main));
        Ok(())
    }

    #[test]
    fn form_errors_keep_the_form_open() -> Result<()> {
        let mut app = app()?;
        press(&mut app, &[KeyCode::Char('2'), KeyCode::Char('2')])?;
        type_text(&mut app, "1")?;
        press(&mut app, &[KeyCode::Tab])?;
        type_text(&mut app, "title")?;
        press(&mut app, &[KeyCode::Tab])?;
        type_text(&mut app, "text")?;
        press(&mut app, &[KeyCode::Tab])?;
        type_text(&mut app, "42")?;
        app.handle_key(KeyCode::Enter)?;

        match &app.mode {
            Mode::Form { form, .. } => {
                assert_eq!(form.error.as_deref(), Some("User id 42 does not exist."));
            }
            _ => panic!("form should stay open after a failed insert"),
        }
        assert_eq!(count_rows(&app.conn, Table::Entry)?, 0);
        Ok(())
    }

    #[test]
    fn purge_requires_the_exact_phrase() -> Result<()> {
        let mut app = app()?;
        seed_user_with_entry(&app)?;

        app.handle_key(KeyCode::Char('7'))?;
        type_text(&mut app, "yes")?;
        app.handle_key(KeyCode::Enter)?;
        assert_eq!(count_rows(&app.conn, Table::User)?, 1);
        assert_eq!(
            status_text(&app),
            "Confirmation did not match; nothing was deleted."
        );

        app.handle_key(KeyCode::Char('7'))?;
        type_text(&mut app, "YES I WANT")?;
        app.handle_key(KeyCode::Enter)?;
        assert_eq!(count_rows(&app.conn, Table::User)?, 0);
        assert_eq!(count_rows(&app.conn, Table::Entry)?, 0);
        Ok(())
    }

    #[test]
    fn clearing_reports_an_already_empty_table() -> Result<()> {
        let mut app = app()?;
        seed_user_with_entry(&app)?;

        press(
            &mut app,
            &[KeyCode::Char('3'), KeyCode::Char('3'), KeyCode::Char('4')],
        )?;
        type_text(&mut app, "yes")?;
        app.handle_key(KeyCode::Enter)?;
        assert_eq!(status_text(&app), "Reminder table was already empty.");

        app.handle_key(KeyCode::Char('7'))?;
        type_text(&mut app, "YES I WANT")?;
        app.handle_key(KeyCode::Enter)?;
        assert_eq!(
            status_text(&app),
            "All data deleted: removed 1 user(s), 1 entr(ies), 0 reminder(s)."
        );

        app.handle_key(KeyCode::Char('7'))?;
        type_text(&mut app, "YES I WANT")?;
        app.handle_key(KeyCode::Enter)?;
        assert_eq!(status_text(&app), "The database was already empty.");
        Ok(())
    }

    #[test]
    fn blank_search_lists_every_user() -> Result<()> {
        let mut app = app()?;
        seed_user_with_entry(&app)?;

        press(&mut app, &[KeyCode::Char('5'), KeyCode::Char('1'), KeyCode::Enter])?;
        match &app.screen {
            Screen::Results(results) => {
                assert_eq!(results.rows.len(), 1);
                assert!(results
                    .note
                    .as_deref()
                    .is_some_and(|note| note.starts_with("No filters set, 1 user(s)")));
            }
            _ => panic!("expected search results"),
        }
        Ok(())
    }

    #[test]
    fn blocked_delete_offers_a_cascade() -> Result<()> {
        let mut app = app()?;
        seed_user_with_entry(&app)?;

        press(
            &mut app,
            &[KeyCode::Char('3'), KeyCode::Char('1'), KeyCode::Char('1')],
        )?;
        type_text(&mut app, "1")?;
        app.handle_key(KeyCode::Enter)?;

        match &app.mode {
            Mode::Confirm(confirm) => {
                assert_eq!(confirm.action, PendingAction::CascadeUser(1));
            }
            _ => panic!("expected a cascade confirmation"),
        }
        type_text(&mut app, "YES")?;
        app.handle_key(KeyCode::Enter)?;

        assert_eq!(count_rows(&app.conn, Table::User)?, 0);
        assert_eq!(count_rows(&app.conn, Table::Entry)?, 0);
        assert!(status_text(&app).starts_with("User 1 deleted with dependents"));
        Ok(())
    }

    #[test]
    fn viewing_a_table_and_going_back() -> Result<()> {
        let mut app = app()?;
        seed_user_with_entry(&app)?;

        press(&mut app, &[KeyCode::Char('1'), KeyCode::Char('2')])?;
        match &app.screen {
            Screen::Results(results) => {
                assert_eq!(results.rows.len(), 1);
                assert_eq!(results.rows[0][1], "Monday");
            }
            _ => panic!("expected the entry listing"),
        }
        press(&mut app, &[KeyCode::Esc])?;
        assert!(matches!(app.screen, Screen::Main));
        Ok(())
    }

    #[test]
    fn editing_prefills_the_current_row() -> Result<()> {
        let mut app = app()?;
        seed_user_with_entry(&app)?;

        press(&mut app, &[KeyCode::Char('4'), KeyCode::Char('1')])?;
        type_text(&mut app, "1")?;
        app.handle_key(KeyCode::Enter)?;
        match &app.mode {
            Mode::Form { form, .. } => assert_eq!(form.value(1), "ann"),
            _ => panic!("expected the edit form"),
        }

        press(&mut app, &[KeyCode::Tab, KeyCode::Tab])?;
        for _ in 0.."ann@x.io".len() {
            app.handle_key(KeyCode::Backspace)?;
        }
        type_text(&mut app, "new@x.io")?;
        app.handle_key(KeyCode::Enter)?;

        let user = find_user(&app.conn, 1)?.ok_or_else(|| anyhow::anyhow!("user missing"))?;
        assert_eq!(user.email, "new@x.io");
        assert_eq!(user.username, "ann");
        Ok(())
    }

    #[test]
    fn exit_from_the_main_menu() -> Result<()> {
        let mut app = app()?;
        assert!(!press(&mut app, &[KeyCode::Char('5'), KeyCode::Char('0')])?);
        assert!(press(&mut app, &[KeyCode::Char('8')])?);
        app.close()
    }

    #[test]
    fn main_menu_renders() -> Result<()> {
        let app = app()?;
        let mut terminal = Terminal::new(TestBackend::new(80, 24))?;
        terminal.draw(|frame| app.draw(frame))?;

        let rendered: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(rendered.contains("Main Menu"));
        assert!(rendered.contains("Delete ALL data"));
        Ok(())
    }
}

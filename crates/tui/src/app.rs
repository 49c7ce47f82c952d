use std::{collections::VecDeque, io, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gamedex_core::{Game, GameDraft, GraphQlClient, GraphQlError};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use tokio::{spawn, sync::mpsc};
use tracing::{error, info};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_FIELD_LEN: usize = 128;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

/// State of the game list as last observed by the list query.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ListView {
    Loading,
    Ready,
    Failed(String),
}

/// Mutation produced by a user action, echoed back when the request settles.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MutationRequest {
    Add { draft: GameDraft },
    Update { id: String, edits: GameDraft },
    Delete { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FormMode {
    Add,
    Edit { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormFocus {
    Title,
    Platform,
    Tags,
}

/// Modal form shared by the add and edit flows. Each open constructs a
/// fresh instance with its own draft, so the two flows cannot leak state
/// into each other.
#[derive(Debug, Clone)]
struct GameFormModal {
    mode: FormMode,
    draft: GameDraft,
    title_cursor: usize,
    platform_input: String,
    platform_cursor: usize,
    tag_cursor: usize,
    focus: FormFocus,
    error: Option<String>,
    submitting: bool,
}

impl GameFormModal {
    fn open_add() -> Self {
        Self {
            mode: FormMode::Add,
            draft: GameDraft::new(),
            title_cursor: 0,
            platform_input: String::new(),
            platform_cursor: 0,
            tag_cursor: 0,
            focus: FormFocus::Title,
            error: None,
            submitting: false,
        }
    }

    fn open_edit(game: &Game) -> Self {
        let draft = GameDraft::from_game(game);
        let title_cursor = draft.title.len();
        Self {
            mode: FormMode::Edit {
                id: game.id.clone(),
            },
            draft,
            title_cursor,
            platform_input: String::new(),
            platform_cursor: 0,
            tag_cursor: 0,
            focus: FormFocus::Title,
            error: None,
            submitting: false,
        }
    }

    fn heading(&self) -> &'static str {
        match self.mode {
            FormMode::Add => "Add New Game",
            FormMode::Edit { .. } => "Edit Game",
        }
    }

    fn active_field(&mut self) -> Option<(&mut String, &mut usize)> {
        match self.focus {
            FormFocus::Title => Some((&mut self.draft.title, &mut self.title_cursor)),
            FormFocus::Platform => Some((&mut self.platform_input, &mut self.platform_cursor)),
            FormFocus::Tags => None,
        }
    }

    // Field cursors are byte offsets and only ever rest on char
    // boundaries; titles from the server may be non-ASCII.
    fn insert(&mut self, ch: char) {
        let Some((value, cursor)) = self.active_field() else {
            return;
        };
        if value.len() >= MAX_FIELD_LEN {
            return;
        }
        if !ch.is_control() {
            value.insert(*cursor, ch);
            *cursor += ch.len_utf8();
        }
    }

    fn backspace(&mut self) {
        let Some((value, cursor)) = self.active_field() else {
            return;
        };
        if let Some((idx, _)) = value[..*cursor].char_indices().next_back() {
            value.remove(idx);
            *cursor = idx;
        }
    }

    fn delete(&mut self) {
        let Some((value, cursor)) = self.active_field() else {
            return;
        };
        if *cursor < value.len() {
            value.remove(*cursor);
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let Some((value, cursor)) = self.active_field() else {
            return;
        };
        if delta < 0 {
            for _ in 0..delta.unsigned_abs() {
                match value[..*cursor].char_indices().next_back() {
                    Some((idx, _)) => *cursor = idx,
                    None => break,
                }
            }
        } else {
            for _ in 0..delta as usize {
                match value[*cursor..].chars().next() {
                    Some(ch) => *cursor += ch.len_utf8(),
                    None => break,
                }
            }
        }
    }

    fn move_home(&mut self) {
        if let Some((_, cursor)) = self.active_field() {
            *cursor = 0;
        }
    }

    fn move_end(&mut self) {
        if let Some((value, cursor)) = self.active_field() {
            *cursor = value.len();
        }
    }

    fn cycle_focus(&mut self, forward: bool) {
        let has_tags = !self.draft.platform.is_empty();
        self.focus = match (self.focus, forward) {
            (FormFocus::Title, true) => FormFocus::Platform,
            (FormFocus::Platform, true) if has_tags => FormFocus::Tags,
            (FormFocus::Platform, true) => FormFocus::Title,
            (FormFocus::Tags, true) => FormFocus::Title,
            (FormFocus::Title, false) if has_tags => FormFocus::Tags,
            (FormFocus::Title, false) => FormFocus::Platform,
            (FormFocus::Platform, false) => FormFocus::Title,
            (FormFocus::Tags, false) => FormFocus::Platform,
        };
        self.clamp_tag_cursor();
    }

    fn clamp_tag_cursor(&mut self) {
        if self.draft.platform.is_empty() {
            self.tag_cursor = 0;
        } else if self.tag_cursor >= self.draft.platform.len() {
            self.tag_cursor = self.draft.platform.len() - 1;
        }
    }

    /// Append the platform input to the draft's tag set. The input is
    /// cleared only when the tag was actually added.
    fn add_platform_tag(&mut self) {
        if self.draft.add_platform(&self.platform_input) {
            self.platform_input.clear();
            self.platform_cursor = 0;
        }
    }

    fn move_tag_cursor(&mut self, delta: isize) {
        if self.draft.platform.is_empty() {
            return;
        }
        let len = self.draft.platform.len() as isize;
        let next = (self.tag_cursor as isize + delta).clamp(0, len - 1);
        self.tag_cursor = next as usize;
    }

    fn remove_selected_tag(&mut self) {
        let Some(value) = self.draft.platform.get(self.tag_cursor).cloned() else {
            return;
        };
        self.draft.remove_platform(&value);
        self.clamp_tag_cursor();
        if self.draft.platform.is_empty() {
            self.focus = FormFocus::Platform;
        }
    }

    /// Validate the draft and produce the mutation to send. An invalid
    /// draft sets the inline error and yields nothing, so no network call
    /// is made for it.
    fn submit(&mut self) -> Option<MutationRequest> {
        if self.submitting {
            return None;
        }
        if let Err(err) = self.draft.validate() {
            self.error = Some(err.to_string());
            return None;
        }
        self.error = None;
        self.submitting = true;
        Some(match &self.mode {
            FormMode::Add => MutationRequest::Add {
                draft: self.draft.clone(),
            },
            FormMode::Edit { id } => MutationRequest::Update {
                id: id.clone(),
                edits: self.draft.clone(),
            },
        })
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    GamesLoaded(Result<Vec<Game>, GraphQlError>),
    MutationFinished {
        request: MutationRequest,
        result: Result<(), GraphQlError>,
    },
}

/// High-level application state for the games terminal client.
pub struct GamedexApp {
    client: Arc<GraphQlClient>,
    games: Vec<Game>,
    list: ListView,
    cursor: usize,
    status: String,
    banner: Option<String>,
    modal: Option<GameFormModal>,
    alerts: VecDeque<String>,
    pending_fetch: bool,
    last_synced: Option<DateTime<Local>>,
    should_quit: bool,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    theme: Theme,
}

impl GamedexApp {
    pub fn new(client: Arc<GraphQlClient>) -> Self {
        // A previous run of this process may have left a cached list behind.
        let games = client.cached_games().unwrap_or_default();
        let list = if games.is_empty() {
            ListView::Loading
        } else {
            ListView::Ready
        };
        Self {
            client,
            games,
            list,
            cursor: 0,
            status: "Connecting…".to_string(),
            banner: None,
            modal: None,
            alerts: VecDeque::new(),
            pending_fetch: false,
            last_synced: None,
            should_quit: false,
            event_tx: None,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        // The mount fetch.
        self.start_fetch();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }

            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }

            if self.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Event::Key(key) = event {
                    self.handle_key(key);
                }
                true
            }
            Some(AppEvent::Tick) => true,
            Some(AppEvent::GamesLoaded(result)) => {
                self.on_games_loaded(result);
                true
            }
            Some(AppEvent::MutationFinished { request, result }) => {
                self.on_mutation_finished(request, result);
                true
            }
            None => false,
        }
    }

    fn selected_game(&self) -> Option<&Game> {
        self.games.get(self.cursor)
    }

    fn clamp_cursor(&mut self) {
        if self.games.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.games.len() {
            self.cursor = self.games.len() - 1;
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.games.is_empty() {
            return;
        }
        let len = self.games.len() as isize;
        let next = (self.cursor as isize + delta).clamp(0, len - 1);
        self.cursor = next as usize;
    }

    /// Queue alert dialogs for GraphQL-level errors, one per message.
    /// Transport failures deliberately stay out of the alert surface and
    /// are handled at the call site only.
    fn queue_alerts(&mut self, err: &GraphQlError) {
        if let Some(messages) = err.response_messages() {
            for message in messages {
                self.alerts.push_back(message.clone());
            }
        }
    }

    fn start_fetch(&mut self) {
        if self.pending_fetch {
            return;
        }
        let Some(sender) = self.event_tx.clone() else {
            return;
        };
        self.pending_fetch = true;
        if self.games.is_empty() {
            self.list = ListView::Loading;
        }
        self.status = "Fetching games…".to_string();
        let client = Arc::clone(&self.client);
        spawn(async move {
            let result = client.games().await;
            let _ = sender.send(AppEvent::GamesLoaded(result)).await;
        });
    }

    fn dispatch(&mut self, request: MutationRequest) {
        let Some(sender) = self.event_tx.clone() else {
            self.status = "Internal error: event channel unavailable".to_string();
            error!("event_channel_missing");
            return;
        };
        let client = Arc::clone(&self.client);
        spawn(async move {
            let result = match &request {
                MutationRequest::Add { draft } => client.add_game(draft).await,
                MutationRequest::Update { id, edits } => client.update_game(id, edits).await,
                MutationRequest::Delete { id } => client.delete_game(id).await,
            };
            let _ = sender
                .send(AppEvent::MutationFinished { request, result })
                .await;
        });
    }

    fn on_games_loaded(&mut self, result: Result<Vec<Game>, GraphQlError>) {
        self.pending_fetch = false;
        match result {
            Ok(games) => {
                info!(count = games.len(), "game list loaded");
                self.games = games;
                self.list = ListView::Ready;
                self.last_synced = Some(Local::now());
                self.clamp_cursor();
                self.status = format!("Loaded {} games", self.games.len());
            }
            Err(err) => {
                error!(error = %err, "game list fetch failed");
                self.queue_alerts(&err);
                self.list = ListView::Failed(err.to_string());
                self.status = "Fetch failed".to_string();
            }
        }
    }

    fn on_mutation_finished(
        &mut self,
        request: MutationRequest,
        result: Result<(), GraphQlError>,
    ) {
        match result {
            Ok(()) => {
                self.banner = None;
                self.status = match &request {
                    MutationRequest::Add { draft } => {
                        info!(title = %draft.title, "game added");
                        format!("Added \"{}\"", draft.title)
                    }
                    MutationRequest::Update { id, edits } => {
                        info!(game_id = %id, "game updated");
                        format!("Updated \"{}\"", edits.title)
                    }
                    MutationRequest::Delete { id } => {
                        info!(game_id = %id, "game deleted");
                        "Game deleted".to_string()
                    }
                };
                if !matches!(request, MutationRequest::Delete { .. }) {
                    self.modal = None;
                }
                // Resync rather than patch locally.
                self.start_fetch();
            }
            Err(err) => {
                self.queue_alerts(&err);
                let message = err.to_string();
                match request {
                    MutationRequest::Delete { id } => {
                        error!(game_id = %id, error = %message, "delete failed");
                        // Table stays as-is; no refetch on failure.
                        self.banner = Some(message);
                    }
                    MutationRequest::Add { .. } | MutationRequest::Update { .. } => {
                        // Modal stays open with the raw rejection message.
                        if let Some(modal) = self.modal.as_mut() {
                            modal.submitting = false;
                            modal.error = Some(message);
                        } else {
                            self.banner = Some(message);
                        }
                    }
                }
                self.status = "Request failed".to_string();
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if !self.alerts.is_empty() {
            self.handle_alert_key(key);
            return;
        }
        if self.modal.is_some() {
            self.handle_modal_key(key);
            return;
        }
        self.handle_browse_key(key);
    }

    fn handle_alert_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            self.alerts.pop_front();
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(-1),
            KeyCode::Char('g') if key.modifiers.is_empty() => self.cursor = 0,
            KeyCode::Char('G') => {
                self.cursor = self.games.len().saturating_sub(1);
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.games.len().saturating_sub(1),
            KeyCode::Char('a') if key.modifiers.is_empty() => {
                self.modal = Some(GameFormModal::open_add());
                self.status = "Adding a new game".to_string();
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(game) = self.games.get(self.cursor).cloned() {
                    self.status = format!("Editing \"{}\"", game.title);
                    self.modal = Some(GameFormModal::open_edit(&game));
                } else {
                    self.status = "No game selected".to_string();
                }
            }
            KeyCode::Char('d') if key.modifiers.is_empty() => self.delete_selected(),
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.start_fetch();
            }
            _ => {}
        }
    }

    /// Delete is fired straight from the table row with no confirmation,
    /// matching the original UI.
    fn delete_selected(&mut self) {
        let Some(game) = self.selected_game() else {
            self.status = "No game selected".to_string();
            return;
        };
        let id = game.id.clone();
        let title = game.title.clone();
        self.status = format!("Deleting \"{title}\"…");
        self.dispatch(MutationRequest::Delete { id });
    }

    fn handle_modal_key(&mut self, key: KeyEvent) {
        let Some(mut modal) = self.modal.take() else {
            return;
        };

        if modal.submitting {
            // A save is in flight; the modal stays open and inert.
            self.modal = Some(modal);
            return;
        }

        let mut close = false;
        let mut submit = None;
        match key.code {
            KeyCode::Esc => {
                close = true;
                self.status = "Cancelled".to_string();
            }
            KeyCode::Tab => modal.cycle_focus(true),
            KeyCode::BackTab => modal.cycle_focus(false),
            KeyCode::Down => modal.cycle_focus(true),
            KeyCode::Up => modal.cycle_focus(false),
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                submit = modal.submit();
            }
            KeyCode::Enter => match modal.focus {
                FormFocus::Title => modal.cycle_focus(true),
                FormFocus::Platform => modal.add_platform_tag(),
                FormFocus::Tags => {}
            },
            KeyCode::Left => match modal.focus {
                FormFocus::Tags => modal.move_tag_cursor(-1),
                _ => modal.move_cursor(-1),
            },
            KeyCode::Right => match modal.focus {
                FormFocus::Tags => modal.move_tag_cursor(1),
                _ => modal.move_cursor(1),
            },
            KeyCode::Home => modal.move_home(),
            KeyCode::End => modal.move_end(),
            KeyCode::Backspace | KeyCode::Delete if modal.focus == FormFocus::Tags => {
                modal.remove_selected_tag();
            }
            KeyCode::Backspace => modal.backspace(),
            KeyCode::Delete => modal.delete(),
            KeyCode::Char('x') if modal.focus == FormFocus::Tags => {
                modal.remove_selected_tag();
            }
            KeyCode::Char(ch) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    modal.insert(ch);
                }
            }
            _ => {}
        }

        if let Some(request) = submit {
            self.status = "Saving…".to_string();
            self.dispatch(request);
        }
        if !close {
            self.modal = Some(modal);
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        match self.list.clone() {
            ListView::Loading => self.draw_placeholder(frame, "Loading games…", false),
            ListView::Failed(message) => {
                self.draw_placeholder(frame, &format!("Error: {message}"), true)
            }
            ListView::Ready => self.draw_browse(frame),
        }
        if let Some(modal) = self.modal.clone() {
            self.render_form_modal(frame, &modal);
        }
        if let Some(message) = self.alerts.front().cloned() {
            self.render_alert(frame, &message);
        }
    }

    fn draw_placeholder(&self, frame: &mut Frame, message: &str, danger: bool) {
        let area = frame.size();
        let style = if danger {
            Style::default().fg(self.theme.danger)
        } else {
            Style::default().fg(self.theme.muted)
        };
        let hint = if danger {
            "Ctrl-R retry  q quit"
        } else {
            "q quit"
        };
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(message.to_string(), style)),
            Line::from(""),
            Line::from(Span::styled(hint, Style::default().fg(self.theme.muted))),
        ])
        .block(Block::default().borders(Borders::ALL).title("Game List"))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_browse(&mut self, frame: &mut Frame) {
        let size = frame.size();

        let mut constraints = vec![Constraint::Length(3)];
        if self.banner.is_some() {
            constraints.push(Constraint::Length(3));
        }
        constraints.push(Constraint::Min(8));
        constraints.push(Constraint::Length(3));

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(size);

        let mut chunk_iter = chunks.iter().copied();
        let header_chunk = chunk_iter.next().unwrap_or(size);
        let banner_chunk = if self.banner.is_some() {
            chunk_iter.next()
        } else {
            None
        };
        let body_chunk = chunk_iter.next().unwrap_or(size);
        let status_chunk = chunk_iter.next().unwrap_or(size);

        self.render_header(frame, header_chunk);
        if let (Some(message), Some(area)) = (self.banner.clone(), banner_chunk) {
            self.render_banner(frame, area, &message);
        }

        let body_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(body_chunk);

        self.render_table(frame, body_chunks[0]);
        self.render_detail(frame, body_chunks[1]);
        self.render_status(frame, status_chunk);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let title = Span::styled(
            "Game List",
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
        );
        let hint = Span::styled(
            "  a add  e edit  d delete  Ctrl-R refresh  q quit",
            Style::default().fg(self.theme.muted),
        );
        let paragraph = Paragraph::new(Line::from(vec![title, hint]))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }

    fn render_banner(&self, frame: &mut Frame, area: Rect, message: &str) {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(self.theme.danger),
        )))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.danger))
                .title("Error"),
        )
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_table(&mut self, frame: &mut Frame, area: Rect) {
        self.clamp_cursor();
        let mut table_state = TableState::default();
        if !self.games.is_empty() {
            table_state.select(Some(self.cursor));
        }

        let header = Row::new(vec!["ID", "Title", "Platform(s)"]).style(
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
        );
        let rows: Vec<Row> = self
            .games
            .iter()
            .map(|game| {
                Row::new(vec![
                    Cell::from(game.id.clone()),
                    Cell::from(game.title.clone()),
                    Cell::from(game.platform_summary()),
                ])
            })
            .collect();

        let widths = [
            Constraint::Length(8),
            Constraint::Percentage(45),
            Constraint::Percentage(45),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Games"))
            .highlight_style(
                Style::default()
                    .bg(self.theme.selection_bg)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(table, area, &mut table_state);
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        if let Some(game) = self.selected_game() {
            lines.push(Line::from(Span::styled(
                game.title.clone(),
                Style::default()
                    .fg(self.theme.primary_fg)
                    .add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(Span::styled(
                format!("Platforms: {}", game.platform_summary()),
                Style::default().fg(self.theme.muted),
            )));
            lines.push(Line::from(""));
            if game.reviews.is_empty() {
                lines.push(Line::from(Span::styled(
                    "No reviews yet",
                    Style::default().fg(self.theme.muted),
                )));
            } else {
                let average = game
                    .average_rating()
                    .map(|avg| format!("{avg:.1}"))
                    .unwrap_or_default();
                lines.push(Line::from(Span::styled(
                    format!("Reviews ({}, avg {average})", game.reviews.len()),
                    Style::default().fg(self.theme.accent),
                )));
                for review in &game.reviews {
                    lines.push(Line::from(vec![
                        Span::styled(
                            format!("  {:>2} ", review.rating),
                            Style::default().fg(self.theme.warning),
                        ),
                        Span::raw(review.author.name.clone()),
                    ]));
                }
            }
        } else {
            lines.push(Line::from(Span::styled(
                "No games yet. Press a to add one.",
                Style::default().fg(self.theme.muted),
            )));
        }

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Details"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let synced = match &self.last_synced {
            Some(stamp) => format!("Last synced {}", stamp.format("%H:%M:%S")),
            None => "Not synced yet".to_string(),
        };
        let secondary = format!("{} games  •  {synced}", self.games.len());
        let paragraph = Paragraph::new(vec![
            Line::from(self.status.clone()),
            Line::from(Span::styled(secondary, Style::default().fg(self.theme.muted))),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_form_modal(&self, frame: &mut Frame, modal: &GameFormModal) {
        let frame_area = frame.size();
        let width = 62.min(frame_area.width.saturating_sub(4)).max(30);
        let height = 13.min(frame_area.height.saturating_sub(2)).max(9);
        let area = centered_rect(width, height, frame_area);

        frame.render_widget(Clear, area);

        let focus_marker = |focused: bool| {
            if focused {
                Span::styled("> ", Style::default().fg(self.theme.accent))
            } else {
                Span::styled("  ", Style::default().fg(self.theme.muted))
            }
        };

        let mut tag_spans: Vec<Span> = vec![focus_marker(modal.focus == FormFocus::Tags)];
        if modal.draft.platform.is_empty() {
            tag_spans.push(Span::styled(
                "(no platforms)",
                Style::default().fg(self.theme.muted),
            ));
        } else {
            for (idx, tag) in modal.draft.platform.iter().enumerate() {
                let selected = modal.focus == FormFocus::Tags && idx == modal.tag_cursor;
                let style = if selected {
                    Style::default()
                        .bg(self.theme.selection_bg)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.primary_fg)
                };
                tag_spans.push(Span::styled(format!("[{tag}]"), style));
                tag_spans.push(Span::raw(" "));
            }
        }

        let error_line = match &modal.error {
            Some(message) => Line::from(Span::styled(
                message.clone(),
                Style::default().fg(self.theme.danger),
            )),
            None if modal.submitting => Line::from(Span::styled(
                "Saving…",
                Style::default().fg(self.theme.warning),
            )),
            None => Line::from(""),
        };

        let helper = Line::from(vec![
            Span::styled("Tab", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" field  "),
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" add platform  "),
            Span::styled("x", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" remove tag  "),
            Span::styled("Ctrl-S", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" save  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ]);

        let lines = vec![
            Line::from(Span::styled("Title", Style::default().fg(self.theme.muted))),
            Line::from(vec![
                focus_marker(modal.focus == FormFocus::Title),
                Span::raw(modal.draft.title.clone()),
            ]),
            Line::from(Span::styled(
                "Platforms",
                Style::default().fg(self.theme.muted),
            )),
            Line::from(vec![
                focus_marker(modal.focus == FormFocus::Platform),
                Span::raw(modal.platform_input.clone()),
            ]),
            Line::from(tag_spans),
            Line::from(""),
            error_line,
            helper,
        ];

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(modal.heading()))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);

        let cursor = match modal.focus {
            FormFocus::Title => Some((modal.title_cursor, 2_u16)),
            FormFocus::Platform => Some((modal.platform_cursor, 4_u16)),
            FormFocus::Tags => None,
        };
        if let Some((cursor_offset, line)) = cursor {
            let cursor_x =
                (area.x + 3 + cursor_offset as u16).min(area.x + area.width.saturating_sub(2));
            let cursor_y = area.y + line;
            frame.set_cursor(cursor_x, cursor_y);
        }
    }

    fn render_alert(&self, frame: &mut Frame, message: &str) {
        let frame_area = frame.size();
        let width = 56.min(frame_area.width.saturating_sub(4)).max(24);
        let height = 7.min(frame_area.height.saturating_sub(2)).max(5);
        let area = centered_rect(width, height, frame_area);

        frame.render_widget(Clear, area);

        let remaining = self.alerts.len().saturating_sub(1);
        let footer = if remaining > 0 {
            format!("Enter dismiss ({remaining} more)")
        } else {
            "Enter dismiss".to_string()
        };
        let paragraph = Paragraph::new(vec![
            Line::from(Span::styled(
                message.to_string(),
                Style::default().fg(self.theme.primary_fg),
            )),
            Line::from(""),
            Line::from(Span::styled(footer, Style::default().fg(self.theme.muted))),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.danger))
                .title("GraphQL error"),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamedex_core::Review;

    fn sample_game() -> Game {
        Game {
            id: "1".to_string(),
            title: "Halo".to_string(),
            platform: vec!["Xbox".to_string()],
            reviews: Vec::new(),
        }
    }

    fn app_with_games(games: Vec<Game>) -> GamedexApp {
        let client = Arc::new(GraphQlClient::new("http://localhost:4000/graphql"));
        let mut app = GamedexApp::new(client);
        app.games = games;
        app.list = ListView::Ready;
        app
    }

    #[test]
    fn valid_add_draft_submits_exact_values() {
        let mut modal = GameFormModal::open_add();
        for ch in "Halo".chars() {
            modal.insert(ch);
        }
        modal.focus = FormFocus::Platform;
        for ch in "Xbox".chars() {
            modal.insert(ch);
        }
        modal.add_platform_tag();

        let request = modal.submit().expect("valid draft should submit");
        match request {
            MutationRequest::Add { draft } => {
                assert_eq!(draft.title, "Halo");
                assert_eq!(draft.platform, vec!["Xbox".to_string()]);
            }
            other => panic!("expected add request, got {other:?}"),
        }
        assert!(modal.submitting);
        assert!(modal.error.is_none());
    }

    #[test]
    fn invalid_draft_submits_nothing_and_sets_fixed_message() {
        let mut modal = GameFormModal::open_add();
        modal.focus = FormFocus::Platform;
        for ch in "PC".chars() {
            modal.insert(ch);
        }
        modal.add_platform_tag();

        // Title empty, platform ["PC"].
        assert_eq!(modal.submit(), None);
        assert_eq!(
            modal.error.as_deref(),
            Some("Title and at least one platform are required")
        );
        assert!(!modal.submitting);
    }

    #[test]
    fn submit_is_ignored_while_in_flight() {
        let mut modal = GameFormModal::open_edit(&sample_game());
        assert!(modal.submit().is_some());
        assert_eq!(modal.submit(), None);
    }

    #[test]
    fn edit_seeds_a_copy_and_submits_update_with_id() {
        let game = sample_game();
        let mut modal = GameFormModal::open_edit(&game);
        modal.focus = FormFocus::Platform;
        for ch in "PC".chars() {
            modal.insert(ch);
        }
        modal.add_platform_tag();

        // The source row is untouched until the save lands.
        assert_eq!(game.platform, vec!["Xbox".to_string()]);

        let request = modal.submit().expect("valid draft should submit");
        match request {
            MutationRequest::Update { id, edits } => {
                assert_eq!(id, "1");
                assert_eq!(edits.title, "Halo");
                assert_eq!(edits.platform, vec!["Xbox".to_string(), "PC".to_string()]);
            }
            other => panic!("expected update request, got {other:?}"),
        }
    }

    #[test]
    fn platform_input_clears_only_on_successful_add() {
        let mut modal = GameFormModal::open_add();
        modal.focus = FormFocus::Platform;
        for ch in "Xbox".chars() {
            modal.insert(ch);
        }
        modal.add_platform_tag();
        assert!(modal.platform_input.is_empty());

        // Duplicate: rejected, input preserved.
        for ch in "Xbox".chars() {
            modal.insert(ch);
        }
        modal.add_platform_tag();
        assert_eq!(modal.platform_input, "Xbox");
        assert_eq!(modal.draft.platform, vec!["Xbox".to_string()]);

        // Whitespace-only: rejected, input preserved.
        modal.platform_input = "   ".to_string();
        modal.platform_cursor = 3;
        modal.add_platform_tag();
        assert_eq!(modal.platform_input, "   ");
    }

    #[test]
    fn edit_key_opens_seeded_modal() {
        let mut app = app_with_games(vec![sample_game()]);
        app.handle_browse_key(KeyEvent::new(KeyCode::Char('e'), KeyModifiers::NONE));
        let modal = app.modal.as_ref().expect("edit modal opens");
        assert_eq!(
            modal.mode,
            FormMode::Edit {
                id: "1".to_string()
            }
        );
        assert_eq!(modal.draft.title, "Halo");
        assert_eq!(app.status, "Editing \"Halo\"");
    }

    #[test]
    fn editing_handles_multibyte_titles() {
        let mut game = sample_game();
        game.title = "Pokémon".to_string();
        let mut modal = GameFormModal::open_edit(&game);

        for _ in 0..4 {
            modal.backspace();
        }
        assert_eq!(modal.draft.title, "Pok");

        modal.insert('é');
        assert_eq!(modal.draft.title, "Poké");

        modal.move_cursor(-1);
        modal.delete();
        assert_eq!(modal.draft.title, "Pok");

        modal.move_cursor(1);
        assert_eq!(modal.title_cursor, modal.draft.title.len());
    }

    #[test]
    fn removing_last_tag_returns_focus_to_platform_field() {
        let mut modal = GameFormModal::open_edit(&sample_game());
        modal.focus = FormFocus::Tags;
        modal.remove_selected_tag();
        assert!(modal.draft.platform.is_empty());
        assert_eq!(modal.focus, FormFocus::Platform);
    }

    #[tokio::test]
    async fn delete_failure_sets_banner_without_refetch() {
        let mut app = app_with_games(vec![sample_game()]);
        let (tx, _rx) = mpsc::channel(8);
        app.event_tx = Some(tx);
        app.on_mutation_finished(
            MutationRequest::Delete {
                id: "2".to_string(),
            },
            Err(GraphQlError::Response {
                messages: vec!["not found".to_string()],
            }),
        );
        assert_eq!(app.banner.as_deref(), Some("not found"));
        assert!(!app.pending_fetch);
        assert_eq!(app.games.len(), 1);
        // The error-link surface also saw the GraphQL-level error.
        assert_eq!(app.alerts.front().map(String::as_str), Some("not found"));
    }

    #[test]
    fn save_failure_keeps_modal_open_with_message() {
        let mut app = app_with_games(vec![sample_game()]);
        let mut modal = GameFormModal::open_edit(&app.games[0]);
        assert!(modal.submit().is_some());
        app.modal = Some(modal);

        app.on_mutation_finished(
            MutationRequest::Update {
                id: "1".to_string(),
                edits: GameDraft::from_game(&app.games[0]),
            },
            Err(GraphQlError::MissingData),
        );
        let modal = app.modal.as_ref().expect("modal stays open");
        assert!(!modal.submitting);
        assert_eq!(modal.error.as_deref(), Some("response contained no data"));
        // Non-GraphQL failures do not reach the alert surface.
        assert!(app.alerts.is_empty());
    }

    #[test]
    fn save_success_closes_modal_and_clears_banner() {
        let mut app = app_with_games(vec![sample_game()]);
        app.banner = Some("stale error".to_string());
        app.modal = Some(GameFormModal::open_add());
        app.on_mutation_finished(
            MutationRequest::Add {
                draft: GameDraft {
                    title: "Pong".to_string(),
                    platform: vec!["Arcade".to_string()],
                },
            },
            Ok(()),
        );
        assert!(app.modal.is_none());
        assert!(app.banner.is_none());
    }

    #[tokio::test]
    async fn save_success_starts_exactly_one_refetch() {
        let mut app = app_with_games(vec![sample_game()]);
        let (tx, _rx) = mpsc::channel(8);
        app.event_tx = Some(tx);
        app.modal = Some(GameFormModal::open_add());

        app.on_mutation_finished(
            MutationRequest::Add {
                draft: GameDraft {
                    title: "Pong".to_string(),
                    platform: vec!["Arcade".to_string()],
                },
            },
            Ok(()),
        );
        assert!(app.pending_fetch);
        assert!(app.modal.is_none());

        // Further refetch requests while one is in flight are no-ops.
        app.start_fetch();
        assert!(app.pending_fetch);
    }

    #[test]
    fn list_failure_replaces_view_with_error() {
        let mut app = app_with_games(Vec::new());
        app.on_games_loaded(Err(GraphQlError::Response {
            messages: vec!["boom".to_string()],
        }));
        assert_eq!(app.list, ListView::Failed("boom".to_string()));
        assert_eq!(app.alerts.len(), 1);
    }

    #[test]
    fn list_success_clamps_cursor() {
        let mut app = app_with_games(vec![sample_game(), sample_game(), sample_game()]);
        app.cursor = 2;
        app.on_games_loaded(Ok(vec![sample_game()]));
        assert_eq!(app.cursor, 0);
        assert_eq!(app.list, ListView::Ready);
    }

    #[test]
    fn detail_panel_data_survives_reviews() {
        let mut game = sample_game();
        game.reviews.push(Review {
            id: "r1".to_string(),
            rating: 9,
            author: gamedex_core::Author {
                id: "a1".to_string(),
                name: "mario".to_string(),
            },
        });
        let app = app_with_games(vec![game]);
        let selected = app.selected_game().expect("one game");
        assert_eq!(selected.average_rating(), Some(9.0));
    }
}

use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gametrack_core::{
    config::AppConfig,
    curation::{CurationStore, FileKeyValueStore},
    display::{format_date_added, plain_text, ColorHint, MediaGallery, ReleaseBadge, TagSummary},
    models::{CatalogItem, ReleaseStatus},
    pipeline::{
        build_view, CatalogQuery, CatalogView, MembershipFilter, PaginationWindow, SortOption,
        ViewState,
    },
    refresh::{Freshness, LoadOutcome, RefreshEvent, RefreshHandle},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_INPUT_LEN: usize = 120;
const DESCRIPTION_LIMIT: usize = 900;
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    accent_alt: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            accent_alt: Color::Blue,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

impl Theme {
    fn hint(&self, hint: ColorHint) -> Color {
        match hint {
            ColorHint::Green => self.success,
            ColorHint::Orange => self.warning,
            ColorHint::Blue => self.accent_alt,
            ColorHint::Gray => self.muted,
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    Search,
    IncludeTags,
    ExcludeTags,
    NewList,
}

impl PromptKind {
    fn title(self) -> &'static str {
        match self {
            Self::Search => "Search",
            Self::IncludeTags => "Require Tags",
            Self::ExcludeTags => "Exclude Tags",
            Self::NewList => "New List",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            Self::Search => "Comma-separated keywords; any match is kept",
            Self::IncludeTags => "Comma-separated tags that must all be present",
            Self::ExcludeTags => "Comma-separated tags that must not be present",
            Self::NewList => "Name of the new list",
        }
    }
}

struct TextPrompt {
    kind: PromptKind,
    input: Vec<char>,
    cursor: usize,
}

impl TextPrompt {
    fn new(kind: PromptKind, initial: &str) -> Self {
        let input: Vec<char> = initial.chars().collect();
        Self {
            kind,
            cursor: input.len(),
            input,
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.input.len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.input.len();
    }

    fn insert(&mut self, ch: char) {
        if self.input.len() >= MAX_INPUT_LEN || ch.is_control() {
            return;
        }
        self.input.insert(self.cursor, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.input.remove(self.cursor);
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.input.len() {
            self.input.remove(self.cursor);
        }
    }

    fn value(&self) -> String {
        self.input.iter().collect::<String>().trim().to_string()
    }
}

/// Interactive catalog browser.
pub struct GametrackApp {
    catalog: Vec<CatalogItem>,
    fetched_at: Option<DateTime<Utc>>,
    freshness: Option<Freshness>,
    warning: Option<String>,
    loading: bool,
    query: CatalogQuery,
    page_size: usize,
    window: PaginationWindow,
    view: CatalogView,
    curation: CurationStore<FileKeyValueStore>,
    active_list: Option<String>,
    refresh: RefreshHandle,
    refresh_rx: Option<mpsc::Receiver<RefreshEvent>>,
    prompt: Option<TextPrompt>,
    state: UiState,
    theme: Theme,
}

impl GametrackApp {
    pub fn new(
        config: &AppConfig,
        curation: CurationStore<FileKeyValueStore>,
        refresh: RefreshHandle,
    ) -> Self {
        let mut query = CatalogQuery {
            sort: Some(SortOption::default()),
            ..CatalogQuery::default()
        };
        query.criteria.show_adult = config.view.show_adult;
        let window = PaginationWindow::new(config.view.page_size);
        let view = build_view(&[], &query, &curation, &window);
        let active_list = curation.list_names().first().map(|name| name.to_string());

        Self {
            catalog: Vec::new(),
            fetched_at: None,
            freshness: None,
            warning: None,
            loading: false,
            query,
            page_size: config.view.page_size,
            window,
            view,
            curation,
            active_list,
            refresh,
            refresh_rx: None,
            prompt: None,
            state: UiState::default(),
            theme: Theme::default(),
        }
    }

    pub fn attach_refresh(&mut self, receiver: mpsc::Receiver<RefreshEvent>) {
        self.refresh_rx = Some(receiver);
    }

    pub async fn run(&mut self) -> Result<()> {
        self.request_refresh(false);

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        let mut refresh_rx = self.refresh_rx.take();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }

            if let Some(rx) = refresh_rx.as_mut() {
                let mut refresh_closed = false;
                tokio::select! {
                    maybe_event = event_rx.recv() => {
                        if !self.process_app_event(maybe_event) {
                            break;
                        }
                    }
                    maybe_refresh = rx.recv() => {
                        match maybe_refresh {
                            Some(event) => self.handle_refresh_event(event),
                            None => refresh_closed = true,
                        }
                    }
                }
                if refresh_closed {
                    error!("refresh worker stopped unexpectedly");
                    self.loading = false;
                    refresh_rx = None;
                }
            } else {
                let maybe_event = event_rx.recv().await;
                if !self.process_app_event(maybe_event) {
                    break;
                }
            }
        }

        restore_terminal(&mut terminal)?;
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) => {
                if self.prompt.is_some() {
                    self.handle_prompt_key(key);
                } else {
                    self.handle_browse_key(key);
                }
                true
            }
            Some(AppEvent::Input(_)) => true,
            Some(AppEvent::Tick) => {
                self.state.tick = self.state.tick.wrapping_add(1);
                true
            }
            None => false,
        }
    }

    fn request_refresh(&mut self, force: bool) {
        let accepted = if force {
            self.refresh.force()
        } else {
            self.refresh.request()
        };
        if accepted {
            self.loading = true;
            self.state.set_status(if force {
                "Fetching a fresh catalog...".to_string()
            } else {
                "Loading catalog...".to_string()
            });
        } else {
            warn!(force, "refresh request rejected");
            self.state
                .set_status("A refresh is already pending".to_string());
        }
    }

    fn handle_refresh_event(&mut self, event: RefreshEvent) {
        let RefreshEvent::Loaded { outcome, forced } = event;
        self.loading = false;
        self.warning = outcome.warning();
        let LoadOutcome {
            items,
            fetched_at,
            freshness,
            ..
        } = outcome;
        info!(items = items.len(), ?freshness, forced, "catalog received");

        let message = match freshness {
            Freshness::Fetched => format!("Fetched {} games", items.len()),
            Freshness::Cached => format!("Loaded {} games from cache", items.len()),
            Freshness::Stale => format!("Refresh failed; showing {} cached games", items.len()),
            Freshness::Unavailable => "No catalog available".to_string(),
        };
        self.catalog = items;
        self.fetched_at = fetched_at;
        self.freshness = Some(freshness);
        self.state.set_status(message);
        self.rebuild_view();
    }

    /// Re-run the pipeline keeping the current pagination window.
    fn rebuild_view(&mut self) {
        self.view = build_view(&self.catalog, &self.query, &self.curation, &self.window);
        self.state.clamp(self.view.items.len());
    }

    /// Re-run the pipeline from the first page after the selection changed.
    fn reset_view(&mut self) {
        self.window = PaginationWindow::new(self.page_size);
        self.state.cursor = 0;
        self.state.offset = 0;
        self.rebuild_view();
    }

    fn current_item(&self) -> Option<&CatalogItem> {
        self.view.items.get(self.state.cursor)
    }

    fn handle_browse_key(&mut self, key: KeyEvent) {
        let len = self.view.items.len();
        match key.code {
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.request_refresh(true)
            }
            KeyCode::Char('q') if key.modifiers.is_empty() => self.state.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.move_cursor(1, len),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_cursor(-1, len),
            KeyCode::Char('g') | KeyCode::Home => self.state.move_to(0, len),
            KeyCode::Char('G') | KeyCode::End => self.state.move_to(usize::MAX, len),
            KeyCode::PageDown => self.state.page_down(len),
            KeyCode::PageUp => self.state.page_up(len),
            KeyCode::Char('/') => self.open_prompt(PromptKind::Search),
            KeyCode::Char('t') => self.open_prompt(PromptKind::IncludeTags),
            KeyCode::Char('T') => self.open_prompt(PromptKind::ExcludeTags),
            KeyCode::Char('n') => self.open_prompt(PromptKind::NewList),
            KeyCode::Char('s') => {
                let next = self.query.sort.unwrap_or_default().next();
                self.query.sort = Some(next);
                self.state.set_status(format!("Sort: {}", next.label()));
                self.reset_view();
            }
            KeyCode::Char('d') => {
                self.query.criteria.demo_only = !self.query.criteria.demo_only;
                self.state.set_status(if self.query.criteria.demo_only {
                    "Showing games with demos only".to_string()
                } else {
                    "Demo filter cleared".to_string()
                });
                self.reset_view();
            }
            KeyCode::Char('r') => {
                let next = next_status(self.query.criteria.release_status);
                self.query.criteria.release_status = next;
                self.state.set_status(format!(
                    "Release status: {}",
                    next.map(ReleaseStatus::label).unwrap_or("All")
                ));
                self.reset_view();
            }
            KeyCode::Char('a') => {
                self.query.criteria.show_adult = !self.query.criteria.show_adult;
                self.state.set_status(if self.query.criteria.show_adult {
                    "Adult content shown".to_string()
                } else {
                    "Adult content hidden".to_string()
                });
                self.reset_view();
            }
            KeyCode::Char('v') => self.cycle_membership(),
            KeyCode::Char('f') => self.toggle_favorite(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.add_to_active_list(),
            KeyCode::Char('-') => self.remove_from_active_list(),
            KeyCode::Char('X') => self.delete_active_list(),
            KeyCode::Char('m') => {
                if self.view.has_more {
                    self.window.reveal_more();
                    self.rebuild_view();
                    self.state.set_status(format!(
                        "Showing {} of {}",
                        self.view.visible(),
                        self.view.stats.filtered
                    ));
                } else {
                    self.state.set_status("All results shown".to_string());
                }
            }
            KeyCode::Char('c') => {
                let show_adult = self.query.criteria.show_adult;
                self.query.criteria = Default::default();
                self.query.criteria.show_adult = show_adult;
                self.state.set_status("Filters cleared".to_string());
                self.reset_view();
            }
            _ => {}
        }
    }

    fn open_prompt(&mut self, kind: PromptKind) {
        let criteria = &self.query.criteria;
        let initial = match kind {
            PromptKind::Search => criteria.keywords.clone(),
            PromptKind::IncludeTags => criteria.include_tags.join(", "),
            PromptKind::ExcludeTags => criteria.exclude_tags.join(", "),
            PromptKind::NewList => String::new(),
        };
        self.prompt = Some(TextPrompt::new(kind, &initial));
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.prompt = None;
                self.state.set_status("Cancelled".to_string());
            }
            KeyCode::Enter => {
                let kind = prompt.kind;
                let value = prompt.value();
                self.prompt = None;
                self.submit_prompt(kind, value);
            }
            KeyCode::Left => prompt.move_cursor(-1),
            KeyCode::Right => prompt.move_cursor(1),
            KeyCode::Home => prompt.move_home(),
            KeyCode::End => prompt.move_end(),
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Delete => prompt.delete(),
            KeyCode::Char(ch) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    prompt.insert(ch);
                }
            }
            _ => {}
        }
    }

    fn submit_prompt(&mut self, kind: PromptKind, value: String) {
        match kind {
            PromptKind::Search => {
                self.state.set_status(if value.is_empty() {
                    "Search cleared".to_string()
                } else {
                    format!("Search: {value}")
                });
                self.query.criteria.keywords = value;
                self.reset_view();
            }
            PromptKind::IncludeTags => {
                self.query.criteria.include_tags = split_tags(&value);
                self.state.set_status(format!("Requiring {} tag(s)", self.query.criteria.include_tags.len()));
                self.reset_view();
            }
            PromptKind::ExcludeTags => {
                self.query.criteria.exclude_tags = split_tags(&value);
                self.state.set_status(format!("Excluding {} tag(s)", self.query.criteria.exclude_tags.len()));
                self.reset_view();
            }
            PromptKind::NewList => match self.curation.create_list(&value) {
                Ok(()) => {
                    let name = value.trim().to_string();
                    self.state
                        .set_status(format!("Created list '{name}'; press + to add games"));
                    self.active_list = Some(name);
                }
                Err(err) => self.state.set_status(format!("Could not create list: {err}")),
            },
        }
    }

    fn cycle_membership(&mut self) {
        let next = next_membership(&self.query.criteria.membership, &self.curation.list_names());
        let label = membership_label(&next);
        if let MembershipFilter::List(name) = &next {
            self.active_list = Some(name.clone());
        }
        self.query.criteria.membership = next;
        self.state.set_status(format!("View: {label}"));
        self.reset_view();
    }

    fn toggle_favorite(&mut self) {
        let Some(item) = self.current_item() else {
            return;
        };
        let (key, name) = (item.key.clone(), item.name.clone());
        let message = if self.curation.toggle_favorite(&key, &name) {
            format!("Added {name} to favorites")
        } else {
            format!("Removed {name} from favorites")
        };
        self.state.set_status(message);
        self.rebuild_view();
    }

    fn add_to_active_list(&mut self) {
        let (Some(list), Some(item)) = (self.active_list.clone(), self.current_item()) else {
            self.state
                .set_status("Create a list with n or select one with v first".to_string());
            return;
        };
        let (key, name) = (item.key.clone(), item.name.clone());
        let message = match self.curation.add_to_list(&list, &key, &name) {
            Ok(true) => format!("Added {name} to '{list}'"),
            Ok(false) => format!("{name} is already in '{list}'"),
            Err(err) => err.to_string(),
        };
        self.state.set_status(message);
        self.rebuild_view();
    }

    fn remove_from_active_list(&mut self) {
        let (Some(list), Some(item)) = (self.active_list.clone(), self.current_item()) else {
            return;
        };
        let (key, name) = (item.key.clone(), item.name.clone());
        let message = match self.curation.remove_from_list(&list, &key) {
            Ok(true) => format!("Removed {name} from '{list}'"),
            Ok(false) => format!("{name} is not in '{list}'"),
            Err(err) => err.to_string(),
        };
        self.state.set_status(message);
        self.rebuild_view();
    }

    fn delete_active_list(&mut self) {
        let MembershipFilter::List(list) = self.query.criteria.membership.clone() else {
            self.state
                .set_status("Switch to a list view with v to delete it".to_string());
            return;
        };
        match self.curation.delete_list(&list) {
            Ok(()) => {
                if self.active_list.as_deref() == Some(list.as_str()) {
                    self.active_list = None;
                }
                self.query.criteria.membership = MembershipFilter::All;
                self.state.set_status(format!("Deleted list '{list}'"));
                self.reset_view();
            }
            Err(err) => self.state.set_status(err.to_string()),
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(5),
            ])
            .split(size);

        let body_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(42), Constraint::Percentage(58)])
            .split(chunks[1]);

        self.render_filters(frame, chunks[0]);
        self.render_game_list(frame, body_chunks[0]);
        self.render_game_info(frame, body_chunks[1]);
        self.render_status(frame, chunks[2]);
        if let Some(prompt) = &self.prompt {
            self.render_prompt(frame, prompt);
        }
    }

    fn render_filters(&self, frame: &mut Frame, area: Rect) {
        let criteria = &self.query.criteria;
        let label = |text: &str| Span::styled(format!("{text}: "), Style::default().fg(self.theme.muted));
        let mut spans = vec![
            label("Sort"),
            Span::raw(self.query.sort.map(SortOption::label).unwrap_or("None")),
            Span::raw("  "),
            label("View"),
            Span::raw(membership_label(&criteria.membership)),
            Span::raw("  "),
            label("Status"),
            Span::raw(criteria.release_status.map(ReleaseStatus::label).unwrap_or("All")),
        ];
        if criteria.demo_only {
            spans.push(Span::styled("  demo only", Style::default().fg(self.theme.success)));
        }
        if criteria.show_adult {
            spans.push(Span::styled("  adult shown", Style::default().fg(self.theme.danger)));
        }
        if !criteria.keywords.is_empty() {
            spans.push(Span::raw("  "));
            spans.push(label("Search"));
            spans.push(Span::raw(criteria.keywords.clone()));
        }
        if !criteria.include_tags.is_empty() {
            spans.push(Span::styled(
                format!("  +{}", criteria.include_tags.join(" +")),
                Style::default().fg(self.theme.success),
            ));
        }
        if !criteria.exclude_tags.is_empty() {
            spans.push(Span::styled(
                format!("  -{}", criteria.exclude_tags.join(" -")),
                Style::default().fg(self.theme.danger),
            ));
        }
        if let Some(list) = &self.active_list {
            spans.push(Span::raw("  "));
            spans.push(label("List"));
            spans.push(Span::styled(list.clone(), Style::default().fg(self.theme.accent)));
        }

        let paragraph = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title("Filters"));
        frame.render_widget(paragraph, area);
    }

    fn render_game_list(&mut self, frame: &mut Frame, area: Rect) {
        let title = format!(
            "Games ({} of {})",
            self.view.visible(),
            self.view.stats.filtered
        );
        let block = Block::default().borders(Borders::ALL).title(title);

        if self.view.items.is_empty() {
            let message = if self.loading {
                "Loading catalog..."
            } else {
                match self.view.state {
                    ViewState::NoData => "No data available.",
                    _ => "No games match the current filters.",
                }
            };
            let paragraph = Paragraph::new(Span::styled(message, Style::default().fg(self.theme.muted)))
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        }

        let len = self.view.items.len();
        self.state.list_height = area.height.saturating_sub(2) as usize;
        self.state.clamp(len);
        self.state.ensure_cursor_visible(len);

        let height = self.state.list_height;
        let end = (self.state.offset + height).min(len);
        let mut list_state = ListState::default();
        list_state.select(Some(self.state.cursor.saturating_sub(self.state.offset)));

        let items: Vec<ListItem> = self.view.items[self.state.offset..end]
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let is_selected = self.state.cursor == self.state.offset + idx;
                let marker = if is_selected {
                    Span::styled(
                        "▶ ",
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw("  ")
                };
                let star = if self.curation.is_favorite(&item.key) {
                    Span::styled("★ ", Style::default().fg(self.theme.warning))
                } else {
                    Span::raw("  ")
                };
                let badge = ReleaseBadge::for_item(item);
                let line = vec![
                    marker,
                    star,
                    Span::raw(format!("{} ", badge.emoji)),
                    Span::styled(
                        item.name.clone(),
                        Style::default()
                            .fg(self.theme.primary_fg)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!(" · {}", badge.date_text),
                        Style::default().fg(self.theme.muted),
                    ),
                ];
                ListItem::new(Line::from(line))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_game_info(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Game Details");
        let Some(item) = self.current_item() else {
            let paragraph = Paragraph::new("No game selected").block(block);
            frame.render_widget(paragraph, area);
            return;
        };

        let muted = Style::default().fg(self.theme.muted);
        let badge = ReleaseBadge::for_item(item);
        let mut lines = vec![
            Line::from(Span::styled(
                item.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::styled(
                    badge.badge_text.clone(),
                    Style::default().fg(self.theme.hint(badge.color_hint)),
                ),
                Span::raw(format!(" · {}", badge.date_text)),
            ]),
            Line::from(Span::styled(
                format!("📅 Added: {}", format_date_added(item.date_added)),
                muted,
            )),
        ];

        let mut flags = Vec::new();
        if item.has_demo() {
            flags.push(Span::styled("🎮 Demo available  ", Style::default().fg(self.theme.success)));
        }
        if self.curation.is_favorite(&item.key) {
            flags.push(Span::styled("★ Favorite  ", Style::default().fg(self.theme.warning)));
        }
        let lists: Vec<&str> = self
            .curation
            .list_names()
            .into_iter()
            .filter(|list| self.curation.is_in_list(list, &item.key))
            .collect();
        if !lists.is_empty() {
            flags.push(Span::styled(
                format!("Lists: {}", lists.join(", ")),
                Style::default().fg(self.theme.accent),
            ));
        }
        if !flags.is_empty() {
            lines.push(Line::from(flags));
        }

        for (label, value) in [
            ("Developers", &item.developers),
            ("Publishers", &item.publishers),
            ("Genres", &item.genres),
        ] {
            if let Some(value) = value.as_deref().filter(|value| !value.trim().is_empty()) {
                lines.push(Line::from(vec![
                    Span::styled(format!("{label}: "), muted),
                    Span::raw(value.to_string()),
                ]));
            }
        }

        match TagSummary::for_item(item) {
            Some(summary) => {
                let mut spans = vec![Span::raw("🎯 ")];
                for (index, chip) in summary.chips.iter().enumerate() {
                    if index > 0 {
                        spans.push(Span::styled(" • ", muted));
                    }
                    let style = if chip.popular {
                        Style::default().add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    };
                    spans.push(Span::styled(chip.name.clone(), style));
                }
                if summary.remaining > 0 {
                    spans.push(Span::styled(format!(" (+{} more)", summary.remaining), muted));
                }
                lines.push(Line::from(spans));
            }
            None => lines.push(Line::from(Span::styled("No community tags available.", muted))),
        }

        lines.push(Line::from(""));
        match item.primary_description().map(plain_text) {
            Some(text) => {
                let truncated = text.chars().count() > DESCRIPTION_LIMIT;
                let mut text: String = text.chars().take(DESCRIPTION_LIMIT).collect();
                if truncated {
                    text.push('…');
                }
                lines.extend(text.lines().map(|line| Line::from(line.to_string())));
            }
            None => lines.push(Line::from(Span::styled("No description available.", muted))),
        }

        let gallery = MediaGallery::for_item(item);
        if !gallery.is_empty() {
            lines.push(Line::from(""));
            if let Some(url) = gallery.movies.first().and_then(|movie| movie.url()) {
                lines.push(Line::from(format!(
                    "🎬 {} trailer(s), first: {url}",
                    gallery.movies.len()
                )));
            }
            if let Some(url) = gallery.screenshots.first().and_then(|shot| shot.url()) {
                lines.push(Line::from(format!(
                    "🖼 {} screenshot(s), first: {url}",
                    gallery.screenshots.len()
                )));
            }
        }
        if let Some(url) = &item.url {
            lines.push(Line::from(vec![Span::styled("Store: ", muted), Span::raw(url.clone())]));
        }

        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let mut primary = self.state.status.clone();
        if self.loading {
            primary = format!("{} {primary}", SPINNER[self.state.tick % SPINNER.len()]);
        }

        let secondary = match (&self.warning, self.freshness, self.fetched_at) {
            (Some(warning), _, _) => {
                Line::from(Span::styled(warning.clone(), Style::default().fg(self.theme.warning)))
            }
            (None, Some(freshness), Some(at)) => Line::from(Span::styled(
                format!(
                    "Catalog from {} ({})",
                    at.format("%Y-%m-%d %H:%M UTC"),
                    freshness_label(freshness)
                ),
                Style::default().fg(self.theme.muted),
            )),
            _ => Line::from(""),
        };

        let stats = &self.view.stats;
        let mut counts = format!(
            "Showing {} of {} • {} in catalog • {} with demo",
            self.view.visible(),
            stats.filtered,
            stats.total,
            stats.with_demo
        );
        if stats.hidden_adult > 0 {
            counts.push_str(&format!(" • {} adult hidden", stats.hidden_adult));
        }
        if self.view.has_more {
            counts.push_str(" • m: load more");
        }

        let paragraph = Paragraph::new(vec![Line::from(primary), secondary, Line::from(counts)])
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_prompt(&self, frame: &mut Frame, prompt: &TextPrompt) {
        let frame_area = frame.size();
        let width = 64_u16.min(frame_area.width.saturating_sub(4)).max(24);
        let height = 7_u16.min(frame_area.height.saturating_sub(2)).max(5);
        let x = frame_area.x + frame_area.width.saturating_sub(width) / 2;
        let y = frame_area.y + frame_area.height.saturating_sub(height) / 2;
        let area = Rect::new(x, y, width, height);

        frame.render_widget(Clear, area);

        let input: String = prompt.input.iter().collect();
        let input_line = Line::from(vec![
            Span::styled("> ", Style::default().fg(self.theme.accent)),
            Span::raw(input),
        ]);
        let helper = Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" apply  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ]);

        let paragraph = Paragraph::new(vec![
            Line::from(prompt.kind.instruction()),
            input_line,
            Line::from(""),
            helper,
        ])
        .block(Block::default().borders(Borders::ALL).title(prompt.kind.title()))
        .wrap(Wrap { trim: true });

        frame.render_widget(paragraph, area);

        let cursor_x = (area.x + 3 + prompt.cursor as u16).min(area.x + area.width.saturating_sub(2));
        frame.set_cursor(cursor_x, area.y + 2);
    }
}

fn freshness_label(freshness: Freshness) -> &'static str {
    match freshness {
        Freshness::Fetched => "fresh",
        Freshness::Cached => "cached",
        Freshness::Stale => "stale",
        Freshness::Unavailable => "unavailable",
    }
}

fn membership_label(membership: &MembershipFilter) -> String {
    match membership {
        MembershipFilter::All => "All games".to_string(),
        MembershipFilter::Favorites => "Favorites".to_string(),
        MembershipFilter::List(name) => format!("List '{name}'"),
    }
}

/// All, then favorites, then each list in order, then back to all.
fn next_membership(current: &MembershipFilter, lists: &[&str]) -> MembershipFilter {
    let list_at = |index: usize| {
        lists
            .get(index)
            .map(|name| MembershipFilter::List(name.to_string()))
            .unwrap_or(MembershipFilter::All)
    };
    match current {
        MembershipFilter::All => MembershipFilter::Favorites,
        MembershipFilter::Favorites => list_at(0),
        MembershipFilter::List(name) => match lists.iter().position(|list| *list == name.as_str()) {
            Some(index) => list_at(index + 1),
            None => MembershipFilter::All,
        },
    }
}

fn next_status(current: Option<ReleaseStatus>) -> Option<ReleaseStatus> {
    match current {
        None => Some(ReleaseStatus::ALL[0]),
        Some(status) => ReleaseStatus::ALL
            .iter()
            .position(|candidate| *candidate == status)
            .and_then(|index| ReleaseStatus::ALL.get(index + 1))
            .copied(),
    }
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
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

struct UiState {
    cursor: usize,
    offset: usize,
    list_height: usize,
    status: String,
    tick: usize,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            cursor: 0,
            offset: 0,
            list_height: 1,
            status: "Ready".to_string(),
            tick: 0,
            should_quit: false,
        }
    }
}

impl UiState {
    fn move_cursor(&mut self, delta: isize, len: usize) {
        if len == 0 {
            return;
        }
        let idx = (self.cursor as isize + delta).clamp(0, len as isize - 1);
        self.cursor = idx as usize;
        self.ensure_cursor_visible(len);
    }

    fn move_to(&mut self, index: usize, len: usize) {
        if len == 0 {
            return;
        }
        self.cursor = index.min(len - 1);
        self.ensure_cursor_visible(len);
    }

    fn page_down(&mut self, len: usize) {
        let delta = self.list_height.min(len);
        self.move_cursor(delta as isize, len);
    }

    fn page_up(&mut self, len: usize) {
        let delta = self.list_height.min(len);
        self.move_cursor(-(delta as isize), len);
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.cursor = 0;
            self.offset = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }

    fn ensure_cursor_visible(&mut self, len: usize) {
        if len == 0 || self.list_height == 0 {
            self.offset = 0;
            return;
        }
        let height = self.list_height;
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }
        self.offset = self.offset.min(len.saturating_sub(height));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_cycles_through_lists() {
        let lists = ["Backlog", "Co-op"];
        let mut current = MembershipFilter::All;
        let mut seen = Vec::new();
        for _ in 0..4 {
            current = next_membership(&current, &lists);
            seen.push(membership_label(&current));
        }
        assert_eq!(
            seen,
            vec!["Favorites", "List 'Backlog'", "List 'Co-op'", "All games"]
        );
        assert_eq!(
            next_membership(&MembershipFilter::Favorites, &[]),
            MembershipFilter::All
        );
    }

    #[test]
    fn status_filter_cycles_back_to_all() {
        let mut current = None;
        let mut steps = 0;
        loop {
            current = next_status(current);
            steps += 1;
            if current.is_none() {
                break;
            }
        }
        assert_eq!(steps, ReleaseStatus::ALL.len() + 1);
    }

    #[test]
    fn prompt_edits_at_cursor() {
        let mut prompt = TextPrompt::new(PromptKind::Search, "rpg");
        prompt.move_home();
        prompt.insert('é');
        prompt.move_end();
        prompt.backspace();
        prompt.move_cursor(-10);
        prompt.delete();
        assert_eq!(prompt.value(), "rp");
        assert_eq!(split_tags(" RPG, ,Horror "), vec!["RPG", "Horror"]);
    }

    #[test]
    fn cursor_stays_in_view() {
        let mut state = UiState {
            list_height: 5,
            ..UiState::default()
        };
        state.move_to(usize::MAX, 12);
        assert_eq!(state.cursor, 11);
        assert_eq!(state.offset, 7);
        state.page_up(12);
        assert_eq!(state.cursor, 6);
        assert_eq!(state.offset, 6);
        state.clamp(3);
        assert_eq!(state.cursor, 2);
    }
}

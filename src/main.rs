pub mod ui;

use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    sync::{mpsc::Sender, Arc},
    thread,
    time::{Duration, Instant},
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use rand::{rngs::StdRng, SeedableRng};
use ratatui::{
    backend::{Backend as TerminalBackend, CrosstermBackend},
    Frame, Terminal,
};

use seekr::{
    api::{Backend, CollageProvider, HttpBackend, ScoreSink},
    app_dirs::AppDirs,
    collage::{CollageRecord, GalleryItem},
    config::{Config, ConfigStore, FileConfigStore},
    error::ApiError,
    game::{ClickOutcome, FetchRequest, GameConfig, GameSession, ScoreSubmission, Ticket},
    geometry::Surface,
    leaderboard::LeaderboardEntry,
    local_store::{LeaderboardDb, LocalBackend},
    logging,
    placement,
    runtime::{CrosstermEventSource, FixedTicker, GameEvent, Runner},
};

use crate::ui::screen::current_screen;

const TICK_RATE_MS: u64 = 50;

/// find the target photo in a collage, against the clock
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Find the target photo hidden in a collage as fast as you can. Hints point the way at a time penalty, and finished times go to the collage's leaderboard."
)]
pub struct Cli {
    /// collage to open; without one the gallery picker is shown
    collage_id: Option<String>,

    /// base url of the collage server
    #[clap(short = 's', long, value_name = "URL")]
    server: Option<String>,

    /// play bundled and local collages, keeping scores in a local database
    #[clap(long)]
    offline: bool,

    /// directory of <id>.json collages for offline play
    #[clap(long, value_name = "DIR")]
    collages_dir: Option<PathBuf>,

    /// name offered when submitting a score
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// print the collage gallery and exit
    #[clap(short = 'l', long)]
    list: bool,
}

impl Cli {
    /// Command line flags win over the stored config for this run.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(server) = &self.server {
            config.server_url = server.clone();
        }
        if self.offline {
            config.offline = true;
        }
        if let Some(dir) = &self.collages_dir {
            config.collages_dir = Some(dir.clone());
        }
        if let Some(name) = &self.name {
            config.player_name = name.clone();
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Playing,
    Gallery,
}

/// Background work requested by the app, run off the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Fetch(FetchRequest),
    Submit(ScoreSubmission),
    Gallery,
}

#[derive(Debug, Default)]
pub struct GalleryState {
    pub items: Vec<GalleryItem>,
    pub selected: usize,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct App {
    pub session: GameSession,
    pub state: AppState,
    pub gallery: GalleryState,
    /// Keyboard cursor, in terminal cells.
    pub cursor: Option<(u16, u16)>,
    pub surface: Option<Surface>,
    pub show_result: bool,
    /// Where collages come from, for display.
    pub source: String,
    pub should_quit: bool,
    warned_small: bool,
    rng: StdRng,
}

impl App {
    pub fn new(session: GameSession, source: impl Into<String>) -> Self {
        Self {
            session,
            state: AppState::Playing,
            gallery: GalleryState::default(),
            cursor: None,
            surface: None,
            show_result: false,
            source: source.into(),
            should_quit: false,
            warned_small: false,
            rng: StdRng::from_entropy(),
        }
    }

    /// First screen: the given collage, or the gallery picker.
    pub fn open(&mut self, collage_id: Option<String>) -> Vec<Job> {
        match collage_id {
            Some(id) => vec![Job::Fetch(self.session.request_collage(id))],
            None => self.open_gallery(),
        }
    }

    pub fn set_surface(&mut self, surface: Option<Surface>) {
        match surface {
            Some(s) => {
                self.session.set_surface_size(s.size());
                self.cursor = self.cursor.map(|(col, row)| {
                    (
                        col.clamp(s.left, s.left + s.cols - 1),
                        row.clamp(s.top, s.top + s.rows - 1),
                    )
                });
                self.warned_small = false;
            }
            None => {
                if !self.warned_small {
                    tracing::warn!("terminal too small for the collage, input disabled");
                    self.warned_small = true;
                }
            }
        }
        self.surface = surface;
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Instant) -> Vec<Job> {
        if key.kind == KeyEventKind::Release {
            return Vec::new();
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Vec::new();
        }
        if self.session.name_prompt().is_some() {
            return self.on_prompt_key(key, now);
        }
        match self.state {
            AppState::Gallery => self.on_gallery_key(key),
            AppState::Playing => self.on_play_key(key, now),
        }
    }

    fn on_prompt_key(&mut self, key: KeyEvent, now: Instant) -> Vec<Job> {
        match key.code {
            KeyCode::Enter => {
                if let Some(submission) = self.session.confirm_name(now) {
                    return vec![Job::Submit(submission)];
                }
            }
            KeyCode::Esc => self.session.cancel_name(now),
            KeyCode::Backspace => {
                if let Some(prompt) = self.session.name_prompt_mut() {
                    prompt.backspace();
                }
            }
            KeyCode::Char(c) => {
                if let Some(prompt) = self.session.name_prompt_mut() {
                    prompt.push(c);
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn on_play_key(&mut self, key: KeyEvent, now: Instant) -> Vec<Job> {
        let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
            4
        } else {
            1
        };
        let playable = self.surface.is_some();

        match key.code {
            KeyCode::Esc => {
                if self.show_result {
                    self.show_result = false;
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Char('g') => return self.open_gallery(),
            KeyCode::Char('s') if playable => match self.session.request_start(now) {
                Ok(request) => {
                    self.show_result = false;
                    return vec![Job::Fetch(request)];
                }
                Err(err) => tracing::debug!(%err, "start rejected"),
            },
            KeyCode::Char('h') if playable => {
                if let Err(err) = self.session.use_hint(now) {
                    tracing::debug!(%err, "hint rejected");
                }
            }
            KeyCode::Up => self.move_cursor(0, -step),
            KeyCode::Down => self.move_cursor(0, step),
            KeyCode::Left => self.move_cursor(-step, 0),
            KeyCode::Right => self.move_cursor(step, 0),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some((col, row)) = self.cursor {
                    self.click_cell(col, row, now);
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn on_gallery_key(&mut self, key: KeyEvent) -> Vec<Job> {
        let count = self.gallery.items.len();
        match key.code {
            KeyCode::Up => self.gallery.selected = self.gallery.selected.saturating_sub(1),
            KeyCode::Down => {
                if self.gallery.selected + 1 < count {
                    self.gallery.selected += 1;
                }
            }
            KeyCode::Char('r') => return self.open_gallery(),
            KeyCode::Enter => {
                if let Some(item) = self.gallery.items.get(self.gallery.selected) {
                    let id = item.id.clone();
                    self.state = AppState::Playing;
                    self.show_result = false;
                    return vec![Job::Fetch(self.session.request_collage(id))];
                }
            }
            KeyCode::Esc => {
                if self.session.collage_id().is_some() {
                    self.state = AppState::Playing;
                } else {
                    self.should_quit = true;
                }
            }
            _ => {}
        }
        Vec::new()
    }

    pub fn on_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        if self.state != AppState::Playing || self.session.name_prompt().is_some() {
            return;
        }
        if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
            self.click_cell(mouse.column, mouse.row, now);
        }
    }

    pub fn on_tick(&mut self, now: Instant) {
        for event in self.session.tick(now) {
            tracing::trace!(?event, "session event");
        }
    }

    pub fn on_collage_fetched(
        &mut self,
        ticket: Ticket,
        result: Result<CollageRecord, ApiError>,
        now: Instant,
    ) {
        match result {
            Ok(record) => {
                // rejected rounds are reported through the session status
                let _ = self
                    .session
                    .on_collage_fetched(ticket, record, &mut self.rng, now);
            }
            Err(err) => {
                if self.session.on_fetch_failed(ticket, now) {
                    tracing::warn!(%err, "collage fetch failed");
                }
            }
        }
    }

    pub fn on_score_submitted(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<LeaderboardEntry>, ApiError>,
        now: Instant,
    ) {
        match result {
            Ok(board) => {
                let rank = self.session.on_score_submitted(ticket, board, now);
                tracing::info!(?rank, "score recorded");
            }
            Err(err) => {
                if self.session.on_score_failed(ticket, now) {
                    tracing::warn!(%err, "score submission failed");
                }
            }
        }
    }

    pub fn on_gallery(&mut self, result: Result<Vec<GalleryItem>, ApiError>) {
        self.gallery.loading = false;
        match result {
            Ok(items) => {
                self.gallery.selected = self.gallery.selected.min(items.len().saturating_sub(1));
                self.gallery.items = items;
                self.gallery.error = None;
            }
            Err(err) => {
                tracing::warn!(%err, "gallery unavailable");
                self.gallery.error = Some(err.to_string());
            }
        }
    }

    fn open_gallery(&mut self) -> Vec<Job> {
        self.state = AppState::Gallery;
        self.gallery.loading = true;
        self.gallery.error = None;
        vec![Job::Gallery]
    }

    fn move_cursor(&mut self, dx: i32, dy: i32) {
        let Some(s) = self.surface else {
            return;
        };
        let (col, row) = self
            .cursor
            .unwrap_or((s.left + s.cols / 2, s.top + s.rows / 2));
        let col = (col as i32 + dx).clamp(s.left as i32, (s.left + s.cols - 1) as i32);
        let row = (row as i32 + dy).clamp(s.top as i32, (s.top + s.rows - 1) as i32);
        self.cursor = Some((col as u16, row as u16));
    }

    /// Picks whatever is drawn in the cell, so photos shrunk below one cell
    /// stay clickable.
    fn click_cell(&mut self, col: u16, row: u16, now: Instant) {
        let Some(surface) = self.surface else {
            return;
        };
        let Some(centre) = surface.cell_to_local(col, row) else {
            return;
        };
        self.cursor = Some((col, row));
        let Some(owner) = placement::cell_owner(self.session.placements(), &surface, col, row) else {
            return;
        };
        let picked = &self.session.placements()[owner];
        let rect = picked.on_surface(surface.size());
        let point = if rect.contains_rotated(centre, picked.rotation_degrees) {
            centre
        } else {
            rect.center()
        };
        if let ClickOutcome::Found { time } = self.session.click_placement(owner, point, now) {
            tracing::info!(time, hints = self.session.max_hints() - self.session.hints_remaining(), "target found");
            self.show_result = true;
        }
    }
}

fn build_backend(config: &Config) -> Result<Arc<dyn Backend>, Box<dyn Error>> {
    if config.offline {
        let db_path = AppDirs::leaderboard_db_path()
            .unwrap_or_else(|| PathBuf::from("seekr_leaderboard.db"));
        let db = LeaderboardDb::open(&db_path)?;
        tracing::info!(db = %db_path.display(), "offline mode");
        Ok(Arc::new(LocalBackend::new(config.collages_dir.clone(), db)))
    } else {
        let backend = HttpBackend::new(&config.server_url, config.request_timeout())?;
        tracing::info!(server = %backend.base_url(), "online mode");
        Ok(Arc::new(backend))
    }
}

fn source_label(config: &Config) -> String {
    if config.offline {
        "offline".to_string()
    } else {
        config.server_url.clone()
    }
}

fn print_gallery(backend: &dyn Backend) -> Result<(), Box<dyn Error>> {
    for item in backend.gallery()? {
        println!("{}\t{}", item.id, ui::gallery::format_updated(item.updated_at));
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(path) = AppDirs::log_path() {
        if let Err(err) = logging::init(&path) {
            eprintln!("seekr: logging disabled: {err}");
        }
    }

    let store = FileConfigStore::new();
    let mut config = cli.apply(store.load());
    tracing::debug!(path = %store.path().display(), offline = config.offline, "config loaded");
    let backend = build_backend(&config)?;

    if cli.list {
        return print_gallery(backend.as_ref());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend_term = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend_term)?;

    let session =
        GameSession::new(GameConfig::default()).with_player_name(config.player_name.clone());
    let mut app = App::new(session, source_label(&config));
    let result = start_tui(
        &mut terminal,
        &mut app,
        backend,
        &store,
        &mut config,
        cli.collage_id,
    );

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: TerminalBackend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    backend: Arc<dyn Backend>,
    store: &dyn ConfigStore,
    config: &mut Config,
    collage_id: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let tx = runner.sender();

    let jobs = app.open(collage_id);
    dispatch(jobs, &backend, &tx, store, config);

    loop {
        terminal.draw(|f| ui(app, f))?;
        if app.should_quit {
            break;
        }

        let event = runner.step();
        let now = Instant::now();
        let jobs = match event {
            GameEvent::Key(key) => app.on_key(key, now),
            GameEvent::Mouse(mouse) => {
                app.on_mouse(mouse, now);
                Vec::new()
            }
            GameEvent::Resize | GameEvent::Tick => Vec::new(),
            GameEvent::CollageFetched { ticket, result } => {
                app.on_collage_fetched(ticket, result, now);
                Vec::new()
            }
            GameEvent::ScoreSubmitted { ticket, result } => {
                app.on_score_submitted(ticket, result, now);
                Vec::new()
            }
            GameEvent::Gallery(result) => {
                app.on_gallery(result);
                Vec::new()
            }
        };
        // mouse motion can keep the channel busy, so timers run after every event
        app.on_tick(now);
        dispatch(jobs, &backend, &tx, store, config);
    }

    Ok(())
}

fn dispatch(
    jobs: Vec<Job>,
    backend: &Arc<dyn Backend>,
    tx: &Sender<GameEvent>,
    store: &dyn ConfigStore,
    config: &mut Config,
) {
    for job in jobs {
        if let Job::Submit(submission) = &job {
            if config.player_name != submission.name {
                config.player_name = submission.name.clone();
                if let Err(err) = store.save(config) {
                    tracing::warn!(%err, "could not save player name");
                }
            }
        }
        spawn_job(Arc::clone(backend), tx.clone(), job);
    }
}

fn spawn_job(backend: Arc<dyn Backend>, tx: Sender<GameEvent>, job: Job) {
    thread::spawn(move || {
        let event = match job {
            Job::Fetch(request) => GameEvent::CollageFetched {
                ticket: request.ticket,
                result: backend.fetch(&request.collage_id),
            },
            Job::Submit(submission) => GameEvent::ScoreSubmitted {
                ticket: submission.ticket,
                result: backend.submit(&submission.collage_id, submission.time, &submission.name),
            },
            Job::Gallery => GameEvent::Gallery(backend.gallery()),
        };
        // a closed channel means the app already quit
        let _ = tx.send(event);
    });
}

fn ui(app: &mut App, f: &mut Frame) {
    current_screen(&app.state).render(app, f);
}

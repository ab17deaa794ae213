use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};

use gridline_terminal::config::{self, AppConfig};
use gridline_terminal::dataset;
use gridline_terminal::export;
use gridline_terminal::features::FeatureRow;
use gridline_terminal::predict::{GamePrediction, ModelSet};

const EXPORT_FILE: &str = "gridline_predictions.xlsx";
const STATUS_LINES: usize = 6;

struct App {
    config: AppConfig,
    predictions: Vec<GamePrediction>,
    features: Vec<FeatureRow>,
    column_names: Vec<String>,
    models_loaded: usize,
    selected: usize,
    status: Vec<String>,
    help_overlay: bool,
    should_quit: bool,
}

impl App {
    fn new(config: AppConfig) -> Self {
        let mut app = Self {
            config,
            predictions: Vec::new(),
            features: Vec::new(),
            column_names: Vec::new(),
            models_loaded: 0,
            selected: 0,
            status: Vec::new(),
            help_overlay: false,
            should_quit: false,
        };
        app.reload();
        app
    }

    fn reload(&mut self) {
        match self.load_tables() {
            Ok(()) => {
                if self.predictions.is_empty() {
                    self.push_log(
                        "[INFO] No NFL games in todays_games — run build_dataset first",
                    );
                } else {
                    self.push_log(format!(
                        "[INFO] Loaded {} games, {} model artifacts",
                        self.predictions.len(),
                        self.models_loaded
                    ));
                }
            }
            Err(err) => self.push_log(format!("[WARN] Load failed: {err:#}")),
        }
        self.selected = self
            .selected
            .min(self.predictions.len().saturating_sub(1));
    }

    fn load_tables(&mut self) -> anyhow::Result<()> {
        let conn = dataset::open_db(&self.config.db_path)?;
        let games = dataset::load_todays_games(&conn)?;
        self.features = dataset::load_features_all(&conn)?;

        let models = ModelSet::load(&self.config);
        for warning in &models.warnings {
            self.push_log(format!("[WARN] {warning}"));
        }
        self.models_loaded = models.loaded_count();
        if self.models_loaded == 0 && !games.is_empty() {
            self.push_log("[INFO] No model artifacts — run train_models for probabilities");
        }

        self.predictions = models.predict(&games);
        self.column_names.clear();
        for prediction in &self.predictions {
            for (name, _) in &prediction.columns {
                if !self.column_names.contains(name) {
                    self.column_names.push(name.clone());
                }
            }
        }
        Ok(())
    }

    fn export(&mut self) {
        match export::export_workbook(
            std::path::Path::new(EXPORT_FILE),
            &self.predictions,
            &self.features,
        ) {
            Ok(report) => self.push_log(format!(
                "[INFO] Exported {} games ({} prediction columns) to {EXPORT_FILE}",
                report.games, report.prediction_columns
            )),
            Err(err) => self.push_log(format!("[WARN] Export failed: {err:#}")),
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected + 1 < self.predictions.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Char('r') | KeyCode::Char('R') => self.reload(),
            KeyCode::Char('e') | KeyCode::Char('E') => self.export(),
            KeyCode::Char('?') => self.help_overlay = !self.help_overlay,
            KeyCode::Esc => self.help_overlay = false,
            _ => {}
        }
    }

    fn push_log(&mut self, line: impl Into<String>) {
        self.status.push(line.into());
        if self.status.len() > STATUS_LINES {
            let overflow = self.status.len() - STATUS_LINES;
            self.status.drain(..overflow);
        }
    }
}

fn main() -> io::Result<()> {
    config::load_dotenv();
    let cfg = AppConfig::from_env();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(cfg);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(STATUS_LINES as u16 + 2),
        ])
        .split(frame.size());

    render_header(frame, chunks[0], app);
    render_games(frame, chunks[1], app);
    render_status(frame, chunks[2], app);

    if app.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let line = format!(
        "db: {}   models: {}   features_all: {} rows",
        app.config.db_path.display(),
        app.models_loaded,
        app.features.len()
    );
    let header = Paragraph::new(line).block(
        Block::default()
            .title("Gridline — NFL model board (? for help)")
            .borders(Borders::ALL),
    );
    frame.render_widget(header, area);
}

fn render_games(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title("Today's games").borders(Borders::ALL);

    if app.predictions.is_empty() {
        let empty = Paragraph::new("No games today. Run build_dataset, then press r.")
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }

    let mut header_cells = vec![
        Cell::from("Gameday"),
        Cell::from("Matchup"),
        Cell::from("Spread"),
        Cell::from("Total"),
    ];
    for name in &app.column_names {
        header_cells.push(Cell::from(short_column_name(name)));
    }
    let header = Row::new(header_cells).style(Style::default().add_modifier(Modifier::BOLD));

    let rows = app.predictions.iter().enumerate().map(|(idx, prediction)| {
        let g = &prediction.game;
        let mut cells = vec![
            Cell::from(g.gameday.format("%Y-%m-%d").to_string()),
            Cell::from(format!("{} @ {}", g.away_team, g.home_team)),
            Cell::from(format!("{:+.1}", g.spread_line)),
            Cell::from(format!("{:.1}", g.total_line)),
        ];
        for name in &app.column_names {
            let text = prediction
                .columns
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, p)| format!("{:>5.1}%", p * 100.0))
                .unwrap_or_else(|| "   - ".to_string());
            cells.push(Cell::from(text));
        }
        let style = if idx == app.selected {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Row::new(cells).style(style)
    });

    let mut widths = vec![
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(7),
        Constraint::Length(6),
    ];
    widths.extend(std::iter::repeat(Constraint::Length(9)).take(app.column_names.len()));

    let table = Table::new(rows, widths).header(header).block(block);
    frame.render_widget(table, area);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let text = app.status.join("\n");
    let status = Paragraph::new(text).block(Block::default().title("Log").borders(Borders::ALL));
    frame.render_widget(status, area);
}

/// "Home Win (LogReg)" -> "HW LogReg" so six columns fit on a laptop width.
fn short_column_name(name: &str) -> String {
    name.replace("Home Win", "HW")
        .replace("Over", "OU")
        .replace(['(', ')'], "")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(55, 55, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Gridline — Help",
        "",
        "  j/k or ↑/↓   Select game",
        "  r            Reload tables and models",
        "  e            Export workbook",
        "  ?            Toggle help",
        "  Esc          Close help",
        "  q            Quit",
        "",
        "Pipeline:",
        "  build_dataset  → fetch + build tables",
        "  train_models   → fit the three families",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

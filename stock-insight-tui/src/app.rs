use crate::api::{AveragePrice, Matrix};
use chrono::{DateTime, Local};
use crossterm::event::KeyCode;
use ratatui::style::Color;
use stock_insight::{Ticker, WindowMinutes};

/// Tickers offered by the chart view and correlated by the heatmap.
pub const TICKERS: [&str; 5] = ["NVDA", "PYPL", "AAPL", "MSFT", "GOOGL"];
/// Selectable windows, in minutes.
pub const WINDOWS: [u32; 4] = [15, 30, 50, 90];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Chart,
    Heatmap,
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Refresh,
    Quit,
}

/// Colour band of a correlation coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatBand {
    StrongPositive,
    WeakPositive,
    Neutral,
    WeakNegative,
    StrongNegative,
}

impl HeatBand {
    pub fn from_correlation(correlation: f64) -> Self {
        if correlation >= 0.7 {
            Self::StrongPositive
        } else if correlation >= 0.3 {
            Self::WeakPositive
        } else if correlation >= -0.3 {
            Self::Neutral
        } else if correlation >= -0.7 {
            Self::WeakNegative
        } else {
            Self::StrongNegative
        }
    }

    pub fn color(self) -> Color {
        match self {
            Self::StrongPositive => Color::Rgb(0, 200, 83),
            Self::WeakPositive => Color::Rgb(174, 234, 0),
            Self::Neutral => Color::Rgb(255, 214, 0),
            Self::WeakNegative => Color::Rgb(255, 109, 0),
            Self::StrongNegative => Color::Rgb(213, 0, 0),
        }
    }
}

/// Chart data tagged with the selection it was fetched for.
#[derive(Debug, Clone)]
pub struct ChartData {
    pub ticker: Ticker,
    pub window: WindowMinutes,
    pub data: AveragePrice,
}

/// Outcome of one background refresh.
#[derive(Debug, Clone)]
pub enum Refreshed {
    Chart(ChartData),
    Matrix(Matrix),
    Nothing,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub view: View,
    pub tickers: Vec<Ticker>,
    pub windows: Vec<WindowMinutes>,
    pub ticker_index: usize,
    pub window_index: usize,
    pub chart: Option<ChartData>,
    pub matrix: Option<Matrix>,
    pub loading: bool,
    pub error: Option<String>,
    pub last_update: Option<DateTime<Local>>,
    /// Incremented per refresh; only the latest one owns `loading` and `error`.
    pub refresh_generation: u64,
}

impl AppState {
    pub fn new(tickers: Vec<Ticker>) -> Self {
        Self {
            view: View::Chart,
            tickers,
            windows: WINDOWS
                .iter()
                .filter_map(|&minutes| WindowMinutes::new(minutes).ok())
                .collect(),
            ticker_index: 0,
            window_index: 1,
            chart: None,
            matrix: None,
            loading: false,
            error: None,
            last_update: None,
            refresh_generation: 0,
        }
    }

    pub fn ticker(&self) -> Option<&Ticker> {
        self.tickers.get(self.ticker_index)
    }

    pub fn window(&self) -> WindowMinutes {
        self.windows[self.window_index]
    }

    /// Chart data if it matches the current selection.
    pub fn current_chart(&self) -> Option<&AveragePrice> {
        self.chart
            .as_ref()
            .filter(|chart| Some(&chart.ticker) == self.ticker() && chart.window == self.window())
            .map(|chart| &chart.data)
    }

    /// Matrix if it matches the current window.
    pub fn current_matrix(&self) -> Option<&Matrix> {
        self.matrix
            .as_ref()
            .filter(|matrix| matrix.minutes == self.window())
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Action {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('r') => Action::Refresh,
            KeyCode::Tab => {
                self.view = match self.view {
                    View::Chart => View::Heatmap,
                    View::Heatmap => View::Chart,
                };
                self.refresh_if_stale()
            }
            KeyCode::Left if self.view == View::Chart => {
                self.ticker_index = cycle(self.ticker_index, self.tickers.len(), false);
                self.refresh_if_stale()
            }
            KeyCode::Right if self.view == View::Chart => {
                self.ticker_index = cycle(self.ticker_index, self.tickers.len(), true);
                self.refresh_if_stale()
            }
            KeyCode::Down => {
                self.window_index = cycle(self.window_index, self.windows.len(), false);
                self.refresh_if_stale()
            }
            KeyCode::Up => {
                self.window_index = cycle(self.window_index, self.windows.len(), true);
                self.refresh_if_stale()
            }
            _ => Action::None,
        }
    }

    /// Mark a refresh as in flight and return its generation.
    pub fn begin_refresh(&mut self) -> u64 {
        self.refresh_generation += 1;
        self.loading = true;
        self.error = None;
        self.refresh_generation
    }

    /// Store a finished refresh. Data is always kept since it is tagged with its
    /// selection, but a superseded refresh leaves the loading state alone.
    pub fn finish_refresh(&mut self, generation: u64, result: Result<Refreshed, String>) {
        let latest = generation == self.refresh_generation;

        match result {
            Ok(Refreshed::Chart(chart)) => self.chart = Some(chart),
            Ok(Refreshed::Matrix(matrix)) => self.matrix = Some(matrix),
            Ok(Refreshed::Nothing) => {}
            Err(error) if latest => self.error = Some(error),
            Err(_) => {}
        }

        if latest {
            self.loading = false;
            self.last_update = Some(Local::now());
        }
    }

    fn refresh_if_stale(&self) -> Action {
        let stale = match self.view {
            View::Chart => self.current_chart().is_none(),
            View::Heatmap => self.current_matrix().is_none(),
        };
        if stale { Action::Refresh } else { Action::None }
    }
}

fn cycle(index: usize, len: usize, forward: bool) -> usize {
    match (len, forward) {
        (0, _) => 0,
        (len, true) => (index + 1) % len,
        (len, false) => (index + len - 1) % len,
    }
}

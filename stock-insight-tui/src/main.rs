mod api;
mod app;
mod ui;

use api::ApiClient;
use app::{Action, AppState, ChartData, Refreshed, TICKERS, View};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{io, sync::Arc, time::Duration};
use stock_insight::Ticker;
use tokio::sync::Mutex;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let api = ApiClient::from_env().map_err(|error| error.to_string())?;
    let tickers = TICKERS
        .iter()
        .map(|symbol| Ticker::new(symbol))
        .collect::<Result<Vec<_>, _>>()?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let state = Arc::new(Mutex::new(AppState::new(tickers)));

    // Run TUI
    let res = run_app(&mut terminal, state, api).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res?;

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    state: Arc<Mutex<AppState>>,
    api: ApiClient,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);

    spawn_refresh(state.clone(), api.clone()).await;

    loop {
        let state_snapshot = {
            let s = state.lock().await;
            s.clone()
        };

        terminal.draw(|f| ui::ui(f, &state_snapshot))?;

        if crossterm::event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                let action = state.lock().await.handle_key(key.code);
                match action {
                    Action::Quit => return Ok(()),
                    Action::Refresh => spawn_refresh(state.clone(), api.clone()).await,
                    Action::None => {}
                }
            }
        }
    }
}

/// Fetch data for the current selection in the background. Results for a selection
/// that has since changed are kept but not rendered.
async fn spawn_refresh(state: Arc<Mutex<AppState>>, api: ApiClient) {
    let (generation, view, ticker, window, tickers) = {
        let mut s = state.lock().await;
        let generation = s.begin_refresh();
        (generation, s.view, s.ticker().cloned(), s.window(), s.tickers.clone())
    };

    tokio::spawn(async move {
        let result = match (view, ticker) {
            (View::Chart, Some(ticker)) => api
                .average_price(&ticker, window)
                .await
                .map(|data| Refreshed::Chart(ChartData { ticker, window, data })),
            (View::Chart, None) => Ok(Refreshed::Nothing),
            (View::Heatmap, _) => api
                .matrix(&tickers, window)
                .await
                .map(Refreshed::Matrix),
        };

        state
            .lock()
            .await
            .finish_refresh(generation, result.map_err(|error| error.to_string()));
    });
}

use crate::{
    api::{AveragePrice, Matrix},
    app::{AppState, HeatBand, View},
};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, BorderType, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table},
};

const C_TITLE: Color = Color::Rgb(255, 215, 0);
const C_ACCENT: Color = Color::Rgb(100, 180, 220);
const C_DIM: Color = Color::Rgb(128, 128, 128);
const C_BRIGHT: Color = Color::Rgb(220, 220, 220);
const C_ERROR: Color = Color::Rgb(255, 69, 58);
const C_AVERAGE: Color = Color::Rgb(255, 99, 132);

pub fn ui(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    render_status_bar(f, chunks[0], state);

    match state.view {
        View::Chart => render_chart(f, chunks[1], state),
        View::Heatmap => render_heatmap(f, chunks[1], state),
    }

    let help = Paragraph::new(Line::from(Span::styled(
        " [Tab] View  [←/→] Ticker  [↑/↓] Window  [R] Refresh  [Q] Quit ",
        Style::default().fg(C_DIM),
    )))
    .alignment(Alignment::Center);
    f.render_widget(help, chunks[2]);
}

fn render_status_bar(f: &mut Frame, area: Rect, state: &AppState) {
    let title = Span::styled(
        " ◆ STOCK INSIGHT ◆ ",
        Style::default().fg(C_TITLE).add_modifier(Modifier::BOLD),
    );

    let view = match state.view {
        View::Chart => format!(
            " {} ",
            state.ticker().map(|ticker| ticker.as_str()).unwrap_or("--")
        ),
        View::Heatmap => " CORRELATION HEATMAP ".to_string(),
    };
    let view = Span::styled(view, Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD));

    let window = Span::styled(
        format!(" {}m ", state.window()),
        Style::default().fg(C_ACCENT),
    );

    let status = match (&state.error, state.loading) {
        (Some(error), _) => Span::styled(format!(" ✗ {error} "), Style::default().fg(C_ERROR)),
        (None, true) => Span::styled(" ⟳ loading ", Style::default().fg(C_DIM)),
        (None, false) => Span::styled(
            state
                .last_update
                .map(|time| format!(" ⏱  {} ", time.format("%H:%M:%S")))
                .unwrap_or_default(),
            Style::default().fg(C_DIM),
        ),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(C_ACCENT));

    let paragraph = Paragraph::new(Line::from(vec![title, view, window, status]))
        .block(block)
        .alignment(Alignment::Center);

    f.render_widget(paragraph, area);
}

fn render_chart(f: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .title(" PRICE HISTORY ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_ACCENT));

    let Some(data) = state.current_chart().filter(|data| !data.price_history.is_empty()) else {
        let placeholder = if state.loading { "Loading..." } else { "No data" };
        f.render_widget(
            Paragraph::new(Span::styled(placeholder, Style::default().fg(C_DIM))).block(block),
            area,
        );
        return;
    };

    let (prices, average) = chart_points(data);
    let (y_min, y_max) = price_bounds(data);
    let x_max = prices.len().saturating_sub(1).max(1) as f64;

    let datasets = vec![
        Dataset::default()
            .name("price")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(C_ACCENT))
            .data(&prices),
        Dataset::default()
            .name(format!("average {:.2}", data.average_stock_price))
            .marker(Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(C_AVERAGE))
            .data(&average),
    ];

    let first = data.price_history.first().map(|s| s.observed_at.format("%H:%M:%S").to_string());
    let last = data.price_history.last().map(|s| s.observed_at.format("%H:%M:%S").to_string());

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(C_DIM))
                .bounds([0.0, x_max])
                .labels([first.unwrap_or_default(), last.unwrap_or_default()]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(C_DIM))
                .bounds([y_min, y_max])
                .labels([format!("{y_min:.2}"), format!("{y_max:.2}")]),
        );

    f.render_widget(chart, area);
}

/// Price line and flat average line, indexed by sample position.
fn chart_points(data: &AveragePrice) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
    let prices = data
        .price_history
        .iter()
        .enumerate()
        .map(|(index, sample)| (index as f64, sample.price))
        .collect::<Vec<_>>();

    let last = prices.len().saturating_sub(1).max(1) as f64;
    let average = vec![
        (0.0, data.average_stock_price),
        (last, data.average_stock_price),
    ];

    (prices, average)
}

/// Y-axis bounds covering every price and the average, padded by 5% of the range.
fn price_bounds(data: &AveragePrice) -> (f64, f64) {
    let (min, max) = data.price_history.iter().map(|sample| sample.price).fold(
        (data.average_stock_price, data.average_stock_price),
        |(min, max), price| (min.min(price), max.max(price)),
    );

    let padding = ((max - min) * 0.05).max(0.01);
    (min - padding, max + padding)
}

fn render_heatmap(f: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .title(" CORRELATION MATRIX ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_ACCENT));

    let Some(matrix) = state.current_matrix() else {
        let placeholder = if state.loading { "Loading..." } else { "No data" };
        f.render_widget(
            Paragraph::new(Span::styled(placeholder, Style::default().fg(C_DIM))).block(block),
            area,
        );
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(matrix.tickers.len() as u16 + 3),
            Constraint::Min(0),
        ])
        .split(area);

    let header_cells = std::iter::once(String::new())
        .chain(matrix.tickers.iter().map(ToString::to_string))
        .map(|h| Cell::from(h).style(Style::default().fg(C_TITLE).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows = matrix.tickers.iter().map(|row| {
        let cells = std::iter::once(
            Cell::from(row.to_string()).style(Style::default().fg(C_TITLE)),
        )
        .chain(matrix.tickers.iter().map(|column| {
            let (content, color) = heat_cell(matrix, row, column);
            Cell::from(content).style(Style::default().fg(Color::Black).bg(color))
        }));
        Row::new(cells).height(1)
    });

    let widths = std::iter::once(Constraint::Length(7))
        .chain(matrix.tickers.iter().map(|_| Constraint::Length(7)))
        .collect::<Vec<_>>();

    let table = Table::new(rows, widths).header(header).block(block);
    f.render_widget(table, chunks[0]);

    let stats = matrix
        .tickers
        .iter()
        .map(|ticker| match matrix.stats.get(ticker) {
            Some(stats) => Line::from(vec![
                Span::styled(format!("{ticker:<6}"), Style::default().fg(C_TITLE)),
                Span::styled(
                    format!(" avg {:>10.2}", stats.average_price),
                    Style::default().fg(C_BRIGHT),
                ),
                Span::styled(
                    format!(
                        "  σ {:>8}",
                        stats
                            .stddev
                            .map(|stddev| format!("{stddev:.2}"))
                            .unwrap_or_else(|| "-".to_string())
                    ),
                    Style::default().fg(C_DIM),
                ),
            ]),
            None => Line::from(Span::styled(
                format!("{ticker:<6} unavailable"),
                Style::default().fg(C_ERROR),
            )),
        })
        .chain(matrix.errors.iter().map(|error| {
            Line::from(Span::styled(
                format!("{}/{}: {}", error.ticker_a, error.ticker_b, error.error),
                Style::default().fg(C_ERROR),
            ))
        }))
        .collect::<Vec<_>>();

    let stats = Paragraph::new(stats).block(
        Block::default()
            .title(" STATS ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(C_DIM)),
    );
    f.render_widget(stats, chunks[1]);
}

/// Heatmap cell text & colour. The diagonal is blank and failed pairs show `-`.
fn heat_cell(
    matrix: &Matrix,
    row: &stock_insight::Ticker,
    column: &stock_insight::Ticker,
) -> (String, Color) {
    if row == column {
        return (String::new(), Color::Reset);
    }
    match matrix.correlation(row, column) {
        Some(correlation) => (
            format!("{correlation:+.2}"),
            HeatBand::from_correlation(correlation).color(),
        ),
        None => ("-".to_string(), C_DIM),
    }
}

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use crossterm::event::DisableMouseCapture;
use crossterm::event::EnableMouseCapture;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use md_showcase::App;
use md_showcase::AppAction;
use md_showcase::Config;
use md_showcase::cli::Cli;
use md_showcase::logging;
use md_showcase_core::crossterm_input::input_event_from_crossterm;
use ratatui::Terminal;
use ratatui::backend::Backend;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::io::Stdout;
use std::io::Write;
use std::time::Duration;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path).context("loading configuration")?,
        None => Config::default(),
    };
    cli.apply(&mut config);

    if cli.print_config {
        let text = config.to_toml().context("serializing configuration")?;
        print!("{text}");
        return Ok(());
    }

    logging::init(&config.log.filter, cli.log_file.as_deref())
        .context("initializing logging")?;

    let mut app = App::new(&config).context("building the showcase")?;

    if cli.dump {
        let mut out = io::stdout().lock();
        for line in app.render_to_lines(cli.width) {
            writeln!(out, "{line}")?;
        }
        return Ok(());
    }

    info!(theme = %config.code.theme, "starting terminal ui");
    let mut stdout = io::stdout();
    enable_raw_mode().context("enabling raw mode")?;
    crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("entering alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let res = run(&mut terminal, &mut app);

    let restored = restore_terminal(&mut terminal);
    info!("terminal ui stopped");
    exit_status(res, restored)
}

/// Runs every restore step, even when an earlier one fails.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let raw = disable_raw_mode().context("disabling raw mode");
    let screen = crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("leaving alternate screen");
    let cursor = terminal.show_cursor().context("showing cursor");
    raw.and(screen).and(cursor)
}

/// The loop's own error is reported ahead of any restore failure.
fn exit_status(run: Result<()>, restored: Result<()>) -> Result<()> {
    run.and(restored)
}

fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let mut dirty = true;
    loop {
        if dirty {
            terminal.draw(|f| app.render_ref(f.area(), f.buffer_mut()))?;
            dirty = false;
        }

        if !crossterm::event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Some(event) = input_event_from_crossterm(crossterm::event::read()?) else {
            continue;
        };
        match app.handle_event(event) {
            AppAction::Quit => return Ok(()),
            AppAction::Redraw => dirty = true,
            AppAction::None => {}
        }
    }
}

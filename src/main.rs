use rynx_gopher::app::{App, page_buffer};
use rynx_gopher::bookmarks::BookmarkStore;
use rynx_gopher::config::{self, ColorScheme, Config};
use rynx_gopher::constants::EVENT_POLL_TIMEOUT_MS;
use rynx_gopher::event_handler::{handle_key_event, is_abort_key};
use rynx_gopher::fetch::{FetchMonitor, Fetcher};
use rynx_gopher::logging::init_file_logging;
use rynx_gopher::models::Location;
use rynx_gopher::status::{StatusChannel, split_warning};
use rynx_gopher::transport::{SystemResolver, TcpTransport};
use rynx_gopher::ui::{draw_loading, ui};
use rynx_gopher::url_codec;

use std::path::PathBuf;
use std::process::ExitCode;
use std::{io, time::Duration};

use clap::Parser;
use clap::error::ErrorKind;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
};
use tracing::{debug, error, info};

/// Console Gopher client.
#[derive(Parser, Debug)]
#[command(name = "rynx_gopher", version)]
struct Cli {
    /// Location to open, e.g. gopher://gopher.floodgap.com
    url: Option<String>,

    /// Save the resource to FILE and exit instead of browsing
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,
}

/// Prints status lines to stdout for the non-interactive mode.
struct StdoutMonitor;

impl FetchMonitor for StdoutMonitor {
    fn progress(&mut self, status: &mut StatusChannel) {
        if let Some(msg) = status.take() {
            println!("{}", split_warning(&msg).0);
        }
    }

    fn cancel_requested(&mut self) -> bool {
        false
    }
}

/// Draws the loading screen and watches for Esc while a fetch runs.
struct TuiMonitor<'a, B: Backend> {
    terminal: &'a mut Terminal<B>,
    colors: ColorScheme,
    url: String,
    message: String,
}

impl<'a, B: Backend> TuiMonitor<'a, B> {
    fn new(terminal: &'a mut Terminal<B>, colors: ColorScheme) -> Self {
        Self {
            terminal,
            colors,
            url: String::new(),
            message: String::new(),
        }
    }

    fn redraw(&mut self) {
        let Self {
            terminal,
            colors,
            url,
            message,
        } = self;
        if let Err(e) = terminal.draw(|f| draw_loading(f, colors, url, message)) {
            debug!(error = %e, "cannot draw loading screen");
        }
    }
}

impl<B: Backend> FetchMonitor for TuiMonitor<'_, B> {
    fn started(&mut self, location: &Location) {
        self.url = url_codec::build(location);
        self.message.clear();
        self.redraw();
    }

    fn progress(&mut self, status: &mut StatusChannel) {
        if let Some(msg) = status.take() {
            self.message = msg;
            self.redraw();
        }
    }

    fn cancel_requested(&mut self) -> bool {
        while matches!(event::poll(Duration::ZERO), Ok(true)) {
            match event::read() {
                Ok(Event::Key(key)) if is_abort_key(&key) => return true,
                Ok(_) => {}
                Err(_) => break,
            }
        }
        false
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    let _log_guard = config::log_file_path().and_then(|path| init_file_logging(&path));
    let config = Config::load();

    let location = match cli.url.as_deref() {
        Some(url) => match url_codec::parse_with(url, &config.url_limits()) {
            Ok(location) => Some(location),
            Err(e) => {
                debug!(url, error = %e, "invalid command line URL");
                println!("Invalid URL!");
                return ExitCode::from(1);
            }
        },
        None => None,
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "cannot start the network runtime");
            println!("Network subsystem initialization failed!");
            return ExitCode::from(3);
        }
    };

    match cli.output {
        Some(output) => runtime.block_on(fetch_to_file(&config, location, output)),
        None => runtime.block_on(browse(&config, location)),
    }
}

async fn fetch_to_file(config: &Config, location: Option<Location>, output: PathBuf) -> ExitCode {
    let Some(location) = location.filter(|l| !l.is_builtin()) else {
        println!("You must provide an URL when using -o");
        println!("Error: failed to fetch the remote resource");
        return ExitCode::from(1);
    };
    let Ok(mut buffer) = page_buffer(config.limits.page_buffer_size) else {
        println!("Out of memory!");
        return ExitCode::from(2);
    };
    let mut fetcher = Fetcher::new(
        Box::new(TcpTransport),
        Box::new(SystemResolver),
        config.dns_cache(),
        BookmarkStore::new(config.bookmarks_path()),
        config.fetch_settings(),
    );
    let mut status = StatusChannel::new();
    let mut monitor = StdoutMonitor;
    let result = fetcher
        .fetch(&location, &mut buffer, Some(&output), &mut status, &mut monitor)
        .await;
    monitor.progress(&mut status);
    match result {
        Ok(outcome) => {
            info!(path = %output.display(), bytes = outcome.len(), "saved");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", split_warning(&e.status_message()).0);
            println!("Error: failed to fetch the remote resource");
            ExitCode::from(1)
        }
    }
}

async fn browse(config: &Config, location: Option<Location>) -> ExitCode {
    let mut app = match App::from_config(config) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "cannot allocate the page buffer");
            println!("Out of memory!");
            return ExitCode::from(2);
        }
    };
    if let Err(e) = app.bookmarks().ensure_default_file() {
        debug!(error = %e, "cannot create the bookmarks file");
    }
    if let Some(location) = location {
        app.open(location);
    }
    app.clipboard = arboard::Clipboard::new().ok();

    // This hook catches panics and restores the terminal before printing the error
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = match setup_terminal() {
        Ok(terminal) => terminal,
        Err(e) => {
            let _ = disable_raw_mode();
            error!(error = %e, "cannot initialize the terminal");
            println!("Display initialization failed!");
            return ExitCode::from(4);
        }
    };

    let res = run_app(&mut terminal, &mut app).await;

    // Teardown
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "terminal failure");
            println!("{err}");
            ExitCode::from(1)
        }
    }
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;
    Ok(terminal)
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        let size = terminal.size()?;
        app.resize(size.width, size.height);

        {
            let mut monitor = TuiMonitor::new(terminal, app.colors);
            app.pump(&mut monitor).await;
        }
        app.take_status();
        terminal.draw(|f| ui(f, app))?;

        if app.should_quit {
            return Ok(());
        }

        // Handle input events
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.status_line.clear();
                    let order = handle_key_event(app, key);
                    app.apply(order);
                }
            }
        }
    }
}

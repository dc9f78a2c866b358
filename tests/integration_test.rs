use rynx_gopher::app::App;
use rynx_gopher::bookmarks::BookmarkStore;
use rynx_gopher::config::Config;
use rynx_gopher::error::FetchError;
use rynx_gopher::event_handler::handle_key_event;
use rynx_gopher::fetch::{FetchOutcome, Fetcher, SilentMonitor};
use rynx_gopher::models::{ItemType, Location, Protocol};
use rynx_gopher::status::StatusChannel;
use rynx_gopher::transport::{SystemResolver, TcpTransport};
use rynx_gopher::ui::ui;
use rynx_gopher::url_codec;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves a tiny Gopher hole on localhost; returns the port.
async fn spawn_gopher_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            let Ok((sock, _)) = listener.accept().await else {
                return;
            };
            let (read_half, mut write_half) = sock.into_split();
            let mut request = String::new();
            BufReader::new(read_half).read_line(&mut request).await.unwrap();
            let body = match request.trim_end() {
                "" => format!(
                    "iLocal test hole\tfake\t(NULL)\t0\r\n\
                     0About this server\t/about.txt\t127.0.0.1\t{port}\r\n\
                     1Nowhere\t/missing\t127.0.0.1\t{port}\r\n\
                     .\r\n"
                ),
                "/about.txt" => "Served over Gopher.\r\nSecond line.\r\n.\r\n".to_string(),
                _ => String::new(),
            };
            write_half.write_all(body.as_bytes()).await.unwrap();
            write_half.shutdown().await.unwrap();
        }
    });
    port
}

fn test_config(dir: &TempDir) -> Config {
    Config {
        bookmarks_file: Some(dir.path().join("bookmarks")),
        ..Config::default()
    }
}

fn test_fetcher(config: &Config) -> Fetcher {
    Fetcher::new(
        Box::new(TcpTransport),
        Box::new(SystemResolver),
        config.dns_cache(),
        BookmarkStore::new(config.bookmarks_path()),
        config.fetch_settings(),
    )
}

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

#[tokio::test]
async fn test_gopher_menu_to_render_flow() {
    let port = spawn_gopher_server().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let mut app = App::new(&config, test_fetcher(&config)).unwrap();
    app.resize(60, 8);

    app.open(Location::gopher("127.0.0.1", port, ItemType::DIRECTORY, ""));
    app.pump(&mut SilentMonitor).await;

    let cached = app.current().unwrap().cache.clone().unwrap();
    assert!(String::from_utf8_lossy(&cached).contains("About this server"));

    let mut terminal = Terminal::new(TestBackend::new(60, 8)).unwrap();
    terminal.draw(|f| ui(f, &app)).unwrap();
    let screen: String = terminal
        .backend()
        .buffer()
        .content()
        .iter()
        .map(|cell| cell.symbol())
        .collect();
    assert!(screen.contains("Local test hole"));
    assert!(screen.contains("TXT About this server"));
    assert!(screen.contains(&format!("gopher://127.0.0.1:{port}/0/about.txt")));
}

#[tokio::test]
async fn test_keyboard_navigation_opens_text_and_goes_back() {
    let port = spawn_gopher_server().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let mut app = App::new(&config, test_fetcher(&config)).unwrap();
    app.resize(60, 8);

    app.open(Location::gopher("127.0.0.1", port, ItemType::DIRECTORY, ""));
    app.pump(&mut SilentMonitor).await;

    let order = handle_key_event(&mut app, press(KeyCode::Enter));
    app.apply(order);
    app.pump(&mut SilentMonitor).await;

    let top = app.current().unwrap();
    assert_eq!(top.location.selector, "/about.txt");
    assert_eq!(app.text_lines()[..2], ["Served over Gopher.", "Second line."]);
    app.take_status();
    assert!(app.status_line.starts_with("file loaded ("));

    let order = handle_key_event(&mut app, press(KeyCode::Backspace));
    app.apply(order);
    assert_eq!(app.current().unwrap().location.item_type, ItemType::DIRECTORY);
    assert!(app.current().unwrap().cache.is_some());
}

#[tokio::test]
async fn test_empty_answer_pops_history() {
    let port = spawn_gopher_server().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let mut app = App::new(&config, test_fetcher(&config)).unwrap();

    app.open(Location::gopher("127.0.0.1", port, ItemType::DIRECTORY, "/missing"));
    app.pump(&mut SilentMonitor).await;

    assert_eq!(app.history.depth(), 1);
    assert!(app.current().unwrap().location.is_builtin());
    app.take_status();
    assert_eq!(
        app.status_line,
        "!The selector does not exist or the server returned nothing"
    );
}

#[tokio::test]
async fn test_http_fetch_strips_headers() {
    let mock_server = MockServer::start().await;
    let mock_html = "<html><head><title>Test Page</title></head><body><h1>Hello World</h1></body></html>";

    Mock::given(method("GET"))
        .and(path("/page.html"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(mock_html, "text/html"))
        .mount(&mock_server)
        .await;

    let location = url_codec::parse(&format!("{}/page.html", mock_server.uri())).unwrap();
    assert_eq!(location.protocol, Protocol::Http);

    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let mut fetcher = test_fetcher(&config);
    let mut buffer = vec![0u8; 64 * 1024];
    let mut status = StatusChannel::new();
    let outcome = fetcher
        .fetch(&location, &mut buffer, None, &mut status, &mut SilentMonitor)
        .await
        .unwrap();

    assert_eq!(outcome, FetchOutcome::Complete(mock_html.len()));
    assert_eq!(&buffer[..outcome.len()], mock_html.as_bytes());
}

#[tokio::test]
async fn test_fetch_to_file_refuses_to_overwrite() {
    let port = spawn_gopher_server().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let mut fetcher = test_fetcher(&config);
    let target = dir.path().join("about.txt");
    let location = Location::gopher("127.0.0.1", port, ItemType::TEXT, "/about.txt");
    let mut buffer = vec![0u8; 512];
    let mut status = StatusChannel::new();

    let outcome = fetcher
        .fetch(&location, &mut buffer, Some(&target), &mut status, &mut SilentMonitor)
        .await
        .unwrap();
    let saved = std::fs::read(&target).unwrap();
    assert_eq!(outcome.len(), saved.len());
    assert!(saved.starts_with(b"Served over Gopher."));

    let second = fetcher
        .fetch(&location, &mut buffer, Some(&target), &mut status, &mut SilentMonitor)
        .await;
    assert!(matches!(second, Err(FetchError::FileExists(_))));
    assert_eq!(std::fs::read(&target).unwrap(), saved);
}

#[tokio::test]
async fn test_failed_download_leaves_no_file() {
    let port = spawn_gopher_server().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let mut fetcher = test_fetcher(&config);
    let target = dir.path().join("missing.bin");
    let location = Location::gopher("127.0.0.1", port, ItemType::BINARY, "/missing");
    let mut buffer = vec![0u8; 512];
    let mut status = StatusChannel::new();

    let result = fetcher
        .fetch(&location, &mut buffer, Some(&target), &mut status, &mut SilentMonitor)
        .await;
    assert!(matches!(result, Err(FetchError::EmptyResponse)));
    assert!(!target.exists());
}

//! Static server for the fixture pages.
//!
//! ```text
//! GET /          ─► index.html
//! GET /{name}    ─► {name}.html when present, else the file `name`
//! GET /a/b.css   ─► static file
//! ```
//!
//! Every response carries `Cache-Control: no-cache` so a rebuilt fixture is
//! never served stale.

#![allow(clippy::unused_async)]

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Path as UrlPath,
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use select_parity::HarnessConfig;
use tokio::net::{TcpListener, TcpStream};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::error::{CliError, CliResult};

/// Pages every fixture directory must provide
pub const REQUIRED_PAGES: [&str; 3] = ["index.html", "plain.html", "shadcn.html"];

/// Fixture server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureServerConfig {
    /// Directory holding the fixture markup
    pub directory: PathBuf,
    /// Bind host
    pub host: String,
    /// Bind port (0 = ephemeral)
    pub port: u16,
    /// Permissive CORS
    pub cors: bool,
}

impl FixtureServerConfig {
    /// Server settings from the harness configuration
    #[must_use]
    pub fn from_harness(config: &HarnessConfig) -> Self {
        Self {
            directory: config.fixtures_dir.clone(),
            host: config.host.clone(),
            port: config.port,
            cors: true,
        }
    }
}

/// Serves a fixture directory
#[derive(Debug, Clone)]
pub struct FixtureServer {
    config: FixtureServerConfig,
}

/// A server running in the background
#[derive(Debug)]
pub struct RunningServer {
    /// Bound address
    pub addr: SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

impl RunningServer {
    /// Base URL of the running server
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop serving
    pub fn shutdown(self) {
        self.handle.abort();
        tracing::debug!(addr = %self.addr, "fixture server stopped");
    }
}

impl FixtureServer {
    /// Create a server
    #[must_use]
    pub const fn new(config: FixtureServerConfig) -> Self {
        Self { config }
    }

    /// Server configuration
    #[must_use]
    pub const fn config(&self) -> &FixtureServerConfig {
        &self.config
    }

    /// Fail early when the fixture directory is incomplete
    pub fn check_fixtures(&self) -> CliResult<()> {
        let missing: Vec<_> = REQUIRED_PAGES
            .iter()
            .filter(|page| !self.config.directory.join(page).is_file())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CliError::config(format!(
                "fixture directory {} is missing {}",
                self.config.directory.display(),
                missing
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )))
        }
    }

    /// Build the router
    #[must_use]
    pub fn router(&self) -> Router {
        let directory = Arc::new(self.config.directory.clone());

        let app = Router::new()
            .route(
                "/",
                get({
                    let dir = directory.clone();
                    move || serve_index(dir.clone())
                }),
            )
            .route(
                "/{name}",
                get({
                    let dir = directory.clone();
                    move |UrlPath(name): UrlPath<String>| serve_page(dir.clone(), name)
                }),
            )
            .fallback({
                let dir = directory.clone();
                move |uri: Uri| serve_static(dir.clone(), uri)
            })
            .layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache"),
            ));

        if self.config.cors {
            app.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            app
        }
    }

    async fn bind(&self) -> CliResult<TcpListener> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        TcpListener::bind(&addr)
            .await
            .map_err(|e| CliError::server(format!("cannot bind {addr}: {e}")))
    }

    /// Start serving in the background
    pub async fn spawn(&self) -> CliResult<RunningServer> {
        let listener = self.bind().await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "fixture server stopped");
            }
        });
        tracing::info!(%addr, dir = %self.config.directory.display(), "fixture server listening");
        Ok(RunningServer { addr, handle })
    }

    /// Serve in the foreground until Ctrl+C
    pub async fn run(&self) -> CliResult<()> {
        let listener = self.bind().await?;
        let addr = listener.local_addr()?;
        tracing::info!(%addr, dir = %self.config.directory.display(), "fixture server listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
        Ok(())
    }
}

/// Whether something accepts connections on `host:port`
pub async fn is_listening(host: &str, port: u16) -> bool {
    matches!(
        tokio::time::timeout(
            Duration::from_millis(500),
            TcpStream::connect((host, port))
        )
        .await,
        Ok(Ok(_))
    )
}

/// Serve index.html
async fn serve_index(directory: Arc<PathBuf>) -> Response {
    serve_file(&directory.join("index.html")).await
}

/// Serve `{name}.html` for extensionless routes like `/plain`
async fn serve_page(directory: Arc<PathBuf>, name: String) -> Response {
    let Some(relative) = sanitize(&name) else {
        return not_found(&name);
    };
    let page = directory.join(&relative).with_extension("html");
    if Path::new(&name).extension().is_none() && page.is_file() {
        return serve_file(&page).await;
    }
    serve_file(&directory.join(relative)).await
}

/// Serve a static file under the fixture directory
async fn serve_static(directory: Arc<PathBuf>, uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    let Some(relative) = sanitize(path) else {
        return not_found(path);
    };
    let file_path = directory.join(relative);
    if file_path.is_dir() {
        return serve_file(&file_path.join("index.html")).await;
    }
    serve_file(&file_path).await
}

/// Relative path with only normal components
fn sanitize(path: &str) -> Option<PathBuf> {
    let path = Path::new(path);
    path.components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then(|| path.to_path_buf())
}

fn not_found(path: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("File not found: {path}")).into_response()
}

/// Serve a file with its MIME type
async fn serve_file(path: &Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(contents) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, get_mime_type(path))
            .body(axum::body::Body::from(contents))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            not_found(&path.display().to_string())
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error reading file: {e}"),
        )
            .into_response(),
    }
}

/// MIME type for a file path
#[must_use]
pub fn get_mime_type(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8".to_string(),
        Some("js" | "mjs") => "text/javascript".to_string(),
        Some("css") => "text/css".to_string(),
        Some("json") => "application/json".to_string(),
        Some("svg") => "image/svg+xml".to_string(),
        _ => mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn fixtures() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::write(dir.path().join("plain.html"), "<select id=\"favoriteFruit\">").unwrap();
        std::fs::write(dir.path().join("shadcn.html"), "<button id=\"favoriteFruit\">").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/app.css"), "body{}").unwrap();
        dir
    }

    fn server(dir: &TempDir) -> FixtureServer {
        FixtureServer::new(FixtureServerConfig {
            directory: dir.path().to_path_buf(),
            host: "127.0.0.1".to_string(),
            port: 0,
            cors: true,
        })
    }

    async fn get(router: Router, uri: &str) -> Response {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_and_fixture_routes() {
        let dir = fixtures();
        let router = server(&dir).router();

        let home = get(router.clone(), "/").await;
        assert_eq!(home.status(), StatusCode::OK);
        assert_eq!(home.headers()[header::CACHE_CONTROL], "no-cache");
        assert!(body(home).await.contains("home"));

        let plain = get(router.clone(), "/plain").await;
        assert_eq!(plain.status(), StatusCode::OK);
        assert!(plain.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        assert!(body(plain).await.contains("select"));

        let shadcn = get(router, "/shadcn").await;
        assert!(body(shadcn).await.contains("button"));
    }

    #[tokio::test]
    async fn test_static_and_missing_files() {
        let dir = fixtures();
        let router = server(&dir).router();

        let css = get(router.clone(), "/assets/app.css").await;
        assert_eq!(css.status(), StatusCode::OK);
        assert_eq!(css.headers()[header::CONTENT_TYPE], "text/css");

        let missing = get(router.clone(), "/nope").await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(
            get(router, "/assets/../../secret").await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_sanitize_rejects_traversal() {
        assert!(sanitize("plain.html").is_some());
        assert!(sanitize("assets/app.css").is_some());
        assert!(sanitize("../etc/passwd").is_none());
        assert!(sanitize("/etc/passwd").is_none());
    }

    #[test]
    fn test_check_fixtures() {
        let dir = fixtures();
        assert!(server(&dir).check_fixtures().is_ok());

        std::fs::remove_file(dir.path().join("shadcn.html")).unwrap();
        let err = server(&dir).check_fixtures().unwrap_err();
        assert!(err.to_string().contains("shadcn.html"));
    }

    #[tokio::test]
    async fn test_spawn_and_detect_listener() {
        let dir = fixtures();
        let running = server(&dir).spawn().await.unwrap();
        let port = running.addr.port();
        assert!(is_listening("127.0.0.1", port).await);
        assert!(running.url().starts_with("http://127.0.0.1:"));
        running.shutdown();
    }

    #[test]
    fn test_mime_types() {
        assert!(get_mime_type(Path::new("plain.html")).starts_with("text/html"));
        assert_eq!(get_mime_type(Path::new("app.js")), "text/javascript");
        assert_eq!(get_mime_type(Path::new("logo.png")), "image/png");
    }
}

//! W3C WebDriver client implementing [`PageDriver`] over plain HTTP.

use std::fs::{self, File};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::ValueEnum;
use reqwest::Method;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;

use crate::driver::{ElementId, Key, PageDriver, WaitCondition};
use crate::error::{DriverError, DriverResult};

/// Key under which W3C endpoints return element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecc";
const ESCAPE: &str = "\u{E00C}";

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const READY_POLL: Duration = Duration::from_millis(250);
const NETWORK_QUIET: Duration = Duration::from_millis(500);
const START_POLL: Duration = Duration::from_millis(200);

const WINDOW_WIDTH: u32 = 1366;
const WINDOW_HEIGHT: u32 = 768;
/// Wheel events land here, inside the place panel on the left.
const SCROLL_ANCHOR: (i64, i64) = (200, 400);

const READY_STATE_SCRIPT: &str = "return document.readyState;";
const NETWORK_STATE_SCRIPT: &str = r#"
    return {
        ready: document.readyState,
        resources: performance.getEntriesByType('resource').length
    };
"#;
const TEXT_CONTENT_SCRIPT: &str = "return arguments[0].textContent;";
const OUTER_HTML_SCRIPT: &str = "return arguments[0].outerHTML;";
const JS_CLICK_SCRIPT: &str = "arguments[0].click(); return true;";
const SCROLL_FALLBACK_SCRIPT: &str = r#"
    const [x, y, dx, dy] = arguments;
    let el = document.elementFromPoint(x, y);
    while (el && el.scrollHeight <= el.clientHeight) {
        el = el.parentElement;
    }
    (el || document.scrollingElement || document.body).scrollBy(dx, dy);
    return true;
"#;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum BrowserArg {
    Chrome,
    Firefox,
}

/// How to reach (or start) the WebDriver endpoint.
#[derive(Debug, Clone)]
pub struct WebDriverOptions {
    pub endpoint: String,
    pub browser: BrowserArg,
    pub headless: bool,
    pub binary: Option<String>,
    pub autostart: bool,
    pub start_timeout_ms: u64,
}

impl Default for WebDriverOptions {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4444".to_string(),
            browser: BrowserArg::Chrome,
            headless: false,
            binary: None,
            autostart: true,
            start_timeout_ms: 12_000,
        }
    }
}

pub struct WebDriverSession {
    client: reqwest::Client,
    base: String,
    session_id: String,
    child: Option<Child>,
    closed: bool,
}

impl WebDriverSession {
    /// Uses the configured endpoint when it answers, otherwise starts a local
    /// driver on a free port, then opens a browser session.
    pub async fn connect(options: &WebDriverOptions) -> DriverResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| DriverError::Transport(format!("http client build failed: {e}")))?;

        let requested = normalize_local_endpoint(&options.endpoint);
        let (base, mut child) = if endpoint_reachable(&requested) {
            info!(endpoint = %requested, "webdriver endpoint reachable");
            (requested, None)
        } else if options.autostart {
            let port = find_free_local_port()?;
            let endpoint = format!("http://127.0.0.1:{port}");
            let child = start_webdriver(options, &endpoint, port).await?;
            info!(endpoint = %endpoint, "webdriver autostarted");
            (endpoint, Some(child))
        } else {
            return Err(DriverError::Startup(format!(
                "endpoint {requested} unreachable and autostart is disabled"
            )));
        };

        let caps = capabilities(options.browser, options.headless);
        let created = request(&client, Method::POST, &format!("{base}/session"), Some(caps)).await;
        let session_id = match created.and_then(|value| session_id_from(&value)) {
            Ok(id) => id,
            Err(err) => {
                stop_webdriver(child.take());
                return Err(err);
            }
        };
        info!(session = %session_id, browser = ?options.browser, "browser session created");

        Ok(Self {
            client,
            base,
            session_id,
            child,
            closed: false,
        })
    }

    /// Ends the browser session and stops an autostarted driver.
    pub async fn close(mut self) {
        self.shutdown().await;
    }

    async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let url = format!("{}/session/{}", self.base, self.session_id);
        if let Err(err) = request(&self.client, Method::DELETE, &url, None).await {
            warn!(error = %err, "session delete failed");
        }
        stop_webdriver(self.child.take());
        info!("browser session closed");
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> DriverResult<Value> {
        let url = format!("{}/session/{}{path}", self.base, self.session_id);
        request(&self.client, method, &url, body).await
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> DriverResult<Value> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    async fn wait_until_ready(&self, wait: WaitCondition) -> DriverResult<()> {
        let started = Instant::now();
        let mut last_resources: Option<u64> = None;
        let mut quiet_since = Instant::now();

        while started.elapsed() < NAVIGATION_TIMEOUT {
            match wait {
                WaitCondition::Load => {
                    let state = self.execute(READY_STATE_SCRIPT, Vec::new()).await?;
                    if state.as_str() == Some("complete") {
                        return Ok(());
                    }
                }
                WaitCondition::NetworkIdle => {
                    let state = self.execute(NETWORK_STATE_SCRIPT, Vec::new()).await?;
                    let ready = state.pointer("/ready").and_then(Value::as_str) == Some("complete");
                    let resources = state.pointer("/resources").and_then(Value::as_u64);
                    if resources != last_resources {
                        last_resources = resources;
                        quiet_since = Instant::now();
                    } else if ready && quiet_since.elapsed() >= NETWORK_QUIET {
                        return Ok(());
                    }
                }
            }
            tokio::time::sleep(READY_POLL).await;
        }
        Err(DriverError::Timeout {
            action: match wait {
                WaitCondition::Load => "page load",
                WaitCondition::NetworkIdle => "network idle",
            },
            millis: NAVIGATION_TIMEOUT.as_millis() as u64,
        })
    }

    async fn native_click(&self, element: &ElementId) -> DriverResult<()> {
        let path = format!("/element/{}/click", element.0);
        match self.command(Method::POST, &path, Some(json!({}))).await {
            Ok(_) => Ok(()),
            Err(DriverError::Protocol { name, message })
                if name == "element click intercepted" || name == "element not interactable" =>
            {
                debug!(reason = %message, "native click refused, using script click");
                self.execute(JS_CLICK_SCRIPT, vec![element_ref(element)]).await.map(|_| ())
            }
            Err(err) => Err(err),
        }
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if !self.closed {
            stop_webdriver(self.child.take());
        }
    }
}

impl PageDriver for WebDriverSession {
    async fn navigate(&mut self, url: &str, wait: WaitCondition) -> DriverResult<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url }))).await?;
        self.wait_until_ready(wait).await
    }

    async fn find_all(&mut self, css: &str) -> DriverResult<Vec<ElementId>> {
        let found = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": "css selector", "value": css })),
            )
            .await?;
        Ok(element_ids(&found))
    }

    async fn find_within(&mut self, parent: &ElementId, css: &str) -> DriverResult<Vec<ElementId>> {
        let path = format!("/element/{}/elements", parent.0);
        let found = self
            .command(
                Method::POST,
                &path,
                Some(json!({ "using": "css selector", "value": css })),
            )
            .await?;
        Ok(element_ids(&found))
    }

    async fn text(&mut self, element: &ElementId) -> DriverResult<String> {
        let value = self.execute(TEXT_CONTENT_SCRIPT, vec![element_ref(element)]).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(&mut self, element: &ElementId, name: &str) -> DriverResult<Option<String>> {
        let path = format!("/element/{}/attribute/{name}", element.0);
        let value = self.command(Method::GET, &path, None).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn outer_html(&mut self, element: &ElementId) -> DriverResult<String> {
        let value = self.execute(OUTER_HTML_SCRIPT, vec![element_ref(element)]).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn is_displayed(&mut self, element: &ElementId) -> DriverResult<bool> {
        let path = format!("/element/{}/displayed", element.0);
        let value = self.command(Method::GET, &path, None).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&mut self, element: &ElementId, timeout: Duration) -> DriverResult<()> {
        match tokio::time::timeout(timeout, self.native_click(element)).await {
            Ok(result) => result,
            Err(_) => Err(DriverError::Timeout {
                action: "click",
                millis: timeout.as_millis() as u64,
            }),
        }
    }

    async fn scroll_by(&mut self, dx: i64, dy: i64) -> DriverResult<()> {
        let (x, y) = SCROLL_ANCHOR;
        let wheel = json!({
            "actions": [{
                "type": "wheel",
                "id": "wheel",
                "actions": [{
                    "type": "scroll",
                    "origin": "viewport",
                    "x": x,
                    "y": y,
                    "deltaX": dx,
                    "deltaY": dy,
                    "duration": 0
                }]
            }]
        });
        match self.command(Method::POST, "/actions", Some(wheel)).await {
            Ok(_) => Ok(()),
            Err(err) => {
                debug!(error = %err, "wheel action failed, scrolling by script");
                self.execute(SCROLL_FALLBACK_SCRIPT, vec![json!(x), json!(y), json!(dx), json!(dy)])
                    .await
                    .map(|_| ())
            }
        }
    }

    async fn press_key(&mut self, key: Key) -> DriverResult<()> {
        let value = match key {
            Key::Escape => ESCAPE,
        };
        let keys = json!({
            "actions": [{
                "type": "key",
                "id": "keyboard",
                "actions": [
                    { "type": "keyDown", "value": value },
                    { "type": "keyUp", "value": value }
                ]
            }]
        });
        self.command(Method::POST, "/actions", Some(keys)).await?;
        self.command(Method::DELETE, "/actions", None).await.map(|_| ())
    }

    async fn title(&mut self) -> DriverResult<String> {
        let value = self.command(Method::GET, "/title", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn page_source(&mut self) -> DriverResult<String> {
        let value = self.command(Method::GET, "/source", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DriverError::Decode("page source is not a string".to_string()))
    }

    async fn screenshot_png(&mut self) -> DriverResult<Vec<u8>> {
        let value = self.command(Method::GET, "/screenshot", None).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| DriverError::Decode("screenshot is not a string".to_string()))?;
        STANDARD
            .decode(encoded)
            .map_err(|e| DriverError::Decode(format!("screenshot base64: {e}")))
    }
}

async fn request(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> DriverResult<Value> {
    let mut builder = client.request(method, url);
    if let Some(body) = body {
        builder = builder.json(&body);
    }
    let res = builder
        .send()
        .await
        .map_err(|e| DriverError::Transport(format!("{url}: {e}")))?;
    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| DriverError::Transport(format!("{url}: response read failed: {e}")))?;
    parse_response(status.as_u16(), &body)
}

/// The `value` member of a WebDriver response, or the error it carries.
pub fn parse_response(status: u16, body: &str) -> DriverResult<Value> {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    if let Some(name) = parsed
        .as_ref()
        .and_then(|v| v.pointer("/value/error"))
        .and_then(Value::as_str)
    {
        let message = parsed
            .as_ref()
            .and_then(|v| v.pointer("/value/message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown webdriver error")
            .to_string();
        if name == "stale element reference" || name == "no such element" {
            return Err(DriverError::StaleElement(message));
        }
        return Err(DriverError::Protocol {
            name: name.to_string(),
            message,
        });
    }
    if !(200..300).contains(&status) {
        return Err(DriverError::Status {
            status,
            body: truncate_for_log(body, 260),
        });
    }
    let value = parsed.ok_or_else(|| {
        DriverError::Decode(format!("invalid json: {}", truncate_for_log(body, 220)))
    })?;
    Ok(value.get("value").cloned().unwrap_or(Value::Null))
}

fn session_id_from(value: &Value) -> DriverResult<String> {
    value
        .pointer("/sessionId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            DriverError::Decode(format!(
                "session id missing in response: {}",
                truncate_for_log(&value.to_string(), 220)
            ))
        })
}

fn element_ref(element: &ElementId) -> Value {
    json!({ ELEMENT_KEY: element.0 })
}

pub fn element_ids(value: &Value) -> Vec<ElementId> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(ELEMENT_KEY).and_then(Value::as_str))
                .map(|id| ElementId(id.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

pub fn capabilities(browser: BrowserArg, headless: bool) -> Value {
    let timeouts = json!({ "pageLoad": 60_000, "script": 30_000, "implicit": 0 });
    match browser {
        BrowserArg::Firefox => {
            let mut args = Vec::<String>::new();
            if headless {
                args.push("-headless".to_string());
            }
            args.push(format!("--width={WINDOW_WIDTH}"));
            args.push(format!("--height={WINDOW_HEIGHT}"));
            json!({
                "capabilities": {
                    "alwaysMatch": {
                        "browserName": "firefox",
                        "acceptInsecureCerts": true,
                        "pageLoadStrategy": "normal",
                        "timeouts": timeouts,
                        "moz:firefoxOptions": { "args": args }
                    }
                }
            })
        }
        BrowserArg::Chrome => {
            let mut args = Vec::<String>::new();
            if headless {
                args.push("--headless=new".to_string());
            }
            args.push(format!("--window-size={WINDOW_WIDTH},{WINDOW_HEIGHT}"));
            args.push("--disable-gpu".to_string());
            args.push("--disable-dev-shm-usage".to_string());
            args.push("--no-first-run".to_string());
            args.push("--no-default-browser-check".to_string());
            if !cfg!(target_os = "macos") {
                args.push("--no-sandbox".to_string());
            }
            json!({
                "capabilities": {
                    "alwaysMatch": {
                        "browserName": "chrome",
                        "acceptInsecureCerts": true,
                        "pageLoadStrategy": "normal",
                        "timeouts": timeouts,
                        "goog:chromeOptions": { "args": args }
                    }
                }
            })
        }
    }
}

pub fn truncate_for_log(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let mut out = input.chars().take(max_chars).collect::<String>();
    out.push_str("...");
    out
}

fn endpoint_reachable(endpoint: &str) -> bool {
    let Ok(parsed) = Url::parse(endpoint) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let port = parsed.port_or_known_default().unwrap_or(4444);
    let Ok(addrs) = (host, port).to_socket_addrs() else {
        return false;
    };
    addrs
        .into_iter()
        .any(|addr| TcpStream::connect_timeout(&addr, Duration::from_secs(2)).is_ok())
}

/// `localhost` endpoints are pinned to `127.0.0.1` so IPv6 resolution never
/// misses a driver bound to IPv4 only.
pub fn normalize_local_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim_end_matches('/');
    let Ok(url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };
    match url.host_str() {
        Some("localhost") | Some("127.0.0.1") => {
            let port = url.port_or_known_default().unwrap_or(4444);
            format!("{}://127.0.0.1:{port}", url.scheme())
        }
        _ => trimmed.to_string(),
    }
}

fn driver_binary(options: &WebDriverOptions) -> String {
    match (&options.binary, options.browser) {
        (Some(bin), _) => bin.clone(),
        (None, BrowserArg::Chrome) => "chromedriver".to_string(),
        (None, BrowserArg::Firefox) => "geckodriver".to_string(),
    }
}

fn binary_available(bin: &str) -> bool {
    let path = Path::new(bin);
    if path.components().count() > 1 || path.is_absolute() {
        return path.exists();
    }
    Command::new(bin)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn configure_webdriver_command(cmd: &mut Command, bin: &str, port: u16) {
    if bin.to_ascii_lowercase().contains("geckodriver") {
        cmd.arg("--port").arg(port.to_string());
        return;
    }
    cmd.arg(format!("--port={port}"));
    cmd.arg("--log-level=SEVERE");
}

async fn start_webdriver(options: &WebDriverOptions, endpoint: &str, port: u16) -> DriverResult<Child> {
    let bin = driver_binary(options);
    if !binary_available(&bin) {
        return Err(DriverError::Startup(format!("{bin} not found")));
    }

    let log_path = webdriver_log_path(port)?;
    let log_file = File::options()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path)
        .map_err(|e| DriverError::Startup(format!("failed to open log {}: {e}", log_path.display())))?;
    let log_file_err = log_file
        .try_clone()
        .map_err(|e| DriverError::Startup(format!("failed to clone log handle: {e}")))?;

    let mut cmd = Command::new(&bin);
    configure_webdriver_command(&mut cmd, &bin, port);
    cmd.stdout(Stdio::from(log_file))
        .stderr(Stdio::from(log_file_err))
        .stdin(Stdio::null());
    let mut child = cmd
        .spawn()
        .map_err(|e| DriverError::Startup(format!("failed to spawn {bin}: {e}")))?;

    let steps = (options.start_timeout_ms / START_POLL.as_millis() as u64).max(1);
    for _ in 0..steps {
        if endpoint_reachable(endpoint) {
            return Ok(child);
        }
        if let Ok(Some(status)) = child.try_wait() {
            let mut reason = format!("{bin} exited early with status {status} (log: {})", log_path.display());
            if let Some(tail) = read_log_tail(&log_path, 30) {
                reason = format!("{reason}; tail: {tail}");
            }
            return Err(DriverError::Startup(reason));
        }
        tokio::time::sleep(START_POLL).await;
    }
    stop_webdriver(Some(child));
    let mut reason = format!("{bin} did not become ready in time (log: {})", log_path.display());
    if let Some(tail) = read_log_tail(&log_path, 30) {
        reason = format!("{reason}; tail: {tail}");
    }
    Err(DriverError::Startup(reason))
}

fn stop_webdriver(child: Option<Child>) {
    if let Some(mut child) = child {
        let _ = child.kill();
        let _ = child.wait();
    }
}

fn webdriver_log_path(port: u16) -> DriverResult<PathBuf> {
    let dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("placescope")
        .join("webdriver");
    fs::create_dir_all(&dir)
        .map_err(|e| DriverError::Startup(format!("log dir create failed: {e}")))?;
    Ok(dir.join(format!("webdriver-{port}.log")))
}

fn read_log_tail(path: &Path, lines: usize) -> Option<String> {
    let text = fs::read_to_string(path).ok()?;
    let mut tail = text.lines().rev().take(lines.max(1)).collect::<Vec<_>>();
    tail.reverse();
    let tail = tail.join(" | ");
    if tail.is_empty() { None } else { Some(tail) }
}

fn find_free_local_port() -> DriverResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|e| DriverError::Startup(format!("free port bind failed: {e}")))?;
    listener
        .local_addr()
        .map(|addr| addr.port())
        .map_err(|e| DriverError::Startup(format!("local addr failed: {e}")))
}

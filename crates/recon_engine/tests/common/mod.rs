#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use recon_engine::{
    BrowserDriver, DriverError, HtmlInspector, NetworkEvent, NetworkTap, PageInspector,
};

pub fn init_logging() {
    recon_logging::initialize_for_tests();
}

/// Login behaviour of a scripted site.
#[derive(Debug, Clone)]
pub struct FakeLogin {
    pub login_url: String,
    pub username: String,
    pub password: String,
    pub success_url: String,
    pub failure_url: String,
}

/// In-memory driver that serves scripted pages and records what was asked of it.
#[derive(Default)]
pub struct FakeDriver {
    pages: HashMap<String, String>,
    failures: HashMap<String, DriverError>,
    hangs: HashSet<String>,
    stalled_lookups: bool,
    traffic: HashMap<String, Vec<NetworkEvent>>,
    login: Option<FakeLogin>,
    screenshot: Option<Result<Vec<u8>, DriverError>>,
    current: Option<String>,
    typed: Vec<(String, String)>,
    tap: Option<NetworkTap>,
    log: Arc<Mutex<Vec<String>>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn with_failure(mut self, url: &str, error: DriverError) -> Self {
        self.failures.insert(url.to_string(), error);
        self
    }

    /// Navigating to `url` never completes.
    pub fn with_hang(mut self, url: &str) -> Self {
        self.hangs.insert(url.to_string());
        self
    }

    /// Element lookups never complete.
    pub fn with_stalled_lookups(mut self) -> Self {
        self.stalled_lookups = true;
        self
    }

    /// Events emitted through the attached tap whenever `url` is loaded.
    pub fn with_traffic(mut self, url: &str, events: Vec<NetworkEvent>) -> Self {
        self.traffic.insert(url.to_string(), events);
        self
    }

    pub fn with_login(mut self, login: FakeLogin) -> Self {
        self.login = Some(login);
        self
    }

    pub fn with_screenshot(mut self, result: Result<Vec<u8>, DriverError>) -> Self {
        self.screenshot = Some(result);
        self
    }

    /// Shared view of the call log, usable after the driver is borrowed by a runner.
    pub fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.log.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|entry| entry.strip_prefix("navigate ").map(str::to_string))
            .collect()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn load(&mut self, url: &str) -> Result<(), DriverError> {
        if let Some(error) = self.failures.get(url) {
            return Err(error.clone());
        }
        if let (Some(tap), Some(events)) = (&self.tap, self.traffic.get(url)) {
            for event in events {
                tap.emit(event.clone());
            }
        }
        if !self.pages.contains_key(url) {
            return Err(DriverError::HttpStatus {
                url: url.to_string(),
                status: 404,
            });
        }
        self.current = Some(url.to_string());
        self.typed.clear();
        Ok(())
    }

    fn current_html(&self) -> Result<&str, DriverError> {
        let url = self.current.as_deref().ok_or(DriverError::NoPage)?;
        self.pages
            .get(url)
            .map(String::as_str)
            .ok_or(DriverError::NoPage)
    }

    fn typed_value(&self, needle: &str) -> Option<&str> {
        self.typed
            .iter()
            .find(|(selector, _)| selector.contains(needle))
            .map(|(_, value)| value.as_str())
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.record(format!("navigate {url}"));
        if self.hangs.contains(url) {
            return std::future::pending().await;
        }
        self.load(url)
    }

    async fn wait_for_network_idle(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn is_present(&mut self, selector: &str) -> Result<bool, DriverError> {
        if self.stalled_lookups {
            return std::future::pending().await;
        }
        let html = self.current_html()?;
        let page = HtmlInspector::parse("about:blank", html);
        let found = page
            .query_all(selector)
            .map_err(|_| DriverError::InvalidSelector(selector.to_string()))?;
        Ok(!found.is_empty())
    }

    async fn type_into(&mut self, selector: &str, text: &str) -> Result<(), DriverError> {
        self.record(format!("type {selector}"));
        self.typed.push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), DriverError> {
        self.record(format!("click {selector}"));
        let Some(login) = self.login.clone() else {
            return Err(DriverError::NotInteractable {
                selector: selector.to_string(),
                reason: "no scripted behaviour".to_string(),
            });
        };
        let accepted = self.typed.len() >= 2
            && self.typed[0].1 == login.username
            && self.typed_value("password") == Some(login.password.as_str());
        let target = if accepted {
            login.success_url
        } else {
            login.failure_url
        };
        self.load(&target)
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        self.current.clone().ok_or(DriverError::NoPage)
    }

    async fn content(&mut self) -> Result<String, DriverError> {
        self.current_html().map(str::to_string)
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        self.record("screenshot".to_string());
        self.screenshot
            .clone()
            .unwrap_or(Err(DriverError::Unsupported("screenshot")))
    }

    fn attach_network_tap(&mut self, tap: Option<NetworkTap>) {
        self.tap = tap;
    }
}

pub fn request(url: &str) -> NetworkEvent {
    NetworkEvent::Request {
        url: url.to_string(),
        method: "GET".to_string(),
        resource_type: "xhr".to_string(),
        timestamp: Utc::now(),
    }
}

pub fn response(url: &str, status: u16) -> NetworkEvent {
    NetworkEvent::Response {
        url: url.to_string(),
        status,
        timestamp: Utc::now(),
    }
}

pub const LOGIN_PAGE: &str = r#"<html><body>
<form action="/session" method="post">
  <input type="email" name="email">
  <input type="password" name="password">
  <button type="submit">Sign in</button>
</form>
</body></html>"#;

/// Navigation page linking to `links` as `(href, text)` pairs.
pub fn nav_page(body: &str, links: &[(&str, &str)]) -> String {
    let anchors: String = links
        .iter()
        .map(|(href, text)| format!(r#"<a href="{href}">{text}</a>"#))
        .collect();
    format!("<html><body><nav>{anchors}</nav><main>{body}</main></body></html>")
}

//! `BrowserDriver` over plain HTTP for server-rendered targets.
//!
//! Pages are fetched with a cookie-preserving client and held as a parsed
//! snapshot. Typing records form values; clicking follows anchors or submits
//! the enclosing form. Client-side scripts never run.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use recon_logging::{recon_debug, recon_trace};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use scraper::{ElementRef, Html};
use url::Url;

use crate::decode::decode_document;
use crate::driver::BrowserDriver;
use crate::inspect::parse_selector;
use crate::network::{NetworkEvent, NetworkTap};
use crate::DriverError;

#[derive(Debug, Clone)]
pub struct HttpDriverSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
    pub user_agent: String,
}

impl Default for HttpDriverSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
            user_agent: concat!("recon/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

struct LoadedPage {
    url: Url,
    html: String,
}

enum PageRequest {
    Get(Url),
    PostForm(Url, Vec<(String, String)>),
}

pub struct HttpDriver {
    settings: HttpDriverSettings,
    client: reqwest::Client,
    page: Option<LoadedPage>,
    typed: Vec<(String, String)>,
    tap: Option<NetworkTap>,
}

impl HttpDriver {
    pub fn new(settings: HttpDriverSettings) -> Result<Self, DriverError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| DriverError::Crashed(err.to_string()))?;
        Ok(Self {
            settings,
            client,
            page: None,
            typed: Vec::new(),
            tap: None,
        })
    }

    fn emit(&self, event: NetworkEvent) {
        if let Some(tap) = &self.tap {
            tap.emit(event);
        }
    }

    fn loaded(&self) -> Result<&LoadedPage, DriverError> {
        self.page.as_ref().ok_or(DriverError::NoPage)
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let essence = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(essence))
    }

    async fn load(&mut self, request: PageRequest) -> Result<(), DriverError> {
        let (method, target, builder) = match request {
            PageRequest::Get(url) => (Method::GET, url.clone(), self.client.get(url)),
            PageRequest::PostForm(url, fields) => {
                (Method::POST, url.clone(), self.client.post(url).form(&fields))
            }
        };
        recon_debug!("{} {}", method, target);
        self.emit(NetworkEvent::Request {
            url: target.to_string(),
            method: method.to_string(),
            resource_type: "document".to_string(),
            timestamp: Utc::now(),
        });

        let response = builder
            .send()
            .await
            .map_err(|err| map_reqwest_error(&target, err))?;
        let status = response.status();
        let final_url = response.url().clone();
        self.emit(NetworkEvent::Response {
            url: final_url.to_string(),
            status: status.as_u16(),
            timestamp: Utc::now(),
        });

        if !status.is_success() {
            return Err(DriverError::HttpStatus {
                url: final_url.to_string(),
                status: status.as_u16(),
            });
        }
        if let Some(declared) = response.content_length() {
            if declared > self.settings.max_bytes {
                return Err(too_large(&final_url, self.settings.max_bytes));
            }
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(DriverError::Navigation {
                    url: final_url.to_string(),
                    message: format!("unsupported content type {ct}"),
                });
            }
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| map_reqwest_error(&final_url, err))?;
            if body.len() as u64 + chunk.len() as u64 > self.settings.max_bytes {
                return Err(too_large(&final_url, self.settings.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        let decoded = decode_document(&body, content_type.as_deref());
        recon_trace!(
            "Loaded {} ({} bytes, {}{})",
            final_url,
            body.len(),
            decoded.encoding,
            if decoded.lossy { ", lossy" } else { "" }
        );
        self.page = Some(LoadedPage {
            url: final_url,
            html: decoded.html,
        });
        self.typed.clear();
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for HttpDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        let target = Url::parse(url).map_err(|err| DriverError::Navigation {
            url: url.to_string(),
            message: err.to_string(),
        })?;
        self.load(PageRequest::Get(target)).await
    }

    /// Documents are complete once `navigate` returns.
    async fn wait_for_network_idle(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn is_present(&mut self, selector: &str) -> Result<bool, DriverError> {
        let page = self.loaded()?;
        let parsed = parse_selector(selector)
            .map_err(|_| DriverError::InvalidSelector(selector.to_string()))?;
        let document = Html::parse_document(&page.html);
        let present = document.select(&parsed).next().is_some();
        Ok(present)
    }

    async fn type_into(&mut self, selector: &str, text: &str) -> Result<(), DriverError> {
        let name = field_name(self.loaded()?, selector)?;
        self.typed.retain(|(existing, _)| existing != &name);
        self.typed.push((name, text.to_string()));
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), DriverError> {
        let request = plan_click(self.loaded()?, selector, &self.typed)?;
        self.load(request).await
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        Ok(self.loaded()?.url.to_string())
    }

    async fn content(&mut self) -> Result<String, DriverError> {
        Ok(self.loaded()?.html.clone())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        Err(DriverError::Unsupported("screenshot"))
    }

    fn attach_network_tap(&mut self, tap: Option<NetworkTap>) {
        self.tap = tap;
    }
}

fn too_large(url: &Url, max_bytes: u64) -> DriverError {
    DriverError::Navigation {
        url: url.to_string(),
        message: format!("response exceeds {max_bytes} bytes"),
    }
}

fn map_reqwest_error(url: &Url, err: reqwest::Error) -> DriverError {
    if err.is_timeout() {
        return DriverError::Timeout;
    }
    DriverError::Navigation {
        url: url.to_string(),
        message: err.to_string(),
    }
}

fn first_match<'a>(document: &'a Html, selector: &str) -> Result<ElementRef<'a>, DriverError> {
    let parsed =
        parse_selector(selector).map_err(|_| DriverError::InvalidSelector(selector.to_string()))?;
    document
        .select(&parsed)
        .next()
        .ok_or_else(|| DriverError::ElementNotFound(selector.to_string()))
}

fn field_name(page: &LoadedPage, selector: &str) -> Result<String, DriverError> {
    let document = Html::parse_document(&page.html);
    let element = first_match(&document, selector)?;
    let value = element.value();
    if !matches!(value.name(), "input" | "textarea" | "select") {
        return Err(not_interactable(selector, "not a form field"));
    }
    value
        .attr("name")
        .or_else(|| value.attr("id"))
        .map(str::to_string)
        .ok_or_else(|| not_interactable(selector, "field has no name"))
}

fn plan_click(
    page: &LoadedPage,
    selector: &str,
    typed: &[(String, String)],
) -> Result<PageRequest, DriverError> {
    let document = Html::parse_document(&page.html);
    let element = first_match(&document, selector)?;

    if element.value().name() == "a" {
        let href = element
            .value()
            .attr("href")
            .ok_or_else(|| not_interactable(selector, "anchor has no href"))?;
        let target = page
            .url
            .join(href.trim())
            .map_err(|err| not_interactable(selector, &err.to_string()))?;
        return Ok(PageRequest::Get(target));
    }

    let form = std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find(|candidate| candidate.value().name() == "form")
        .ok_or_else(|| not_interactable(selector, "not inside a form"))?;

    let mut fields = form_fields(form, element);
    for (name, value) in typed {
        match fields.iter_mut().find(|(existing, _)| existing == name) {
            Some(field) => field.1 = value.clone(),
            None => fields.push((name.clone(), value.clone())),
        }
    }

    let action = form
        .value()
        .attr("action")
        .map(str::trim)
        .filter(|action| !action.is_empty());
    let mut target = match action {
        Some(action) => page
            .url
            .join(action)
            .map_err(|err| not_interactable(selector, &err.to_string()))?,
        None => page.url.clone(),
    };

    let is_post = form
        .value()
        .attr("method")
        .is_some_and(|method| method.eq_ignore_ascii_case("post"));
    if is_post {
        return Ok(PageRequest::PostForm(target, fields));
    }
    target.query_pairs_mut().clear().extend_pairs(fields.iter());
    Ok(PageRequest::Get(target))
}

/// Successful controls of `form` as a browser would submit them via `submitter`.
fn form_fields(form: ElementRef<'_>, submitter: ElementRef<'_>) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    let Ok(controls) = parse_selector("input, select, textarea, button") else {
        return fields;
    };
    for control in form.select(&controls) {
        let value = control.value();
        let Some(name) = value.attr("name") else {
            continue;
        };
        if value.attr("disabled").is_some() {
            continue;
        }
        let kind = value.attr("type").unwrap_or("text").to_ascii_lowercase();
        let entry = match (value.name(), kind.as_str()) {
            ("button", _) | ("input", "submit" | "image") => {
                if control.id() != submitter.id() {
                    continue;
                }
                value.attr("value").unwrap_or("").to_string()
            }
            ("input", "button" | "reset" | "file") => continue,
            ("input", "checkbox" | "radio") => {
                if value.attr("checked").is_none() {
                    continue;
                }
                value.attr("value").unwrap_or("on").to_string()
            }
            ("select", _) => selected_option(control),
            ("textarea", _) => control.text().collect(),
            _ => value.attr("value").unwrap_or("").to_string(),
        };
        fields.push((name.to_string(), entry));
    }
    fields
}

fn selected_option(select: ElementRef<'_>) -> String {
    let Ok(options) = parse_selector("option") else {
        return String::new();
    };
    let mut all = select.select(&options);
    let first = all.next();
    let chosen = first
        .into_iter()
        .chain(all)
        .find(|option| option.value().attr("selected").is_some())
        .or(first);
    chosen
        .map(|option| {
            option
                .value()
                .attr("value")
                .map(str::to_string)
                .unwrap_or_else(|| option.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default()
}

fn not_interactable(selector: &str, reason: &str) -> DriverError {
    DriverError::NotInteractable {
        selector: selector.to_string(),
        reason: reason.to_string(),
    }
}

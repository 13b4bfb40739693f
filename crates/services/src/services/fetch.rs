//! Page fetcher with optional LLM summary.
//!
//! A fetch either returns everything (status, headers, metadata, summary) or
//! fails outright; there is no partial result.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Client, StatusCode, header::USER_AGENT, redirect};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;
use utils::text::{collapse_whitespace, truncate_chars};

use super::{
    config::GatewayConfig,
    llm::{self, LlmError, LlmProvider, prompts::PageDigest},
};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);
pub const MAX_REDIRECTS: usize = 5;
/// Characters of body text kept after whitespace collapsing.
pub const MAX_TEXT_CHARS: usize = 8000;
pub const PREVIEW_CHARS: usize = 400;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36";

lazy_static! {
    static ref SCHEME: Regex = Regex::new(r"(?i)^https?://").expect("valid scheme pattern");
    static ref TITLE: Selector = selector("title");
    static ref META_DESCRIPTION: Selector = selector(r#"meta[name="description"]"#);
    static ref OG_DESCRIPTION: Selector = selector(r#"meta[property="og:description"]"#);
    static ref CONTENT_REGIONS: [Selector; 3] =
        [selector("main"), selector("article"), selector("body")];
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid CSS")
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL")]
    MissingUrl,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Domain is blocked: {0}")]
    Blocked(String),
    #[error("Domain {domain} needs approval")]
    NeedsApproval { domain: String, url: String },
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Request failed with status code {status}")]
    Status { status: u16, body: String },
    #[error("Summary failed: {0}")]
    Summarize(#[from] LlmError),
}

impl FetchError {
    pub fn details(&self) -> Value {
        match self {
            FetchError::Status { body, .. } if !body.is_empty() => Value::String(body.clone()),
            FetchError::Summarize(e) => e.details(),
            other => Value::String(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub url: Option<String>,
    pub user_agent: Option<String>,
    pub summarize: bool,
    /// One-off approval for a host outside the allow-list.
    pub approve: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub title: String,
    pub desc: String,
    pub about: Option<String>,
    pub preview: String,
}

/// Metadata pulled out of an HTML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContent {
    pub title: String,
    pub description: String,
    pub text: String,
}

/// Add `https://` when the caller left the scheme off.
pub fn normalize_url(raw: Option<&str>) -> Result<String, FetchError> {
    let raw = utils::text::non_blank(raw).ok_or(FetchError::MissingUrl)?.trim();
    if SCHEME.is_match(raw) {
        Ok(raw.to_string())
    } else {
        Ok(format!("https://{raw}"))
    }
}

/// Exact host or any subdomain of a listed entry.
pub fn matches_domain(host: &str, domains: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    domains
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

/// Which hosts the fetcher may contact. The blocklist is fixed at startup
/// and always wins; the allow-list can grow at runtime. While the allow-list
/// is empty every host that is not blocked may be fetched.
#[derive(Debug, Default)]
pub struct DomainPolicy {
    blocked: Vec<String>,
    allowed: RwLock<BTreeSet<String>>,
}

impl DomainPolicy {
    pub fn new(blocked: Vec<String>, allowed: Vec<String>) -> Self {
        Self {
            blocked,
            allowed: RwLock::new(allowed.into_iter().collect()),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            config.blocked_domains.clone(),
            config.allowed_domains.clone(),
        )
    }

    pub fn blocked(&self) -> &[String] {
        &self.blocked
    }

    /// Sorted snapshot of the allow-list.
    pub fn allowed(&self) -> Vec<String> {
        self.allowed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Add `domain` and return the updated list.
    pub fn allow(&self, domain: &str) -> Vec<String> {
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        let mut allowed = self.allowed.write().unwrap_or_else(PoisonError::into_inner);
        if allowed.insert(domain.clone()) {
            tracing::info!("Added {} to the fetch allow-list", domain);
        }
        allowed.iter().cloned().collect()
    }

    pub fn is_blocked(&self, host: &str) -> bool {
        matches_domain(host, &self.blocked)
    }

    /// Blocked hosts are refused outright; hosts outside a non-empty
    /// allow-list need `approved`.
    pub fn check(&self, host: &str, url: &str, approved: bool) -> Result<(), FetchError> {
        if self.is_blocked(host) {
            tracing::warn!("Refusing to fetch blocked domain {}", host);
            return Err(FetchError::Blocked(host.to_string()));
        }
        if approved {
            return Ok(());
        }
        let allowed = self.allowed();
        if allowed.is_empty() || matches_domain(host, &allowed) {
            Ok(())
        } else {
            tracing::info!("Fetch of {} held for approval", host);
            Err(FetchError::NeedsApproval {
                domain: host.to_string(),
                url: url.to_string(),
            })
        }
    }
}

/// Raised from the redirect policy so the caller can tell a refused hop
/// from a network failure.
#[derive(Debug, Error)]
#[error("redirect to blocked domain {0}")]
struct BlockedRedirect(String);

/// Follow up to [`MAX_REDIRECTS`] hops, refusing any that lands on a
/// blocked host.
fn redirect_policy(blocked: Vec<String>) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        // `previous` includes the URL first requested.
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error(format!("more than {MAX_REDIRECTS} redirects"));
        }
        let blocked_host = attempt
            .url()
            .host_str()
            .filter(|host| matches_domain(host, &blocked))
            .map(str::to_string);
        match blocked_host {
            Some(host) => attempt.error(BlockedRedirect(host)),
            None => attempt.follow(),
        }
    })
}

fn blocked_redirect(error: &reqwest::Error) -> Option<String> {
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        if let Some(BlockedRedirect(host)) = cause.downcast_ref::<BlockedRedirect>() {
            return Some(host.clone());
        }
        source = std::error::Error::source(cause);
    }
    None
}

pub fn extract_content(html: &str) -> PageContent {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let first_content = |sel: &Selector| {
        document
            .select(sel)
            .next()
            .and_then(|el| el.value().attr("content"))
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    };
    let description = first_content(&META_DESCRIPTION)
        .or_else(|| first_content(&OG_DESCRIPTION))
        .unwrap_or_default();

    let text = CONTENT_REGIONS
        .iter()
        .map(|sel| {
            let raw: String = document.select(sel).map(visible_text).collect();
            collapse_whitespace(&raw)
        })
        .find(|text| !text.is_empty())
        .unwrap_or_default();

    PageContent {
        title,
        description,
        text: truncate_chars(&text, MAX_TEXT_CHARS).to_string(),
    }
}

/// Text nodes under `element`, skipping script and style bodies.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor.value().as_element().is_some_and(|el| {
                matches!(el.name(), "script" | "style" | "noscript" | "template")
            })
        });
        if !hidden {
            out.push_str(text);
        }
    }
    out
}

pub struct WebFetcher {
    client: Client,
    domains: Arc<DomainPolicy>,
}

impl WebFetcher {
    pub fn new(domains: Arc<DomainPolicy>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .redirect(redirect_policy(domains.blocked().to_vec()))
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(Self { client, domains })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, FetchError> {
        Self::new(Arc::new(DomainPolicy::from_config(config)))
    }

    pub fn domains(&self) -> &Arc<DomainPolicy> {
        &self.domains
    }

    /// Fetch, extract and optionally summarize.
    pub async fn fetch(
        &self,
        request: FetchRequest,
        provider: &dyn LlmProvider,
        config: &GatewayConfig,
    ) -> Result<FetchReport, FetchError> {
        let url = normalize_url(request.url.as_deref())?;
        let parsed = Url::parse(&url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl(format!("{url} has no host")))?;
        self.domains.check(host, &url, request.approve)?;

        let user_agent = utils::text::non_blank(request.user_agent.as_deref())
            .unwrap_or(DEFAULT_USER_AGENT);
        let response = self
            .client
            .get(parsed)
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| match blocked_redirect(&e) {
                Some(host) => {
                    tracing::warn!("Refusing redirect from {} to blocked domain {}", url, host);
                    FetchError::Blocked(host)
                }
                None => FetchError::Request(e.to_string()),
            })?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .fold(BTreeMap::<String, String>::new(), |mut acc, (name, value)| {
                let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                acc.entry(name.as_str().to_string())
                    .and_modify(|existing| {
                        existing.push_str(", ");
                        existing.push_str(&value);
                    })
                    .or_insert(value);
                acc
            });
        let html = response
            .text()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        if !is_acceptable(status) {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_chars(&html, PREVIEW_CHARS).to_string(),
            });
        }

        let content = extract_content(&html);
        tracing::debug!(
            "Fetched {} ({}): {} chars of text",
            url,
            status,
            content.text.len()
        );

        let about = if request.summarize {
            let digest = PageDigest {
                url: &url,
                title: &content.title,
                description: &content.description,
                text: &content.text,
            };
            llm::summarize_page(provider, config, &digest).await?
        } else {
            None
        };

        Ok(FetchReport {
            status: status.as_u16(),
            headers,
            title: content.title,
            desc: content.description,
            about,
            preview: truncate_chars(&html, PREVIEW_CHARS).to_string(),
        })
    }
}

/// Anything below 400 counts as a page, and so does a 404 body.
fn is_acceptable(status: StatusCode) -> bool {
    status.as_u16() < 400 || status == StatusCode::NOT_FOUND
}

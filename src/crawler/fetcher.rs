//! Remote category/content API adapter
//!
//! This module handles all HTTP traffic for the crawler:
//! - Building the HTTP client with user agent and timeouts
//! - Listing the members of a category page by page (cursor pagination)
//! - Fetching the plain-text extract of a single page
//!
//! Everything above this module speaks [`CategorySource`]; the MediaWiki wire
//! format stays contained here.

use crate::{FetchError, FetchResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// How a category member is typed by the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    /// A leaf content page
    Page,

    /// A nested category
    Subcategory,

    /// Anything else the API may return (files, templates, ...)
    Other,
}

impl ChildKind {
    fn from_member_type(kind: &str) -> Self {
        match kind {
            "page" => ChildKind::Page,
            "subcat" => ChildKind::Subcategory,
            _ => ChildKind::Other,
        }
    }
}

/// One member of a category listing
#[derive(Debug, Clone)]
pub struct ChildEntry {
    /// Full title, namespace prefix included for subcategories
    pub title: String,

    /// Member type as classified by the API
    pub kind: ChildKind,

    /// Namespace number; articles live in namespace 0
    pub namespace: i64,

    /// Page id, present for content pages
    pub page_id: Option<u64>,
}

impl ChildEntry {
    /// True for leaf pages in the article namespace
    pub fn is_article(&self) -> bool {
        self.kind == ChildKind::Page && self.namespace == 0
    }

    /// True for nested categories
    pub fn is_subcategory(&self) -> bool {
        self.kind == ChildKind::Subcategory
    }
}

/// One page of a category listing plus the cursor for the next page
#[derive(Debug)]
pub struct ChildBatch {
    pub entries: Vec<ChildEntry>,
    /// Continuation cursor; None when the listing is exhausted
    pub next: Option<String>,
}

/// Title and plain-text body of a downloaded page
#[derive(Debug, Clone)]
pub struct PageContent {
    pub title: String,
    pub text: String,
}

/// Source of category listings and page content
///
/// The crawl core only ever talks to this trait; production uses
/// [`MediaWikiSource`], tests substitute an in-memory implementation.
#[async_trait]
pub trait CategorySource: Send + Sync {
    /// Lists one batch of a category's members
    ///
    /// `cursor` is the continuation token from the previous batch, or None
    /// for the first request.
    async fn list_children(&self, category: &str, cursor: Option<&str>)
        -> FetchResult<ChildBatch>;

    /// Fetches the title and text extract of a single page
    async fn fetch_content(&self, page_id: u64) -> FetchResult<PageContent>;
}

/// Builds the HTTP client used for all API requests
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("wikigrove/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `CategorySource` backed by a MediaWiki `api.php` endpoint
pub struct MediaWikiSource {
    client: Client,
    endpoint: String,
}

impl MediaWikiSource {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

// ---- Wire format -----------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MembersReply {
    #[serde(rename = "continue")]
    next: Option<MembersContinue>,
    query: Option<MembersQuery>,
}

#[derive(Debug, Deserialize)]
struct MembersContinue {
    cmcontinue: String,
}

#[derive(Debug, Deserialize)]
struct MembersQuery {
    #[serde(default)]
    categorymembers: Vec<Member>,
}

#[derive(Debug, Deserialize)]
struct Member {
    title: String,
    #[serde(rename = "type", default)]
    kind: String,
    ns: i64,
    #[serde(default)]
    pageid: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ExtractReply {
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    pages: HashMap<String, ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    title: String,
    #[serde(default)]
    extract: Option<String>,
}

impl From<Member> for ChildEntry {
    fn from(member: Member) -> Self {
        ChildEntry {
            kind: ChildKind::from_member_type(&member.kind),
            title: member.title,
            namespace: member.ns,
            page_id: member.pageid,
        }
    }
}

#[async_trait]
impl CategorySource for MediaWikiSource {
    async fn list_children(
        &self,
        category: &str,
        cursor: Option<&str>,
    ) -> FetchResult<ChildBatch> {
        let mut params = vec![
            ("action", "query"),
            ("format", "json"),
            ("list", "categorymembers"),
            ("cmprop", "title|type|ids"),
            ("cmlimit", "500"),
            ("cmtitle", category),
        ];
        if let Some(cursor) = cursor {
            params.push(("cmcontinue", cursor));
        }

        let response = self.client.get(&self.endpoint).query(&params).send().await?;
        let url = response.url().to_string();
        tracing::debug!("Listing {}", url);

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let reply: MembersReply = response.json().await?;
        let query = reply.query.ok_or_else(|| FetchError::MalformedReply {
            url,
            message: "reply has no query object".to_string(),
        })?;

        Ok(ChildBatch {
            entries: query.categorymembers.into_iter().map(Into::into).collect(),
            next: reply.next.map(|c| c.cmcontinue),
        })
    }

    async fn fetch_content(&self, page_id: u64) -> FetchResult<PageContent> {
        let id = page_id.to_string();
        let params = [
            ("action", "query"),
            ("format", "json"),
            ("prop", "extracts"),
            ("exsectionformat", "plain"),
            ("pageids", id.as_str()),
        ];

        let response = self.client.get(&self.endpoint).query(&params).send().await?;
        let url = response.url().to_string();
        tracing::debug!("Fetching {}", url);

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let reply: ExtractReply = response.json().await?;
        let page = reply
            .query
            .and_then(|mut q| q.pages.remove(&id))
            .ok_or_else(|| FetchError::MalformedReply {
                url: url.clone(),
                message: format!("reply has no page {}", id),
            })?;

        let text = page.extract.ok_or_else(|| FetchError::MalformedReply {
            url,
            message: format!("page {} has no extract", id),
        })?;

        Ok(PageContent {
            title: page.title,
            text,
        })
    }
}

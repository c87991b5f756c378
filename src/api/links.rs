//! Cursor pagination via the `Link` response header
//!
//! Header format:
//! ```text
//! <https://host/api/0/x/?cursor=0:0:1>; rel="previous"; results="false"; cursor="0:0:1",
//! <https://host/api/0/x/?cursor=0:100:0>; rel="next"; results="true"; cursor="0:100:0"
//! ```

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LinkError {
    #[error("Malformed Link header segment: '{0}'")]
    Malformed(String),
}

/// One pagination link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub href: String,

    /// Whether following the link yields any results
    pub results: bool,

    pub cursor: String,
}

/// Previous/next links of a paginated response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    pub previous: Option<PageLink>,
    pub next: Option<PageLink>,
}

impl PageLinks {
    /// Parses a `Link` header
    pub fn parse(header: &str) -> Result<Self, LinkError> {
        let mut links = PageLinks::default();
        let header = header.trim();
        if header.is_empty() {
            return Ok(links);
        }

        for segment in header.split(", <") {
            let segment = segment.trim().trim_start_matches('<');
            let (href, params) = segment
                .split_once('>')
                .ok_or_else(|| LinkError::Malformed(segment.to_string()))?;

            let mut rel = None;
            let mut results = false;
            let mut cursor = String::new();

            for param in params.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                let (key, value) = param
                    .split_once('=')
                    .ok_or_else(|| LinkError::Malformed(segment.to_string()))?;
                let value = value.trim().trim_matches('"');
                match key.trim() {
                    "rel" => rel = Some(value.to_string()),
                    "results" => results = value == "true",
                    "cursor" => cursor = value.to_string(),
                    _ => {}
                }
            }

            let link = PageLink {
                href: href.to_string(),
                results,
                cursor,
            };
            match rel.as_deref() {
                Some("previous") => links.previous = Some(link),
                Some("next") => links.next = Some(link),
                Some(_) => {}
                None => return Err(LinkError::Malformed(segment.to_string())),
            }
        }

        Ok(links)
    }

    /// Cursor for the next page, if there is one with results
    pub fn next_cursor(&self) -> Option<&str> {
        self.next
            .as_ref()
            .filter(|l| l.results)
            .map(|l| l.cursor.as_str())
    }

    /// Cursor for the previous page, if there is one with results
    pub fn previous_cursor(&self) -> Option<&str> {
        self.previous
            .as_ref()
            .filter(|l| l.results)
            .map(|l| l.cursor.as_str())
    }
}

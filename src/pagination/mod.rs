//! Pagination handling for the GitHub REST API.
//!
//! The [`LinkHeaderInfo`] parser turns a `Link` response header into page
//! numbers. The engine functions ([`get_all_data`], [`get_all_data_until`],
//! [`get_all_filtered_data`]) drive a caller-supplied page fetch function
//! using that information.

mod engine;

pub use engine::{get_all_data, get_all_data_until, get_all_filtered_data, split_search_groups};

use crate::client::ResponseMeta;
use crate::config::MAX_PER_PAGE;
use regex::Regex;
use reqwest::header::HeaderMap;
use std::sync::OnceLock;

/// Name of the pagination header.
pub const LINK_HEADER: &str = "link";

fn page_param() -> &'static Regex {
    static PAGE_PARAM: OnceLock<Regex> = OnceLock::new();
    PAGE_PARAM.get_or_init(|| Regex::new(r"[?&]page=(\d+)").expect("page regex is valid"))
}

/// One comma-separated section of a Link header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSection {
    /// URL with the surrounding angle brackets removed.
    pub url: String,
    /// Everything after the first `;`, e.g. `rel="next"`.
    pub metadata: String,
}

/// Page pointers parsed from a Link header.
///
/// Page numbers are 1-based; a relation that is absent is `0`.
/// `total_pages >= next_page` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkHeaderInfo {
    /// Page from the `prev` relation.
    pub previous_page: u32,
    /// Page from the `next` relation.
    pub next_page: u32,
    /// Page from the `last` relation.
    pub total_pages: u32,
    /// Page from the `first` relation.
    pub first_page: u32,
    /// Every section in header order, including unrecognized relations.
    pub raw_sections: Vec<LinkSection>,
}

impl LinkHeaderInfo {
    /// Parses a raw Link header value.
    ///
    /// Returns `None` for an empty header, meaning no pagination information
    /// is available and the response should be treated as the only page.
    pub fn parse(header_value: &str) -> Option<Self> {
        if header_value.trim().is_empty() {
            return None;
        }

        let mut info = Self::default();

        for section in split_sections(header_value) {
            let (url_part, metadata) = match section.split_once(';') {
                Some((url, metadata)) => (url.trim(), metadata.trim()),
                None => (section.trim(), ""),
            };
            let url = url_part.trim_start_matches('<').trim_end_matches('>');
            let page = extract_page_number(url).unwrap_or(0);

            if metadata.contains(r#"rel="prev""#) {
                info.previous_page = page;
            } else if metadata.contains(r#"rel="next""#) {
                info.next_page = page;
            } else if metadata.contains(r#"rel="last""#) {
                info.total_pages = page;
            } else if metadata.contains(r#"rel="first""#) {
                info.first_page = page;
            }

            info.raw_sections.push(LinkSection {
                url: url.to_string(),
                metadata: metadata.to_string(),
            });
        }

        // A `next` without a `last` still proves at least that many pages exist.
        info.total_pages = info.total_pages.max(info.next_page);

        Some(info)
    }

    /// Parses the Link header from response headers.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(LINK_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(Self::parse)
    }

    /// Parses the Link header of a response.
    pub fn from_response(response: &ResponseMeta) -> Option<Self> {
        Self::from_headers(response.headers())
    }

    /// Returns true if there is a next page.
    pub fn has_next(&self) -> bool {
        self.next_page > 0
    }

    /// Returns true if there is a previous page.
    pub fn has_prev(&self) -> bool {
        self.previous_page > 0
    }
}

/// Splits on commas that are not inside `<...>`, so query strings such as
/// `labels=bug,docs` stay within their section.
fn split_sections(header_value: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (idx, ch) in header_value.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                sections.push(&header_value[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    sections.push(&header_value[start..]);

    sections
}

/// Extracts the `page=` query parameter from a URL.
pub fn extract_page_number(url: &str) -> Option<u32> {
    page_param()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Clamps a page number to the 1-based range.
pub fn clamp_page(page: u32) -> u32 {
    page.max(1)
}

/// Clamps a page size into `[1, 100]`.
pub fn clamp_per_page(per_page: u32) -> u32 {
    per_page.clamp(1, MAX_PER_PAGE)
}

/// Pagination parameters for list requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationParams {
    /// Page number (1-indexed).
    pub page: u32,
    /// Items per page (max 100).
    pub per_page: u32,
}

impl PaginationParams {
    /// Creates clamped pagination parameters.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: clamp_page(page),
            per_page: clamp_per_page(per_page),
        }
    }

    /// Converts to query parameters.
    pub fn to_query(&self) -> Vec<(String, String)> {
        vec![
            ("per_page".to_string(), self.per_page.to_string()),
            ("page".to_string(), self.page.to_string()),
        ]
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self::new(1, MAX_PER_PAGE)
    }
}

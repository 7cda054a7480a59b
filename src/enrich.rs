//! Metadata enrichment: turn a raw URL into display-ready bookmark fields.
//!
//! The page fetch is the only fatal step. Favicon retrieval and color
//! extraction are best-effort; any failure there degrades to a null color
//! and the request still succeeds.

use std::time::Duration;

use color_quant::NeuQuant;
use image::DynamicImage;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use serde::Serialize;

use crate::error::EnrichError;

/// Timeout for the primary page fetch (seconds).
pub const PAGE_TIMEOUT_SECS: u64 = 10;

/// Timeout for the favicon fetch (seconds).
pub const FAVICON_TIMEOUT_SECS: u64 = 5;

/// Palette size for the dominant-color quantization.
const PALETTE_COLORS: usize = 16;

#[derive(Debug, Clone, Serialize)]
pub struct Enriched {
    pub title: String,
    #[serde(rename = "faviconColor")]
    pub favicon_color: Option<[u8; 3]>,
}

pub struct Enricher {
    page_client: Client,
    icon_client: Client,
}

impl Enricher {
    pub fn new() -> anyhow::Result<Self> {
        let page_client = Client::builder()
            .timeout(Duration::from_secs(PAGE_TIMEOUT_SECS))
            .build()?;
        let icon_client = Client::builder()
            .timeout(Duration::from_secs(FAVICON_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            page_client,
            icon_client,
        })
    }

    pub async fn enrich(&self, raw_url: &str) -> Result<Enriched, EnrichError> {
        let url = normalize_url(raw_url)?;

        let resp = self
            .page_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| EnrichError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(EnrichError::Status(resp.status().as_u16()));
        }
        let html = resp
            .text()
            .await
            .map_err(|e| EnrichError::Transport(e.to_string()))?;

        let title = extract_title(&html);
        let favicon_color = self.favicon_color(&url).await;

        Ok(Enriched {
            title,
            favicon_color,
        })
    }

    /// Best-effort: every failure on this path is swallowed into `None`.
    async fn favicon_color(&self, page_url: &Url) -> Option<[u8; 3]> {
        let icon_url = favicon_url(page_url)?;

        let resp = match self.icon_client.get(icon_url.clone()).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!("favicon fetch failed for {}: {}", icon_url, e);
                return None;
            }
        };
        if !resp.status().is_success() {
            tracing::debug!("favicon fetch for {} returned {}", icon_url, resp.status());
            return None;
        }
        let bytes = resp.bytes().await.ok()?;

        let img = match image::load_from_memory(&bytes) {
            Ok(img) => img,
            Err(e) => {
                tracing::debug!("favicon decode failed for {}: {}", icon_url, e);
                return None;
            }
        };
        dominant_color(&img)
    }
}

/// Prepends `https://` when the scheme is missing, then parses.
pub fn normalize_url(raw: &str) -> Result<Url, EnrichError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(EnrichError::InvalidUrl(raw.to_string()));
    }

    let candidate = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let url = Url::parse(&candidate).map_err(|_| EnrichError::InvalidUrl(raw.to_string()))?;
    if url.host_str().is_none() {
        return Err(EnrichError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// `scheme://host[:port]/favicon.ico` for the page's origin.
fn favicon_url(page_url: &Url) -> Option<Url> {
    page_url.host_str()?;
    let mut url = page_url.clone();
    url.set_path("/favicon.ico");
    url.set_query(None);
    url.set_fragment(None);
    Some(url)
}

/// First `<title>` element's text, whitespace-collapsed; empty when absent.
pub fn extract_title(html: &str) -> String {
    let document = Html::parse_document(html);
    if let Ok(sel) = Selector::parse("title") {
        if let Some(el) = document.select(&sel).next() {
            let text = el.text().collect::<String>();
            return text.split_whitespace().collect::<Vec<_>>().join(" ");
        }
    }
    String::new()
}

/// Most dominant opaque color after NeuQuant palette reduction.
pub fn dominant_color(img: &DynamicImage) -> Option<[u8; 3]> {
    let rgba = img.to_rgba8();
    let pixels: Vec<u8> = rgba
        .pixels()
        .filter(|p| p[3] >= 128)
        .flat_map(|p| p.0)
        .collect();
    if pixels.is_empty() {
        return None;
    }

    let quantizer = NeuQuant::new(10, PALETTE_COLORS, &pixels);
    let mut counts = vec![0u64; PALETTE_COLORS];
    for px in pixels.chunks_exact(4) {
        counts[quantizer.index_of(px)] += 1;
    }

    let best = counts
        .iter()
        .enumerate()
        .max_by_key(|(_, count)| **count)
        .map(|(i, _)| i)?;
    let palette = quantizer.color_map_rgba();
    Some([palette[best * 4], palette[best * 4 + 1], palette[best * 4 + 2]])
}

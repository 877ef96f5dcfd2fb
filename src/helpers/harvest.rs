use reqwest::{header, Client};
use std::{fs, path::Path};
use tracing::{error, info};

use crate::error::{BalanceError, Result};
use crate::models::harvest::{CachedEntries, TimeEntriesPage, TimeEntry};

pub const HARVEST_API_URL: &str = "https://api.harvestapp.com/api/v2";

pub fn harvest_client_init(account_id: &str, token: &str) -> Result<Client> {
    info!("Initializing Harvest client");

    let malformed_header = |what: &str| {
        error!("Failed to create {} header value", what);
        BalanceError::malformed(what, "contains characters not allowed in an HTTP header")
    };

    let mut bearer = header::HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| malformed_header("HARVEST_API_BEARER"))?;
    bearer.set_sensitive(true);

    let account = header::HeaderValue::from_str(account_id)
        .map_err(|_| malformed_header("HARVEST_API_ID"))?;

    let mut headers = header::HeaderMap::new();
    headers.insert(header::AUTHORIZATION, bearer);
    headers.insert("Harvest-Account-ID", account);
    headers.insert(header::USER_AGENT, header::HeaderValue::from_static("TimeChecker"));

    match Client::builder().default_headers(headers).build() {
        Ok(client) => {
            info!("Harvest client initialized successfully");
            Ok(client)
        }
        Err(e) => {
            error!("Failed to build Harvest client: {}", e);
            Err(e.into())
        }
    }
}

pub async fn fetch_page(client: &Client, base_url: &str, page: u32) -> Result<TimeEntriesPage> {
    let url = format!("{}/time_entries", base_url.trim_end_matches('/'));
    info!("Fetching time entries page {} from {}", page, url);

    let response = match client.get(&url).query(&[("page", page)]).send().await {
        Ok(resp) => {
            if !resp.status().is_success() {
                let status = resp.status();
                let error_text = resp
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                error!(
                    "Harvest API returned error status {}: {}",
                    status, error_text
                );
                return Err(BalanceError::UpstreamStatus {
                    status: status.as_u16(),
                    body: error_text,
                });
            }
            resp
        }
        Err(e) => {
            error!("Failed to send request to Harvest API: {}", e);
            return Err(e.into());
        }
    };

    let text = response.text().await.inspect_err(|e| {
        error!("Failed to read response body: {}", e);
    })?;

    match serde_json::from_str::<TimeEntriesPage>(&text) {
        Ok(page) => {
            info!(
                "Parsed page {}/{} with {} entries",
                page.page,
                page.total_pages,
                page.time_entries.len()
            );
            Ok(page)
        }
        Err(e) => {
            error!("Failed to parse Harvest response: {}", e);
            error!("Raw response: {}", text);
            Err(BalanceError::UpstreamPayload(e))
        }
    }
}

/// Walks the pages one after another; the page count is only known once
/// the first page arrived.
pub async fn fetch_all_entries(client: &Client, base_url: &str) -> Result<Vec<TimeEntry>> {
    let mut page = 1;
    let first = fetch_page(client, base_url, page).await?;
    let total_pages = first.total_pages;
    let mut entries = first.time_entries;

    while total_pages > page {
        page += 1;
        let next = fetch_page(client, base_url, page).await?;
        entries.extend(next.time_entries);
    }

    info!(
        "Fetched {} time entries over {} page(s)",
        entries.len(),
        total_pages.max(1)
    );
    Ok(entries)
}

pub fn load_cached_entries(path: &Path) -> Result<Vec<TimeEntry>> {
    info!("Reading cached time entries from {}", path.display());

    let text = fs::read_to_string(path).map_err(|source| BalanceError::Cache {
        path: path.to_path_buf(),
        source,
    })?;

    let entries = serde_json::from_str::<CachedEntries>(&text)
        .map_err(|source| {
            error!("Failed to parse cache file {}: {}", path.display(), source);
            BalanceError::CachePayload {
                path: path.to_path_buf(),
                source,
            }
        })?
        .into_entries();

    info!("Loaded {} cached time entries", entries.len());
    Ok(entries)
}

pub fn write_cached_entries(path: &Path, entries: &[TimeEntry]) -> Result<()> {
    let cache_error = |source| BalanceError::Cache {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(cache_error)?;
    }

    let document = CachedEntries::Envelope {
        time_entries: entries.to_vec(),
    };
    let json = serde_json::to_string_pretty(&document).map_err(|source| {
        BalanceError::CachePayload {
            path: path.to_path_buf(),
            source,
        }
    })?;
    fs::write(path, json).map_err(cache_error)?;

    info!("Wrote {} time entries to {}", entries.len(), path.display());
    Ok(())
}

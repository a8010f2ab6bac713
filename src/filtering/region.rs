//! URL based region filtering.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

use super::Filter;

/// Accepted URL parts. Comparisons are case insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlFilterConfig {
    /// last label of the host (`de` in `www.example.de`)
    pub tlds: Vec<String>,
    /// first label of the host (`de` in `de.wikipedia.org`)
    pub subdomains: Vec<String>,
    /// any path segment (`de-at` in `/en/de-at/services`)
    pub path_segments: Vec<String>,
}

impl Default for UrlFilterConfig {
    /// German speaking countries.
    fn default() -> Self {
        let to_vec = |items: &[&str]| -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        };
        Self {
            tlds: to_vec(&["de", "at", "ch"]),
            subdomains: to_vec(&["de", "at", "ch"]),
            path_segments: to_vec(&["de", "de-de", "de-at", "de-ch"]),
        }
    }
}

/// Keeps http(s) URLs matching a TLD, a subdomain or a path segment.
pub struct UrlFilter {
    tlds: HashSet<String>,
    subdomains: HashSet<String>,
    path_segments: HashSet<String>,
}

impl From<&UrlFilterConfig> for UrlFilter {
    fn from(config: &UrlFilterConfig) -> Self {
        let lower = |items: &[String]| -> HashSet<String> {
            items.iter().map(|s| s.to_lowercase()).collect()
        };
        Self {
            tlds: lower(&config.tlds),
            subdomains: lower(&config.subdomains),
            path_segments: lower(&config.path_segments),
        }
    }
}

impl Default for UrlFilter {
    fn default() -> Self {
        Self::from(&UrlFilterConfig::default())
    }
}

impl Filter<&str> for UrlFilter {
    fn detect(&self, url: &str) -> bool {
        let url = match Url::parse(url) {
            Ok(url) => url,
            Err(_) => return false,
        };

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_lowercase(),
            _ => return false,
        };

        let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
        if let Some(tld) = labels.last() {
            if self.tlds.contains(*tld) {
                return true;
            }
        }
        if labels.len() > 2 && self.subdomains.contains(labels[0]) {
            return true;
        }

        url.path_segments()
            .map(|mut segments| {
                segments.any(|segment| self.path_segments.contains(&segment.to_lowercase()))
            })
            .unwrap_or(false)
    }
}

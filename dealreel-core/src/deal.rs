use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// One discounted offer as delivered by the feed client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub appid: u64,
    pub name: String,
    pub currency: String,
    /// Minor units (cents).
    pub original_price: i64,
    /// Minor units (cents).
    pub final_price: i64,
    pub discount_percent: u32,
    /// Unix seconds.
    pub discount_expiration: i64,
}

impl Deal {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.discount_expiration, 0).single()
    }

    pub fn discount_label(&self) -> String {
        format!("-{}%", self.discount_percent)
    }

    pub fn original_price_label(&self) -> String {
        format_price(self.original_price, &self.currency)
    }

    pub fn final_price_label(&self) -> String {
        format_price(self.final_price, &self.currency)
    }
}

pub fn format_price(minor_units: i64, currency: &str) -> String {
    if minor_units <= 0 {
        return "Free".to_string();
    }
    format!("{:.2} {}", minor_units as f64 / 100.0, currency)
}

/// Ordered, de-duplicated trailer URLs for one deal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TrailerCandidates {
    urls: Vec<String>,
}

impl TrailerCandidates {
    pub fn new<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut urls: Vec<String> = Vec::new();
        for candidate in raw {
            let trimmed = candidate.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }
            let normalized = normalize_url(trimmed);
            if !urls.contains(&normalized) {
                urls.push(normalized);
            }
        }
        Self { urls }
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for TrailerCandidates {
    fn from(urls: Vec<String>) -> Self {
        Self::new(urls)
    }
}

impl From<TrailerCandidates> for Vec<String> {
    fn from(candidates: TrailerCandidates) -> Self {
        candidates.urls
    }
}

/// Remote trailer links carry short-lived signing tokens in the query string.
fn normalize_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) if matches!(parsed.scheme(), "http" | "https") => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        _ => raw.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealEntry {
    pub deal: Deal,
    #[serde(default)]
    pub trailers: TrailerCandidates,
}

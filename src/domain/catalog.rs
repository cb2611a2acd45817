use std::cmp::Ordering;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// A purchasable line of a gig. Prices are in MAD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceItem {
    pub id: String,
    pub title: String,
    pub price: BigDecimal,
}

/// A provider's service listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gig {
    pub id: Uuid,
    pub artist_id: String,
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub items: Vec<ServiceItem>,
    pub created_at: DateTime<Utc>,
}

impl Gig {
    /// Cheapest single item, used as the "from" price on listings.
    pub fn starting_price(&self) -> Option<&BigDecimal> {
        self.items.iter().map(|i| &i.price).min()
    }

    pub fn item(&self, item_id: &str) -> Option<&ServiceItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    fn mentions(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.category.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GigSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Title,
}

impl FromStr for GigSort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "newest" => Ok(GigSort::Newest),
            "price_asc" => Ok(GigSort::PriceAsc),
            "price_desc" => Ok(GigSort::PriceDesc),
            "title" => Ok(GigSort::Title),
            other => Err(DomainError::validation(format!("unknown sort '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GigQuery {
    pub text: Option<String>,
    pub category: Option<String>,
    pub max_price: Option<BigDecimal>,
    pub sort: GigSort,
}

/// Immutable copy of the catalog taken by an explicit fetch.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub gigs: Vec<Gig>,
    pub fetched_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    pub fn new(gigs: Vec<Gig>, fetched_at: DateTime<Utc>) -> Self {
        Self { gigs, fetched_at }
    }

    pub fn gig(&self, id: Uuid) -> Option<&Gig> {
        self.gigs.iter().find(|g| g.id == id)
    }

    pub fn search(&self, query: &GigQuery) -> Vec<&Gig> {
        let needle = query
            .text
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());
        let category = query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let mut hits: Vec<&Gig> = self
            .gigs
            .iter()
            .filter(|g| needle.as_deref().map_or(true, |n| g.mentions(n)))
            .filter(|g| category.map_or(true, |c| g.category.eq_ignore_ascii_case(c)))
            .filter(|g| match &query.max_price {
                Some(max) => g.starting_price().is_some_and(|p| p <= max),
                None => true,
            })
            .collect();

        match query.sort {
            GigSort::Newest => hits.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            GigSort::PriceAsc => hits.sort_by(|a, b| by_price(a, b, false)),
            GigSort::PriceDesc => hits.sort_by(|a, b| by_price(a, b, true)),
            GigSort::Title => hits.sort_by_key(|g| g.title.to_lowercase()),
        }
        hits
    }
}

// Gigs without items sort after priced ones.
fn by_price(a: &Gig, b: &Gig, descending: bool) -> Ordering {
    match (a.starting_price(), b.starting_price()) {
        (Some(x), Some(y)) if descending => y.cmp(x),
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

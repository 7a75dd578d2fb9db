use std::fmt;
use std::str::FromStr;

use crate::page::{Display, Document, Element};

pub const PRICE_OPTIONS: [PriceFilter; 4] = [
    PriceFilter::All,
    PriceFilter::Max(10),
    PriceFilter::Max(50),
    PriceFilter::Max(100),
];

/// Ceiling picked in the price drop-down of the index page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriceFilter {
    #[default]
    All,
    Max(u32),
}

impl PriceFilter {
    pub fn admits(&self, price: f64) -> bool {
        match self {
            PriceFilter::All => true,
            // NaN never passes a ceiling
            PriceFilter::Max(max) => price <= f64::from(*max),
        }
    }
}

impl fmt::Display for PriceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceFilter::All => f.write_str("All"),
            PriceFilter::Max(max) => write!(f, "{max}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("price filter must be one of All, 10, 50, 100 (got {0:?})")]
pub struct InvalidPriceFilter(String);

impl FromStr for PriceFilter {
    type Err = InvalidPriceFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PRICE_OPTIONS
            .into_iter()
            .find(|option| option.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| InvalidPriceFilter(s.to_string()))
    }
}

/// Fill the drop-down with the fixed options, once
pub fn setup(doc: &mut Document) {
    let Some(select) = doc.by_id_mut("price-filter") else {
        return;
    };
    if !select.children.is_empty() {
        return;
    }
    for option in PRICE_OPTIONS {
        let value = option.to_string();
        let mut el = Element::new("option").attr("value", &value).html(value.clone());
        if option == PriceFilter::All {
            el = el.attr("selected", "selected");
        }
        select.children.push(el);
    }
}

/// Show or hide the rendered place cards. Nothing is fetched again.
pub fn apply(doc: &mut Document, filter: PriceFilter) {
    if let Some(select) = doc.by_id_mut("price-filter") {
        let selected = filter.to_string();
        for option in &mut select.children {
            if option.attrs.get("value") == Some(&selected) {
                option.attrs.insert("selected".to_string(), "selected".to_string());
            } else {
                option.attrs.remove("selected");
            }
        }
    }
    doc.for_each_by_class("place-card", |card| {
        let price = card
            .attrs
            .get("data-price")
            .and_then(|p| p.parse::<f64>().ok())
            .unwrap_or(f64::NAN);
        card.display = if filter.admits(price) {
            Display::Block
        } else {
            Display::None
        };
    });
}

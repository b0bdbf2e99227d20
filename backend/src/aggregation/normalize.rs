use super::source::{ExternalListing, PriceValue};
use crate::models::{AggregatedListing, Marketplace};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

const MAX_TITLE_LEN: usize = 200;

/// Trim and collapse runs of whitespace
pub fn normalize_title(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_TITLE_LEN {
        collapsed.chars().take(MAX_TITLE_LEN).collect()
    } else {
        collapsed
    }
}

/// Parse a display price such as "$1,234.50", "US $ 12" or "12.5"
pub fn parse_price(value: &PriceValue) -> Option<Decimal> {
    let price = match value {
        PriceValue::Number(n) if n.is_finite() => Decimal::from_f64(*n)?,
        PriceValue::Number(_) => return None,
        PriceValue::Text(text) => {
            let cleaned: String = text
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            Decimal::from_str(&cleaned).ok()?
        }
    };

    if price.is_sign_negative() {
        return None;
    }

    Some(price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

fn normalize_currency(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|c| c.len() == 3 && c.chars().all(|ch| ch.is_ascii_alphabetic()))
        .map(str::to_uppercase)
        .unwrap_or_else(|| "USD".to_string())
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `None` when the listing is unusable: no id, no title, or no valid price
pub fn normalize_listing(marketplace: Marketplace, raw: &ExternalListing) -> Option<AggregatedListing> {
    let external_id = raw.id.trim();
    if external_id.is_empty() {
        return None;
    }

    let title = normalize_title(&raw.title);
    if title.is_empty() {
        return None;
    }

    let price = parse_price(&raw.price)?;

    Some(AggregatedListing {
        marketplace,
        external_id: external_id.to_string(),
        title,
        price,
        currency: normalize_currency(raw.currency.as_deref()),
        listing_url: non_empty(raw.url.as_deref()),
        image_url: non_empty(raw.image_url.as_deref()),
        bid_count: raw.bids.unwrap_or(0).max(0),
        ends_at: raw.ends_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, title: &str, price: PriceValue) -> ExternalListing {
        ExternalListing {
            id: id.to_string(),
            title: title.to_string(),
            price,
            currency: None,
            url: Some("  ".to_string()),
            image_url: None,
            bids: Some(-3),
            ends_at: None,
        }
    }

    #[test]
    fn test_parse_price_text() {
        assert_eq!(
            parse_price(&PriceValue::Text("$1,234.50".into())),
            Some(Decimal::new(123450, 2))
        );
        assert_eq!(
            parse_price(&PriceValue::Text("US $ 12".into())),
            Some(Decimal::new(12, 0))
        );
        assert_eq!(parse_price(&PriceValue::Text("Free shipping".into())), None);
        assert_eq!(parse_price(&PriceValue::Text("-5.00".into())), None);
    }

    #[test]
    fn test_parse_price_number() {
        assert_eq!(
            parse_price(&PriceValue::Number(19.999)),
            Some(Decimal::new(2000, 2))
        );
        assert_eq!(parse_price(&PriceValue::Number(f64::NAN)), None);
        assert_eq!(parse_price(&PriceValue::Number(-1.0)), None);
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Nikon   F3\n body  "), "Nikon F3 body");
        assert_eq!(normalize_title(&"x".repeat(300)).len(), MAX_TITLE_LEN);
    }

    #[test]
    fn test_normalize_listing() {
        let listing = normalize_listing(
            Marketplace::Mercari,
            &raw(" m42 ", " Game  Boy ", PriceValue::Text("$45".into())),
        )
        .unwrap();

        assert_eq!(listing.external_id, "m42");
        assert_eq!(listing.title, "Game Boy");
        assert_eq!(listing.currency, "USD");
        assert_eq!(listing.listing_url, None);
        assert_eq!(listing.bid_count, 0);
    }

    #[test]
    fn test_normalize_rejects_unusable() {
        assert!(normalize_listing(Marketplace::Ebay, &raw("", "Lens", PriceValue::Number(1.0))).is_none());
        assert!(normalize_listing(Marketplace::Ebay, &raw("1", "   ", PriceValue::Number(1.0))).is_none());
        assert!(normalize_listing(
            Marketplace::Ebay,
            &raw("1", "Lens", PriceValue::Text("call for price".into()))
        )
        .is_none());
    }

    #[test]
    fn test_currency_normalization() {
        assert_eq!(normalize_currency(Some(" eur ")), "EUR");
        assert_eq!(normalize_currency(Some("dollars")), "USD");
        assert_eq!(normalize_currency(None), "USD");
    }
}

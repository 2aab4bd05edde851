use chrono::{DateTime, Utc};

use super::snapshot::ItemSnapshot;

/// Every attribute of a snapshot that is compared between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    ForSale,
    Price,
    Description,
    Creator,
    Updated,
    Limited,
    Collectible,
    Remaining,
    Thumbnail,
}

impl Field {
    /// Comparison (and reporting) order.
    pub const ALL: [Field; 10] = [
        Field::Name,
        Field::ForSale,
        Field::Price,
        Field::Description,
        Field::Creator,
        Field::Updated,
        Field::Limited,
        Field::Collectible,
        Field::Remaining,
        Field::Thumbnail,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::ForSale => "forsale",
            Field::Price => "price",
            Field::Description => "description",
            Field::Creator => "creator",
            Field::Updated => "updated",
            Field::Limited => "islimited",
            Field::Collectible => "iscollectible",
            Field::Remaining => "remaining",
            Field::Thumbnail => "thumbnail",
        }
    }

    /// Human-facing name used in alerts.
    pub fn label(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::ForSale => "sale status",
            Field::Price => "price",
            Field::Description => "description",
            Field::Creator => "creator",
            Field::Updated => "last updated time",
            Field::Limited => "limited status",
            Field::Collectible => "collectible status",
            Field::Remaining => "quantity",
            Field::Thumbnail => "thumbnail",
        }
    }

    /// Exact comparison. `None`, `Free` and every amount are all distinct prices.
    pub fn differs(&self, a: &ItemSnapshot, b: &ItemSnapshot) -> bool {
        match self {
            Field::Name => a.name != b.name,
            Field::ForSale => a.for_sale != b.for_sale,
            Field::Price => a.price != b.price,
            Field::Description => a.description != b.description,
            Field::Creator => a.creator != b.creator,
            Field::Updated => a.updated != b.updated,
            Field::Limited => a.is_limited != b.is_limited,
            Field::Collectible => a.is_collectible != b.is_collectible,
            Field::Remaining => a.remaining != b.remaining,
            Field::Thumbnail => a.thumbnail != b.thumbnail,
        }
    }

    /// Display form of this field's value in `snapshot`.
    pub fn render(&self, snapshot: &ItemSnapshot) -> String {
        match self {
            Field::Name => snapshot.name.clone(),
            Field::ForSale => yes_no(snapshot.for_sale),
            Field::Price => match snapshot.price {
                Some(price) => price.to_string(),
                None => "no price".to_string(),
            },
            Field::Description if snapshot.description.is_empty() => "no description".to_string(),
            Field::Description => snapshot.description.clone(),
            Field::Creator => snapshot.creator.clone(),
            Field::Updated => render_timestamp(&snapshot.updated),
            Field::Limited => yes_no(snapshot.is_limited),
            Field::Collectible => yes_no(snapshot.is_collectible),
            Field::Remaining => match snapshot.remaining {
                Some(count) => count.to_string(),
                None => "unknown".to_string(),
            },
            Field::Thumbnail => snapshot.thumbnail.clone(),
        }
    }

    pub fn is_price_or_sale(&self) -> bool {
        matches!(self, Field::Price | Field::ForSale)
    }
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

/// RFC 3339 timestamps get a readable UTC form, anything else is shown as-is.
fn render_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Fields that differ between two snapshots, in [`Field::ALL`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet(Vec<Field>);

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains(&field)
    }

    pub fn fields(&self) -> &[Field] {
        &self.0
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.0.iter().map(Field::key).collect()
    }
}

pub fn diff(previous: &ItemSnapshot, current: &ItemSnapshot) -> ChangeSet {
    ChangeSet(
        Field::ALL
            .into_iter()
            .filter(|field| field.differs(previous, current))
            .collect(),
    )
}

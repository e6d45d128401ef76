use std::cmp::Ordering;

use serde::Serialize;

use crate::links::{guest_path, ShareLinks};
use crate::models::Guest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    Id,
    Token,
    Attendance,
    #[field(value = "max_count")]
    MaxCount,
    #[field(value = "updated_count")]
    UpdatedCount,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromFormField, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Serialize)]
pub struct Row {
    pub guest: Guest,
    pub status: &'static str,
    pub attending: &'static str,
    pub url: String,
    pub path: String,
}

impl Row {
    fn new(guest: Guest, links: &ShareLinks) -> Self {
        Row {
            status: if guest.has_responded() { "Responded" } else { "Pending" },
            attending: guest.attending.map_or("-", |a| a.as_str()),
            url: links.rsvp_url(&guest),
            path: guest_path(&guest.id),
            guest,
        }
    }
}

/// The organizer's table: filtered, sorted rows plus totals over every loaded guest.
#[derive(Debug, Serialize)]
pub struct Listing {
    pub rows: Vec<Row>,
    pub guest_count: usize,
    pub total_max: i64,
    pub total_updated: i64,
}

fn compare(key: SortKey, a: &Guest, b: &Guest) -> Ordering {
    match key {
        SortKey::Name => a
            .full_name
            .to_lowercase()
            .cmp(&b.full_name.to_lowercase())
            .then_with(|| a.full_name.cmp(&b.full_name)),
        SortKey::Id => a.id.cmp(&b.id),
        SortKey::Token => a.token.cmp(&b.token),
        // Responders first.
        SortKey::Attendance => b.has_responded().cmp(&a.has_responded()),
        SortKey::MaxCount => a.attendance_max_count.cmp(&b.attendance_max_count),
        SortKey::UpdatedCount => a
            .attendance_updated_count
            .cmp(&b.attendance_updated_count),
    }
}

pub fn build(
    mut guests: Vec<Guest>,
    query: Option<&str>,
    sort: Option<SortKey>,
    order: Order,
    links: &ShareLinks,
) -> Listing {
    let guest_count = guests.len();
    let total_max = guests
        .iter()
        .map(|g| i64::from(g.attendance_max_count))
        .sum();
    let total_updated = guests
        .iter()
        .map(|g| i64::from(g.attendance_updated_count))
        .sum();

    if let Some(needle) = query.map(str::trim).filter(|q| !q.is_empty()) {
        let needle = needle.to_lowercase();
        guests.retain(|g| g.full_name.to_lowercase().contains(&needle));
    }

    let key = sort.unwrap_or(SortKey::Attendance);
    guests.sort_by(|a, b| match order {
        Order::Asc => compare(key, a, b),
        Order::Desc => compare(key, b, a),
    });

    Listing {
        rows: guests.into_iter().map(|g| Row::new(g, links)).collect(),
        guest_count,
        total_max,
        total_updated,
    }
}

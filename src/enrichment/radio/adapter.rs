//! Adapter layer: convert radio directory DTOs to domain models

use super::dto;
use crate::enrichment::domain::{Region, Station};

/// Regions with a name, sorted alphabetically.
pub fn to_regions(entries: Vec<dto::StateEntry>) -> Vec<Region> {
    let mut regions: Vec<Region> = entries
        .into_iter()
        .filter(|e| !e.name.trim().is_empty())
        .map(|e| Region {
            name: e.name,
            station_count: e.stationcount,
        })
        .collect();
    regions.sort_by(|a, b| a.name.cmp(&b.name));
    regions
}

/// Stations in directory order. Entries without any stream URL are dropped.
pub fn to_stations(entries: Vec<dto::StationEntry>) -> Vec<Station> {
    entries.into_iter().filter_map(to_station).collect()
}

fn to_station(entry: dto::StationEntry) -> Option<Station> {
    let stream_url = non_empty(entry.url_resolved).or_else(|| non_empty(entry.url))?;

    Some(Station {
        uuid: entry.stationuuid,
        name: entry.name,
        region: non_empty(entry.state),
        favicon: non_empty(entry.favicon),
        stream_url,
        click_count: entry.clickcount,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

//! Radio directory commands.

use tokio::runtime::Runtime;

use crate::config::Config;
use crate::enrichment::{RadioApi, RadioBrowserClient};
use crate::enrichment::radio::station_song;
use crate::error::NetworkError;
use crate::model::{Song, SongSource};

use super::library::song_line;

/// List the regions of the configured country
pub fn cmd_regions(rt: &Runtime, config: &Config) -> anyhow::Result<()> {
    rt.block_on(async {
        let client = radio_client(config)?;
        let regions = client.regions(&config.radio.country).await?;

        println!("Regions in {}:", config.radio.country);
        for region in &regions {
            println!("  {:<24} {:>4} stations", region.name, region.station_count);
        }
        anyhow::Ok(())
    })
}

/// List live stations in a region
pub fn cmd_stations(
    rt: &Runtime,
    config: &Config,
    region: Option<&str>,
    limit: Option<u32>,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let client = radio_client(config)?;
        let region = region.unwrap_or(&config.radio.default_region);
        let limit = limit.unwrap_or(config.radio.station_limit);

        let songs = station_songs(&client, &config.radio.country_code, region, limit).await?;
        if songs.is_empty() {
            println!("No stations in {}.", region);
            return Ok(());
        }
        for song in &songs {
            println!("{}", song_line(song));
            if let SongSource::Url(ref url) = song.source {
                println!("    {}", url);
            }
        }
        anyhow::Ok(())
    })
}

/// Stations of `region` as playable live songs.
async fn station_songs(
    api: &dyn RadioApi,
    country_code: &str,
    region: &str,
    limit: u32,
) -> Result<Vec<Song>, NetworkError> {
    let stations = api.stations(country_code, region, limit).await?;
    Ok(stations.iter().map(|s| station_song(s, region)).collect())
}

fn radio_client(config: &Config) -> anyhow::Result<RadioBrowserClient> {
    Ok(RadioBrowserClient::new(&config.radio, config.proxy.timeout())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::domain::Station;
    use crate::enrichment::traits::mocks::MockRadio;

    fn station(uuid: &str, region: &str) -> Station {
        Station {
            uuid: uuid.to_string(),
            name: format!("FM {uuid}"),
            region: Some(region.to_string()),
            favicon: None,
            stream_url: format!("https://live.example.com/{uuid}.m3u8"),
            click_count: 10,
        }
    }

    #[tokio::test]
    async fn test_station_songs_are_live() {
        let radio = MockRadio {
            stations: vec![station("a1", "Beijing"), station("b2", "Shanghai")],
            ..Default::default()
        };

        let songs = station_songs(&radio, "CN", "Beijing", 10).await.unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].id.as_str(), "station:a1");
        assert!(songs[0].is_live);
        assert_eq!(songs[0].duration, 0.0);
    }

    #[tokio::test]
    async fn test_station_songs_propagates_failure() {
        let radio = MockRadio {
            error: Some(NetworkError::Transport("dns".to_string())),
            ..Default::default()
        };
        assert!(station_songs(&radio, "CN", "Beijing", 10).await.is_err());
    }
}

/// Plex discover API provider
///
/// All endpoints answer with XML `MediaContainer` documents:
/// 1. Watchlist: /library/sections/watchlist/all → `Video` items, paged
/// 2. Genres: /library/sections/watchlist/genre → `Directory` entries whose
///    `key` is itself a filtered watchlist path
/// 3. Details: /library/metadata/{guid} → one `Video` with nested tags
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        Genre, GenreKey, MovieDetails, MovieImages, Rating, RatingSource, WatchlistItem,
        WatchlistPage,
    },
    services::providers::CatalogProvider,
};
use chrono::Utc;
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use reqwest::Client as HttpClient;
use std::collections::HashMap;

const GENRE_CACHE_TTL: u64 = 86400; // 1 day
const DETAILS_CACHE_TTL: u64 = 604800; // 1 week
const PLEX_PAGE_SIZE: usize = 20;
const WATCHLIST_PATH: &str = "/library/sections/watchlist/all";
const GENRES_PATH: &str = "/library/sections/watchlist/genre";

#[derive(Clone)]
pub struct PlexProvider {
    http_client: HttpClient,
    token: String,
    api_url: String,
    cache: Cache,
}

impl PlexProvider {
    pub fn new(cache: Cache, token: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            token,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    fn watchlist_url(&self, genre: &GenreKey) -> String {
        match genre {
            GenreKey::Any => format!("{}{}", self.api_url, WATCHLIST_PATH),
            GenreKey::Path(path) => format!("{}{}", self.api_url, path),
        }
    }

    /// GET an XML document from the catalog
    async fn get_xml(&self, url: &str, query: &[(&str, String)]) -> AppResult<String> {
        let response = self
            .http_client
            .get(url)
            .header("Accept", "application/xml")
            .header("X-Plex-Token", &self.token)
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Plex API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.text().await?)
    }
}

#[async_trait::async_trait]
impl CatalogProvider for PlexProvider {
    async fn fetch_watchlist_page(
        &self,
        genre: &GenreKey,
        start: usize,
    ) -> AppResult<WatchlistPage> {
        let url = self.watchlist_url(genre);
        let xml = self
            .get_xml(
                &url,
                &[
                    ("X-Plex-Container-Start", start.to_string()),
                    ("X-Plex-Container-Size", PLEX_PAGE_SIZE.to_string()),
                ],
            )
            .await?;

        let page = parse_watchlist_page(&xml)?;

        tracing::info!(
            genre = %genre,
            start,
            size = page.size,
            items = page.items.len(),
            provider = "plex",
            "Watchlist page fetched"
        );

        Ok(page)
    }

    async fn fetch_genres(&self) -> AppResult<Vec<Genre>> {
        cached!(self.cache, CacheKey::Genres, GENRE_CACHE_TTL, async move {
            let url = format!("{}{}", self.api_url, GENRES_PATH);
            let xml = self.get_xml(&url, &[]).await?;
            let genres = parse_genres(&xml)?;

            tracing::info!(genres = genres.len(), provider = "plex", "Genres fetched");

            Ok::<_, AppError>(genres)
        })
    }

    async fn fetch_movie_details(&self, guid: &str) -> AppResult<MovieDetails> {
        if guid.trim().is_empty() {
            return Err(AppError::InvalidInput("Movie guid cannot be empty".to_string()));
        }

        cached!(
            self.cache,
            CacheKey::MovieDetails(guid.to_string()),
            DETAILS_CACHE_TTL,
            async move {
                let url = format!("{}/library/metadata/{}", self.api_url, guid);
                let xml = self.get_xml(&url, &[]).await?;
                let details = parse_movie_details(&xml)?;

                tracing::info!(guid = %guid, title = %details.title, provider = "plex", "Movie details fetched");

                Ok::<_, AppError>(details)
            }
        )
    }

    fn page_size(&self) -> usize {
        PLEX_PAGE_SIZE
    }

    fn name(&self) -> &'static str {
        "plex"
    }
}

// ============================================================================
// XML Parsing
// ============================================================================

type Attributes = HashMap<String, String>;

fn attributes(elem: &BytesStart<'_>) -> AppResult<Attributes> {
    let mut map = HashMap::new();
    for attr in elem.attributes() {
        let attr = attr
            .map_err(|e| AppError::ExternalApi(format!("Malformed Plex XML attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = match quick_xml::escape::unescape(&raw) {
            Ok(unescaped) => unescaped.into_owned(),
            Err(_) => raw.into_owned(),
        };
        map.insert(key, value);
    }
    Ok(map)
}

/// Walks every opening or self-closing element of a document
fn for_each_element<F>(xml: &str, mut visit: F) -> AppResult<()>
where
    F: FnMut(&[u8], Attributes),
{
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event() {
            Ok(Event::Start(elem)) | Ok(Event::Empty(elem)) => {
                let attrs = attributes(&elem)?;
                visit(elem.name().as_ref(), attrs);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(AppError::ExternalApi(format!(
                    "Malformed Plex XML at position {}: {}",
                    reader.error_position(),
                    e
                )))
            }
        }
    }

    Ok(())
}

/// Plex guids look like `plex://movie/5d776b59ad5437001f79c6f8`
fn short_guid(guid: &str) -> String {
    guid.rsplit('/').next().unwrap_or(guid).to_string()
}

pub(crate) fn parse_watchlist_page(xml: &str) -> AppResult<WatchlistPage> {
    let mut reported_size = None;
    let mut listed = 0;
    let mut items = Vec::new();

    for_each_element(xml, |name, attrs| match name {
        b"MediaContainer" => {
            reported_size = attrs.get("size").and_then(|s| s.parse::<usize>().ok());
        }
        b"Video" => {
            listed += 1;
            let guid = attrs.get("guid").map(|g| short_guid(g));
            let duration_ms = attrs.get("duration").and_then(|d| d.parse::<u64>().ok());

            match (guid, duration_ms) {
                (Some(guid), Some(duration_ms)) => items.push(WatchlistItem {
                    guid,
                    title: attrs.get("title").cloned().unwrap_or_default(),
                    duration_secs: u32::try_from(duration_ms / 1000).unwrap_or(u32::MAX),
                }),
                _ => tracing::debug!(
                    title = ?attrs.get("title"),
                    "Skipping watchlist item without guid or duration"
                ),
            }
        }
        _ => {}
    })?;

    Ok(WatchlistPage {
        size: reported_size.unwrap_or(listed),
        items,
    })
}

pub(crate) fn parse_genres(xml: &str) -> AppResult<Vec<Genre>> {
    let mut genres = Vec::new();

    for_each_element(xml, |name, attrs| {
        if name == b"Directory" {
            if let (Some(label), Some(key)) = (attrs.get("title"), attrs.get("key")) {
                genres.push(Genre {
                    label: label.clone(),
                    key: key.clone(),
                });
            }
        }
    })?;

    Ok(genres)
}

pub(crate) fn parse_movie_details(xml: &str) -> AppResult<MovieDetails> {
    let mut video: Option<Attributes> = None;
    let mut images = MovieImages::default();
    let mut genres = Vec::new();
    let mut ratings = Vec::new();
    let mut guids = Vec::new();
    let mut countries = Vec::new();
    let mut director = None;
    let (mut summary_100, mut summary_250, mut summary_500) = (None, None, None);

    for_each_element(xml, |name, mut attrs| match name {
        b"Video" if video.is_none() => video = Some(attrs),
        b"Image" => {
            if let (Some(image_type), Some(url)) = (attrs.remove("type"), attrs.remove("url")) {
                images.set(&image_type, url);
            }
        }
        b"Genre" => genres.extend(attrs.remove("tag")),
        b"Guid" => guids.extend(attrs.remove("id")),
        b"Country" => countries.extend(attrs.remove("tag")),
        b"Director" if director.is_none() => director = attrs.remove("tag"),
        b"Summary" => {
            let slot = match attrs.get("size").map(String::as_str) {
                Some("100") => &mut summary_100,
                Some("250") => &mut summary_250,
                Some("500") => &mut summary_500,
                _ => return,
            };
            if slot.is_none() {
                *slot = attrs.remove("tag");
            }
        }
        b"Rating" => {
            let image = attrs.get("image").map(String::as_str).unwrap_or_default();
            let (source, icon) = classify_rating(image, attrs.get("type").map(String::as_str));
            ratings.push(Rating {
                source,
                value: attrs.get("value").and_then(|v| v.parse::<f64>().ok()),
                icon,
            });
        }
        _ => {}
    })?;

    let mut video = video
        .ok_or_else(|| AppError::ExternalApi("Plex metadata response has no Video".to_string()))?;
    let guid = video
        .get("guid")
        .map(|g| short_guid(g))
        .ok_or_else(|| AppError::ExternalApi("Plex metadata response missing guid".to_string()))?;

    Ok(MovieDetails {
        guid,
        title: video.remove("title").unwrap_or_default(),
        summary: video.remove("summary"),
        summary_100,
        summary_250,
        summary_500,
        tagline: video.remove("tagline"),
        thumb: video.remove("thumb"),
        year: video.get("year").and_then(|y| y.parse().ok()),
        duration: video.get("duration").and_then(|d| d.parse().ok()),
        images,
        genres,
        ratings,
        guids,
        countries,
        director,
        fetched_at: Utc::now(),
    })
}

/// Rating source and, for Rotten Tomatoes, its freshness icon
///
/// Plex encodes both in the image URI, e.g. `rottentomatoes://image.rating.ripe`.
fn classify_rating(image: &str, rating_type: Option<&str>) -> (RatingSource, Option<String>) {
    if image.contains("imdb") {
        (RatingSource::Imdb, None)
    } else if image.contains("rottentomatoes") {
        let source = match rating_type {
            Some("critic") => RatingSource::RottenTomatoesCritic,
            Some("audience") => RatingSource::RottenTomatoesAudience,
            _ => RatingSource::RottenTomatoes,
        };
        (source, rating_icon(image))
    } else if image.contains("themoviedb") {
        (RatingSource::TheMovieDb, None)
    } else {
        (RatingSource::Unknown, None)
    }
}

fn rating_icon(image: &str) -> Option<String> {
    let (_, rest) = image.split_once("rating.")?;
    let icon: String = rest
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    (!icon.is_empty()).then_some(icon)
}

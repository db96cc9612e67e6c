//! # Map Passthrough
//!
//! Thin proxy over the Mapbox geocoding and directions APIs. Keeps the
//! access token on the server and reshapes responses to the fields the UI
//! renders.

use folio_core::query::parse_leading_int;
use folio_core::{Error, Result};
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};

const GEOCODE_TYPES: &str = "poi,address,place";
const DEFAULT_LIMIT: i64 = 8;
const MAX_LIMIT: i64 = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeocodeParams {
    pub q: Option<String>,
    pub limit: Option<String>,
    /// `lng,lat` to bias results toward.
    pub proximity: Option<String>,
}

impl GeocodeParams {
    /// Default 8, clamped to `1..=10`.
    pub fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(parse_leading_int)
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteParams {
    /// `lng,lat`
    pub from: Option<String>,
    /// `lng,lat`
    pub to: Option<String>,
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Walking,
    Driving,
    Cycling,
}

impl Profile {
    /// Unknown or missing profiles fall back to walking.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("driving") => Profile::Driving,
            Some("cycling") => Profile::Cycling,
            _ => Profile::Walking,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Walking => "walking",
            Profile::Driving => "driving",
            Profile::Cycling => "cycling",
        }
    }
}

pub struct MapClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl MapClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token,
        }
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Configuration("MAPBOX_TOKEN not set".into()))
    }

    /// `base_url` with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Configuration(format!("invalid maps base_url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| Error::Configuration("invalid maps base_url".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn geocode_url(&self, params: &GeocodeParams) -> Result<Url> {
        let token = self.token()?;
        let q = params.q.as_deref().map(str::trim).unwrap_or_default();
        if q.is_empty() {
            return Err(Error::invalid("q required"));
        }

        let place = format!("{q}.json");
        let mut url = self.endpoint(&["geocoding", "v5", "mapbox.places", &place])?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("access_token", token)
                .append_pair("types", GEOCODE_TYPES)
                .append_pair("limit", &params.limit().to_string());
            if let Some(proximity) = params.proximity.as_deref().filter(|p| !p.is_empty()) {
                query.append_pair("proximity", proximity);
            }
        }
        Ok(url)
    }

    pub fn route_url(&self, params: &RouteParams) -> Result<Url> {
        let token = self.token()?;
        let from = params.from.as_deref().map(str::trim).unwrap_or_default();
        let to = params.to.as_deref().map(str::trim).unwrap_or_default();
        if from.is_empty() || to.is_empty() {
            return Err(Error::invalid("from & to required"));
        }

        let profile = Profile::parse(params.profile.as_deref());
        let coordinates = format!("{from};{to}");
        let mut url = self.endpoint(&["directions", "v5", "mapbox", profile.as_str(), &coordinates])?;
        url.query_pairs_mut()
            .append_pair("geometries", "geojson")
            .append_pair("overview", "full")
            .append_pair("steps", "true")
            .append_pair("access_token", token);
        Ok(url)
    }

    pub async fn geocode(&self, params: &GeocodeParams) -> Result<Value> {
        let url = self.geocode_url(params)?;
        let body = self.fetch(url).await?;
        Ok(shape_geocode(&body))
    }

    pub async fn route(&self, params: &RouteParams) -> Result<Value> {
        let url = self.route_url(params)?;
        let body = self.fetch(url).await?;
        shape_route(&body).ok_or_else(|| Error::NotFound("no route".into()))
    }

    async fn fetch(&self, url: Url) -> Result<Value> {
        let response = self.http.get(url).send().await.map_err(|e| {
            tracing::error!("Mapbox request failed: {}", e);
            Error::Upstream(format!("map failed: {e}"))
        })?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("map failed: {e}")))?;

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("map failed");
            tracing::warn!("Mapbox responded {}: {}", status, message);
            return Err(Error::Upstream(message.to_string()));
        }
        Ok(body)
    }
}

/// `{ok, items: [{id, name, full, center, bbox, category}]}`
pub fn shape_geocode(body: &Value) -> Value {
    let items: Vec<Value> = body
        .get("features")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .map(|f| {
            json!({
                "id": f.get("id"),
                "name": f.get("text"),
                "full": f.get("place_name"),
                "center": f.get("center"),
                "bbox": f.get("bbox"),
                "category": f.pointer("/properties/category"),
            })
        })
        .collect();
    json!({ "ok": true, "items": items })
}

/// First route as `{ok, distance, duration, geometry, steps}`, or `None`
/// when the response has no route.
pub fn shape_route(body: &Value) -> Option<Value> {
    let route = body.get("routes")?.get(0)?;
    let steps: Vec<Value> = route
        .pointer("/legs/0/steps")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .map(|s| {
            json!({
                "distance": s.get("distance"),
                "duration": s.get("duration"),
                "name": s.get("name"),
                "maneuver": s.get("maneuver"),
                "mode": s.get("mode"),
            })
        })
        .collect();

    Some(json!({
        "ok": true,
        "distance": route.get("distance"),
        "duration": route.get("duration"),
        "geometry": route.get("geometry"),
        "steps": steps,
    }))
}

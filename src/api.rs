use std::time::Duration;

use itertools::Itertools;
use url::Url;

use crate::collage::{CollageRecord, Gallery, GalleryItem, LeaderboardResponse};
use crate::error::ApiError;
use crate::leaderboard::LeaderboardEntry;

/// Supplies collage records and the gallery listing.
pub trait CollageProvider: Send + Sync {
    fn fetch(&self, collage_id: &str) -> Result<CollageRecord, ApiError>;

    /// Newest first.
    fn gallery(&self) -> Result<Vec<GalleryItem>, ApiError>;
}

/// Accepts finished scores and answers with the refreshed leaderboard.
pub trait ScoreSink: Send + Sync {
    fn submit(
        &self,
        collage_id: &str,
        time: f64,
        name: &str,
    ) -> Result<Vec<LeaderboardEntry>, ApiError>;
}

/// Both halves of the collage server.
pub trait Backend: CollageProvider + ScoreSink {}

impl<T: CollageProvider + ScoreSink> Backend for T {}

#[derive(Debug, serde::Serialize)]
struct ScoreBody<'a> {
    time: f64,
    name: &'a str,
}

/// Talks to the collage web server over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base: Url,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl {
                url: base_url.to_string(),
                reason: "not a base url".into(),
            });
        }
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Ok(Self { base, agent })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Appends path segments to the base url, escaping each one.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| ApiError::InvalidUrl {
                url: self.base.to_string(),
                reason: "not a base url".into(),
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }
}

impl CollageProvider for HttpBackend {
    fn fetch(&self, collage_id: &str) -> Result<CollageRecord, ApiError> {
        let url = self.endpoint(&["collage", collage_id])?;
        tracing::debug!(%url, "fetching collage");

        match self.agent.get(url.as_str()).call() {
            Ok(response) => response.into_json().map_err(ApiError::Decode),
            Err(ureq::Error::Status(404, _)) => Err(ApiError::NotFound(collage_id.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    fn gallery(&self) -> Result<Vec<GalleryItem>, ApiError> {
        let url = self.endpoint(&["gallery"])?;
        let gallery: Gallery = self
            .agent
            .get(url.as_str())
            .call()?
            .into_json()
            .map_err(ApiError::Decode)?;

        Ok(gallery
            .items
            .into_iter()
            .sorted_by(|a, b| b.updated_at.total_cmp(&a.updated_at))
            .collect())
    }
}

impl ScoreSink for HttpBackend {
    fn submit(
        &self,
        collage_id: &str,
        time: f64,
        name: &str,
    ) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let url = self.endpoint(&["collage", collage_id, "leaderboard"])?;
        tracing::debug!(%url, time, "posting score");

        let response: LeaderboardResponse = self
            .agent
            .post(url.as_str())
            .send_json(ScoreBody { time, name })?
            .into_json()
            .map_err(ApiError::Decode)?;

        Ok(response.leaderboard)
    }
}

//! Video-hosting lookup: resolve a lesson video id to a playable URL.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::VideoConfig;
use crate::error::{ProxyError, Result};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VideoSource {
    pub video_id: String,
    pub stream_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_url: Option<String>,
}

// --- Hosting API response ---

#[derive(Deserialize)]
struct HostedVideo {
    #[serde(default)]
    assets: Assets,
}

#[derive(Deserialize, Default)]
struct Assets {
    mp4: Option<String>,
    hls: Option<String>,
    player: Option<String>,
}

pub struct VideoResolver {
    api_base: String,
    api_token: String,
    http: Client,
}

impl VideoResolver {
    pub fn new(config: &VideoConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            http,
        })
    }

    pub async fn resolve(&self, video_id: &str) -> Result<VideoSource> {
        if !is_valid_id(video_id) {
            return Err(ProxyError::InvalidRequest(format!("bad video id: {video_id:?}")));
        }

        let url = format!("{}/videos/{video_id}", self.api_base);
        debug!("Resolving video {video_id} via {url}");

        let mut request = self.http.get(&url);
        if !self.api_token.is_empty() {
            request = request.header(AUTHORIZATION, format!("Bearer {}", self.api_token));
        }

        let resp = request.send().await?;
        match resp.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => return Err(ProxyError::NotFound(video_id.to_string())),
            s => return Err(ProxyError::UpstreamStatus(s)),
        }

        let hosted: HostedVideo = resp.json().await?;
        let Assets { mp4, hls, player } = hosted.assets;
        let Some(stream_url) = mp4.or(hls) else {
            return Err(ProxyError::NotFound(format!("{video_id} has no playable asset")));
        };

        info!("Resolved video {video_id}");
        Ok(VideoSource {
            video_id: video_id.to_string(),
            stream_url,
            player_url: player,
        })
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

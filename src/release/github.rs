//! GitHub Releases backend
//!
//! Talks to the REST API with `ureq` on the blocking pool. Non-2xx statuses
//! are read as values so API messages make it into the error.

use super::{AssetFile, Release, ReleaseAsset, ReleaseHost, ReleaseSpec};
use crate::config::schema::ReleaseConfig;
use crate::error::{NightshiftError, NightshiftResult};
use crate::process::run_blocking;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use ureq::http::Response;
use ureq::{Agent, Body};

const USER_AGENT: &str = concat!("nightshift/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ApiRelease {
    id: u64,
    tag_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    upload_url: String,
    #[serde(default)]
    assets: Vec<ApiAsset>,
}

#[derive(Debug, Deserialize)]
struct ApiAsset {
    id: u64,
    name: String,
    size: u64,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

impl From<ApiRelease> for Release {
    fn from(api: ApiRelease) -> Self {
        Self {
            id: api.id,
            tag: api.tag_name,
            name: api.name.unwrap_or_default(),
            body: api.body.unwrap_or_default(),
            prerelease: api.prerelease,
            upload_url: api.upload_url,
            assets: api.assets.into_iter().map(ReleaseAsset::from).collect(),
        }
    }
}

impl From<ApiAsset> for ReleaseAsset {
    fn from(api: ApiAsset) -> Self {
        Self {
            id: api.id,
            name: api.name,
            size: api.size,
        }
    }
}

/// Extract `owner/repo` from a GitHub remote URL
pub fn parse_github_remote(url: &str) -> Option<String> {
    let url = url.trim();
    let path = url
        .strip_prefix("git@github.com:")
        .or_else(|| url.strip_prefix("ssh://git@github.com/"))
        .or_else(|| url.strip_prefix("https://github.com/"))
        .or_else(|| url.strip_prefix("http://github.com/"))?;
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let mut parts = path.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Some(format!("{}/{}", owner, repo))
        }
        _ => None,
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// GitHub Releases over the REST API
#[derive(Clone)]
pub struct GithubReleaseHost {
    agent: Agent,
    api_url: String,
    repository: Option<String>,
    token: Option<String>,
    token_env: String,
}

impl GithubReleaseHost {
    /// Build from config and the environment.
    ///
    /// Missing token or repository is reported when the host is first used,
    /// so a run still builds and tests without publishing credentials.
    pub fn from_config(config: &ReleaseConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            repository: config
                .repository
                .clone()
                .or_else(|| non_empty_env("GITHUB_REPOSITORY")),
            token: non_empty_env(&config.token_env),
            token_env: config.token_env.clone(),
        }
    }

    /// Fill in the repository when neither config nor environment named one
    pub fn or_repository(mut self, repository: Option<String>) -> Self {
        if self.repository.is_none() {
            self.repository = repository;
        }
        self
    }

    /// Repository releases are published to, if known
    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    /// Whether an API token is available
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn credentials(&self) -> NightshiftResult<(&str, &str)> {
        let repo = self
            .repository
            .as_deref()
            .ok_or(NightshiftError::MissingRepository)?;
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| NightshiftError::MissingToken(self.token_env.clone()))?;
        Ok((repo, token))
    }

    fn repo_url(&self, path: &str) -> NightshiftResult<String> {
        let (repo, _) = self.credentials()?;
        Ok(format!("{}/repos/{}{}", self.api_url, repo, path))
    }

    fn auth(&self) -> NightshiftResult<String> {
        let (_, token) = self.credentials()?;
        Ok(format!("Bearer {}", token))
    }

    fn find_blocking(&self, tag: &str) -> NightshiftResult<Option<Release>> {
        let url = self.repo_url(&format!("/releases/tags/{}", tag))?;
        debug!("GET {}", url);

        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", self.auth()?)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(transport)?;

        match response.status().as_u16() {
            404 => Ok(None),
            s if (200..300).contains(&s) => {
                let api: ApiRelease = response.body_mut().read_json().map_err(transport)?;
                Ok(Some(api.into()))
            }
            _ => Err(api_error(response)),
        }
    }

    fn get_by_id_blocking(&self, id: u64) -> NightshiftResult<Release> {
        let url = self.repo_url(&format!("/releases/{}", id))?;
        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", self.auth()?)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(api_error(response));
        }
        let api: ApiRelease = response.body_mut().read_json().map_err(transport)?;
        Ok(api.into())
    }

    fn create_blocking(&self, spec: &ReleaseSpec) -> NightshiftResult<Release> {
        let url = self.repo_url("/releases")?;
        let payload = serde_json::json!({
            "tag_name": spec.tag,
            "target_commitish": spec.commit,
            "name": spec.title,
            "body": spec.body,
            "prerelease": spec.prerelease,
        });

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", self.auth()?)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .send_json(&payload)
            .map_err(transport)?;

        match response.status().as_u16() {
            s if (200..300).contains(&s) => {
                let api: ApiRelease = response.body_mut().read_json().map_err(transport)?;
                Ok(api.into())
            }
            // Another instance created it first
            422 => match self.find_blocking(&spec.tag)? {
                Some(release) => Ok(release),
                None => Err(api_error(response)),
            },
            _ => Err(api_error(response)),
        }
    }

    fn update_blocking(&self, release: &Release, spec: &ReleaseSpec) -> NightshiftResult<Release> {
        let url = self.repo_url(&format!("/releases/{}", release.id))?;
        let payload = serde_json::json!({
            "name": spec.title,
            "body": spec.body,
            "prerelease": spec.prerelease,
        });

        let mut response = self
            .agent
            .patch(&url)
            .header("Authorization", self.auth()?)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .send_json(&payload)
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(api_error(response));
        }
        let api: ApiRelease = response.body_mut().read_json().map_err(transport)?;
        Ok(api.into())
    }

    fn delete_blocking(&self, asset_id: u64) -> NightshiftResult<()> {
        let url = self.repo_url(&format!("/releases/assets/{}", asset_id))?;
        let response = self
            .agent
            .delete(&url)
            .header("Authorization", self.auth()?)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(transport)?;

        match response.status().as_u16() {
            // Already gone, e.g. replaced by the other platform's run
            404 => Ok(()),
            s if (200..300).contains(&s) => Ok(()),
            _ => Err(api_error(response)),
        }
    }

    fn upload_url(&self, release: &Release, name: &str) -> NightshiftResult<String> {
        let base = match release.upload_url.split('{').next() {
            Some(base) if !base.is_empty() => base.to_string(),
            _ => {
                let (repo, _) = self.credentials()?;
                format!(
                    "https://uploads.github.com/repos/{}/releases/{}/assets",
                    repo, release.id
                )
            }
        };
        Ok(format!("{}?name={}", base, encode_name(name)))
    }

    fn upload_blocking(&self, release: &Release, file: &AssetFile) -> NightshiftResult<ReleaseAsset> {
        let bytes = std::fs::read(&file.path)
            .map_err(|e| NightshiftError::io(format!("reading {}", file.path.display()), e))?;

        match self.post_asset(release, &file.name, &bytes)? {
            Ok(asset) => Ok(asset),
            Err(conflict) => {
                // A concurrent writer uploaded the same name; last writer wins
                warn!("Asset {} appeared concurrently, replacing it", file.name);
                let fresh = self.get_by_id_blocking(release.id)?;
                let Some(existing) = fresh.asset(&file.name) else {
                    return Err(conflict);
                };
                self.delete_blocking(existing.id)?;
                self.post_asset(&fresh, &file.name, &bytes)?
            }
        }
    }

    /// Inner `Err` is a name conflict that may be retried
    fn post_asset(
        &self,
        release: &Release,
        name: &str,
        bytes: &[u8],
    ) -> NightshiftResult<Result<ReleaseAsset, NightshiftError>> {
        let url = self.upload_url(release, name)?;
        debug!("POST {} ({} bytes)", url, bytes.len());

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", self.auth()?)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/octet-stream")
            .send(bytes)
            .map_err(transport)?;

        match response.status().as_u16() {
            s if (200..300).contains(&s) => {
                let api: ApiAsset = response.body_mut().read_json().map_err(transport)?;
                Ok(Ok(api.into()))
            }
            422 => Ok(Err(api_error(response))),
            _ => Err(api_error(response)),
        }
    }
}

fn encode_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn transport(e: ureq::Error) -> NightshiftError {
    NightshiftError::Publish(e.to_string())
}

fn api_error(mut response: Response<Body>) -> NightshiftError {
    let status = response.status().as_u16();
    let message = response
        .body_mut()
        .read_json::<ApiMessage>()
        .map(|m| m.message)
        .unwrap_or_else(|_| "no error message".to_string());
    NightshiftError::ReleaseApi { status, message }
}

#[async_trait]
impl ReleaseHost for GithubReleaseHost {
    async fn find_release(&self, tag: &str) -> NightshiftResult<Option<Release>> {
        let host = self.clone();
        let tag = tag.to_string();
        run_blocking("release", move || host.find_blocking(&tag)).await
    }

    async fn create_release(&self, spec: &ReleaseSpec) -> NightshiftResult<Release> {
        let host = self.clone();
        let spec = spec.clone();
        run_blocking("release", move || host.create_blocking(&spec)).await
    }

    async fn update_release(&self, release: &Release, spec: &ReleaseSpec) -> NightshiftResult<Release> {
        let host = self.clone();
        let release = release.clone();
        let spec = spec.clone();
        run_blocking("release", move || host.update_blocking(&release, &spec)).await
    }

    async fn delete_asset(&self, _release: &Release, asset: &ReleaseAsset) -> NightshiftResult<()> {
        let host = self.clone();
        let id = asset.id;
        run_blocking("release", move || host.delete_blocking(id)).await
    }

    async fn upload_asset(&self, release: &Release, file: &AssetFile) -> NightshiftResult<ReleaseAsset> {
        let host = self.clone();
        let release = release.clone();
        let file = file.clone();
        run_blocking("release", move || host.upload_blocking(&release, &file)).await
    }
}

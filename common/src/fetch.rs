use core::time::Duration;

use log::{info, warn};

use crate::platform::HttpFetch;
use crate::types::{FetchError, RemoteConfig};

pub const FETCH_ATTEMPTS: u32 = 3;
pub const FETCH_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Retry-bounded fetch of the remote dashboard descriptor.
pub struct ConfigFetcher {
    base_url: String,
    descriptor_url: String,
}

impl ConfigFetcher {
    pub fn new(base_url: &str, room: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            descriptor_url: resolve_url(base_url, &format!("dashboard/{room}")),
        }
    }

    pub fn descriptor_url(&self) -> &str {
        &self.descriptor_url
    }

    /// Issues up to [`FETCH_ATTEMPTS`] GETs with a fixed
    /// [`FETCH_RETRY_DELAY`] pause in between. Any status other than 200
    /// counts as a failed attempt, as does a transport error. A malformed
    /// 200 body is a parse failure and is not retried. Caller state is
    /// never touched on failure.
    pub fn fetch(&self, transport: &mut impl HttpFetch) -> Result<RemoteConfig, FetchError> {
        let mut last_failure = FetchError::Network("no attempt made".to_string());

        for attempt in 1..=FETCH_ATTEMPTS {
            match transport.get(&self.descriptor_url) {
                Ok(response) if response.status == 200 => {
                    info!("descriptor loaded on attempt {attempt}/{FETCH_ATTEMPTS}");
                    return self.parse(&response.body);
                }
                Ok(response) => {
                    warn!(
                        "descriptor request returned HTTP {} on attempt {attempt}/{FETCH_ATTEMPTS}",
                        response.status
                    );
                    last_failure = FetchError::HttpStatus(response.status);
                }
                Err(err) => {
                    warn!("descriptor request failed on attempt {attempt}/{FETCH_ATTEMPTS}: {err}");
                    last_failure = FetchError::Network(err.0);
                }
            }

            if attempt < FETCH_ATTEMPTS {
                transport.pause(FETCH_RETRY_DELAY);
            }
        }

        Err(last_failure)
    }

    fn parse(&self, body: &[u8]) -> Result<RemoteConfig, FetchError> {
        let doc: serde_json::Value =
            serde_json::from_slice(body).map_err(|_| FetchError::Parse("body"))?;

        let image_url = string_field(&doc, "imageUrl")?;
        let archived_image_url = string_field(&doc, "archivedImageUrl")?;
        let time_to_sleep_minutes = doc
            .get("timeToSleep")
            .and_then(serde_json::Value::as_u64)
            .filter(|minutes| *minutes > 0)
            .and_then(|minutes| u32::try_from(minutes).ok())
            .ok_or(FetchError::Parse("timeToSleep"))?;

        Ok(RemoteConfig {
            image_url: resolve_url(&self.base_url, image_url),
            archived_image_url: resolve_url(&self.base_url, archived_image_url),
            time_to_sleep_minutes,
        })
    }
}

fn string_field<'a>(doc: &'a serde_json::Value, name: &'static str) -> Result<&'a str, FetchError> {
    doc.get(name)
        .and_then(serde_json::Value::as_str)
        .ok_or(FetchError::Parse(name))
}

/// Joins a base URL and a relative path with exactly one `/` between them,
/// whatever either side already carries.
pub fn resolve_url(base: &str, relative: &str) -> String {
    let base = base.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');
    format!("{base}/{relative}")
}

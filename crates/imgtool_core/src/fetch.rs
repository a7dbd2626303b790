use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;

use crate::relocate::ImageFetcher;
use crate::resolve::basename;

/// Blocking HTTP transport for remote images. Retrieves the resource and
/// deposits it in the destination directory under the remote filename.
pub struct HttpFetcher {
    client: Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let mut response = self
            .client
            .get(url)
            .header("User-Agent", self.user_agent.clone())
            .send()
            .with_context(|| format!("request to {url} failed"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {} while fetching {}", status.as_u16(), url);
        }

        // Redirects may rename the resource; the final URL decides.
        let filename = remote_filename(response.url().path());
        let Some(filename) = filename else {
            bail!("cannot derive a filename from {url}");
        };
        let path = dest_dir.join(&filename);
        let mut file = fs::File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        response
            .copy_to(&mut file)
            .with_context(|| format!("failed to write body of {url}"))?;
        Ok(path)
    }
}

fn remote_filename(url_path: &str) -> Option<String> {
    let name = basename(url_path);
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::remote_filename;

    #[test]
    fn remote_filename_is_the_final_path_segment() {
        assert_eq!(remote_filename("/y/cat.png"), Some("cat.png".to_string()));
        assert_eq!(remote_filename("/cat.png"), Some("cat.png".to_string()));
    }

    #[test]
    fn remote_filename_rejects_bare_directories() {
        assert_eq!(remote_filename("/"), None);
        assert_eq!(remote_filename(""), None);
    }
}

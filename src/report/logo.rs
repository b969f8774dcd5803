//! Store logo download and decoding

use crate::config::ReportConfig;
use crate::error::{Error, Result};
use image::imageops::FilterType;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Longest edge of an embedded logo, in pixels
const MAX_LOGO_EDGE: u32 = 256;

/// A decoded logo as packed 8-bit RGB
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl LogoImage {
    /// Decode any supported image format
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut image = image::load_from_memory(bytes)?;
        if image.width() > MAX_LOGO_EDGE || image.height() > MAX_LOGO_EDGE {
            image = image.resize(MAX_LOGO_EDGE, MAX_LOGO_EDGE, FilterType::Triangle);
        }
        let rgb = image.to_rgb8();
        Ok(Self {
            width: rgb.width(),
            height: rgb.height(),
            rgb: rgb.into_raw(),
        })
    }
}

/// Fetches logos over HTTP
#[derive(Clone)]
pub struct LogoFetcher {
    client: Client,
}

impl LogoFetcher {
    pub fn new(config: &ReportConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.logo_timeout_secs))
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }

    /// Download and decode the logo at `url`; any failure yields `None`
    pub async fn fetch(&self, url: &str) -> Option<LogoImage> {
        match self.try_fetch(url).await {
            Ok(logo) => {
                debug!(url, width = logo.width, height = logo.height, "Fetched logo");
                Some(logo)
            }
            Err(e) => {
                warn!(url, "Skipping logo: {}", e);
                None
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<LogoImage> {
        let parsed = Url::parse(url).map_err(|e| Error::Other(format!("Invalid logo URL: {}", e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::Other(format!(
                "Unsupported logo URL scheme: {}",
                parsed.scheme()
            )));
        }

        let bytes = self
            .client
            .get(parsed)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        LogoImage::decode(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn fetcher() -> LogoFetcher {
        LogoFetcher::new(&ReportConfig::default()).unwrap()
    }

    #[test]
    fn test_decode_downscales_large_logos() {
        let logo = LogoImage::decode(&png_bytes(1024, 512)).unwrap();
        assert_eq!(logo.width, 256);
        assert_eq!(logo.height, 128);
        assert_eq!(logo.rgb.len(), 256 * 128 * 3);
    }

    #[tokio::test]
    async fn test_fetch_logo() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logo.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(png_bytes(4, 3)),
            )
            .mount(&server)
            .await;

        let logo = fetcher()
            .fetch(&format!("{}/logo.png", server.uri()))
            .await
            .unwrap();
        assert_eq!((logo.width, logo.height), (4, 3));
        assert_eq!(&logo.rgb[..3], &[200, 30, 30]);
    }

    #[tokio::test]
    async fn test_fetch_failures_are_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/garbage.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not an image".to_vec()))
            .mount(&server)
            .await;

        let fetcher = fetcher();
        assert!(fetcher
            .fetch(&format!("{}/missing.png", server.uri()))
            .await
            .is_none());
        assert!(fetcher
            .fetch(&format!("{}/garbage.png", server.uri()))
            .await
            .is_none());
        assert!(fetcher.fetch("ftp://example.com/logo.png").await.is_none());
        assert!(fetcher.fetch("not a url").await.is_none());
    }
}

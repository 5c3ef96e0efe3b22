//! Image staging: local pass-through, remote download, minimum-width resize.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::GenericImageView;
use image::imageops::FilterType;
use tempfile::TempPath;
use tracing::{debug, info};

use pinsmith_protocols::error::MediaError;

/// A staged image ready for upload.
///
/// `Local` paths belong to the caller and are never deleted. `Temp` files
/// are owned by this handle and removed when it drops.
#[derive(Debug)]
pub enum StagedMedia {
    Local(PathBuf),
    Temp(TempPath),
}

impl StagedMedia {
    pub fn path(&self) -> &Path {
        match self {
            StagedMedia::Local(path) => path,
            StagedMedia::Temp(path) => path,
        }
    }
}

/// Prepares pin images for upload.
pub struct MediaStager {
    client: reqwest::Client,
    min_width: u32,
}

impl MediaStager {
    /// `min_width` is the narrowest acceptable upload; narrower downloads
    /// are upscaled to exactly this width.
    pub fn new(min_width: u32) -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
            min_width,
        }
    }

    /// Resolve an image reference into a local file.
    ///
    /// `None` passes through (the pin is published without an image).
    /// Errors here are recoverable by contract: the engine logs them and
    /// continues imageless.
    pub async fn stage(&self, image_ref: Option<&str>) -> Result<Option<StagedMedia>, MediaError> {
        let Some(image_ref) = image_ref else {
            return Ok(None);
        };

        if image_ref.starts_with("http://") || image_ref.starts_with("https://") {
            self.stage_remote(image_ref).await.map(Some)
        } else {
            let path = Path::new(image_ref);
            if path.is_file() {
                debug!(path = image_ref, "using local image as-is");
                Ok(Some(StagedMedia::Local(path.to_path_buf())))
            } else {
                Err(MediaError::NotFound(image_ref.to_string()))
            }
        }
    }

    async fn stage_remote(&self, url: &str) -> Result<StagedMedia, MediaError> {
        info!(url, "downloading pin image");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| MediaError::Download(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| MediaError::Download(e.to_string()))?;

        let mut download = tempfile::Builder::new()
            .prefix("pinsmith-pin-")
            .suffix(".jpg")
            .tempfile()?;
        download.write_all(&bytes)?;

        let img = image::load_from_memory(&bytes).map_err(|e| MediaError::Decode(e.to_string()))?;
        let (width, height) = img.dimensions();
        debug!(width, height, "image dimensions");

        if width >= self.min_width {
            return Ok(StagedMedia::Temp(download.into_temp_path()));
        }

        // Too narrow for the target site; upscale to exactly min_width and
        // replace the download with the resized copy.
        info!(width, min_width = self.min_width, "upscaling undersized image");
        let target_height =
            ((height as f64) * (self.min_width as f64) / (width as f64)).round().max(1.0) as u32;
        let resized = img.resize_exact(self.min_width, target_height, FilterType::Lanczos3);

        let resized_file = tempfile::Builder::new()
            .prefix("pinsmith-pin-resized-")
            .suffix(".png")
            .tempfile()?;
        resized
            .save(resized_file.path())
            .map_err(|e| MediaError::Encode(e.to_string()))?;

        // Deletes the original download.
        download.close()?;

        Ok(StagedMedia::Temp(resized_file.into_temp_path()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;
    use std::io::Cursor;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::new_rgba8(width, height);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    async fn serve_image(bytes: Vec<u8>) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pin.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_stage_none() {
        let stager = MediaStager::new(1000);
        assert!(stager.stage(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stage_local_path_unchanged() {
        let stager = MediaStager::new(1000);
        let file = tempfile::NamedTempFile::new().unwrap();
        let path_str = file.path().to_string_lossy().to_string();

        let staged = stager.stage(Some(&path_str)).await.unwrap().unwrap();
        assert_eq!(staged.path(), file.path());

        // Local files are not owned by the stager
        drop(staged);
        assert!(file.path().exists());
    }

    #[tokio::test]
    async fn test_stage_missing_local_path() {
        let stager = MediaStager::new(1000);
        let result = stager.stage(Some("/nonexistent/pin.jpg")).await;
        assert!(matches!(result, Err(MediaError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stage_wide_image_keeps_dimensions() {
        let server = serve_image(png_bytes(1200, 800)).await;
        let stager = MediaStager::new(1000);

        let url = format!("{}/pin.png", server.uri());
        let staged = stager.stage(Some(&url)).await.unwrap().unwrap();

        let img = image::open(staged.path()).unwrap();
        assert_eq!(img.dimensions(), (1200, 800));
    }

    #[tokio::test]
    async fn test_stage_narrow_image_resized_to_min_width() {
        let server = serve_image(png_bytes(400, 300)).await;
        let stager = MediaStager::new(1000);

        let url = format!("{}/pin.png", server.uri());
        let staged = stager.stage(Some(&url)).await.unwrap().unwrap();

        let img = image::open(staged.path()).unwrap();
        assert_eq!(img.width(), 1000);
        assert_eq!(img.height(), 750);
    }

    #[tokio::test]
    async fn test_temp_file_deleted_on_drop() {
        let server = serve_image(png_bytes(400, 300)).await;
        let stager = MediaStager::new(1000);

        let url = format!("{}/pin.png", server.uri());
        let staged = stager.stage(Some(&url)).await.unwrap().unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_download_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pin.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let stager = MediaStager::new(1000);
        let url = format!("{}/pin.png", server.uri());
        let result = stager.stage(Some(&url)).await;
        assert!(matches!(result, Err(MediaError::Download(_))));
    }

    #[tokio::test]
    async fn test_undecodable_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pin.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not an image".to_vec()))
            .mount(&server)
            .await;

        let stager = MediaStager::new(1000);
        let url = format!("{}/pin.png", server.uri());
        let result = stager.stage(Some(&url)).await;
        assert!(matches!(result, Err(MediaError::Decode(_))));
    }
}

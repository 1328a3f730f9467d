//! Motivational images from an Unsplash style random-photo endpoint.

use async_trait::async_trait;
use log::warn;
use serde::Deserialize;
use serde_json::json;

use crate::error::{ErrorReport, ErrorType};
use crate::http::{HttpClient, HttpRequest, truncate_for_log};
use crate::secrets::Credentials;

use super::{ImageInfo, ImageSource};

/// Stock image served when the provider cannot be used.
pub const FALLBACK_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1517836357463-d25dfeac3438?w=1080&q=80";

const SEARCH_QUERY: &str = "fitness";

pub struct UnsplashImages {
    http: HttpClient,
    credentials: Credentials,
}

#[derive(Deserialize)]
struct Photo {
    urls: PhotoUrls,
    alt_description: Option<String>,
    description: Option<String>,
    user: Photographer,
}

#[derive(Deserialize)]
struct PhotoUrls {
    regular: String,
}

#[derive(Deserialize)]
struct Photographer {
    name: String,
    links: PhotographerLinks,
}

#[derive(Deserialize)]
struct PhotographerLinks {
    html: String,
}

impl From<Photo> for ImageInfo {
    fn from(photo: Photo) -> Self {
        let alt = photo
            .alt_description
            .or(photo.description)
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| "Fitness motivation".to_string());
        Self {
            image_url: photo.urls.regular,
            alt,
            photographer: photo.user.name,
            photographer_url: photo.user.links.html,
        }
    }
}

impl UnsplashImages {
    pub fn new(http: HttpClient, credentials: Credentials) -> Self {
        Self { http, credentials }
    }

    async fn fetch(&self) -> Result<ImageInfo, ErrorReport> {
        let keys = self.credentials.keys().await?;
        let key = keys.images.as_deref().ok_or_else(|| {
            ErrorReport::new(ErrorType::ConfigurationError, "Image API key is not configured")
        })?;

        let request = HttpRequest::get("photos/random")
            .query("query", SEARCH_QUERY)
            .query("orientation", "portrait")
            .header("Authorization", format!("Client-ID {}", key))
            .header("Accept-Version", "v1");
        let response = self.http.execute(&request).await?;

        if !response.is_success() {
            return Err(ErrorReport::new(
                ErrorType::ExternalApiError,
                format!("Image provider returned HTTP {}", response.status),
            )
            .with_details(json!({ "body": truncate_for_log(&response.body) })));
        }

        let photo: Photo = response.json()?;
        Ok(photo.into())
    }
}

#[async_trait]
impl ImageSource for UnsplashImages {
    #[tracing::instrument(skip(self))]
    async fn image(&self) -> ImageInfo {
        match self.fetch().await {
            Ok(image) => image,
            Err(e) => {
                warn!("Falling back to the stock image: {}", e);
                ImageInfo::fallback()
            }
        }
    }
}

//! Client for the IPFS pinning service that stores listing photos.

use std::{sync::Arc, time::Duration};

use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde::Deserialize;
use tokio::task::JoinSet;

use crate::{
    config::PinningConfig,
    errors::AppError,
    structs::{ImageCategory, NewImage},
};

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// An uploaded photo waiting to be pinned.
#[derive(Debug, Clone)]
pub struct PendingImage {
    pub category: ImageCategory,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct PinningClient {
    http: Client,
    config: Arc<PinningConfig>,
}

impl PinningClient {
    pub fn new(config: PinningConfig) -> Result<Self, AppError> {
        let http = Client::builder()
            .user_agent(concat!("hostel_finder/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn gateway_url(&self, cid: &str) -> String {
        format!("{}/ipfs/{}", self.config.gateway.trim_end_matches('/'), cid)
    }

    /// Pins one file and returns its gateway URL.
    pub async fn pin_file(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let form = Form::new().part("file", part);
        let url = format!(
            "{}/pinning/pinFileToIPFS",
            self.config.api_url.trim_end_matches('/')
        );

        let res = self
            .http
            .post(url)
            .header("pinata_api_key", &self.config.api_key)
            .header("pinata_secret_api_key", &self.config.secret_key)
            .multipart(form)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::PinningError(format!("{status}: {body}")));
        }

        let pinned: PinResponse = res.json().await?;
        Ok(self.gateway_url(&pinned.ipfs_hash))
    }

    /// Pins every image concurrently and waits for all of them.
    ///
    /// Failed uploads are logged and left out; the rest keep their input order.
    pub async fn pin_all(&self, images: Vec<PendingImage>) -> Vec<NewImage> {
        if images.is_empty() {
            return Vec::new();
        }
        log::info!("Uploading {} images to the pinning service", images.len());

        let mut tasks = JoinSet::new();
        for (index, image) in images.into_iter().enumerate() {
            let client = self.clone();
            tasks.spawn(async move {
                let result = client
                    .pin_file(&image.file_name, &image.content_type, image.bytes)
                    .await;
                (index, image.category, image.file_name, result)
            });
        }

        let mut pinned = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, category, _, Ok(image_url))) => pinned.push((
                    index,
                    NewImage {
                        image_url,
                        image_type: category,
                    },
                )),
                Ok((_, category, file_name, Err(e))) => {
                    log::error!("Error uploading {} image {:?}: {}", category, file_name, e);
                }
                Err(e) => log::error!("Upload task failed: {}", e),
            }
        }

        pinned.sort_by_key(|(index, _)| *index);
        pinned.into_iter().map(|(_, image)| image).collect()
    }
}

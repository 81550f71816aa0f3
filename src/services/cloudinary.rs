use crate::services::badge::BadgeUpload;
use crate::services::badge_store::BadgeStore;
use anyhow::Context;
use serde::Deserialize;
use sha2::{Digest, Sha256};

const CLOUDINARY_API: &str = "https://api.cloudinary.com/v1_1";
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("folder", &self.folder)
            .finish()
    }
}

/// Badge images on Cloudinary. Credentials are owned by the instance.
pub struct CloudinaryStore {
    client: reqwest::Client,
    config: CloudinaryConfig,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> anyhow::Result<Self> {
        Self::with_api_base(config, CLOUDINARY_API)
    }

    pub fn with_api_base(config: CloudinaryConfig, api_base: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            client,
            config,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{action}", self.api_base, self.config.cloud_name)
    }

    fn signed_form(&self, params: Vec<(&'static str, String)>) -> reqwest::multipart::Form {
        let signature = sign_params(&params, &self.config.api_secret);
        params
            .into_iter()
            .fold(reqwest::multipart::Form::new(), |form, (key, value)| {
                form.text(key, value)
            })
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
    }
}

#[async_trait::async_trait]
impl BadgeStore for CloudinaryStore {
    async fn store(&self, upload: &BadgeUpload) -> anyhow::Result<String> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let file = reqwest::multipart::Part::bytes(upload.bytes.clone())
            .file_name(
                upload
                    .file_name
                    .clone()
                    .unwrap_or_else(|| "badge".to_string()),
            )
            .mime_str(&upload.content_type)?;

        let form = self
            .signed_form(vec![
                ("folder", self.config.folder.clone()),
                ("timestamp", timestamp),
            ])
            .part("file", file);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Cloudinary upload returned {status}: {body}");
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .context("unexpected Cloudinary upload response")?;
        tracing::debug!(public_id = %uploaded.public_id, "badge uploaded to Cloudinary");
        Ok(uploaded.secure_url)
    }

    async fn delete(&self, reference: &str) -> anyhow::Result<()> {
        let public_id = public_id_from_url(reference)
            .with_context(|| format!("{reference} is not a Cloudinary asset"))?;
        let timestamp = chrono::Utc::now().timestamp().to_string();

        let form = self.signed_form(vec![
            ("public_id", public_id.clone()),
            ("timestamp", timestamp),
        ]);

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Cloudinary destroy returned {status}: {body}");
        }

        let destroyed: DestroyResponse = response.json().await?;
        match destroyed.result.as_str() {
            "ok" => Ok(()),
            "not found" => {
                tracing::debug!(%public_id, "badge already gone from Cloudinary");
                Ok(())
            }
            other => anyhow::bail!("Cloudinary destroy of {public_id} returned {other}"),
        }
    }
}

/// Hex SHA-256 over the alphabetically sorted `key=value` pairs joined by `&`,
/// followed by the API secret.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha256::digest(format!("{joined}{api_secret}").as_bytes()))
}

/// `https://res.cloudinary.com/<cloud>/image/upload/v123/folder/name.png`
/// becomes `folder/name`.
pub fn public_id_from_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/upload/")?;
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);

    let rest = match rest.split_once('/') {
        Some((version, tail))
            if version.len() > 1
                && version.starts_with('v')
                && version[1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            tail
        }
        _ => rest,
    };

    let public_id = match rest.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains('/') => stem,
        _ => rest,
    };

    (!public_id.is_empty()).then(|| public_id.to_string())
}

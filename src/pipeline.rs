//! One publishing run: pick a comic, download it, post it, clean up.
//!
//! Stages run strictly in order. Any failure aborts the run and leaves
//! whatever was already done (a downloaded file, an uploaded photo) as is.

use std::path::PathBuf;

use rand::Rng;
use tracing::info;

use crate::cleanup::delete_file;
use crate::config::PipelineConfig;
use crate::download::{local_image_path, ImageDownloader};
use crate::vk::{AttachmentId, VkClient};
use crate::xkcd::{random_comic, ComicReference, XkcdClient};
use crate::Result;

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub comic: ComicReference,
    pub caption: String,
    pub image_path: PathBuf,
    pub attachment: AttachmentId,
    pub post_id: Option<i64>,
    pub image_removed: bool,
}

pub struct Pipeline {
    xkcd: XkcdClient,
    downloader: ImageDownloader,
    vk: VkClient,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Ok(Self {
            xkcd: XkcdClient::new(&config.xkcd)?,
            downloader: ImageDownloader::new()?,
            vk: VkClient::new(config.vk.clone())?,
            config,
        })
    }

    /// Publish a comic drawn at random from the whole archive.
    pub async fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<PublishReport> {
        let max_index = self.xkcd.get_current_number().await?;
        let comic = random_comic(max_index, rng)?;
        self.run_for(comic).await
    }

    /// Publish a specific comic.
    pub async fn run_for(&self, comic: ComicReference) -> Result<PublishReport> {
        let comic_url = self.xkcd.comic_url(comic);
        info!(index = comic.index, %comic_url, "Selected comic");

        let detail = self.xkcd.get_image_url_with_comment(&comic_url).await?;
        let image_path = local_image_path(&self.config.work_dir, &detail.image_url)?;

        self.downloader
            .save_image(&image_path, &detail.image_url)
            .await?;

        let upload_url = self.vk.get_upload_url().await?;
        let uploaded = self.vk.upload_photo(&image_path, &upload_url).await?;
        let attachment = self.vk.save_wall_photo(uploaded).await?;
        let response = self.vk.post_photo(&attachment, &detail.comment).await?;

        let post_id = response
            .get("response")
            .and_then(|r| r.get("post_id"))
            .and_then(|id| id.as_i64());
        info!(%attachment, ?post_id, "✅ Comic posted to wall");

        let image_removed = if self.config.keep_image {
            info!(path = %image_path.display(), "Keeping downloaded image");
            false
        } else {
            delete_file(&image_path).await?;
            true
        };

        Ok(PublishReport {
            comic,
            caption: detail.comment,
            image_path,
            attachment,
            post_id,
            image_removed,
        })
    }
}

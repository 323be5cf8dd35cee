use std::path::{Path, PathBuf};

use reqwest::Client;
use tokio::io::AsyncWriteExt;

use crate::error::{DoctorError, Result};

/// ONNX export of google/vit-base-patch16-224
pub const DEFAULT_CLASSIFIER_REPO: &str = "Xenova/vit-base-patch16-224";
pub const DEFAULT_CLASSIFIER_FILE: &str = "onnx/model.onnx";

const HUB_URL: &str = "https://huggingface.co";

/// Location of the pretrained classifier weights on the hub and in the local cache
#[derive(Debug, Clone)]
pub struct ModelWeights {
    repo: String,
    file: String,
    cache_dir: PathBuf,
}

impl ModelWeights {
    pub fn new(repo: &str, file: &str, cache_dir: PathBuf) -> Self {
        Self {
            repo: repo.to_string(),
            file: file.to_string(),
            cache_dir,
        }
    }

    /// Weights from `repo`/`file`, cached under `~/.cache/mrdoc/models`
    pub fn cached(repo: &str, file: &str) -> Result<Self> {
        Ok(Self::new(repo, file, default_cache_dir()?))
    }

    pub fn default_location() -> Result<Self> {
        Self::cached(DEFAULT_CLASSIFIER_REPO, DEFAULT_CLASSIFIER_FILE)
    }

    pub fn url(&self) -> String {
        format!("{}/{}/resolve/main/{}", HUB_URL, self.repo, self.file)
    }

    /// `<cache_dir>/<owner>--<name>/<file>`
    pub fn local_path(&self) -> PathBuf {
        let mut path = self.cache_dir.join(self.repo.replace('/', "--"));
        for segment in self.file.split('/') {
            path.push(segment);
        }
        path
    }

    pub fn is_cached(&self) -> bool {
        self.local_path().is_file()
    }

    /// Return the cached weights, downloading them first if needed
    pub async fn ensure(&self) -> Result<PathBuf> {
        let path = self.local_path();
        if path.is_file() {
            tracing::debug!(path = %path.display(), "classifier weights already cached");
            return Ok(path);
        }

        self.download(&path).await?;
        Ok(path)
    }

    async fn download(&self, path: &Path) -> Result<()> {
        let url = self.url();
        tracing::info!(url = %url, "downloading classifier weights");

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut response = Client::new().get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(DoctorError::Provider {
                provider: "Hugging Face",
                status,
                body: format!("failed to download {}", url),
            });
        }

        // Write to a side file so an interrupted download never looks cached
        let partial = path.with_extension("part");
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&partial, path).await?;
        tracing::info!(bytes = written, path = %path.display(), "classifier weights cached");
        Ok(())
    }
}

fn default_cache_dir() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir().ok_or_else(|| {
        DoctorError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "could not determine cache directory",
        ))
    })?;
    Ok(cache_dir.join("mrdoc").join("models"))
}

/// Download the classifier weights ahead of time (used by `mrdoc fetch-model`)
pub async fn download_classifier_weights(weights: &ModelWeights) -> Result<PathBuf> {
    if weights.is_cached() {
        println!("✓ Classifier weights already cached at {}", weights.local_path().display());
        return Ok(weights.local_path());
    }

    println!("Downloading classifier weights from {}...", weights.url());
    let path = weights.ensure().await?;
    println!("✓ Classifier weights cached at {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_points_at_hub_file() {
        let weights = ModelWeights::new(DEFAULT_CLASSIFIER_REPO, DEFAULT_CLASSIFIER_FILE, PathBuf::from("/tmp"));
        assert_eq!(
            weights.url(),
            "https://huggingface.co/Xenova/vit-base-patch16-224/resolve/main/onnx/model.onnx"
        );
    }

    #[test]
    fn test_local_path_layout() {
        let weights = ModelWeights::new("owner/model", "onnx/model.onnx", PathBuf::from("/cache"));
        assert_eq!(
            weights.local_path(),
            PathBuf::from("/cache/owner--model/onnx/model.onnx")
        );
    }

    #[tokio::test]
    async fn test_ensure_uses_cached_file() {
        let dir = tempfile::tempdir().unwrap();
        let weights = ModelWeights::new("owner/model", "model.onnx", dir.path().to_path_buf());
        let path = weights.local_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"onnx").unwrap();

        assert!(weights.is_cached());
        assert_eq!(weights.ensure().await.unwrap(), path);
    }
}

use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::error::StartupError;

/// Upload and plot directories. Files are named by request id, never by
/// the client-supplied filename.
#[derive(Debug, Clone)]
pub struct Storage {
    upload_dir: PathBuf,
    plot_dir: PathBuf,
}

impl Storage {
    pub fn new(upload_dir: impl Into<PathBuf>, plot_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            plot_dir: plot_dir.into(),
        }
    }

    /// Create both directories if they are missing.
    pub fn ensure_dirs(&self) -> Result<(), StartupError> {
        for dir in [&self.upload_dir, &self.plot_dir] {
            std::fs::create_dir_all(dir).map_err(|source| StartupError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn upload_path(&self, id: Uuid, original_name: &str) -> PathBuf {
        match extension_of(original_name) {
            Some(ext) => self.upload_dir.join(format!("{id}.{ext}")),
            None => self.upload_dir.join(id.to_string()),
        }
    }

    pub fn plot_path(&self, id: Uuid) -> PathBuf {
        self.plot_dir.join(format!("plot_{id}.png"))
    }

    pub async fn save_upload(
        &self,
        id: Uuid,
        original_name: &str,
        bytes: &[u8],
    ) -> std::io::Result<PathBuf> {
        let path = self.upload_path(id, original_name);
        fs::write(&path, bytes).await?;
        Ok(path)
    }

    pub async fn save_plot(&self, id: Uuid, png: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.plot_path(id);
        fs::write(&path, png).await?;
        Ok(path)
    }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
}

/// Download name shown to the user: `plot_<name>.png`, reduced to a safe
/// character set and stripped of any directory part.
pub fn download_name(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .take(80)
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "plot.png".to_string()
    } else {
        format!("plot_{cleaned}.png")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_name_strips_paths_and_odd_characters() {
        assert_eq!(download_name("survey.xlsx"), "plot_survey.xlsx.png");
        assert_eq!(download_name("../../etc/passwd"), "plot_passwd.png");
        assert_eq!(download_name("C:\\Users\\me\\Modal split 2023.xlsx"), "plot_Modal_split_2023.xlsx.png");
        assert_eq!(download_name("a\"b;c.csv"), "plot_a_b_c.csv.png");
        assert_eq!(download_name(".."), "plot.png");
    }

    #[test]
    fn artifacts_are_keyed_by_id() {
        let storage = Storage::new("up", "plots");
        let id = Uuid::nil();
        assert_eq!(
            storage.upload_path(id, "../../secret.XLSX"),
            PathBuf::from("up").join(format!("{id}.xlsx"))
        );
        assert_eq!(storage.upload_path(id, "noext"), PathBuf::from("up").join(id.to_string()));
        assert_eq!(
            storage.plot_path(id),
            PathBuf::from("plots").join(format!("plot_{id}.png"))
        );
    }

    #[tokio::test]
    async fn saves_into_created_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("u"), dir.path().join("p/nested"));
        storage.ensure_dirs().unwrap();
        let id = Uuid::new_v4();
        let up = storage.save_upload(id, "s.csv", b"a,b").await.unwrap();
        let plot = storage.save_plot(id, b"png").await.unwrap();
        assert_eq!(std::fs::read(up).unwrap(), b"a,b");
        assert_eq!(std::fs::read(plot).unwrap(), b"png");
    }
}

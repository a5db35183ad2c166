use serde::Serialize;

use crate::context::UserContext;
use crate::error::{Error, Result};
use crate::http::HttpMethod;
use crate::model::FileMetadata;
use crate::transport::{json_body, Endpoint, MultipartForm};

#[derive(Serialize)]
struct PathBody<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct RemoveBody {
    paths: Vec<String>,
    trash: bool,
}

#[derive(Serialize)]
struct ArchiveBody<'a> {
    destination: String,
    sources: &'a [&'a str],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractBody {
    destination_dir: String,
    merge_and_overwrite: bool,
    source: String,
}

#[derive(Serialize)]
struct MoveBody<'a> {
    destination: &'a str,
    overwrite: bool,
    source: &'a str,
}

/// Paths are relative to the account home; the panel wants them rooted.
fn rooted(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Split a rooted path into its directory and final component.
fn split_path(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some(("", name)) => ("/", name),
        Some((dir, name)) => (dir, name),
        None => ("/", path),
    }
}

impl UserContext {
    /// Zip `sources` into `destination` on the server. `.zip` is appended
    /// when missing.
    pub fn create_archive(&self, destination: &str, sources: &[&str]) -> Result<()> {
        if destination.is_empty() || sources.is_empty() {
            return Err(Error::InvalidInput("no destination path or sources provided".to_string()));
        }
        let destination = if destination.ends_with(".zip") {
            destination.to_string()
        } else {
            format!("{destination}.zip")
        };
        let body = json_body(&ArchiveBody { destination, sources })?;
        self.call_modern_bytes(HttpMethod::Post, "filemanager-actions/create-archive", Some(body))?;
        Ok(())
    }

    /// Create `path` along with any missing parents.
    pub fn create_directory(&self, path: &str) -> Result<()> {
        let body = json_body(&PathBody { path })?;
        self.call_modern_bytes(HttpMethod::Post, "filemanager-actions/mkdir", Some(body))?;
        Ok(())
    }

    /// Remove `paths`, moving them to the trash unless `skip_trash`.
    pub fn delete_files(&self, skip_trash: bool, paths: &[&str]) -> Result<()> {
        if paths.is_empty() {
            return Err(Error::InvalidInput("no files provided".to_string()));
        }
        let mut normalized = Vec::with_capacity(paths.len());
        for (index, path) in paths.iter().enumerate() {
            if path.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "empty file path provided for file {}",
                    index + 1
                )));
            }
            normalized.push(rooted(path));
        }
        let body = json_body(&RemoveBody {
            paths: normalized,
            trash: !skip_trash,
        })?;
        self.call_modern_bytes(HttpMethod::Post, "filemanager-actions/remove", Some(body))?;
        Ok(())
    }

    pub fn download_file(&self, path: &str) -> Result<Vec<u8>> {
        self.call_modern_bytes(
            HttpMethod::Get,
            Endpoint::new("filemanager/download").query("path", path),
            None,
        )
    }

    pub fn extract_archive(&self, destination_dir: &str, source: &str, merge_and_overwrite: bool) -> Result<()> {
        if destination_dir.is_empty() || source.is_empty() {
            return Err(Error::InvalidInput(
                "no destination directory or source provided".to_string(),
            ));
        }
        let body = json_body(&ExtractBody {
            destination_dir: rooted(destination_dir),
            merge_and_overwrite,
            source: rooted(source),
        })?;
        self.call_modern_bytes(HttpMethod::Post, "filemanager-actions/extract-archive", Some(body))?;
        Ok(())
    }

    pub fn get_file_metadata(&self, path: &str) -> Result<FileMetadata> {
        self.call_modern(
            HttpMethod::Get,
            Endpoint::new("filemanager/metadata").query("path", path),
            None,
        )
    }

    pub fn move_path(&self, source: &str, destination: &str, overwrite: bool) -> Result<()> {
        let body = json_body(&MoveBody {
            destination,
            overwrite,
            source,
        })?;
        self.call_modern_bytes(HttpMethod::Post, "filemanager-actions/move", Some(body))?;
        Ok(())
    }

    /// Store `data` at `path`, replacing an existing file only when
    /// `overwrite` is set.
    pub fn upload_file(&self, path: &str, data: &[u8], overwrite: bool) -> Result<()> {
        if path.is_empty() {
            return Err(Error::InvalidInput("no upload path provided".to_string()));
        }
        let path = rooted(path);
        let (dir, name) = split_path(&path);
        let (body, content_type) = MultipartForm::new().file("file", name, data).finish();
        let endpoint = Endpoint::new("filemanager-actions/upload")
            .query("dir", dir)
            .query("overwrite", overwrite.to_string())
            .query("name", name);
        self.upload::<serde_json::Value>(HttpMethod::Post, endpoint, body, &content_type)?;
        Ok(())
    }
}

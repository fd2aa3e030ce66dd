use super::{RemoteContent, RemoteFile};
use crate::error::RemoteError;
use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// 本地目录实现的内容仓库，每个分支一个子目录
///
/// 版本标识为文件内容的 blake3 哈希，冲突语义与远程仓库一致。
pub struct LocalContent {
    base_path: PathBuf,
    name: String,
}

impl LocalContent {
    pub fn new(path: &Path) -> Result<Self, RemoteError> {
        if !path.exists() {
            std::fs::create_dir_all(path)?;
        }
        Ok(Self {
            base_path: path.to_path_buf(),
            name: format!("local:{}", path.display()),
        })
    }

    /// 解析分支内的文件路径，拒绝跳出根目录的路径
    fn resolve_path(&self, branch: &str, path: &str) -> Result<PathBuf, RemoteError> {
        let path = path.replace('\\', "/");
        let mut resolved = self.base_path.clone();
        for part in [branch, path.trim_start_matches('/')] {
            for component in Path::new(part).components() {
                match component {
                    Component::Normal(c) => resolved.push(c),
                    Component::CurDir => {}
                    _ => {
                        return Err(RemoteError::Io(io::Error::new(
                            io::ErrorKind::InvalidInput,
                            format!("非法路径: {}/{}", branch, path),
                        )))
                    }
                }
            }
        }
        Ok(resolved)
    }

    pub fn revision_of(content: &[u8]) -> String {
        blake3::hash(content).to_hex().to_string()
    }

    async fn read_file(full_path: &Path) -> Result<Option<Vec<u8>>, RemoteError> {
        match fs::read(full_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl RemoteContent for LocalContent {
    async fn read(&self, path: &str, reference: &str) -> Result<Option<RemoteFile>, RemoteError> {
        let full_path = self.resolve_path(reference, path)?;
        Ok(Self::read_file(&full_path).await?.map(|content| RemoteFile {
            sha: Self::revision_of(&content),
            content,
        }))
    }

    async fn write(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        branch: &str,
        expected: Option<&str>,
    ) -> Result<String, RemoteError> {
        let full_path = self.resolve_path(branch, path)?;

        let current = Self::read_file(&full_path)
            .await?
            .map(|data| Self::revision_of(&data));
        let accepted = match (expected, current.as_deref()) {
            (None, None) => true,
            (Some(e), Some(c)) => e == c,
            _ => false,
        };
        if !accepted {
            return Err(RemoteError::Conflict {
                path: path.to_string(),
            });
        }

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // 使用临时文件写入，然后原子重命名
        let temp_path = full_path.with_extension("tmp");
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, &full_path).await?;

        tracing::debug!("{}: {} ({})", self.name, path, message);
        Ok(Self::revision_of(content))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_update() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContent::new(dir.path()).unwrap();

        assert!(!store.exists("Icons/Home.png", "dev").await);
        let rev1 = store
            .write("Icons/Home.png", b"v1", "add", "dev", None)
            .await
            .unwrap();
        assert!(store.exists("Icons/Home.png", "dev").await);
        assert!(!store.exists("Icons/Home.png", "main").await);
        assert_eq!(store.revision("Icons/Home.png", "dev").await, Some(rev1.clone()));

        let rev2 = store
            .write("Icons/Home.png", b"v2", "update", "dev", Some(&rev1))
            .await
            .unwrap();
        assert_ne!(rev1, rev2);

        let file = store.read("Icons/Home.png", "dev").await.unwrap().unwrap();
        assert_eq!(file.content, b"v2");
        assert_eq!(file.sha, rev2);
    }

    #[tokio::test]
    async fn test_stale_revision_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContent::new(dir.path()).unwrap();

        let rev1 = store.write("a.png", b"1", "m", "dev", None).await.unwrap();
        store.write("a.png", b"2", "m", "dev", Some(&rev1)).await.unwrap();

        let err = store
            .write("a.png", b"3", "m", "dev", Some(&rev1))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        // 文件已存在时不带版本写入同样冲突
        let err = store.write("a.png", b"3", "m", "dev", None).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContent::new(dir.path()).unwrap();
        assert!(store.read("../secret", "dev").await.is_err());
        assert!(store.write("x", b"", "m", "../dev", None).await.is_err());
    }
}

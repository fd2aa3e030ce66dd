//! 测试用内存仓库，可注入读取失败、写入冲突和写入错误

use super::{RemoteContent, RemoteFile};
use crate::error::RemoteError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// 一次写入调用的记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCall {
    pub path: String,
    pub branch: String,
    pub message: String,
    pub expected: Option<String>,
}

#[derive(Default)]
struct Inner {
    files: HashMap<(String, String), RemoteFile>,
    next_sha: u64,
    failing_reads: HashSet<String>,
    failing_writes: HashSet<String>,
    /// 路径 -> 写入前插入的“并发”修改次数
    races: HashMap<String, u32>,
    writes: Vec<WriteCall>,
}

#[derive(Default)]
pub struct MemoryContent {
    inner: Mutex<Inner>,
}

impl MemoryContent {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sha(inner: &mut Inner) -> String {
        inner.next_sha += 1;
        format!("sha{:08}", inner.next_sha)
    }

    /// 直接放置文件，返回版本标识
    pub fn put(&self, branch: &str, path: &str, content: &[u8]) -> String {
        let mut inner = self.inner.lock().unwrap();
        let sha = Self::next_sha(&mut inner);
        inner.files.insert(
            (branch.to_string(), path.to_string()),
            RemoteFile {
                content: content.to_vec(),
                sha: sha.clone(),
            },
        );
        sha
    }

    pub fn get(&self, branch: &str, path: &str) -> Option<RemoteFile> {
        let inner = self.inner.lock().unwrap();
        inner
            .files
            .get(&(branch.to_string(), path.to_string()))
            .cloned()
    }

    pub fn fail_reads(&self, path: &str) {
        self.inner.lock().unwrap().failing_reads.insert(path.to_string());
    }

    pub fn fail_writes(&self, path: &str) {
        self.inner.lock().unwrap().failing_writes.insert(path.to_string());
    }

    /// 让接下来 `times` 次写入前都有别人抢先修改该文件
    pub fn race_writes(&self, path: &str, times: u32) {
        self.inner.lock().unwrap().races.insert(path.to_string(), times);
    }

    pub fn writes(&self) -> Vec<WriteCall> {
        self.inner.lock().unwrap().writes.clone()
    }
}

#[async_trait]
impl RemoteContent for MemoryContent {
    async fn read(&self, path: &str, reference: &str) -> Result<Option<RemoteFile>, RemoteError> {
        let inner = self.inner.lock().unwrap();
        if inner.failing_reads.contains(path) {
            return Err(RemoteError::Http {
                status: 500,
                body: "injected".to_string(),
            });
        }
        Ok(inner
            .files
            .get(&(reference.to_string(), path.to_string()))
            .cloned())
    }

    async fn write(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        branch: &str,
        expected: Option<&str>,
    ) -> Result<String, RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.writes.push(WriteCall {
            path: path.to_string(),
            branch: branch.to_string(),
            message: message.to_string(),
            expected: expected.map(str::to_string),
        });

        if inner.failing_writes.contains(path) {
            return Err(RemoteError::Http {
                status: 500,
                body: "injected".to_string(),
            });
        }

        let key = (branch.to_string(), path.to_string());
        let pending_race = inner.races.get(path).copied().unwrap_or(0);
        if pending_race > 0 {
            inner.races.insert(path.to_string(), pending_race - 1);
            let sha = Self::next_sha(&mut inner);
            inner.files.insert(
                key.clone(),
                RemoteFile {
                    content: b"concurrent".to_vec(),
                    sha,
                },
            );
        }

        let current = inner.files.get(&key).map(|f| f.sha.clone());
        if current.as_deref() != expected {
            return Err(RemoteError::Conflict {
                path: path.to_string(),
            });
        }

        let sha = Self::next_sha(&mut inner);
        inner.files.insert(
            key,
            RemoteFile {
                content: content.to_vec(),
                sha: sha.clone(),
            },
        );
        Ok(sha)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

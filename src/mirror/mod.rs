//! 本地镜像：差异计算与孤儿清理

mod diff;

pub use diff::MirrorDiff;

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// 列出目录下的普通文件名
pub async fn list_local(dir: &Path) -> Result<HashSet<String>> {
    let mut names = HashSet::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("读取目录失败: {:?}", dir))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("读取目录失败: {:?}", dir))?
    {
        let file_type = entry.file_type().await?;
        if !file_type.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.insert(name.to_string());
        }
    }

    Ok(names)
}

/// 删除孤儿文件，返回删除数量
///
/// 任一文件删除失败即中止，剩余孤儿留到下一轮
pub async fn prune(dir: &Path, orphans: &[String]) -> Result<usize> {
    for name in orphans {
        let path = dir.join(name);
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("删除孤儿文件失败: {:?}", path))?;
        debug!("已删除孤儿文件: {}", name);
    }
    Ok(orphans.len())
}

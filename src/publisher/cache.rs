// 发布目录写入
//
// 文件服务器直接读取发布目录，所有写入都先落到点号开头的临时文件，
// 再原子重命名，读方不会看到写了一半的文件

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 发布目录中的临时文件路径（点号开头，元数据扫描时忽略）
fn temp_path_for(cache_dir: &Path, filename: &str) -> PathBuf {
    cache_dir.join(format!(".{}.tmp", filename))
}

/// 原子写入发布目录
pub async fn write_atomic(cache_dir: &Path, filename: &str, contents: &[u8]) -> Result<()> {
    tokio::fs::create_dir_all(cache_dir)
        .await
        .with_context(|| format!("创建发布目录失败: {:?}", cache_dir))?;

    let temp_path = temp_path_for(cache_dir, filename);
    let target = cache_dir.join(filename);

    tokio::fs::write(&temp_path, contents)
        .await
        .with_context(|| format!("写入临时文件失败: {:?}", temp_path))?;

    if let Err(e) = tokio::fs::rename(&temp_path, &target).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e).with_context(|| format!("替换发布文件失败: {:?}", target));
    }
    Ok(())
}

/// 把工作目录中的文件复制到发布目录（覆盖）
///
/// # 返回
/// - `Ok(true)`: 已发布
/// - `Ok(false)`: 源文件不存在，跳过
pub async fn publish_file(src_dir: &Path, filename: &str, cache_dir: &Path) -> Result<bool> {
    let src = src_dir.join(filename);
    if !tokio::fs::try_exists(&src).await.unwrap_or(false) {
        debug!("源文件不存在，跳过发布: {:?}", src);
        return Ok(false);
    }

    tokio::fs::create_dir_all(cache_dir)
        .await
        .with_context(|| format!("创建发布目录失败: {:?}", cache_dir))?;

    let temp_path = temp_path_for(cache_dir, filename);
    let target = cache_dir.join(filename);

    tokio::fs::copy(&src, &temp_path)
        .await
        .with_context(|| format!("复制文件失败: {:?} -> {:?}", src, temp_path))?;

    if let Err(e) = tokio::fs::rename(&temp_path, &target).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e).with_context(|| format!("替换发布文件失败: {:?}", target));
    }

    debug!("已发布: {}", filename);
    Ok(true)
}

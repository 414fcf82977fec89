//! 远端拉取错误类型

use thiserror::Error;

/// 单次 HTTP 拉取失败原因
///
/// 所有变体都只影响当前条目或当前数据源，下轮同步自动重试
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("请求超时: {url}")]
    Timeout { url: String },

    #[error("HTTP错误 {status}: {url}")]
    Status { url: String, status: u16 },

    #[error("请求失败: {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("响应内容为空: {url}")]
    Empty { url: String },

    #[error("写入本地文件失败: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// 按 reqwest 错误类型归类
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                source: err,
            }
        }
    }

    /// 是否为超时
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = FetchError::Status {
            url: "https://example.org/a.png".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "HTTP错误 404: https://example.org/a.png");
        assert!(!err.is_timeout());

        let err = FetchError::Timeout {
            url: "https://example.org/".to_string(),
        };
        assert!(err.is_timeout());
    }
}

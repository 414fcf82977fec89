//! 远端数据源
//!
//! 提供数据源配置类型和三种列表解析规则

pub mod flare;
pub mod parser;
pub mod types;

pub use flare::{group_frames, group_key, FlareCrawler};
pub use parser::{parse_anchor, parse_flat};
pub use types::{
    AnimationLayout, AnimationSpec, FrameConvention, FramePublish, ParseRule, RemoteFrame,
    SourceConfig, SyncMode,
};

//! 帧序列视频合成

mod encoder;
pub mod sequencer;

pub use encoder::{render_concat_list, EncodeRequest, FfmpegEncoder, VideoEncoder, EVEN_SCALE_FILTER};
pub use sequencer::{
    collect_frames, flare_list_name, flare_output_name, FrameSequencer, FRAME_LIST_NAME,
};

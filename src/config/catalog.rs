//! 内置数据源目录
//!
//! 数据源、静态图表和置顶资源都是固定的，直接编译进二进制

use crate::downloader::DownloadTask;
use crate::source::{
    AnimationLayout, AnimationSpec, FrameConvention, FramePublish, ParseRule, SourceConfig,
    SyncMode,
};
use serde::{Deserialize, Serialize};

const NOAA_BASE_URL: &str = "https://services.swpc.noaa.gov/images/";
const SDO_MPEG_URL: &str = "https://sdo.gsfc.nasa.gov/assets/img/latest/mpeg/";
const SDO_LATEST_URL: &str = "https://sdo.gsfc.nasa.gov/assets/img/latest/";
const SOHO_URL: &str = "https://sohowww.nascom.nasa.gov/data/";
const STEREO_PAGE_URL: &str = "https://stereo-ssc.nascom.nasa.gov/beacon/beacon_secchi.shtml";
const STEREO_BASE_URL: &str = "https://stereo-ssc.nascom.nasa.gov";
const GONG_URL: &str = "https://farside.nso.edu/calib_gallery.html";
const GONG_BASE_URL: &str = "https://farside.nso.edu";

/// 默认 CRF
const DEFAULT_CRF: u8 = 20;

/// 耀斑分组最少帧数
pub const FLARE_MIN_FRAMES: usize = 5;

/// 置顶资源（前端首页固定展示）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedResource {
    pub id: String,
    pub name: String,
    pub category: String,
}

impl PinnedResource {
    fn new(id: &str, name: &str, category: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
        }
    }
}

/// 数据源目录
#[derive(Debug, Clone)]
pub struct Catalog {
    /// 按同步顺序排列的数据源
    pub sources: Vec<SourceConfig>,
    /// 单例静态图表（每次覆盖，不做差异比较）
    pub charts: Vec<DownloadTask>,
    /// 归入 dashboard 分类的图表文件名（NASA 最新图像不在其中）
    pub dashboard: Vec<String>,
    pub pinned: Vec<PinnedResource>,
}

impl Catalog {
    /// 内置目录
    pub fn builtin() -> Self {
        let mut charts = dashboard_charts();
        let dashboard = charts.iter().map(|t| t.filename.clone()).collect();
        charts.extend(nasa_charts());

        Self {
            sources: builtin_sources(),
            charts,
            dashboard,
            pinned: builtin_pinned(),
        }
    }

    /// 按 ID 查找数据源
    pub fn source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// 静态图表的文件名集合
    pub fn chart_filenames(&self) -> Vec<String> {
        self.charts.iter().map(|t| t.filename.clone()).collect()
    }

    pub fn dashboard_filenames(&self) -> Vec<String> {
        self.dashboard.clone()
    }
}

fn single(output_name: &str, frame_duration: f64) -> Option<AnimationSpec> {
    Some(AnimationSpec {
        layout: AnimationLayout::Single {
            output_name: output_name.to_string(),
        },
        frame_duration,
        crf: DEFAULT_CRF,
    })
}

fn flat(listing_url: &str, pattern: &str, prefix: &str) -> ParseRule {
    ParseRule::FlatPattern {
        pattern: pattern.to_string(),
        base_url: listing_url.to_string(),
        filename_prefix: prefix.to_string(),
    }
}

fn builtin_sources() -> Vec<SourceConfig> {
    let enlil_url = format!("{}animations/enlil/", NOAA_BASE_URL);
    let ccor1_url = format!("{}animations/ccor1/", NOAA_BASE_URL);
    let drap_url = format!("{}animations/d-rap/global/", NOAA_BASE_URL);

    vec![
        SourceConfig {
            id: "enlil".to_string(),
            tag: "ENLIL".to_string(),
            rule: flat(&enlil_url, r#"href="(enlil_com2_[^"]+\.jpg)""#, "enlil_"),
            listing_url: enlil_url,
            convention: FrameConvention::new("enlil_", &["jpg"]),
            mode: SyncMode::Incremental,
            verbose: false,
            animation: single("enlil_anim.mp4", 0.1),
            frame_publish: FramePublish::None,
        },
        SourceConfig {
            id: "ccor1".to_string(),
            tag: "CCOR1".to_string(),
            rule: flat(
                &ccor1_url,
                r#"href="(\d{8}_\d{4}_ccor1_1024by960\.jpg)""#,
                "ccor1_",
            ),
            listing_url: ccor1_url,
            convention: FrameConvention::new("ccor1_", &["jpg"]),
            mode: SyncMode::Incremental,
            verbose: false,
            animation: single("ccor1_anim.mp4", 0.08),
            frame_publish: FramePublish::None,
        },
        SourceConfig {
            id: "drap".to_string(),
            tag: "DRAP".to_string(),
            rule: flat(
                &drap_url,
                r#"href="(SWX_DRAP20_C_SWPC_\d+_GLOBAL\.png)""#,
                "drap_anim_",
            ),
            listing_url: drap_url,
            convention: FrameConvention::new("drap_anim_", &["png"]),
            mode: SyncMode::Incremental,
            verbose: false,
            animation: single("drap_global_anim.mp4", 0.1),
            frame_publish: FramePublish::None,
        },
        SourceConfig {
            id: "gong".to_string(),
            tag: "GONG".to_string(),
            listing_url: GONG_URL.to_string(),
            rule: ParseRule::AnchorTag {
                pattern: r#"(?i)src="(/oQR/fqg/[^"]+\.jpg)""#.to_string(),
                base_url: GONG_BASE_URL.to_string(),
                filename_prefix: "gong_".to_string(),
            },
            convention: FrameConvention::new("gong_", &["jpg"]),
            mode: SyncMode::Incremental,
            verbose: false,
            animation: single("gong_anim.mp4", 0.15),
            frame_publish: FramePublish::Latest,
        },
        SourceConfig {
            id: "flares".to_string(),
            tag: "FLARES".to_string(),
            listing_url: format!("{}flares/", NOAA_BASE_URL),
            rule: ParseRule::RecursiveDirectory {
                base_url: NOAA_BASE_URL.to_string(),
                root: "flares/".to_string(),
                join_char: '_',
            },
            convention: FrameConvention::new("flares_", &["png", "jpg"]),
            mode: SyncMode::Incremental,
            verbose: false,
            animation: Some(AnimationSpec {
                layout: AnimationLayout::FlareGroups {
                    min_frames: FLARE_MIN_FRAMES,
                },
                frame_duration: 0.15,
                crf: 23,
            }),
            frame_publish: FramePublish::None,
        },
        SourceConfig {
            id: "stereo".to_string(),
            tag: "STEREO".to_string(),
            listing_url: STEREO_PAGE_URL.to_string(),
            rule: ParseRule::AnchorTag {
                pattern: r#"(?i)src="(/beacon/[^"]+\.(?:jpg|gif))""#.to_string(),
                base_url: STEREO_BASE_URL.to_string(),
                filename_prefix: "stereo_".to_string(),
            },
            convention: FrameConvention::new("stereo_", &["jpg", "gif"]),
            mode: SyncMode::Snapshot,
            verbose: true,
            animation: None,
            frame_publish: FramePublish::All,
        },
    ]
}

fn chart(url: String, filename: &str) -> DownloadTask {
    DownloadTask::new(url, filename)
}

/// 仪表盘图表：SDO 视频、NOAA 面板、D-RAP 静态图
fn dashboard_charts() -> Vec<DownloadTask> {
    let mut charts = Vec::new();

    // SDO 视频
    for (remote, local) in [
        ("latest_1024_HMIB.mp4", "sdo_hmib.mp4"),
        ("latest_1024_HMIBC.mp4", "sdo_hmibc.mp4"),
        ("latest_1024_HMII.mp4", "sdo_hmii.mp4"),
        ("latest_1024_0094.mp4", "latest_094.mp4"),
        ("latest_1024_0171.mp4", "latest_171.mp4"),
        ("latest_1024_0131.mp4", "latest_131.mp4"),
        ("latest_1024_0193.mp4", "latest_193.mp4"),
    ] {
        charts.push(chart(format!("{}{}", SDO_MPEG_URL, remote), local));
    }

    // NOAA 仪表盘 / ACE / SEAESRT
    for (remote, local) in [
        ("swx-overview-large.gif", "swx-overview-large.gif"),
        ("station-k-index.png", "station-k-index.png"),
        (
            "aurora-forecast-northern-hemisphere.jpg",
            "aurora-forecast-northern-hemisphere.jpg",
        ),
        ("synoptic-map.jpg", "synoptic-map.jpg"),
        ("ace-mag-24-hour.gif", "ace-mag-24.gif"),
        ("ace-swepam-24-hour.gif", "ace-swepam-24.gif"),
        ("ace-epam-24-hour.gif", "ace-epam-24.gif"),
        ("ace-sis-24-hour.gif", "ace-sis-24-hour.gif"),
        (
            "seaesrt-space-environment.png",
            "seaesrt-space-environment.png",
        ),
        ("seaesrt-charging-hazards.png", "seaesrt-charging-hazards.png"),
    ] {
        charts.push(chart(format!("{}{}", NOAA_BASE_URL, remote), local));
    }

    // D-RAP 静态图（含各预报时效）
    for region in ["global", "north-pole", "south-pole"] {
        for suffix in ["", "_f05", "_f10", "_f15", "_f20", "_f25", "_f30"] {
            charts.push(chart(
                format!("{}d-rap/{}{}.png", NOAA_BASE_URL, region, suffix),
                &format!("drap_static_{}{}.png", region, suffix),
            ));
        }
    }

    charts
}

/// NASA 最新图像与 LASCO 动图，分类时不算作 dashboard
fn nasa_charts() -> Vec<DownloadTask> {
    let mut charts = Vec::new();

    for (id, path) in [
        ("lasco_c2", "realtime/c2/1024/latest.jpg"),
        ("lasco_c3", "realtime/c3/1024/latest.jpg"),
    ] {
        charts.push(chart(format!("{}{}", SOHO_URL, path), &format!("{}.jpg", id)));
    }
    for (id, code) in [
        ("sdo_193", "0193"),
        ("sdo_304", "0304"),
        ("sdo_335", "0335"),
        ("sdo_211", "0211"),
        ("sdo_171", "0171"),
        ("hmi_mag", "HMIB"),
        ("hmi_ic", "HMII"),
        ("hmi_iic", "HMIIC"),
    ] {
        charts.push(chart(
            format!("{}latest_2048_{}.jpg", SDO_LATEST_URL, code),
            &format!("{}.jpg", id),
        ));
    }

    // LASCO 动图
    for (id, name) in [("lasco_c2", "current_c2.gif"), ("lasco_c3", "current_c3.gif")] {
        charts.push(chart(
            format!("{}LATEST/{}", SOHO_URL, name),
            &format!("{}_anim.gif", id),
        ));
    }

    charts
}

fn builtin_pinned() -> Vec<PinnedResource> {
    vec![
        PinnedResource::new("enlil_anim.mp4", "WSA-ENLIL PREDICTION", "dashboard"),
        PinnedResource::new("drap_global_anim.mp4", "D-RAP GLOBAL (ANIMATION)", "ionosphere"),
        PinnedResource::new("sdo_hmib.mp4", "SDO MAGNETOGRAM", "dashboard"),
        PinnedResource::new("sdo_hmibc.mp4", "SDO MAGNETOGRAM (COLOR)", "dashboard"),
        PinnedResource::new("sdo_hmii.mp4", "SDO INTENSITYGRAM", "dashboard"),
        PinnedResource::new("swx-overview-large.gif", "SOLAR WIND (Real-Time)", "dashboard"),
        PinnedResource::new("station-k-index.png", "PLANETARY K-INDEX", "dashboard"),
        PinnedResource::new(
            "aurora-forecast-northern-hemisphere.jpg",
            "AURORA BOREALIS",
            "dashboard",
        ),
        PinnedResource::new(
            "geospace_geospace_timeline_critical.png",
            "GEOSPACE TIMELINE",
            "dashboard",
        ),
    ]
}

pub mod heatmap;

pub use heatmap::{HeatmapClient, RefreshKind, ShowFetch, build_http_client};

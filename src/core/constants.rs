// Defaults and fixed values for recording normalization and playback

use std::time::Duration;

/// Label colors assigned by position when a label carries none.
pub const LABEL_PALETTE: [&str; 6] = [
    "#FF5733", "#33FF66", "#335BFF", "#FFC133", "#FF33A8", "#33FFF9",
];

/// Chart colors assigned by position when a label carries none.
pub const CHART_PALETTE: [&str; 6] = [
    "#33C1FF", "#FFC133", "#9D33FF", "#33FF77", "#FF3333", "#3385FF",
];

// Untitled labels become "Label 1", "Label 2", ...
pub const DEFAULT_TITLE_PREFIX: &str = "Label";

// Suffix marking a color key inside a raw digitalStatus object
pub const DIGITAL_COLOR_SUFFIX: &str = "_color";

/// Real time that must pass before the playback clock commits one second.
pub const ADVANCE_PERIOD: Duration = Duration::from_secs(1);

/// Default spacing between tick-loop frames (roughly one display refresh).
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// Largest elapsed second a recording may carry (31 days). The second index
/// allocates one slot per second up to the largest one present.
pub const MAX_SECOND: u32 = 31 * 24 * 3600;

// Capacity of the engine event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Digital sensors produced by the synthetic generator, with their fixed colors.
pub const SYNTHETIC_DIGITAL_SENSORS: [(&str, &str); 5] = [
    ("On-Track Status", "#FF0000"),
    ("Park Brake Output", "#00FF00"),
    ("Front Rail Gear Down", "#1E90FF"),
    ("Front Rail Gear Up", "#FFD700"),
    ("EWP Stowed", "#FF69B4"),
];

// Synthetic track origin (lat, lng)
pub const SYNTHETIC_ORIGIN: (f64, f64) = (28.6139, 77.2090);

// Magic prefixes for compressed recording documents
pub const GZIP_MAGIC: &[u8; 2] = &[0x1f, 0x8b];
pub const ZSTD_MAGIC: &[u8; 4] = &[0x28, 0xb5, 0x2f, 0xfd];
pub const LZ4_MAGIC: &[u8; 4] = &[0x04, 0x22, 0x4d, 0x18];

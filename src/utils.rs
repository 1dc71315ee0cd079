use std::time::{SystemTime, UNIX_EPOCH};

pub const KB: usize = 1024;
pub const MB: usize = 1024 * 1024;
pub const GB: usize = 1024 * 1024 * 1024;

/// Milliseconds since the unix epoch, used to timestamp paste titles.
pub fn unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

pub fn format_bytes(bytes: usize) -> String {
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{} KB", bytes / KB)
    } else if bytes < GB {
        format!("{} MB", bytes / MB)
    } else {
        format!("{} GB", bytes / GB)
    }
}

pub fn format_speed(bps: f64) -> String {
    format!("{}/s", format_bytes(bps as usize))
}

#[cfg(test)]
mod utils_test {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2 KB");
        assert_eq!(format_bytes(3 * MB), "3 MB");
        assert_eq!(format_bytes(5 * GB), "5 GB");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(100.0), "100 B/s");
        assert_eq!(format_speed((4 * KB) as f64), "4 KB/s");
    }
}

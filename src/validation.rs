use crate::config::UploadConfig;
use crate::queue::item::FileMeta;

/// Validate a file against the current configuration.
///
/// Rules are applied independently and all violations are collected; an empty
/// result means the file is acceptable. No side effects.
pub fn validate_file(file: &FileMeta, config: &UploadConfig) -> Vec<String> {
    let mut violations = Vec::new();

    if file.size_bytes > config.max_file_size_bytes {
        violations.push(format!(
            "File size exceeds {} limit",
            format_file_size(config.max_file_size_bytes)
        ));
    }

    if !config.allowed_type_patterns.is_empty() {
        let allowed = config
            .allowed_type_patterns
            .iter()
            .any(|pattern| matches_pattern(file, pattern));

        if !allowed {
            violations.push("File type not allowed".to_string());
        }
    }

    violations
}

/// A pattern starting with `.` is a case-insensitive suffix match against the
/// file name; any other pattern matches as a substring of the MIME type.
fn matches_pattern(file: &FileMeta, pattern: &str) -> bool {
    if pattern.starts_with('.') {
        file.name
            .to_lowercase()
            .ends_with(&pattern.to_lowercase())
    } else {
        file.mime_type.contains(pattern)
    }
}

/// Human-readable file size, 1024-based.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let exponent = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);

    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');

    format!("{} {}", trimmed, UNITS[exponent])
}

pub fn format_upload_speed(bytes_per_second: u64) -> String {
    format!("{}/s", format_file_size(bytes_per_second))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size_bytes: u64, mime_type: &str) -> FileMeta {
        FileMeta {
            name: name.to_string(),
            size_bytes,
            mime_type: mime_type.to_string(),
        }
    }

    #[test]
    fn accepts_file_within_limits() {
        let config = UploadConfig::default();
        let violations = validate_file(&file("photo.png", 1024, "image/png"), &config);
        assert!(violations.is_empty());
    }

    #[test]
    fn rejects_oversized_file() {
        let config = UploadConfig {
            max_file_size_bytes: 1000,
            ..UploadConfig::default()
        };

        let violations = validate_file(&file("big.bin", 2000, "application/octet-stream"), &config);
        assert_eq!(violations, vec!["File size exceeds 1000 Bytes limit"]);
    }

    #[test]
    fn empty_pattern_list_allows_all_types() {
        let config = UploadConfig::default();
        let violations = validate_file(&file("anything.xyz", 10, "application/x-unknown"), &config);
        assert!(violations.is_empty());
    }

    #[test]
    fn extension_pattern_matches_case_insensitively() {
        let config = UploadConfig {
            allowed_type_patterns: vec![".png".to_string()],
            ..UploadConfig::default()
        };

        assert!(validate_file(&file("SHOT.PNG", 10, "image/png"), &config).is_empty());
        assert_eq!(
            validate_file(&file("doc.pdf", 10, "application/pdf"), &config),
            vec!["File type not allowed"]
        );
    }

    #[test]
    fn mime_pattern_matches_as_substring() {
        let config = UploadConfig {
            allowed_type_patterns: vec!["image".to_string()],
            ..UploadConfig::default()
        };

        assert!(validate_file(&file("a.webp", 10, "image/webp"), &config).is_empty());
        assert!(!validate_file(&file("a.mp4", 10, "video/mp4"), &config).is_empty());
    }

    #[test]
    fn collects_all_violations_without_short_circuiting() {
        let config = UploadConfig {
            max_file_size_bytes: 100,
            allowed_type_patterns: vec![".png".to_string()],
            ..UploadConfig::default()
        };

        let violations = validate_file(&file("movie.mp4", 5000, "video/mp4"), &config);
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn formats_file_sizes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(500), "500 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
    }

    #[test]
    fn formats_upload_speed() {
        assert_eq!(format_upload_speed(2048), "2 KB/s");
    }
}

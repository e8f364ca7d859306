//! MIME type probing by file extension

/// Reported when the extension is not known
pub const UNKNOWN_MIME_TYPE: &str = "content/unknown";

const MIME_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("ico", "image/x-icon"),
    ("svg", "image/svg+xml"),
    ("webp", "image/webp"),
    ("txt", "text/plain"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("pdf", "application/pdf"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
    ("otf", "font/otf"),
    ("wav", "audio/wav"),
    ("mp3", "audio/mpeg"),
    ("ogg", "audio/ogg"),
    ("mp4", "video/mp4"),
];

/// MIME type of `file_name`, or [`UNKNOWN_MIME_TYPE`]
pub fn probe(file_name: &str) -> &'static str {
    file_name
        .rsplit_once('.')
        .and_then(|(_, extension)| {
            MIME_TYPES
                .iter()
                .find(|(known, _)| known.eq_ignore_ascii_case(extension))
        })
        .map_or(UNKNOWN_MIME_TYPE, |(_, mime)| *mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe() {
        assert_eq!(probe("logo.PNG"), "image/png");
        assert_eq!(probe("site.min.css"), "text/css");
        assert_eq!(probe("blob.bin"), UNKNOWN_MIME_TYPE);
        assert_eq!(probe("Makefile"), UNKNOWN_MIME_TYPE);
    }
}

//! Recognising shareable links and rewriting file-host URLs to direct downloads.

use url::Url;

/// Pull the video id out of a shareable video-platform link.
///
/// Recognises `youtu.be/<id>` and `youtube.com` / `m.youtube.com` links of
/// the `/watch?v=<id>`, `/shorts/<id>` and `/embed/<id>` forms.
pub fn extract_video_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    let id = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string),
        "youtube.com" | "m.youtube.com" => {
            let path = url.path();
            if path == "/watch" {
                url.query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned())
            } else if path.starts_with("/shorts/") || path.starts_with("/embed/") {
                url.path_segments()?.nth(1).map(str::to_string)
            } else {
                None
            }
        }
        _ => None,
    };

    id.filter(|id| !id.is_empty())
}

/// Rewrite share links from common file hosts into direct-download URLs.
///
/// Input that does not parse as a URL (a local path, say) is returned as-is.
pub fn normalize_audio_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };

    let host = url.host_str().map(str::to_owned);
    match host.as_deref() {
        Some("www.dropbox.com") | Some("dropbox.com") => {
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(k, _)| k != "dl")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            if url.set_host(Some("dl.dropboxusercontent.com")).is_err() {
                return raw.to_string();
            }
            if kept.is_empty() {
                url.set_query(None);
            } else {
                url.query_pairs_mut().clear().extend_pairs(kept);
            }
            url.to_string()
        }
        Some("github.com") => {
            let parts: Vec<&str> = url
                .path_segments()
                .map(|s| s.filter(|p| !p.is_empty()).collect())
                .unwrap_or_default();
            if parts.len() >= 5 && parts[2] == "blob" {
                format!(
                    "https://raw.githubusercontent.com/{}/{}/{}/{}",
                    parts[0],
                    parts[1],
                    parts[3],
                    parts[4..].join("/")
                )
            } else {
                url.to_string()
            }
        }
        Some("drive.google.com") => {
            let segments: Vec<&str> = url
                .path_segments()
                .map(|s| s.collect())
                .unwrap_or_default();
            let from_path = segments
                .windows(3)
                .find(|w| w[0] == "file" && w[1] == "d" && !w[2].is_empty())
                .map(|w| w[2].to_string());
            let id = from_path.or_else(|| {
                url.query_pairs()
                    .find(|(k, _)| k == "id")
                    .map(|(_, v)| v.into_owned())
            });
            match id {
                Some(id) => format!("https://drive.google.com/uc?export=download&id={id}"),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}

/// Sources fetched over the network rather than opened from disk.
pub fn is_remote_source(src: &str) -> bool {
    let lower = src.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Session-only object references; never written to the library file.
pub fn is_ephemeral_source(src: &str) -> bool {
    src.trim_start().starts_with("blob:")
}

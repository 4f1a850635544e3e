//! Browser request profiles.
//!
//! The shield fingerprints clients on their header set, so plain
//! `reqwest/x.y` requests are challenged immediately. Each client picks one
//! realistic browser profile at construction time and keeps it for the whole
//! session; rotating mid-session looks more suspicious than sticking to one.

use http::{HeaderMap, HeaderName, HeaderValue};
use rand::seq::SliceRandom;
use rand::thread_rng;

/// One browser identity: the ordered header set sent with every request.
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    pub name: &'static str,
    headers: &'static [(&'static str, &'static str)],
}

impl BrowserProfile {
    /// Materialises the profile into a header map.
    pub fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in self.headers {
            let header_name =
                HeaderName::from_static(name);
            let header_value = HeaderValue::from_static(value);
            map.insert(header_name, header_value);
        }
        map
    }

    pub fn user_agent(&self) -> &'static str {
        self.headers
            .iter()
            .find(|(name, _)| *name == "user-agent")
            .map(|(_, value)| *value)
            .unwrap_or_default()
    }
}

static PROFILES: &[BrowserProfile] = &[
    BrowserProfile {
        name: "chrome-windows",
        headers: &[
            (
                "user-agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
            ),
            (
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,\
                 image/webp,image/apng,*/*;q=0.8",
            ),
            ("accept-language", "en-US,en;q=0.9"),
            ("accept-encoding", "gzip, deflate, br"),
            ("upgrade-insecure-requests", "1"),
        ],
    },
    BrowserProfile {
        name: "chrome-linux",
        headers: &[
            (
                "user-agent",
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
            ),
            (
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,\
                 image/webp,image/apng,*/*;q=0.8",
            ),
            ("accept-language", "en-US,en;q=0.9"),
            ("accept-encoding", "gzip, deflate, br"),
            ("upgrade-insecure-requests", "1"),
        ],
    },
    BrowserProfile {
        name: "firefox-windows",
        headers: &[
            (
                "user-agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) \
                 Gecko/20100101 Firefox/133.0",
            ),
            (
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,\
                 image/webp,*/*;q=0.8",
            ),
            ("accept-language", "en-US,en;q=0.5"),
            ("accept-encoding", "gzip, deflate, br"),
            ("upgrade-insecure-requests", "1"),
        ],
    },
    BrowserProfile {
        name: "safari-macos",
        headers: &[
            (
                "user-agent",
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
                 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
            ),
            (
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
            ("accept-language", "en-US,en;q=0.9"),
            ("accept-encoding", "gzip, deflate, br"),
        ],
    },
];

/// Picks a random profile for a new client session.
pub fn random_profile() -> BrowserProfile {
    let mut rng = thread_rng();
    PROFILES
        .choose(&mut rng)
        .cloned()
        .unwrap_or_else(|| PROFILES[0].clone())
}

/// Looks up a profile by name, for callers that want a fixed identity.
pub fn profile_by_name(name: &str) -> Option<BrowserProfile> {
    PROFILES.iter().find(|profile| profile.name == name).cloned()
}

//! Challenge detection.
//!
//! Classifies responses produced by the anti-automation shield in front of
//! the API (Cloudflare) into the mitigation kinds the request layer knows how
//! to react to. Pattern-based: a static signature table matched against the
//! interstitial HTML, plus status/header heuristics.

use http::HeaderMap;
use http::header;
use once_cell::sync::Lazy;
use regex::Regex;

/// Mitigation kinds the shield distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeKind {
    /// Legacy "Just a moment..." JavaScript challenge.
    JsChallenge,
    /// Managed browser-verification interstitial.
    ManagedChallenge,
    /// Turnstile captcha widget.
    Turnstile,
    /// Error 1015 / HTTP 429 rate limiting.
    RateLimit,
    /// Error 1020 access denied.
    AccessDenied,
}

impl ChallengeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeKind::JsChallenge => "js_challenge",
            ChallengeKind::ManagedChallenge => "managed_challenge",
            ChallengeKind::Turnstile => "turnstile",
            ChallengeKind::RateLimit => "rate_limit",
            ChallengeKind::AccessDenied => "access_denied",
        }
    }

    /// Whether waiting and replaying the request can clear the challenge.
    /// Interactive kinds (captcha) and hard blocks cannot be waited out.
    pub fn retryable(&self) -> bool {
        !matches!(self, ChallengeKind::Turnstile | ChallengeKind::AccessDenied)
    }
}

impl std::fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct ChallengeSignature {
    kind: ChallengeKind,
    patterns: Vec<Regex>,
}

impl ChallengeSignature {
    fn new(kind: ChallengeKind, raw_patterns: &[&str]) -> Self {
        let patterns = raw_patterns
            .iter()
            .map(|pattern| build_regex(pattern))
            .collect();
        Self { kind, patterns }
    }

    fn matches(&self, body: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(body))
    }
}

fn build_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid challenge pattern {pattern:?}: {err}"))
}

/// Static list of known interstitial signatures. Order matters: the most
/// specific kinds are listed first.
static KNOWN_SIGNATURES: Lazy<Vec<ChallengeSignature>> = Lazy::new(|| {
    vec![
        ChallengeSignature::new(
            ChallengeKind::Turnstile,
            &[
                r#"class="cf-turnstile""#,
                r"cf-turnstile-response",
                r#"src="https://challenges\.cloudflare\.com/turnstile/v0/api\.js"#,
            ],
        ),
        ChallengeSignature::new(
            ChallengeKind::RateLimit,
            &[
                r#"<span[^>]*class="cf-error-code">1015<"#,
                r"You are being rate limited",
            ],
        ),
        ChallengeSignature::new(
            ChallengeKind::AccessDenied,
            &[
                r#"<span[^>]*class="cf-error-code">1020<"#,
                r"Access denied \| .*? used Cloudflare to restrict access",
            ],
        ),
        ChallengeSignature::new(
            ChallengeKind::ManagedChallenge,
            &[
                r#"<div[^>]*class="cf-browser-verification"#,
                r"window\._cf_chl_ctx\s*=",
                r#"cpo\.src\s*=\s*['"]/cdn-cgi/challenge-platform/"#,
            ],
        ),
        ChallengeSignature::new(
            ChallengeKind::JsChallenge,
            &[
                r"<title>\s*Just a moment\.\.\.\s*</title>",
                r"window\._cf_chl_opt\s*=",
                r#"<form[^>]*id="challenge-form""#,
            ],
        ),
    ]
});

fn is_shield_server(headers: &HeaderMap) -> bool {
    headers
        .get(header::SERVER)
        .and_then(|value| value.to_str().ok())
        .map(|server| server.to_ascii_lowercase().contains("cloudflare"))
        .unwrap_or(false)
}

fn looks_like_html(headers: &HeaderMap, body: &str) -> bool {
    let html_content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|ct| ct.contains("text/html"))
        .unwrap_or(false);

    html_content_type || body.trim_start().starts_with('<')
}

/// Classifies a response, returning the challenge kind when the shield (and
/// not the API itself) produced it.
///
/// API errors share status codes with the shield, so a response is only
/// treated as a challenge when it carries an HTML interstitial. JSON error
/// envelopes pass through untouched.
pub fn detect_challenge(status: u16, headers: &HeaderMap, body: &str) -> Option<ChallengeKind> {
    if !matches!(status, 403 | 429 | 503) {
        return None;
    }

    if !looks_like_html(headers, body) {
        return None;
    }

    if let Some(signature) = KNOWN_SIGNATURES
        .iter()
        .find(|signature| signature.matches(body))
    {
        return Some(signature.kind);
    }

    // Unmarked interstitial: fall back on status semantics, but only when the
    // response demonstrably came through the shield.
    if is_shield_server(headers) {
        return Some(match status {
            429 => ChallengeKind::RateLimit,
            _ => ChallengeKind::ManagedChallenge,
        });
    }

    None
}

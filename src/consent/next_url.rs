//! Post-consent redirect target sanitization.

use std::borrow::Cow;

use url::Url;

/// Resolves a posted `next_url` to an absolute URL under `master_url`.
///
/// The value is percent-decoded once, then must be a relative reference that
/// stays on the master URL's origin and under its path. Anything else
/// (absolute URLs, scheme-relative `//host` forms, backslashes, control
/// characters, paths escaping the base) falls back to `home_page`.
///
/// Returns `None` only if `master_url` itself is not a usable base URL.
#[must_use]
pub fn resolve_redirect(master_url: &str, next_url: Option<&str>, home_page: &str) -> Option<Url> {
    let base = Url::parse(master_url).ok()?;
    if base.cannot_be_a_base() {
        return None;
    }

    let local = next_url
        .map(decode)
        .and_then(|candidate| local_target(&base, &candidate));
    match local {
        Some(url) => Some(url),
        None => base.join(home_page).ok(),
    }
}

fn decode(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

fn local_target(base: &Url, candidate: &str) -> Option<Url> {
    let candidate = candidate.trim();
    if candidate.is_empty()
        || candidate.starts_with("//")
        || candidate.contains('\\')
        || candidate.chars().any(char::is_control)
        || Url::parse(candidate).is_ok()
    {
        return None;
    }

    let joined = base.join(candidate.trim_start_matches('/')).ok()?;
    let same_origin = joined.origin() == base.origin();
    let under_base = joined.path().starts_with(base.path());
    (same_origin && under_base).then_some(joined)
}

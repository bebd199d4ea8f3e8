//! Attribution labels derived from listing URLs.

use url::Url;

/// Known portals and agencies, matched as substrings of the host.
const KNOWN_HOSTS: &[(&str, &str)] = &[
    ("myhome", "MyHome"),
    ("propertymap", "PropertyMap"),
    ("findqo", "FindQo"),
    ("sherryfitz", "SherryFitz"),
    ("dng", "DNG"),
    ("westcorkproperty", "James Lyon O'Keefe"),
    ("michelleburke", "Michelle Burke"),
];

/// Best-effort badge label for `url`.
///
/// Known hosts map to their display name; anything else falls back to the
/// first label of the hostname once a leading `www.` is dropped, so
/// `www.example-agent.ie` reads `example-agent`. `None` when no host can be
/// read.
pub fn source_label(url: &str) -> Option<String> {
    let host = host_of(url)?;
    let host = host.strip_prefix("www.").unwrap_or(&host);
    for (needle, label) in KNOWN_HOSTS {
        if host.contains(needle) {
            return Some((*label).to_string());
        }
    }
    host.split('.')
        .next()
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}

/// Lower-cased host of an absolute URL, without userinfo or port.
///
/// Internationalized hosts come back in their punycode form.
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(str::to_ascii_lowercase)
}

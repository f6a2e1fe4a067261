// src/checker/classify.rs
// =============================================================================
// This module decides what kind of link a raw URL is.
//
// The kind picks the validation strategy, so the rules are checked from the
// most specific prefix to the least specific:
//
//   ""                      -> Empty
//   #tab/<id>               -> Tab (docfx tabbed content)
//   http:// https://        -> Webpage
//   ftp:// ftps://          -> Ftp
//   mailto:                 -> Mail
//   xref:                   -> CrossReference
//   any other scheme:       -> Unrecognized
//   path into a resource    -> Resource
//   anything else           -> Local
//
// A `#fragment` is split off first and kept for anchor checks. Classification
// is a pure function: no filesystem, no network.
// =============================================================================

use serde::Serialize;
use std::path::Path;

use crate::config::{has_extension, Config};
use crate::document::Hyperlink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Empty,
    Local,
    Resource,
    Webpage,
    Ftp,
    Mail,
    CrossReference,
    Tab,
    Unrecognized,
}

// What decides whether a local path is a resource
#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    pub resource_dir: String,
    pub resource_extensions: Vec<String>,
}

impl From<&Config> for ClassifyOptions {
    fn from(config: &Config) -> Self {
        ClassifyOptions {
            resource_dir: config.resource_dir.clone(),
            resource_extensions: config.resource_extensions.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: LinkKind,
    /// Normalized target: the URL without fragment, the decoded local path,
    /// the mail address list, the xref uid or the tab id
    pub target: String,
    /// Decoded `#fragment`, if any
    pub fragment: Option<String>,
}

// A hyperlink together with its classification: the unit of work of the
// validator engine
#[derive(Debug, Clone)]
pub struct ClassifiedLink {
    pub link: Hyperlink,
    pub kind: LinkKind,
    pub target: String,
    pub fragment: Option<String>,
}

impl ClassifiedLink {
    pub fn new(link: Hyperlink, options: &ClassifyOptions) -> Self {
        let Classified {
            kind,
            target,
            fragment,
        } = classify(&link.raw, options);
        ClassifiedLink {
            link,
            kind,
            target,
            fragment,
        }
    }
}

pub fn classify(raw: &str, options: &ClassifyOptions) -> Classified {
    let raw = raw.trim();
    if raw.is_empty() {
        return classified(LinkKind::Empty, "", None);
    }

    if let Some(tab) = strip_prefix_ignore_case(raw, "#tab/") {
        return classified(LinkKind::Tab, tab, None);
    }

    let (target, fragment) = match raw.split_once('#') {
        Some((target, fragment)) => (target, Some(fragment)),
        None => (raw, None),
    };
    let fragment = fragment
        .filter(|f| !f.is_empty())
        .map(percent_decode);

    if starts_with_ignore_case(target, "http://") || starts_with_ignore_case(target, "https://") {
        return classified(LinkKind::Webpage, target, fragment);
    }
    if target.starts_with("//") {
        return classified(LinkKind::Webpage, &format!("https:{}", target), fragment);
    }
    if starts_with_ignore_case(target, "ftp://") || starts_with_ignore_case(target, "ftps://") {
        return classified(LinkKind::Ftp, target, fragment);
    }
    if let Some(address) = strip_prefix_ignore_case(target, "mailto:") {
        return classified(LinkKind::Mail, address, None);
    }
    if let Some(uid) = strip_prefix_ignore_case(target, "xref:") {
        // `xref:Uid?displayProperty=fullName` only names `Uid`
        let uid = uid.split('?').next().unwrap_or_default();
        return classified(LinkKind::CrossReference, &percent_decode(uid), fragment);
    }
    if has_scheme(target) {
        return classified(LinkKind::Unrecognized, target, fragment);
    }

    let path = percent_decode(target.split('?').next().unwrap_or_default()).replace('\\', "/");
    let kind = if is_resource(&path, options) {
        LinkKind::Resource
    } else {
        LinkKind::Local
    };
    Classified {
        kind,
        target: path,
        fragment,
    }
}

fn classified(kind: LinkKind, target: &str, fragment: Option<String>) -> Classified {
    Classified {
        kind,
        target: target.to_string(),
        fragment,
    }
}

fn is_resource(path: &str, options: &ClassifyOptions) -> bool {
    has_extension(Path::new(path), &options.resource_extensions)
        || path.split('/').any(|segment| segment == options.resource_dir)
}

// `scheme:` per RFC 3986, at least two characters long so Windows drive
// letters (`C:\docs`) are not mistaken for schemes
fn has_scheme(target: &str) -> bool {
    let Some((scheme, _)) = target.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    scheme.len() >= 2
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if starts_with_ignore_case(text, prefix) {
        text.get(prefix.len()..)
    } else {
        None
    }
}

// Decodes %XX escapes; invalid escapes are kept as written
fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = text
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(byte) = hex {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ClassifyOptions {
        ClassifyOptions::from(&Config::default())
    }

    fn kind(raw: &str) -> LinkKind {
        classify(raw, &options()).kind
    }

    #[test]
    fn test_kinds() {
        assert_eq!(kind(""), LinkKind::Empty);
        assert_eq!(kind("   "), LinkKind::Empty);
        assert_eq!(kind("https://www.rust-lang.org"), LinkKind::Webpage);
        assert_eq!(kind("HTTP://example.com"), LinkKind::Webpage);
        assert_eq!(kind("ftp://ftp.example.com/pub"), LinkKind::Ftp);
        assert_eq!(kind("ftps://ftp.example.com"), LinkKind::Ftp);
        assert_eq!(kind("mailto:docs@example.com"), LinkKind::Mail);
        assert_eq!(kind("xref:System.String"), LinkKind::CrossReference);
        assert_eq!(kind("#tab/windows"), LinkKind::Tab);
        assert_eq!(kind("tel:+123456"), LinkKind::Unrecognized);
        assert_eq!(kind("javascript:void(0)"), LinkKind::Unrecognized);
        assert_eq!(kind("./guide.md"), LinkKind::Local);
        assert_eq!(kind("C:\\docs\\guide.md"), LinkKind::Local);
        assert_eq!(kind("images/logo.PNG"), LinkKind::Resource);
        assert_eq!(kind("../.attachments/notes.txt"), LinkKind::Resource);
    }

    #[test]
    fn test_fragment_is_split_before_scheme_detection() {
        let c = classify("guide.md#getting-started", &options());
        assert_eq!(c.kind, LinkKind::Local);
        assert_eq!(c.target, "guide.md");
        assert_eq!(c.fragment.as_deref(), Some("getting-started"));

        let c = classify("https://example.com/page#part", &options());
        assert_eq!(c.target, "https://example.com/page");
        assert_eq!(c.fragment.as_deref(), Some("part"));
    }

    #[test]
    fn test_fragment_only_is_local_not_empty() {
        let c = classify("#section", &options());
        assert_eq!(c.kind, LinkKind::Local);
        assert_eq!(c.target, "");
        assert_eq!(c.fragment.as_deref(), Some("section"));
    }

    #[test]
    fn test_local_paths_are_decoded() {
        let c = classify("my%20folder/read%20me.md?view=raw#S%C3%A9curit%C3%A9", &options());
        assert_eq!(c.target, "my folder/read me.md");
        assert_eq!(c.fragment.as_deref(), Some("Sécurité"));

        let c = classify("..\\other\\page.md", &options());
        assert_eq!(c.target, "../other/page.md");
    }

    #[test]
    fn test_special_targets() {
        let c = classify("mailto:a@example.com,b@example.com", &options());
        assert_eq!(c.target, "a@example.com,b@example.com");

        let c = classify("xref:System.String?displayProperty=fullName", &options());
        assert_eq!(c.target, "System.String");

        let c = classify("#tab/linux/ubuntu", &options());
        assert_eq!(c.target, "linux/ubuntu");
        assert_eq!(c.fragment, None);
    }

    #[test]
    fn test_bad_percent_escape_is_kept() {
        assert_eq!(percent_decode("100%25 and 50%"), "100% and 50%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }
}

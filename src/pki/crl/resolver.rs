//! Distribution point name resolution.
//!
//! Distribution point names arrive in their textual general-name form
//! (`URI:http://ca.example/ca.crl`). A [`NameResolver`] turns such a name
//! into the URI the fetcher should dereference.

use serde::Deserialize;
use tracing::debug;

/// Type labels that may prefix a textual general name.
const GENERAL_NAME_LABELS: &[&str] = &[
    "URI",
    "DNS",
    "email",
    "DirName",
    "IP Address",
    "Registered ID",
    "othername",
    "X400Name",
    "EdiPartyName",
    "RelativeName",
];

/// Strategy for rewriting a raw general name into a fetchable URI.
///
/// Resolution never fails: a name that cannot be interpreted is returned
/// in its best-effort form and left for the fetcher to reject.
pub trait NameResolver: Send + Sync {
    fn resolve(&self, raw_name: &str) -> String;
}

impl<F> NameResolver for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn resolve(&self, raw_name: &str) -> String {
        self(raw_name)
    }
}

/// Strip the general-name type label and keep the remainder as is.
pub fn strip_type_prefix(raw_name: &str) -> &str {
    let trimmed = raw_name.trim();
    match trimmed.split_once(':') {
        Some((label, rest)) if GENERAL_NAME_LABELS.contains(&label.trim()) => rest.trim(),
        _ => trimmed,
    }
}

/// Assumes the name already is a dereferenceable URI.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNameResolver;

impl NameResolver for DefaultNameResolver {
    fn resolve(&self, raw_name: &str) -> String {
        strip_type_prefix(raw_name).to_string()
    }
}

/// A URI prefix rewrite, e.g. `http://crl.internal` → `file:///srv/crl`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Redirect {
    pub from: String,
    pub to: String,
}

/// Strips the type label, then applies the first matching prefix redirect.
///
/// Lets a deployment serve CRLs published under one scheme from another,
/// for instance a local directory mirroring a network endpoint.
#[derive(Debug, Clone, Default)]
pub struct PrefixRedirectResolver {
    redirects: Vec<Redirect>,
}

impl PrefixRedirectResolver {
    pub fn new(redirects: impl IntoIterator<Item = Redirect>) -> Self {
        Self {
            redirects: redirects.into_iter().collect(),
        }
    }

    pub fn redirect(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.redirects.push(Redirect {
            from: from.into(),
            to: to.into(),
        });
        self
    }
}

impl NameResolver for PrefixRedirectResolver {
    fn resolve(&self, raw_name: &str) -> String {
        let uri = strip_type_prefix(raw_name);

        for redirect in &self.redirects {
            if let Some(rest) = uri.strip_prefix(redirect.from.as_str()) {
                let target = format!("{}{}", redirect.to, rest);
                debug!("Redirecting CRL URI {} to {}", uri, target);
                return target;
            }
        }

        uri.to_string()
    }
}

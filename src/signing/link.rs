//! Tracking link construction.

use url::Url;

use super::{LinkSigner, SignedToken};
use crate::types::UserId;

/// Path of the self-hosted redirect endpoint.
const REDIRECT_PATH: &str = "go";

/// Builds signed tracking links for a destination site.
///
/// When a public base URL for this service is configured, links point at its
/// `/go` redirect; otherwise they point straight at the destination site.
/// Either way the `c`, `ts` and `sig` parameters ride along in the query.
#[derive(Debug, Clone)]
pub struct TrackingLinks {
    signer: LinkSigner,
    site_url: Url,
    redirect_url: Option<Url>,
}

impl TrackingLinks {
    /// Creates a link builder.
    #[must_use]
    pub fn new(signer: LinkSigner, site_url: Url, base_url: Option<Url>) -> Self {
        Self {
            signer,
            site_url,
            redirect_url: base_url.map(|base| redirect_endpoint(&base)),
        }
    }

    /// Mints a fresh token and returns the tracking link carrying it.
    #[must_use]
    pub fn tracking_link(&self, user_id: UserId) -> Url {
        let token = self.signer.issue(user_id);
        self.link_for(&token)
    }

    /// Returns the tracking link for an already issued token.
    #[must_use]
    pub fn link_for(&self, token: &SignedToken) -> Url {
        let target = self.redirect_url.as_ref().unwrap_or(&self.site_url);
        let pairs = token.query_pairs();
        let borrowed: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
        append_query(target, &borrowed)
    }

    /// Returns the destination site.
    #[must_use]
    pub fn site_url(&self) -> &Url {
        &self.site_url
    }

    /// Returns the signer used for tokens and webhook bodies.
    #[must_use]
    pub fn signer(&self) -> &LinkSigner {
        &self.signer
    }
}

/// Appends query parameters to `url`, replacing parameters of the same name
/// and keeping every other existing one.
#[must_use]
pub fn append_query(url: &Url, extra: &[(&str, &str)]) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !extra.iter().any(|(name, _)| *name == key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut out = url.clone();
    out.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .extend_pairs(extra.iter().copied());
    out
}

fn redirect_endpoint(base: &Url) -> Url {
    let mut url = base.clone();
    let path = format!("{}/{REDIRECT_PATH}", base.path().trim_end_matches('/'));
    url.set_path(&path);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn signer() -> LinkSigner {
        LinkSigner::new(SecretString::from("s".to_owned()))
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn token() -> SignedToken {
        signer().issue_at(UserId(42), 1000)
    }

    #[test]
    fn test_link_points_at_site_without_base_url() {
        let links = TrackingLinks::new(signer(), url("https://form.example.com/apply"), None);
        let token = token();
        let link = links.link_for(&token);

        assert_eq!(link.host_str(), Some("form.example.com"));
        assert_eq!(link.path(), "/apply");
        assert_eq!(
            link.query(),
            Some(format!("c=42&ts=1000&sig={}", token.signature).as_str())
        );
    }

    #[test]
    fn test_link_points_at_redirect_with_base_url() {
        let links = TrackingLinks::new(
            signer(),
            url("https://form.example.com"),
            Some(url("https://bot.example.com/funnel/")),
        );
        let link = links.link_for(&token());

        assert_eq!(link.host_str(), Some("bot.example.com"));
        assert_eq!(link.path(), "/funnel/go");
    }

    #[test]
    fn test_tracking_link_verifies() {
        let links = TrackingLinks::new(signer(), url("https://form.example.com"), None);
        let link = links.tracking_link(UserId(7));
        let params: std::collections::HashMap<_, _> = link.query_pairs().into_owned().collect();

        let ts: i64 = params["ts"].parse().unwrap();
        assert_eq!(params["c"], "7");
        assert!(links.signer().verify(UserId(7), ts, &params["sig"]));
    }

    #[test]
    fn test_append_query_keeps_and_replaces() {
        let base = url("https://form.example.com/?utm=tg&c=old");
        let out = append_query(&base, &[("c", "42"), ("ts", "1000")]);

        assert_eq!(out.query(), Some("utm=tg&c=42&ts=1000"));
    }

    #[test]
    fn test_append_query_encodes_values() {
        let out = append_query(&url("https://form.example.com/"), &[("sig", "a b&c")]);
        assert_eq!(out.query(), Some("sig=a+b%26c"));
    }
}

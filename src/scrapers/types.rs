use serde::Serialize;

/// Identity and branding of one supported listing website
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SiteIdentity {
    /// Hostname the site is registered under, e.g. `www.homegate.ch`
    pub hostname: &'static str,
    /// Short human readable name
    pub name: &'static str,
    /// Icon shown next to notifications from this site
    pub icon_url: &'static str,
}

impl SiteIdentity {
    /// Landing page of the site
    pub fn home_url(&self) -> String {
        format!("https://{}", self.hostname)
    }
}

//! Typed hyperlinks
//!
//! Every Abiquo resource carries a `links` array describing its relations to
//! other resources. Memberships (virtual appliance, datacenter, firewall,
//! ...) are only visible through these links.

use serde::{Deserialize, Serialize};

/// A single `{rel, title, type, href}` hyperlink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Relation kind (`virtualappliance`, `firewall`, `nic0`, ...)
    pub rel: String,
    /// Display title of the target resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Media type of the target resource
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Absolute URL of the target resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl Link {
    /// Create a link with a relation and title
    pub fn new(rel: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            title: Some(title.into()),
            media_type: None,
            href: None,
        }
    }

    /// Set the media type
    #[must_use]
    pub fn with_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Set the target URL
    #[must_use]
    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    /// Title of the target, or an empty string when absent
    #[must_use]
    pub fn title_or_empty(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }
}

/// Lookups over a list of links
///
/// All lookups are first-match in the order the API returned the links.
pub trait LinkSet {
    /// First link whose relation equals `rel`
    fn find_rel(&self, rel: &str) -> Option<&Link>;

    /// First link whose relation contains `needle`
    fn find_rel_containing(&self, needle: &str) -> Option<&Link>;

    /// Titles of every link accepted by `pred`, deduplicated, first-seen order
    fn distinct_titles<F>(&self, pred: F) -> Vec<String>
    where
        F: Fn(&Link) -> bool;
}

impl LinkSet for [Link] {
    fn find_rel(&self, rel: &str) -> Option<&Link> {
        self.iter().find(|l| l.rel == rel)
    }

    fn find_rel_containing(&self, needle: &str) -> Option<&Link> {
        self.iter().find(|l| l.rel.contains(needle))
    }

    fn distinct_titles<F>(&self, pred: F) -> Vec<String>
    where
        F: Fn(&Link) -> bool,
    {
        let mut titles: Vec<String> = Vec::new();
        for title in self
            .iter()
            .filter(|l| pred(l))
            .filter_map(|l| l.title.as_deref())
        {
            if !titles.iter().any(|t| t == title) {
                titles.push(title.to_string());
            }
        }
        titles
    }
}

impl LinkSet for Vec<Link> {
    fn find_rel(&self, rel: &str) -> Option<&Link> {
        self.as_slice().find_rel(rel)
    }

    fn find_rel_containing(&self, needle: &str) -> Option<&Link> {
        self.as_slice().find_rel_containing(needle)
    }

    fn distinct_titles<F>(&self, pred: F) -> Vec<String>
    where
        F: Fn(&Link) -> bool,
    {
        self.as_slice().distinct_titles(pred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_deserialize_type_field() {
        let json = r#"{"rel":"ip","title":"80.1.2.3","type":"application/vnd.abiquo.publicip+json","href":"http://api/ips/1"}"#;
        let link: Link = serde_json::from_str(json).unwrap();
        assert_eq!(link.rel, "ip");
        assert_eq!(link.title.as_deref(), Some("80.1.2.3"));
        assert_eq!(
            link.media_type.as_deref(),
            Some("application/vnd.abiquo.publicip+json")
        );
    }

    #[test]
    fn test_link_missing_optional_fields() {
        let link: Link = serde_json::from_str(r#"{"rel":"edit"}"#).unwrap();
        assert!(link.title.is_none());
        assert_eq!(link.title_or_empty(), "");
    }

    #[test]
    fn test_find_rel_is_first_match() {
        let links = vec![Link::new("ip", "10.0.0.1"), Link::new("ip", "10.0.0.2")];
        assert_eq!(links.find_rel("ip").unwrap().title_or_empty(), "10.0.0.1");
        assert!(links.find_rel("nic0").is_none());
    }

    #[test]
    fn test_find_rel_containing() {
        let links = vec![
            Link::new("edit", "self"),
            Link::new("privatenetwork", "default"),
            Link::new("externalnetwork", "ext"),
        ];
        let link = links.find_rel_containing("network").unwrap();
        assert_eq!(link.rel, "privatenetwork");
    }

    #[test]
    fn test_distinct_titles_preserves_order() {
        let links = vec![
            Link::new("firewall", "web"),
            Link::new("firewall", "db"),
            Link::new("loadbalancer", "lb"),
            Link::new("firewall", "web"),
        ];
        let titles = links.distinct_titles(|l| l.rel == "firewall");
        assert_eq!(titles, vec!["web".to_string(), "db".to_string()]);
    }
}

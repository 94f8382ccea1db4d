use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Separator between attachment URLs in the stored `links` field
///
/// Whitespace inside a URL is percent-encoded by [`encode_link`] before
/// joining, so the delimiter only ever appears between entries.
pub const LINK_DELIMITER: &str = " ";

/// Percent-encodes whitespace in `url`; existing escapes are left alone
pub fn encode_link(url: &str) -> String {
    let mut encoded = String::with_capacity(url.len());
    for c in url.chars() {
        if c.is_whitespace() {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                encoded.push_str(&format!("%{byte:02X}"));
            }
        } else {
            encoded.push(c);
        }
    }
    encoded
}

/// Joins attachment URLs into the stored `links` field
///
/// Blank URLs have nothing to point at and are left out.
pub fn join_links<S: AsRef<str>>(urls: &[S]) -> Option<String> {
    let urls: Vec<String> = urls
        .iter()
        .map(AsRef::as_ref)
        .filter(|url| !url.trim().is_empty())
        .map(encode_link)
        .collect();
    (!urls.is_empty()).then(|| urls.join(LINK_DELIMITER))
}

/// Splits a stored `links` field back into URLs
pub fn split_links(links: Option<&str>) -> Vec<String> {
    links
        .map(|links| {
            links
                .split(LINK_DELIMITER)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Announcement record as held by the data service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: String,
    pub author_id: String,
    pub classroom_id: String,
    pub text: Option<String>,
    pub links: Option<String>, // Attachment URLs joined by LINK_DELIMITER
    pub created_at: DateTime<Utc>,
}

impl Announcement {
    pub fn from_request(request: NewAnnouncement) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author_id: request.user_id,
            classroom_id: request.classroom_id,
            text: request.text,
            links: request.links,
            created_at: Utc::now(),
        }
    }

    pub fn link_list(&self) -> Vec<String> {
        split_links(self.links.as_deref())
    }
}

/// Request payload for the create-announcement mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAnnouncement {
    pub user_id: String,
    pub classroom_id: String,
    pub text: Option<String>,
    pub links: Option<String>,
}

impl NewAnnouncement {
    /// Builds the payload; blank text and an empty URL list are sent as absent
    pub fn new<S: AsRef<str>>(
        user_id: impl Into<String>,
        classroom_id: impl Into<String>,
        text: &str,
        urls: &[S],
    ) -> Self {
        Self {
            user_id: user_id.into(),
            classroom_id: classroom_id.into(),
            text: (!text.trim().is_empty()).then(|| text.to_string()),
            links: join_links(urls),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.links.is_none()
    }
}

/// Fields the create-announcement mutation echoes back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedAnnouncement {
    pub text: Option<String>,
    pub links: Option<String>,
}

impl CreatedAnnouncement {
    pub fn link_list(&self) -> Vec<String> {
        split_links(self.links.as_deref())
    }
}

/// An uploaded file waiting to be posted with the announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedAttachment {
    pub file_name: String,
    pub url: String, // Already passed through encode_link
}

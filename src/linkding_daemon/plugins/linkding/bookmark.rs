use serde::Deserialize;

use crate::{
    common::{Item, ItemAction},
    plugins::index::IndexItem,
};

pub const ACTION_OPEN: &str = "open";
pub const ACTION_COPY: &str = "copy";
pub const ACTION_ARCHIVE: &str = "archive";
pub const ACTION_DELETE: &str = "delete";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Bookmark {
    pub id: u64,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tag_names: Vec<String>,
}

/// One page of `GET /api/bookmarks/`.
#[derive(Debug, Deserialize)]
pub struct Page {
    pub next: Option<String>,
    pub results: Vec<Bookmark>,
}

impl Bookmark {
    /// `url,title,tag1,tag2,...`
    pub fn filter_string(&self) -> String {
        let tags = self.tag_names.join(",");
        [self.url.as_str(), self.title.as_str(), tags.as_str()].join(",")
    }

    pub fn to_item(&self) -> Item {
        Item {
            id: self.id.to_string(),
            text: if self.title.is_empty() {
                self.url.clone()
            } else {
                self.title.clone()
            },
            subtext: format!("{}: {}", self.tag_names.join(","), self.url),
            actions: vec![
                ItemAction::new(ACTION_OPEN, "Open link"),
                ItemAction::new(ACTION_COPY, "Copy URL to clipboard"),
                ItemAction::new(ACTION_ARCHIVE, "Archive link"),
                ItemAction::new(ACTION_DELETE, "Delete link"),
            ],
        }
    }

    pub fn to_index_item(&self) -> IndexItem {
        IndexItem {
            item: self.to_item(),
            string: self.filter_string(),
        }
    }
}

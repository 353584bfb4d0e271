//! Host-bridge page representation.
//!
//! The embedding browser extension hands the tracker a structured
//! snapshot of the page it is observing: a simplified node tree plus the
//! metadata the DOM already knows. The tracker never touches a live DOM.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ContentType;

/// One element in the simplified page tree.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageNode {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub role: Option<String>,
    /// Direct text content of this element (children carry their own).
    pub text: String,
    pub children: Vec<PageNode>,
}

impl PageNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_child(mut self, child: PageNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Everything the bridge captured about one page view, taken once at
/// page settle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub author: Option<String>,
    pub publish_date: Option<DateTime<Utc>>,
    /// Hint from the host (e.g. og:type); extraction falls back to URL
    /// heuristics when absent.
    pub content_type_hint: Option<ContentType>,
    pub body: PageNode,
}

/// Browser events the tracker consumes, each stamped by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageEvent {
    /// Scroll position as a fraction of the page, 0.0..=1.0.
    Scrolled {
        at: DateTime<Utc>,
        fraction: f64,
    },
    PointerMoved {
        at: DateTime<Utc>,
    },
    Clicked {
        at: DateTime<Utc>,
    },
    VisibilityChanged {
        at: DateTime<Utc>,
        visible: bool,
    },
    Unloaded {
        at: DateTime<Utc>,
    },
}

impl PageEvent {
    pub fn at(&self) -> DateTime<Utc> {
        match *self {
            PageEvent::Scrolled { at, .. }
            | PageEvent::PointerMoved { at }
            | PageEvent::Clicked { at }
            | PageEvent::VisibilityChanged { at, .. }
            | PageEvent::Unloaded { at } => at,
        }
    }
}

//! Comment box helpers for the friend-link page

use crate::platform::KeyValueStore;

/// Tried in order; the first match is the comment input
pub const TEXTAREA_SELECTORS: [&str; 5] = [
    ".el-textarea__inner",
    ".wl-editor",
    ".wl-input",
    "textarea[placeholder*='评论']",
    "textarea",
];
pub const NOT_FOUND_TEXT: &str = "未找到评论框，请确保页面已完全加载";
/// Delay between clearing and filling the box (ms)
pub const FILL_DELAY_MS: i32 = 100;

const CACHE_MARKERS: [&str; 4] = ["comment", "waline", "twikoo", "valine"];

/// Friend-link application form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTemplate {
    /// Butterfly theme YAML block
    Butterfly,
    PlainText,
}

impl LinkTemplate {
    /// `"bf"` selects the YAML block, anything else the plain form
    pub fn from_key(key: &str) -> Self {
        if key == "bf" {
            LinkTemplate::Butterfly
        } else {
            LinkTemplate::PlainText
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            LinkTemplate::Butterfly => {
                "```yml\n- name: \n  link: \n  avatar: \n  descr: \n  siteshot: \n```"
            }
            LinkTemplate::PlainText => "站点名称：\n站点地址：\n头像链接：\n站点描述：\n站点截图：",
        }
    }

    /// Caret position after filling, right after the first label
    pub fn cursor(self) -> u32 {
        match self {
            LinkTemplate::Butterfly => 15,
            LinkTemplate::PlainText => 5,
        }
    }
}

/// Keys left behind by the comment widgets (Waline, Twikoo, Valine)
pub fn is_comment_cache_key(key: &str) -> bool {
    CACHE_MARKERS.iter().any(|marker| key.contains(marker))
}

/// Remove cached drafts from each store; returns how many keys went
pub fn clear_comment_cache(stores: &[&dyn KeyValueStore]) -> usize {
    let mut removed = 0;
    for store in stores {
        for key in store.keys().into_iter().filter(|k| is_comment_cache_key(k)) {
            store.remove(&key);
            removed += 1;
        }
    }
    log::info!("Cleared {} comment cache entries", removed);
    removed
}

/// Emoji hover preview
pub mod preview {
    /// Below this body width the preview is disabled
    pub const MIN_BODY_WIDTH: f64 = 768.0;
    pub const SCALE: f64 = 3.0;
    pub const MARGIN: f64 = 10.0;
    pub const HOVER_DELAY_MS: i32 = 300;

    /// Position of the magnified emoji
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct PreviewRect {
        pub left: f64,
        pub top: f64,
        pub width: f64,
        pub height: f64,
    }

    impl PreviewRect {
        pub fn css(&self) -> String {
            format!(
                "display:flex; height:{}px; width:{}px; left:{}px; top:{}px;",
                self.height, self.width, self.left, self.top
            )
        }
    }

    /// Centre a 3x copy over an emoji whose top-left is at (`x`, `y`),
    /// kept inside the page
    pub fn place(x: f64, y: f64, width: f64, height: f64, body_width: f64) -> PreviewRect {
        let big_w = SCALE * width;
        let big_h = SCALE * height;
        let mut left = x - (big_w - width) / 2.0;
        if left + big_w > body_width {
            left -= left + big_w - body_width + MARGIN;
        }
        if left < 0.0 {
            left = MARGIN;
        }
        PreviewRect {
            left,
            top: y,
            width: big_w,
            height: big_h,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStore;

    #[test]
    fn test_templates() {
        let bf = LinkTemplate::from_key("bf");
        assert_eq!(bf, LinkTemplate::Butterfly);
        assert_eq!(&bf.text()[..bf.cursor() as usize], "```yml\n- name: ");

        let plain = LinkTemplate::from_key("other");
        let head: String = plain.text().chars().take(plain.cursor() as usize).collect();
        assert_eq!(head, "站点名称：");
    }

    #[test]
    fn test_clear_comment_cache() {
        let local = MemoryStore::new();
        let session = MemoryStore::new();
        local.set("WALINE_USER", "x");
        local.set("waline-comment-box", "draft");
        local.set("twikoo-nick", "me");
        local.set("fishTotalTime", "10");
        session.set("valine_cache", "1");

        assert_eq!(clear_comment_cache(&[&local, &session]), 3);
        // matching is case-sensitive
        assert!(local.get("WALINE_USER").is_some());
        assert!(local.get("fishTotalTime").is_some());
        assert!(session.is_empty());
    }

    #[test]
    fn test_preview_stays_on_page() {
        let rect = preview::place(100.0, 50.0, 20.0, 20.0, 1000.0);
        assert_eq!((rect.left, rect.width, rect.height), (80.0, 60.0, 60.0));

        let right = preview::place(980.0, 0.0, 20.0, 20.0, 1000.0);
        assert_eq!(right.left, 930.0);

        let left = preview::place(5.0, 0.0, 20.0, 20.0, 1000.0);
        assert_eq!(left.left, 10.0);
        assert!(left.css().starts_with("display:flex; height:60px; width:60px;"));
    }
}

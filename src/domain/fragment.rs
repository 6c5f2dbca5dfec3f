//! Markup contract between the delivery endpoint and the client runtime.
//!
//! One `notifications-tray` wrapper holding one `notification` element per
//! unread record. Each item carries `data-id` and `data-fadeout`; the message
//! is escaped text content. An empty set renders as an empty body.

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::notification::{Fadeout, Notification};

pub const TRAY_CLASS: &str = "notifications-tray";
pub const ITEM_CLASS: &str = "notification";

static TRAY_OPEN: Lazy<String> = Lazy::new(|| format!(r#"<div class="{}">"#, TRAY_CLASS));

static ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<div class="notification" data-id="([^"]*)" data-fadeout="([^"]*)">([^<]*)</div>"#)
        .expect("item pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayItem {
    pub id: i64,
    pub fadeout: Fadeout,
    pub message: String,
}

impl From<&Notification> for TrayItem {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id,
            fadeout: notification.fadeout,
            message: notification.message.clone(),
        }
    }
}

pub fn render(notifications: &[Notification]) -> String {
    if notifications.is_empty() {
        return String::new();
    }

    let mut output = TRAY_OPEN.clone();
    for notification in notifications {
        let id = notification.id.to_string();
        let fadeout = notification.fadeout.to_string();
        output.push_str(&format!(
            r#"<div class="{}" data-id="{}" data-fadeout="{}">{}</div>"#,
            ITEM_CLASS,
            html_escape::encode_double_quoted_attribute(&id),
            html_escape::encode_double_quoted_attribute(&fadeout),
            html_escape::encode_safe(&notification.message),
        ));
    }
    output.push_str("</div>");
    output
}

pub fn parse(body: &str) -> Result<Vec<TrayItem>> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(Vec::new());
    }
    if !body.starts_with(TRAY_OPEN.as_str()) {
        return Err(anyhow!("response is not a notification fragment"));
    }

    let mut items = Vec::new();
    for captures in ITEM.captures_iter(body) {
        let id = html_escape::decode_html_entities(&captures[1]);
        let id: i64 = id
            .parse()
            .with_context(|| format!("invalid notification id {:?}", id))?;
        let fadeout = html_escape::decode_html_entities(&captures[2]).parse::<Fadeout>()?;
        let message = html_escape::decode_html_entities(&captures[3]).into_owned();
        items.push(TrayItem { id, fadeout, message });
    }

    Ok(items)
}

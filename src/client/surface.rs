use crate::domain::fragment::TrayItem;

/// Where notifications are displayed: a page, a terminal, a test recorder.
pub trait Surface: Send + Sync {
    fn show(&self, items: &[TrayItem]);

    fn hide(&self, id: i64);
}

/// Prints notifications as log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalSurface;

impl Surface for TerminalSurface {
    fn show(&self, items: &[TrayItem]) {
        for item in items {
            tracing::info!(
                notification_id = item.id,
                fadeout = %item.fadeout,
                "{}",
                item.message
            );
        }
    }

    fn hide(&self, id: i64) {
        tracing::info!(notification_id = id, "notification dismissed");
    }
}

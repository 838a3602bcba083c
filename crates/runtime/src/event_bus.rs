use tracing::{error, info, warn};

use crate::generation::Ticket;

/// How a notice is presented to the user.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Diagnostic only; never shown as a dialog.
    Diagnostic,
    /// Non-blocking toast-style notice.
    Notice,
    /// Blocking alert; the operation that raised it was aborted.
    Blocking,
}

/// A user-facing or diagnostic message raised by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Generation active when the notice was raised.
    pub generation: u64,
    pub level: NoticeLevel,
    pub kind: &'static str,
    pub message: String,
}

/// Collects notices and tracks long-running activities (the loading
/// indicator).
///
/// The host drains notices after every controller call and shows the
/// loading indicator while [`NoticeBus::is_busy`] is true.
#[derive(Debug, Default)]
pub struct NoticeBus {
    notices: Vec<Notice>,
    activities: Vec<&'static str>,
}

impl NoticeBus {
    pub fn new() -> Self {
        Self {
            notices: Vec::new(),
            activities: Vec::new(),
        }
    }

    pub fn emit(
        &mut self,
        ticket: Ticket,
        level: NoticeLevel,
        kind: &'static str,
        message: impl Into<String>,
    ) {
        let message = message.into();
        match level {
            NoticeLevel::Diagnostic => info!(kind, %message, "diagnostic"),
            NoticeLevel::Notice => warn!(kind, %message, "notice"),
            NoticeLevel::Blocking => error!(kind, %message, "blocking notice"),
        }
        self.notices.push(Notice {
            generation: ticket.value(),
            level,
            kind,
            message,
        });
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn last(&self) -> Option<&Notice> {
        self.notices.last()
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Starts a named activity; the loading indicator stays up until every
    /// started activity has ended.
    pub fn begin_activity(&mut self, label: &'static str) {
        self.activities.push(label);
    }

    /// Ends the most recent activity with this label. Unknown labels are
    /// ignored.
    pub fn end_activity(&mut self, label: &'static str) {
        if let Some(pos) = self.activities.iter().rposition(|a| *a == label) {
            self.activities.remove(pos);
        }
    }

    pub fn is_busy(&self) -> bool {
        !self.activities.is_empty()
    }

    /// Label shown by the loading indicator.
    pub fn current_activity(&self) -> Option<&'static str> {
        self.activities.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::{NoticeBus, NoticeLevel};
    use crate::generation::Generation;

    #[test]
    fn records_notices_with_generation() {
        let mut g = Generation::new();
        let t = g.advance();
        let mut bus = NoticeBus::new();
        bus.emit(t, NoticeLevel::Blocking, "credential", "missing token");
        assert_eq!(bus.notices().len(), 1);
        assert_eq!(bus.notices()[0].generation, 1);
        assert_eq!(bus.last().unwrap().level, NoticeLevel::Blocking);
    }

    #[test]
    fn drain_clears_notices() {
        let mut bus = NoticeBus::new();
        bus.emit(Generation::new().current(), NoticeLevel::Notice, "k", "m");
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert!(bus.notices().is_empty());
    }

    #[test]
    fn activities_nest() {
        let mut bus = NoticeBus::new();
        bus.begin_activity("Loading map data...");
        bus.begin_activity("Generating map image...");
        assert_eq!(bus.current_activity(), Some("Generating map image..."));
        bus.end_activity("Generating map image...");
        assert!(bus.is_busy());
        bus.end_activity("Loading map data...");
        assert!(!bus.is_busy());
        bus.end_activity("never started");
        assert!(!bus.is_busy());
    }
}

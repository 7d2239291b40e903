use async_trait::async_trait;
use strum_macros::{AsRefStr, Display};
use tracing::info;

use crate::model::payroll::{PayrollDeduction, PayrollRecord};
use crate::model::salary::SalaryStructure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    PayrollGenerated,
    PayrollApproved,
}

/// Fire-and-forget delivery to an employee. Delivery problems stay inside
/// the sink; the engine never sees them.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, recipient: u64, title: &str, message: &str, kind: NotificationKind);
}

/// Writes notifications to the log.
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, recipient: u64, title: &str, message: &str, kind: NotificationKind) {
        info!(recipient, kind = kind.as_ref(), title, message, "Notification");
    }
}

/// Produces a payslip document and returns a handle to it.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render_payslip(
        &self,
        record: &PayrollRecord,
        salary: &SalaryStructure,
        deductions: &[PayrollDeduction],
    ) -> anyhow::Result<String>;
}

#[cfg(test)]
pub use recording::{FailingRenderer, RecordingNotifier};

#[cfg(test)]
mod recording {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingNotifier(Mutex<Vec<(u64, NotificationKind)>>);

    impl RecordingNotifier {
        pub fn sent(&self) -> Vec<(u64, NotificationKind)> {
            self.0.lock().unwrap().clone()
        }
    }

    impl NotificationSink for RecordingNotifier {
        fn notify(&self, recipient: u64, _title: &str, _message: &str, kind: NotificationKind) {
            self.0.lock().unwrap().push((recipient, kind));
        }
    }

    pub struct FailingRenderer;

    #[async_trait]
    impl DocumentRenderer for FailingRenderer {
        async fn render_payslip(
            &self,
            _record: &PayrollRecord,
            _salary: &SalaryStructure,
            _deductions: &[PayrollDeduction],
        ) -> anyhow::Result<String> {
            anyhow::bail!("template engine unavailable")
        }
    }
}

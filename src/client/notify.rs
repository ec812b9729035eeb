use std::fmt::Display;
use std::time::{Duration, Instant};

pub const TOAST_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl ToastKind {
    pub fn css_class(self) -> &'static str {
        match self {
            ToastKind::Success => "toast-success",
            ToastKind::Error => "toast-error",
            ToastKind::Info => "toast-info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub expires_at: Instant,
}

/// Queue of transient notifications. Failures are shown, never retried.
#[derive(Debug)]
pub struct Notifier {
    ttl: Duration,
    toasts: Vec<Toast>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(TOAST_TTL)
    }
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            toasts: Vec::new(),
        }
    }

    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>, now: Instant) {
        self.toasts.push(Toast {
            kind,
            message: message.into(),
            expires_at: now + self.ttl,
        });
    }

    /// Shows `success` on `Ok`, the error text on `Err`, and hands the result back.
    pub fn report<T, E: Display>(
        &mut self,
        result: Result<T, E>,
        success: &str,
        now: Instant,
    ) -> Result<T, E> {
        match &result {
            Ok(_) => self.push(ToastKind::Success, success, now),
            Err(e) => self.push(ToastKind::Error, e.to_string(), now),
        }
        result
    }

    /// Drops expired toasts and returns the ones still visible.
    pub fn active(&mut self, now: Instant) -> &[Toast] {
        self.toasts.retain(|t| t.expires_at > now);
        &self.toasts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;

    #[test]
    fn toasts_expire() {
        let start = Instant::now();
        let mut notifier = Notifier::default();
        notifier.push(ToastKind::Info, "hello", start);

        assert_eq!(notifier.active(start + Duration::from_secs(4)).len(), 1);
        assert!(notifier.active(start + TOAST_TTL).is_empty());
    }

    #[test]
    fn report_surfaces_server_message() {
        let now = Instant::now();
        let mut notifier = Notifier::default();
        let failed: Result<(), ClientError> = Err(ClientError::Api {
            status: 403,
            message: "You can only delete your own posts".into(),
        });

        assert!(notifier.report(failed, "Post deleted", now).is_err());
        let shown = notifier.active(now);
        assert_eq!(shown[0].kind, ToastKind::Error);
        assert_eq!(shown[0].message, "You can only delete your own posts");

        let ok: Result<u8, ClientError> = Ok(1);
        assert_eq!(notifier.report(ok, "Post deleted", now).unwrap(), 1);
        assert_eq!(notifier.active(now)[1].kind, ToastKind::Success);
    }
}

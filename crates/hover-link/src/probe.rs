use std::time::{Duration, Instant};
use tracing::{info, warn};

use hover_proto::Command;

use crate::channel::CommandLink;

#[derive(Debug, Clone)]
pub struct ProbeAttempt {
    pub reply: Option<String>,
    pub elapsed_ms: u64,
    pub note: String,
}

#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub sdk_ok: bool,
    pub battery: Option<u8>,
    pub attempts: Vec<ProbeAttempt>,
}

/// Puts the vehicle into SDK mode, waiting for its `ok`, then reads the battery
/// once. Gives up after `attempts` unanswered `command`s.
pub fn probe_link(link: &dyn CommandLink, attempts: u32, timeout: Duration) -> ProbeReport {
    let mut report = ProbeReport { sdk_ok: false, battery: None, attempts: Vec::new() };

    for n in 1..=attempts.max(1) {
        let start = Instant::now();
        let (reply, note) = match link.send_and_await_response(&Command::Sdk, Duration::ZERO, timeout) {
            Ok(r) if r.eq_ignore_ascii_case("ok") => (Some(r), "ok".to_string()),
            Ok(r) => {
                let note = format!("unexpected reply {:?}", r);
                (Some(r), note)
            }
            Err(e) => (None, e.to_string()),
        };
        let ok = note == "ok";
        report.attempts.push(ProbeAttempt { reply, elapsed_ms: start.elapsed().as_millis() as u64, note });
        if ok {
            info!("link probe: sdk mode after {} attempt(s)", n);
            report.sdk_ok = true;
            break;
        }
        warn!("link probe attempt {}/{} failed", n, attempts.max(1));
    }

    if report.sdk_ok {
        match link.battery(timeout) {
            Ok(p) => report.battery = Some(p),
            Err(e) => warn!("link probe: battery query failed: {}", e),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::fake::RecordingLink;

    #[test]
    fn answers_ok_and_battery() {
        let link = RecordingLink::default();
        link.reply("command", "ok");
        link.reply("battery?", "88");
        let r = probe_link(&link, 3, Duration::from_millis(10));
        assert!(r.sdk_ok);
        assert_eq!(r.battery, Some(88));
        assert_eq!(r.attempts.len(), 1);
    }

    #[test]
    fn silent_vehicle_exhausts_attempts() {
        let link = RecordingLink::default();
        let r = probe_link(&link, 3, Duration::from_millis(10));
        assert!(!r.sdk_ok);
        assert_eq!(r.battery, None);
        assert_eq!(r.attempts.len(), 3);
        assert_eq!(link.sent(), vec!["command"; 3]);
    }

    #[test]
    fn error_reply_is_not_ok() {
        let link = RecordingLink::default();
        link.reply("command", "error");
        let r = probe_link(&link, 2, Duration::from_millis(10));
        assert!(!r.sdk_ok);
        assert_eq!(r.attempts[0].reply.as_deref(), Some("error"));
    }
}

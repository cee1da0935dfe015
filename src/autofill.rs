//! Login auto-fill: a bounded retry sequence run once per page load.
//!
//! The sequencer is a plain state machine. The app feeds it page-load
//! notifications, timer deliveries and script results; it answers with what to
//! schedule or inject next. Every page load bumps a generation counter and
//! deliveries tagged with an older generation are ignored, which is how
//! pending timers and script callbacks are "cancelled".

use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::config::{
    AUTOFILL_RETRY_DELAY_MS, DEFAULT_TRIGGER_URL, FIELD_FILL_DELAY_MS,
    INITIAL_AUTOFILL_DELAY_MS, MAX_AUTOFILL_ATTEMPTS, PASSWORD_FIELD_ID, USER_FIELD_ID,
};
use crate::models::Credentials;

/// Tunables for the fill sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct AutofillSettings {
    /// Auto-fill only runs on a page whose URL is exactly this.
    pub trigger_url: String,
    pub user_field_id: String,
    pub password_field_id: String,
    pub initial_delay: Duration,
    pub retry_delay: Duration,
    /// Attempts per page load, first one included. Zero disables auto-fill.
    pub max_attempts: u32,
    /// Pause between filling the user field and the password field.
    pub field_delay: Duration,
}

impl Default for AutofillSettings {
    fn default() -> Self {
        Self {
            trigger_url: DEFAULT_TRIGGER_URL.to_string(),
            user_field_id: USER_FIELD_ID.to_string(),
            password_field_id: PASSWORD_FIELD_ID.to_string(),
            initial_delay: Duration::from_millis(INITIAL_AUTOFILL_DELAY_MS),
            retry_delay: Duration::from_millis(AUTOFILL_RETRY_DELAY_MS),
            max_attempts: MAX_AUTOFILL_ATTEMPTS,
            field_delay: Duration::from_millis(FIELD_FILL_DELAY_MS),
        }
    }
}

/// An attempt to run after `delay`, valid only for `generation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledAttempt {
    pub generation: u64,
    pub delay: Duration,
}

/// Script to evaluate in the page for the current attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub generation: u64,
    pub script: String,
}

/// What happened after a script result was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The result belongs to an earlier page load.
    Stale,
    Filled,
    Retry(ScheduledAttempt),
    Exhausted,
}

#[derive(Debug, Clone, Copy)]
struct RetryState {
    attempts_remaining: u32,
    attempts_made: u32,
}

/// Drives fill attempts for the most recent page load.
#[derive(Debug)]
pub struct AutofillSequencer {
    settings: AutofillSettings,
    generation: u64,
    retry: Option<RetryState>,
}

impl AutofillSequencer {
    pub fn new(settings: AutofillSettings) -> Self {
        Self {
            settings,
            generation: 0,
            retry: None,
        }
    }

    pub fn settings(&self) -> &AutofillSettings {
        &self.settings
    }

    /// Whether an attempt is scheduled or in flight.
    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.retry.is_some()
    }

    /// A page load started or finished. Anything still pending for an earlier
    /// load becomes stale; a successful load of the trigger URL starts a new
    /// sequence.
    pub fn on_page_load(&mut self, succeeded: bool, url: &str) -> Option<ScheduledAttempt> {
        self.generation += 1;
        self.retry = None;

        if !succeeded {
            return None;
        }
        if url != self.settings.trigger_url {
            tracing::debug!("Auto-fill not armed for {}", url);
            return None;
        }
        if self.settings.max_attempts == 0 {
            return None;
        }

        self.retry = Some(RetryState {
            attempts_remaining: self.settings.max_attempts,
            attempts_made: 0,
        });
        tracing::debug!(
            "Auto-fill armed (generation {}, {} attempts)",
            self.generation,
            self.settings.max_attempts
        );
        Some(ScheduledAttempt {
            generation: self.generation,
            delay: self.settings.initial_delay,
        })
    }

    /// A scheduled attempt is due. Returns the script to inject, or `None` when
    /// the attempt is no longer relevant or there is nothing to fill.
    ///
    /// `credentials` is only consulted for relevant attempts.
    pub fn on_attempt_due<F>(
        &mut self,
        generation: u64,
        current_url: &str,
        credentials: F,
    ) -> Option<Injection>
    where
        F: FnOnce() -> Option<Credentials>,
    {
        if generation != self.generation {
            return None;
        }
        let mut state = self.retry?;
        if state.attempts_remaining == 0 {
            return None;
        }

        if current_url != self.settings.trigger_url {
            tracing::debug!("Page moved to {} before auto-fill, dropping attempt", current_url);
            self.retry = None;
            return None;
        }

        let Some(credentials) = credentials() else {
            tracing::debug!("No saved credentials, skipping auto-fill");
            self.retry = None;
            return None;
        };

        state.attempts_remaining -= 1;
        state.attempts_made += 1;
        self.retry = Some(state);

        tracing::debug!(
            "Auto-fill attempt {} of {}",
            state.attempts_made,
            self.settings.max_attempts
        );
        Some(Injection {
            generation,
            script: fill_script(&self.settings, &credentials),
        })
    }

    /// The injected script reported back.
    pub fn on_result(&mut self, generation: u64, filled: bool) -> AttemptOutcome {
        if generation != self.generation {
            return AttemptOutcome::Stale;
        }
        let Some(state) = self.retry else {
            return AttemptOutcome::Stale;
        };

        if filled {
            tracing::info!("Login form auto-filled");
            self.retry = None;
            return AttemptOutcome::Filled;
        }

        if state.attempts_remaining == 0 {
            tracing::warn!(
                "Auto-fill failed after {} attempts",
                state.attempts_made
            );
            self.retry = None;
            return AttemptOutcome::Exhausted;
        }

        AttemptOutcome::Retry(ScheduledAttempt {
            generation,
            delay: self.settings.retry_delay * state.attempts_made,
        })
    }
}

/// Script that fills the login form and evaluates to `true` when both inputs
/// exist. The password is written `field_delay` after the user name.
pub fn fill_script(settings: &AutofillSettings, credentials: &Credentials) -> String {
    format!(
        r#"(() => {{
  const userField = document.getElementById({user_id});
  const passField = document.getElementById({pass_id});
  if (!userField || !passField) {{
    return false;
  }}
  const notify = (field) => {{
    ['input', 'change', 'blur'].forEach((type) => {{
      field.dispatchEvent(new Event(type, {{ bubbles: true }}));
    }});
  }};
  userField.value = {username};
  notify(userField);
  setTimeout(() => {{
    passField.value = {password};
    notify(passField);
  }}, {delay});
  return true;
}})()"#,
        user_id = js_string(&settings.user_field_id),
        pass_id = js_string(&settings.password_field_id),
        username = js_string(&credentials.username),
        password = js_string(&credentials.password),
        delay = settings.field_delay.as_millis(),
    )
}

/// Interpret the JSON-encoded value returned by the webview.
pub fn parse_script_result(raw: &str) -> bool {
    matches!(serde_json::from_str::<JsonValue>(raw), Ok(JsonValue::Bool(true)))
}

/// Quote a value as a JavaScript string literal.
fn js_string(value: &str) -> String {
    // JSON strings are valid JS literals once the line separators are escaped.
    serde_json::to_string(value)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIGGER: &str = "http://10.0.10.27/";

    fn creds() -> Option<Credentials> {
        Some(Credentials::new("alice", "secret1", TRIGGER))
    }

    fn sequencer(max_attempts: u32) -> AutofillSequencer {
        AutofillSequencer::new(AutofillSettings {
            max_attempts,
            ..AutofillSettings::default()
        })
    }

    #[test]
    fn test_non_matching_url_never_schedules() {
        let mut seq = sequencer(3);
        assert_eq!(seq.on_page_load(true, "http://10.0.10.27/other"), None);
        assert_eq!(seq.on_page_load(true, "http://10.0.10.27"), None);
        assert!(!seq.is_active());
    }

    #[test]
    fn test_failed_load_never_schedules() {
        let mut seq = sequencer(3);
        assert_eq!(seq.on_page_load(false, TRIGGER), None);
        assert!(!seq.is_active());
    }

    #[test]
    fn test_first_attempt_uses_initial_delay() {
        let mut seq = sequencer(3);
        let scheduled = seq.on_page_load(true, TRIGGER).unwrap();
        assert_eq!(scheduled.delay, Duration::from_millis(250));

        let injection = seq.on_attempt_due(scheduled.generation, TRIGGER, creds).unwrap();
        assert!(injection.script.contains(r#"document.getElementById("Editbox1")"#));
        assert_eq!(seq.on_result(injection.generation, true), AttemptOutcome::Filled);
        assert!(!seq.is_active());
    }

    #[test]
    fn test_retries_are_bounded() {
        let mut seq = sequencer(3);
        let mut next = seq.on_page_load(true, TRIGGER);
        let mut injections = 0;
        let mut delays = Vec::new();

        while let Some(scheduled) = next.take() {
            delays.push(scheduled.delay);
            let injection = seq
                .on_attempt_due(scheduled.generation, TRIGGER, creds)
                .unwrap();
            injections += 1;
            match seq.on_result(injection.generation, false) {
                AttemptOutcome::Retry(s) => next = Some(s),
                AttemptOutcome::Exhausted => break,
                other => panic!("unexpected outcome {:?}", other),
            }
        }

        assert_eq!(injections, 3);
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(250),
                Duration::from_millis(500),
                Duration::from_millis(1000)
            ]
        );
        assert!(!seq.is_active());
    }

    #[test]
    fn test_single_attempt_exhausts_immediately() {
        let mut seq = sequencer(1);
        let scheduled = seq.on_page_load(true, TRIGGER).unwrap();
        let injection = seq.on_attempt_due(scheduled.generation, TRIGGER, creds).unwrap();
        assert_eq!(seq.on_result(injection.generation, false), AttemptOutcome::Exhausted);
    }

    #[test]
    fn test_zero_attempts_disables() {
        let mut seq = sequencer(0);
        assert_eq!(seq.on_page_load(true, TRIGGER), None);
    }

    #[test]
    fn test_new_page_load_makes_pending_work_stale() {
        let mut seq = sequencer(3);
        let first = seq.on_page_load(true, TRIGGER).unwrap();
        let injection = seq.on_attempt_due(first.generation, TRIGGER, creds).unwrap();

        let second = seq.on_page_load(true, TRIGGER).unwrap();
        assert_ne!(first.generation, second.generation);
        assert_eq!(seq.on_result(injection.generation, false), AttemptOutcome::Stale);
        assert_eq!(seq.on_attempt_due(first.generation, TRIGGER, creds), None);
        assert!(seq.on_attempt_due(second.generation, TRIGGER, creds).is_some());
    }

    #[test]
    fn test_navigation_away_drops_attempt() {
        let mut seq = sequencer(3);
        let scheduled = seq.on_page_load(true, TRIGGER).unwrap();
        assert_eq!(
            seq.on_attempt_due(scheduled.generation, "http://elsewhere/", creds),
            None
        );
        assert!(!seq.is_active());
    }

    #[test]
    fn test_missing_credentials_ends_sequence_silently() {
        let mut seq = sequencer(3);
        let scheduled = seq.on_page_load(true, TRIGGER).unwrap();
        assert_eq!(seq.on_attempt_due(scheduled.generation, TRIGGER, || None), None);
        assert!(!seq.is_active());
    }

    #[test]
    fn test_credentials_not_read_for_stale_attempt() {
        let mut seq = sequencer(3);
        let first = seq.on_page_load(true, TRIGGER).unwrap();
        seq.on_page_load(true, TRIGGER);

        let injection = seq.on_attempt_due(first.generation, TRIGGER, || {
            panic!("credentials should not be loaded for a stale attempt")
        });
        assert_eq!(injection, None);
    }

    #[test]
    fn test_fill_script_escapes_values() {
        let settings = AutofillSettings::default();
        let script = fill_script(
            &settings,
            &Credentials::new("o'brien", "pa\"ss</script>\u{2028}", ""),
        );
        assert!(script.contains(r#"userField.value = "o'brien";"#));
        assert!(script.contains(r#"passField.value = "pa\"ss</script>\u2028";"#));
        assert!(script.contains("}, 250);"));
        assert!(script.starts_with("(() => {"));
        assert!(script.ends_with("})()"));
    }

    #[test]
    fn test_parse_script_result() {
        assert!(parse_script_result("true"));
        assert!(!parse_script_result("false"));
        assert!(!parse_script_result("null"));
        assert!(!parse_script_result(""));
        assert!(!parse_script_result("\"true\""));
    }
}

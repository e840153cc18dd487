use crate::protocol::{DecisionRequester, SubmissionDescriptor};
use crate::verdict::PolicyDecision;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Prompts are truncated to this many characters before leaving the page.
pub const MAX_PROMPT_CHARS: usize = 20_000;

/// Minimum gap between block notices; rapid re-submission of a blocked
/// prompt must not flood the user.
pub const NOTICE_COOLDOWN: Duration = Duration::from_secs(5);

// ─── Gestures and outcomes ───────────────────────────────────────────────────

/// A user gesture that would submit the composed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitGesture {
    /// Enter key; `shift` marks the line-break variant, which never submits.
    EnterKey { shift: bool },
    /// A recognized send control was activated.
    SendControl,
    /// The surrounding form fired a submit.
    FormSubmit,
}

impl SubmitGesture {
    #[must_use]
    pub fn is_line_break(self) -> bool {
        matches!(self, Self::EnterKey { shift: true })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Idle,
    Held,
    Submitting,
    Blocked,
    FailOpenSubmitting,
}

impl CollectorState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Held => "held",
            Self::Submitting => "submitting",
            Self::Blocked => "blocked",
            Self::FailOpenSubmitting => "fail_open_submitting",
        }
    }
}

/// What happened to one submit gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Synthetic submission triggered by the collector itself; not intercepted.
    PassedThrough,
    IgnoredLineBreak,
    IgnoredEmpty,
    /// A prompt decision is already outstanding; the gesture was dropped.
    DiscardedBusy,
    /// Same text as the previous accepted submission; dropped.
    DiscardedDuplicate,
    Submitted,
    SubmittedModified,
    SubmittedFailOpen,
    Blocked { notice_shown: bool },
}

// ─── Page surface seam ───────────────────────────────────────────────────────

/// The page's composer: input field, original submission path, user notice.
pub trait ComposerSurface: Send + Sync {
    fn read_input(&self) -> String;

    fn write_input(&self, text: &str);

    /// Trigger the original submission path (the one the collector held).
    fn submit(&self);

    fn show_notice(&self, message: &str);
}

/// Trim and cap the composed text. Empty input never submits.
#[must_use]
pub fn normalize_prompt(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_PROMPT_CHARS).collect())
}

// ─── Collector ───────────────────────────────────────────────────────────────

/// Holds a detected text submission until the verdict resolves, then
/// releases, rewrites, or aborts it.
///
/// Exactly one underlying submission occurs per accepted gesture; a blocked
/// gesture produces none.
pub struct PromptCollector {
    surface: Arc<dyn ComposerSurface>,
    requester: Arc<DecisionRequester>,
    state: Mutex<CollectorState>,
    in_flight: AtomicBool,
    loop_guard: AtomicBool,
    last_submitted: Mutex<Option<String>>,
    last_notice: Mutex<Option<Instant>>,
}

impl PromptCollector {
    pub fn new(surface: Arc<dyn ComposerSurface>, requester: Arc<DecisionRequester>) -> Self {
        Self {
            surface,
            requester,
            state: Mutex::new(CollectorState::Idle),
            in_flight: AtomicBool::new(false),
            loop_guard: AtomicBool::new(false),
            last_submitted: Mutex::new(None),
            last_notice: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> CollectorState {
        *self.state.lock().expect("collector state lock poisoned")
    }

    #[must_use]
    pub fn loop_guard_active(&self) -> bool {
        self.loop_guard.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: CollectorState) {
        *self.state.lock().expect("collector state lock poisoned") = state;
    }

    /// Handle one submit gesture. The default submission is considered
    /// prevented for the duration of this call; the collector itself decides
    /// whether the original path runs.
    pub async fn on_gesture(&self, gesture: SubmitGesture) -> GestureOutcome {
        if self.loop_guard.load(Ordering::SeqCst) {
            return GestureOutcome::PassedThrough;
        }
        if gesture.is_line_break() {
            return GestureOutcome::IgnoredLineBreak;
        }

        let Some(prompt) = normalize_prompt(&self.surface.read_input()) else {
            return GestureOutcome::IgnoredEmpty;
        };

        {
            let last = self.last_submitted.lock().expect("last_submitted lock poisoned");
            if last.as_deref() == Some(prompt.as_str()) {
                return GestureOutcome::DiscardedDuplicate;
            }
        }

        // Single-flight: one outstanding prompt decision at a time.
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return GestureOutcome::DiscardedBusy;
        }

        self.set_state(CollectorState::Held);
        let verdict = self
            .requester
            .request(SubmissionDescriptor::Prompt {
                text: prompt.clone(),
            })
            .await;

        let outcome = self.apply(&prompt, verdict);
        self.set_state(CollectorState::Idle);
        self.in_flight.store(false, Ordering::SeqCst);
        outcome
    }

    fn apply(&self, original: &str, verdict: PolicyDecision) -> GestureOutcome {
        if verdict.is_blocked() {
            self.set_state(CollectorState::Blocked);
            let notice_shown = self.show_block_notice(verdict.reason.as_deref());
            tracing::info!(notice_shown, "prompt blocked by policy");
            return GestureOutcome::Blocked { notice_shown };
        }

        if verdict.fail_open {
            self.set_state(CollectorState::FailOpenSubmitting);
            tracing::debug!(
                reason = verdict.reason.as_deref().unwrap_or_default(),
                "decision failed open, submitting original text"
            );
            self.remember_submitted(original);
            self.release();
            return GestureOutcome::SubmittedFailOpen;
        }

        self.set_state(CollectorState::Submitting);
        match verdict.modified_content {
            Some(modified) if modified != original => {
                self.surface.write_input(&modified);
                self.remember_submitted(&modified);
                self.release();
                GestureOutcome::SubmittedModified
            }
            _ => {
                self.remember_submitted(original);
                self.release();
                GestureOutcome::Submitted
            }
        }
    }

    /// Trigger the original submission path. The loop guard is set for the
    /// duration of the synthetic submission so our own interception passes
    /// it through, and drops once that submission has run its course.
    fn release(&self) {
        self.loop_guard.store(true, Ordering::SeqCst);
        self.surface.submit();
        self.loop_guard.store(false, Ordering::SeqCst);
    }

    fn remember_submitted(&self, text: &str) {
        *self
            .last_submitted
            .lock()
            .expect("last_submitted lock poisoned") = Some(text.to_string());
    }

    /// One-shot, cooldown-limited notice.
    fn show_block_notice(&self, reason: Option<&str>) -> bool {
        let mut last = self.last_notice.lock().expect("last_notice lock poisoned");
        let now = Instant::now();
        let due = last.is_none_or(|at| now.duration_since(at) >= NOTICE_COOLDOWN);
        if !due {
            return false;
        }
        *last = Some(now);

        let message = match reason {
            Some(reason) => format!("Submission blocked by policy: {reason}"),
            None => "Submission blocked by policy".to_string(),
        };
        self.surface.show_notice(&message);
        true
    }
}

use crate::model::{StageMarker, View, STAGE_COUNT};
use crate::orchestrator::UiCommand;
use crate::presenter::{
    CompanyLine, ConfidenceGauge, Notice, PresenterEvent, PriceLine, VerdictCard,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::{Duration, Instant};

/// How long the confidence gauge takes to fill once its delay has passed.
const CONFIDENCE_ANIMATION: Duration = Duration::from_millis(600);

pub struct ActiveNotice {
    pub notice: Notice,
    pub raised_at: Instant,
}

pub struct UiState {
    pub view: View,
    pub input: String,
    pub input_focused: bool,
    pub notice_duration: Duration,
    pub notice: Option<ActiveNotice>,

    pub progress_message: String,
    pub progress_percent: u8,
    pub stages: [StageMarker; STAGE_COUNT],
    pub loading_since: Option<Instant>,

    pub company: Option<CompanyLine>,
    pub verdict: Option<VerdictCard>,
    pub confidence: Option<ConfidenceGauge>,
    pub confidence_painted_at: Option<Instant>,
    pub price: Option<PriceLine>,
    pub download_enabled: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            view: View::Input,
            input: String::new(),
            input_focused: true,
            notice_duration: Duration::from_secs(5),
            notice: None,
            progress_message: String::new(),
            progress_percent: 0,
            stages: [StageMarker::Pending; STAGE_COUNT],
            loading_since: None,
            company: None,
            verdict: None,
            confidence: None,
            confidence_painted_at: None,
            price: None,
            download_enabled: false,
        }
    }
}

impl UiState {
    pub fn apply(&mut self, ev: PresenterEvent, now: Instant) {
        match ev {
            PresenterEvent::SetView(view) => {
                if view == View::Loading && self.view != View::Loading {
                    self.loading_since = Some(now);
                }
                if view != View::Loading {
                    self.loading_since = None;
                }
                self.view = view;
            }
            PresenterEvent::Progress { message, percent } => {
                self.progress_message = message;
                self.progress_percent = percent.min(100);
            }
            PresenterEvent::Stages(stages) => self.stages = stages,
            PresenterEvent::ResetProgress => {
                self.progress_message.clear();
                self.progress_percent = 0;
                self.stages = [StageMarker::Pending; STAGE_COUNT];
            }
            PresenterEvent::Company(c) => self.company = Some(c),
            PresenterEvent::Verdict(v) => self.verdict = Some(v),
            PresenterEvent::Confidence(g) => {
                self.confidence = Some(g);
                self.confidence_painted_at = Some(now);
            }
            PresenterEvent::Price(p) => self.price = Some(p),
            PresenterEvent::DownloadEnabled(enabled) => self.download_enabled = enabled,
            PresenterEvent::ClearInput => self.input.clear(),
            PresenterEvent::FocusInput => self.input_focused = true,
            PresenterEvent::Notify(notice) => {
                self.notice = Some(ActiveNotice {
                    notice,
                    raised_at: now,
                });
            }
        }
    }

    /// Hide the notification once it has been visible for the configured duration.
    pub fn expire_notice(&mut self, now: Instant) {
        if let Some(active) = &self.notice {
            if now.saturating_duration_since(active.raised_at) >= self.notice_duration {
                self.notice = None;
            }
        }
    }

    pub fn dismiss_notice(&mut self) -> bool {
        self.notice.take().is_some()
    }

    /// Current gauge fill, animated from zero once the cosmetic delay has elapsed.
    pub fn confidence_fill(&self, now: Instant) -> f64 {
        let (Some(gauge), Some(painted)) = (&self.confidence, self.confidence_painted_at) else {
            return 0.0;
        };
        let elapsed = now.saturating_duration_since(painted);
        if elapsed < gauge.fill_delay {
            return 0.0;
        }
        let t = (elapsed - gauge.fill_delay).as_secs_f64() / CONFIDENCE_ANIMATION.as_secs_f64();
        gauge.fill_ratio.clamp(0.0, 1.0) * t.clamp(0.0, 1.0)
    }

    pub fn push_input(&mut self, c: char) {
        const MAX: usize = 32;
        if !c.is_control() && self.input.chars().count() < MAX {
            self.input.push(c);
        }
    }

    pub fn pop_input(&mut self) {
        self.input.pop();
    }
}

/// Map a key press to local edits and, when it means something to the workflow, a command.
pub(crate) fn handle_key(state: &mut UiState, key: KeyEvent) -> Option<UiCommand> {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => return Some(UiCommand::Quit),
        (_, KeyCode::Esc) => {
            state.dismiss_notice();
            return None;
        }
        _ => {}
    }

    match state.view {
        View::Input => match (key.modifiers, key.code) {
            (_, KeyCode::Enter) => {
                state.input_focused = false;
                Some(UiCommand::Analyze(state.input.clone()))
            }
            (_, KeyCode::Backspace) => {
                state.pop_input();
                None
            }
            (KeyModifiers::CONTROL, KeyCode::Char('u')) => {
                state.input.clear();
                None
            }
            (m, KeyCode::Char(c)) if !m.contains(KeyModifiers::CONTROL) => {
                state.push_input(c);
                None
            }
            _ => None,
        },
        View::Results => match key.code {
            KeyCode::Char('d') if state.download_enabled => Some(UiCommand::Download),
            KeyCode::Char('n') => Some(UiCommand::NewAnalysis),
            KeyCode::Char('q') => Some(UiCommand::Quit),
            _ => None,
        },
        View::Loading => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presenter::NoticeLevel;

    #[test]
    fn notice_auto_hides_after_duration() {
        let t0 = Instant::now();
        let mut state = UiState::default();
        state.apply(PresenterEvent::Notify(Notice::error("boom")), t0);

        state.expire_notice(t0 + Duration::from_millis(4999));
        assert!(state.notice.is_some());
        assert_eq!(
            state.notice.as_ref().map(|n| n.notice.level),
            Some(NoticeLevel::Error)
        );

        state.expire_notice(t0 + Duration::from_secs(5));
        assert!(state.notice.is_none());
    }

    #[test]
    fn newer_notice_restarts_timer() {
        let t0 = Instant::now();
        let mut state = UiState::default();
        state.apply(PresenterEvent::Notify(Notice::error("first")), t0);
        state.apply(
            PresenterEvent::Notify(Notice::info("second")),
            t0 + Duration::from_secs(4),
        );
        state.expire_notice(t0 + Duration::from_secs(6));
        assert_eq!(
            state.notice.as_ref().map(|n| n.notice.message.as_str()),
            Some("second")
        );
        assert!(state.dismiss_notice());
        assert!(!state.dismiss_notice());
    }

    #[test]
    fn confidence_fill_waits_for_delay() {
        let t0 = Instant::now();
        let mut state = UiState::default();
        state.apply(
            PresenterEvent::Confidence(ConfidenceGauge {
                percent: 80,
                text: "80%".into(),
                fill_ratio: 0.8,
                fill_delay: Duration::from_millis(100),
            }),
            t0,
        );
        assert_eq!(state.confidence_fill(t0 + Duration::from_millis(50)), 0.0);
        let done = state.confidence_fill(t0 + Duration::from_secs(2));
        assert!((done - 0.8).abs() < 1e-9);
        let mid = state.confidence_fill(t0 + Duration::from_millis(400));
        assert!(mid > 0.0 && mid < 0.8);
    }

    #[test]
    fn reset_returns_progress_to_zero() {
        let now = Instant::now();
        let mut state = UiState::default();
        state.apply(
            PresenterEvent::Progress {
                message: "Fetching".into(),
                percent: 40,
            },
            now,
        );
        state.apply(
            PresenterEvent::Stages([StageMarker::Completed, StageMarker::Active, StageMarker::Pending]),
            now,
        );
        state.apply(PresenterEvent::ResetProgress, now);
        assert_eq!(state.progress_percent, 0);
        assert!(state.progress_message.is_empty());
        assert_eq!(state.stages, [StageMarker::Pending; STAGE_COUNT]);
    }

    #[test]
    fn input_editing() {
        let mut state = UiState::default();
        for c in "infy.ns\n".chars() {
            state.push_input(c);
        }
        assert_eq!(state.input, "infy.ns");
        state.pop_input();
        assert_eq!(state.input, "infy.n");
        state.apply(PresenterEvent::ClearInput, Instant::now());
        assert!(state.input.is_empty());
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn enter_submits_the_typed_symbol() {
        let mut state = UiState::default();
        for c in "tcs.ns".chars() {
            assert_eq!(handle_key(&mut state, press(KeyCode::Char(c))), None);
        }
        assert_eq!(
            handle_key(&mut state, press(KeyCode::Enter)),
            Some(UiCommand::Analyze("tcs.ns".into()))
        );
        assert!(!state.input_focused);
    }

    #[test]
    fn ctrl_u_clears_and_ctrl_c_quits() {
        let mut state = UiState::default();
        state.input = "INFY".into();
        let ctrl = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
        assert_eq!(handle_key(&mut state, ctrl('u')), None);
        assert!(state.input.is_empty());
        assert_eq!(handle_key(&mut state, ctrl('c')), Some(UiCommand::Quit));
    }

    #[test]
    fn download_key_needs_a_report() {
        let mut state = UiState {
            view: View::Results,
            ..Default::default()
        };
        assert_eq!(handle_key(&mut state, press(KeyCode::Char('d'))), None);

        state.download_enabled = true;
        assert_eq!(
            handle_key(&mut state, press(KeyCode::Char('d'))),
            Some(UiCommand::Download)
        );
        assert_eq!(
            handle_key(&mut state, press(KeyCode::Char('n'))),
            Some(UiCommand::NewAnalysis)
        );
        assert_eq!(
            handle_key(&mut state, press(KeyCode::Char('q'))),
            Some(UiCommand::Quit)
        );
    }

    #[test]
    fn loading_sends_nothing_but_esc_still_dismisses() {
        let mut state = UiState {
            view: View::Loading,
            ..Default::default()
        };
        state.apply(PresenterEvent::Notify(Notice::info("hi")), Instant::now());
        for code in [KeyCode::Enter, KeyCode::Char('d'), KeyCode::Char('n'), KeyCode::Char('q')] {
            assert_eq!(handle_key(&mut state, press(code)), None);
        }
        assert!(state.input.is_empty());
        assert_eq!(handle_key(&mut state, press(KeyCode::Esc)), None);
        assert!(state.notice.is_none());
    }
}

use encore_core::{
    schedule_frame, ClientMessage, ClockOffset, FramePosition, ServerMessage, SessionStart,
    ShowState, StepKind, StepParams,
};

/// Per-frame output handed to the presentation layer: which effect is live,
/// how far into it we are, and its opaque parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub kind: StepKind,
    /// Index into the routine's active-filtered step sequence.
    pub step_index: usize,
    pub elapsed_in_step: u64,
    pub params: StepParams,
}

/// The presentation collaborator. Everything visual lives behind this seam;
/// the engine only decides *what* is on screen and *when*.
pub trait Renderer: Send {
    /// Called once per frame while a step is live. Must be cheap; it runs at
    /// display rate.
    fn render(&mut self, frame: &FrameOutput);

    /// Return to the idle/waiting presentation.
    fn idle(&mut self);

    /// The routine ran to completion. `redirection_url` is empty when no
    /// redirect is configured.
    fn finished(&mut self, redirection_url: &str);

    /// The local show-state copy was replaced by a broadcast.
    fn state_changed(&mut self, _state: &ShowState) {}
}

/// Connection-independent client state machine.
///
/// Feed it server messages and frame ticks; it drives the [`Renderer`].
/// Everything timing-related goes through the clock offset captured from the
/// one sync round trip, so two engines fed the same messages and the same
/// corrected clock render the same thing.
pub struct ClientEngine<R: Renderer> {
    renderer: R,
    offset: ClockOffset,
    state: ShowState,
    session: Option<SessionStart>,
    pending_sync: Option<u64>,
    is_admin: bool,
}

impl<R: Renderer> ClientEngine<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            offset: ClockOffset::default(),
            state: ShowState::default(),
            session: None,
            pending_sync: None,
            is_admin: false,
        }
    }

    /// Start the clock-sync round trip. Returns the message to send; the
    /// reply is handled in [`ClientEngine::handle_server_message`]. If the
    /// reply never arrives the offset stays zero and the local clock is used
    /// as-is.
    pub fn begin_sync(&mut self, local_now: u64) -> ClientMessage {
        self.pending_sync = Some(local_now);
        ClientMessage::SyncTime {
            client_time: local_now,
        }
    }

    pub fn handle_server_message(&mut self, message: ServerMessage, local_now: u64) {
        match message {
            ServerMessage::SyncTimeReply {
                client_time,
                server_time,
            } => {
                if self.pending_sync.take() == Some(client_time) {
                    self.offset = ClockOffset::from_round_trip(client_time, local_now, server_time);
                    log::info!("clock offset {}ms", self.offset.millis());
                } else {
                    log::debug!("ignoring sync reply for unknown timestamp {client_time}");
                }
            }
            ServerMessage::StateUpdate { state } => {
                // The local copy is stale the instant a broadcast arrives;
                // replace it wholesale, never patch.
                self.state = state;
                self.renderer.state_changed(&self.state);
            }
            ServerMessage::SpectatorCount { count } => {
                log::debug!("{count} spectators connected");
            }
            ServerMessage::AdminGranted => {
                self.is_admin = true;
            }
            ServerMessage::StartSequence {
                target_time,
                routine,
            } => {
                log::info!("session starts at {target_time}: '{}'", routine.name);
                self.session = Some(SessionStart {
                    target_time,
                    routine,
                });
            }
            ServerMessage::ResetSequence => {
                self.session = None;
                self.renderer.idle();
            }
        }
    }

    /// One display frame. Safe to call at any rate; the scheduling is a pure
    /// recomputation, so repeated invocation never drifts.
    pub fn frame(&mut self, local_now: u64) {
        let Some(session) = &self.session else {
            return;
        };

        let corrected_now = self.offset.corrected(local_now);
        match schedule_frame(&session.routine, session.target_time, corrected_now) {
            FramePosition::Pending => {}
            FramePosition::Active {
                step_index,
                elapsed_in_step,
            } => {
                if let Some(step) = session.routine.active_steps().nth(step_index) {
                    let frame = FrameOutput {
                        kind: step.kind.clone(),
                        step_index,
                        elapsed_in_step,
                        params: step.params.clone(),
                    };
                    self.renderer.render(&frame);
                }
            }
            FramePosition::Finished => {
                let url = self.state.redirection_url.clone();
                self.session = None;
                self.renderer.finished(&url);
            }
        }
    }

    pub fn offset(&self) -> ClockOffset {
        self.offset
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn in_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn state(&self) -> &ShowState {
        &self.state
    }
}

/// A renderer that logs step transitions. Useful for headless smoke tests
/// against a live server.
#[derive(Debug, Default)]
pub struct LogRenderer {
    current_step: Option<usize>,
}

impl Renderer for LogRenderer {
    fn render(&mut self, frame: &FrameOutput) {
        if self.current_step != Some(frame.step_index) {
            self.current_step = Some(frame.step_index);
            log::info!("step {} -> {:?}", frame.step_index, frame.kind);
        }
    }

    fn idle(&mut self) {
        self.current_step = None;
        log::info!("idle");
    }

    fn finished(&mut self, redirection_url: &str) {
        self.current_step = None;
        if redirection_url.is_empty() {
            log::info!("routine finished");
        } else {
            log::info!("routine finished, redirecting to {redirection_url}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::{Routine, Step};

    #[derive(Debug, PartialEq)]
    enum Event {
        Render(usize, u64),
        Idle,
        Finished(String),
        StateChanged,
    }

    #[derive(Default)]
    struct RecordingRenderer {
        events: Vec<Event>,
    }

    impl Renderer for RecordingRenderer {
        fn render(&mut self, frame: &FrameOutput) {
            self.events
                .push(Event::Render(frame.step_index, frame.elapsed_in_step));
        }

        fn idle(&mut self) {
            self.events.push(Event::Idle);
        }

        fn finished(&mut self, redirection_url: &str) {
            self.events.push(Event::Finished(redirection_url.to_string()));
        }

        fn state_changed(&mut self, _state: &ShowState) {
            self.events.push(Event::StateChanged);
        }
    }

    fn engine() -> ClientEngine<RecordingRenderer> {
        ClientEngine::new(RecordingRenderer::default())
    }

    fn start_message(target_time: u64) -> ServerMessage {
        let mut routine = Routine::new("r", "R");
        routine.steps = vec![
            Step::new(StepKind::Emojis, 1000),
            Step::new(StepKind::Flash, 2000),
        ];
        ServerMessage::StartSequence {
            target_time,
            routine,
        }
    }

    #[test]
    fn sync_round_trip_sets_offset() {
        let mut engine = engine();
        let msg = engine.begin_sync(1000);
        assert_eq!(msg, ClientMessage::SyncTime { client_time: 1000 });

        engine.handle_server_message(
            ServerMessage::SyncTimeReply {
                client_time: 1000,
                server_time: 1080,
            },
            1100,
        );
        assert_eq!(engine.offset().millis(), 30);
    }

    #[test]
    fn admin_grant_sets_capability() {
        let mut engine = engine();
        assert!(!engine.is_admin());
        engine.handle_server_message(ServerMessage::AdminGranted, 0);
        assert!(engine.is_admin());
    }

    #[test]
    fn state_update_replaces_local_copy() {
        let mut engine = engine();
        let mut state = ShowState::default();
        state.active_routine_index = 3;
        engine.handle_server_message(ServerMessage::StateUpdate { state }, 0);
        assert_eq!(engine.state().active_routine_index, 3);
        assert_eq!(engine.renderer.events, vec![Event::StateChanged]);
    }

    #[test]
    fn unsolicited_sync_reply_is_ignored() {
        let mut engine = engine();
        engine.handle_server_message(
            ServerMessage::SyncTimeReply {
                client_time: 5,
                server_time: 9999,
            },
            100,
        );
        assert_eq!(engine.offset().millis(), 0);
    }

    #[test]
    fn frames_follow_the_session_timeline() {
        let mut engine = engine();
        engine.handle_server_message(start_message(10_000), 0);

        engine.frame(9_000); // pre-roll
        engine.frame(10_500); // step 0
        engine.frame(11_500); // step 1
        engine.frame(14_000); // past the end

        assert_eq!(
            engine.renderer.events,
            vec![
                Event::Render(0, 500),
                Event::Render(1, 500),
                Event::Finished(String::new()),
            ]
        );
        assert!(!engine.in_session());
    }

    #[test]
    fn finished_reports_redirection_url() {
        let mut engine = engine();
        let mut state = ShowState::default();
        state.redirection_url = "https://example.com/thanks".into();
        engine.handle_server_message(ServerMessage::StateUpdate { state }, 0);
        engine.handle_server_message(start_message(0), 0);

        engine.frame(8_000);
        assert_eq!(
            engine.renderer.events,
            vec![
                Event::StateChanged,
                Event::Finished("https://example.com/thanks".into()),
            ]
        );
    }

    #[test]
    fn reset_abandons_session_unconditionally() {
        let mut engine = engine();
        engine.handle_server_message(start_message(0), 0);
        engine.frame(100);
        assert!(engine.in_session());

        engine.handle_server_message(ServerMessage::ResetSequence, 0);
        assert!(!engine.in_session());
        assert_eq!(engine.renderer.events.last(), Some(&Event::Idle));

        // Frames after reset are no-ops.
        let before = engine.renderer.events.len();
        engine.frame(200);
        assert_eq!(engine.renderer.events.len(), before);
    }

    #[test]
    fn offset_shifts_the_frame_clock() {
        let mut engine = engine();
        engine.begin_sync(0);
        engine.handle_server_message(
            ServerMessage::SyncTimeReply {
                client_time: 0,
                server_time: 5_000,
            },
            0,
        );
        assert_eq!(engine.offset().millis(), 5_000);

        engine.handle_server_message(start_message(5_000), 0);
        // Local clock reads 400, corrected to 5_400: 400ms into step 0.
        engine.frame(400);
        assert_eq!(engine.renderer.events, vec![Event::Render(0, 400)]);
    }
}

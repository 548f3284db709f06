//! Playback monitor and survey runtime.
//!
//! `SurveyRuntime` owns everything a single viewing needs: the session state
//! machine, the playback source handle, the chosen submission sink, the
//! current presenter surface and the timeline projection. All operations run
//! on one task; the only shared-state hazard is re-arming the sampling
//! ticker, which always replaces the previous one so two samplers never run
//! concurrently.
//!
//! The host drives the runtime either by calling the methods directly from
//! its own event loop, or by sending `WidgetEvent`s into [`SurveyRuntime::run`].

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::Interval;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;

use crate::config::PlaybackConfig;
use crate::error::VidformError;
use crate::playback::{PlaybackError, PlaybackSource, PlayerState};
use crate::session::{SessionError, SurveySession};
use crate::sink::{Delivery, SubmissionSink, SubmitError};
use crate::surface::{FormSurface, SurfaceError};
use crate::timeline::Timeline;

/// Host-side events consumed by the [`SurveyRuntime::run`] driver.
#[derive(Debug)]
pub enum WidgetEvent {
    PlayerReady,
    StateChanged(PlayerState),
    /// Error code from the player's error channel; fatal to the session.
    PlayerError(u16),
    TimelineClicked {
        click_x: f64,
        track_width: f64,
    },
    TextEntered(String),
    OptionSelected {
        group: String,
        value: String,
    },
    SubmitPressed,
}

/// What happened to a submit action.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Entry recorded, playback resumed. Carries the per-answer delivery
    /// result; a failed incremental delivery does not block the session.
    Continued { delivery: Delivery },
    /// Terminal checkpoint flushed; the session is complete.
    Completed { delivery: Delivery },
    /// Terminal batch flush failed; the overlay stays open, the accumulator
    /// is retained and submit is re-enabled for a retry.
    RetryRequired { error: SubmitError },
}

pub struct SurveyRuntime {
    session: SurveySession,
    player: Box<dyn PlaybackSource + Send>,
    sink: Box<dyn SubmissionSink>,
    surface: Option<FormSurface>,
    timeline: Option<Timeline>,
    ticker: Option<Interval>,
    sample_interval: Duration,
    duration_retry_ms: u64,
}

impl SurveyRuntime {
    pub fn new(
        session: SurveySession,
        player: Box<dyn PlaybackSource + Send>,
        sink: Box<dyn SubmissionSink>,
        config: &PlaybackConfig,
    ) -> Self {
        Self {
            session,
            player,
            sink,
            surface: None,
            timeline: None,
            ticker: None,
            sample_interval: Duration::from_millis(config.sample_interval_ms),
            duration_retry_ms: config.duration_retry_ms,
        }
    }

    pub fn session(&self) -> &SurveySession {
        &self.session
    }

    pub fn surface(&self) -> Option<&FormSurface> {
        self.surface.as_ref()
    }

    pub fn timeline(&self) -> Option<&Timeline> {
        self.timeline.as_ref()
    }

    pub fn sampler_armed(&self) -> bool {
        self.ticker.is_some()
    }

    /// (Re)arm the sampling ticker. Assigning drops any previous ticker
    /// first, so restarting cannot leave a duplicate sampler behind.
    fn arm_sampler(&mut self) {
        self.ticker = Some(tokio::time::interval(self.sample_interval));
    }

    fn disarm_sampler(&mut self) {
        self.ticker = None;
    }

    /// Player reported ready: start monitoring and build the timeline. The
    /// duration may not be known yet; probe on a fixed cadence until it is.
    pub async fn on_player_ready(&mut self) {
        self.arm_sampler();
        let duration = self.probe_duration().await;
        self.timeline = Some(Timeline::build(self.session.checkpoints(), duration));
    }

    async fn probe_duration(&self) -> f64 {
        let strategy = FixedInterval::from_millis(self.duration_retry_ms);
        let player = &self.player;
        let result: Result<f64, ()> = Retry::spawn(strategy, || {
            let probed = player.duration();
            async move {
                match probed {
                    Some(duration) if duration.is_finite() && duration > 0.0 => Ok(duration),
                    _ => Err(()),
                }
            }
        })
        .await;
        result.unwrap_or_default()
    }

    /// Any playing state (re)starts monitoring; any other state stops it.
    pub fn on_state_change(&mut self, state: PlayerState) {
        if state.is_playing() {
            self.session.playback_started();
            self.arm_sampler();
        } else {
            self.session.playback_stopped();
            self.disarm_sampler();
        }
    }

    /// One monitoring tick: refresh the projection, then evaluate the
    /// checkpoint at the cursor. On a crossing: pause playback, record the
    /// trigger time and present the checkpoint's surface (replacing any
    /// previous one).
    pub fn on_sample(&mut self) -> Option<usize> {
        let position = self.player.position();
        if let Some(timeline) = &mut self.timeline {
            timeline.set_position(position);
        }

        let index = self.session.sample(position)?;
        self.player.pause();
        let video_time = self.player.position();
        let checkpoint = self.session.checkpoints().get(index)?.clone();
        tracing::info!(
            index,
            checkpoint = %checkpoint.id,
            video_time,
            "checkpoint triggered"
        );
        self.surface = Some(FormSurface::present(&checkpoint, index, video_time));
        if let Some(timeline) = &mut self.timeline {
            timeline.mark_completed(index);
        }
        Some(index)
    }

    /// Map a click on the timeline track to a seek. A seek neither triggers
    /// nor re-arms checkpoints; the next sample re-evaluates against the
    /// cursor only. If the video was playing it keeps playing.
    pub fn on_timeline_click(&mut self, click_x: f64, track_width: f64) {
        let target = match &self.timeline {
            Some(timeline) if timeline.duration() > 0.0 => {
                timeline.seek_target(click_x, track_width)
            }
            _ => return,
        };

        let was_playing = self.player.state().is_playing();
        self.player.seek_to(target);
        if was_playing {
            self.player.play();
        }
        if let Some(timeline) = &mut self.timeline {
            timeline.set_position(target);
        }
    }

    pub fn enter_text(&mut self, text: impl Into<String>) -> Result<(), SurfaceError> {
        match &mut self.surface {
            Some(surface) => surface.enter_text(text),
            None => Err(SurfaceError::NotPresenting),
        }
    }

    pub fn select_option(&mut self, group: &str, value: &str) -> Result<(), SurfaceError> {
        match &mut self.surface {
            Some(surface) => surface.select(group, value),
            None => Err(SurfaceError::NotPresenting),
        }
    }

    /// The submit action. Collects the surface into an answer entry, hands
    /// it to the sink, and resumes playback — unconditionally for
    /// non-terminal checkpoints, even when incremental delivery failed. At
    /// the terminal checkpoint the accumulated set is flushed; only a flush
    /// failure keeps the overlay open (retry re-flushes without collecting a
    /// duplicate entry).
    pub async fn submit(&mut self) -> Result<SubmitOutcome, SessionError> {
        let entry = match &self.surface {
            Some(surface) => surface.collect(self.session.key()),
            None => return Err(SessionError::NoActiveCheckpoint),
        };
        let ticket = self.session.begin_submit()?;
        let mut delivery = Delivery::Delivered;

        if !ticket.retry {
            self.session.record(entry.clone());
            if let Err(error) = self.sink.deliver(&entry).await {
                tracing::warn!(
                    sink = self.sink.name(),
                    error = %error,
                    "answer delivery failed; continuing session"
                );
                delivery = Delivery::Failed(error.to_string());
            }
        }

        if self.session.is_terminal(ticket.index) {
            match self
                .sink
                .flush(self.session.key(), self.session.entries())
                .await
            {
                Ok(()) => {
                    self.session.flush_succeeded();
                    self.close_overlay_and_resume();
                    Ok(SubmitOutcome::Completed { delivery })
                }
                Err(error) => {
                    tracing::error!(
                        sink = self.sink.name(),
                        error = %error,
                        "terminal flush failed; keeping the overlay open for retry"
                    );
                    self.session.flush_failed();
                    Ok(SubmitOutcome::RetryRequired { error })
                }
            }
        } else {
            self.session.submit_finished();
            self.close_overlay_and_resume();
            Ok(SubmitOutcome::Continued { delivery })
        }
    }

    fn close_overlay_and_resume(&mut self) {
        self.surface = None;
        self.player.play();
    }

    /// Drive the runtime from a host event stream until the stream closes,
    /// shutdown fires, or a fatal playback error arrives.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<WidgetEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<SurveySession, VidformError> {
        loop {
            let sampler = self.ticker.as_mut();
            let tick = async move {
                match sampler {
                    Some(ticker) => {
                        ticker.tick().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = tick => {
                    self.on_sample();
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await?,
                    None => break,
                },
                _ = shutdown.recv() => break,
            }
        }
        Ok(self.session)
    }

    async fn handle_event(&mut self, event: WidgetEvent) -> Result<(), VidformError> {
        match event {
            WidgetEvent::PlayerReady => self.on_player_ready().await,
            WidgetEvent::StateChanged(state) => self.on_state_change(state),
            WidgetEvent::PlayerError(code) => {
                let error = PlaybackError::from_code(code);
                tracing::error!(error = %error, "fatal playback error");
                return Err(error.into());
            }
            WidgetEvent::TimelineClicked {
                click_x,
                track_width,
            } => self.on_timeline_click(click_x, track_width),
            WidgetEvent::TextEntered(text) => {
                if let Err(error) = self.enter_text(text) {
                    tracing::debug!(error = %error, "text input ignored");
                }
            }
            WidgetEvent::OptionSelected { group, value } => {
                if let Err(error) = self.select_option(&group, &value) {
                    tracing::debug!(error = %error, "option selection ignored");
                }
            }
            WidgetEvent::SubmitPressed => match self.submit().await {
                Ok(_) | Err(SessionError::SubmitInFlight) => {}
                Err(error) => tracing::debug!(error = %error, "submit ignored"),
            },
        }
        Ok(())
    }
}

// TrialController - sequences 2IAFC trials across a session
//
// Lifecycle per frequency:
//   start_frequency -> (present_trial -> submit_response)* -> next frequency
//
// present_trial is split into begin_trial (interval assignment, level
// calibration) and play_intervals (presenter sequence). A response is only
// accepted once both intervals have been played. The staircase update is
// computed on a copy and committed after the recorder accepted the trial,
// so a failed write or an aborted session never leaves a half-applied
// response behind.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

use crate::calibration::{LevelCalibrator, PresentationLevel};
use crate::error::{
    log_presentation_error, ErrorCode, PresentationError, SequencingError, SessionError,
};
use crate::session::config::{SessionConfig, TimingConfig};
use crate::session::events::{EventChannel, SessionEvent, SessionProgress};
use crate::session::listener::Listener;
use crate::session::presenter::{Interval, PresentationRequest, Presenter};
use crate::session::record::TrialRecord;
use crate::session::recorder::TrialRecorder;
use crate::staircase::{Staircase, TrackPoint};
use crate::stimulus::{synthesize, StimulusBuffer};

/// Where the controller is within the trial cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No frequency running
    Idle,
    /// Frequency running, next trial may be presented
    Ready,
    /// Trial prepared, intervals not yet played
    Presenting,
    /// Both intervals played, waiting for the listener
    AwaitingResponse,
    /// Every frequency tested or session aborted
    Finished,
}

/// Trial prepared for presentation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialCue {
    /// Session-wide trial number this presentation will be recorded as
    pub trial: u32,
    pub frequency: f64,
    pub staircase_level: f64,
    pub level: PresentationLevel,
}

/// Result of one submitted response
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    pub record: TrialRecord,
    pub point: TrackPoint,
    /// The staircase reached its reversal target with this response
    pub frequency_complete: bool,
}

/// Summary of one frequency's track
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyResult {
    pub frequency: f64,
    pub reversals: Vec<f64>,
    pub trials: usize,
    /// Ended by a configuration or range error before completion
    pub aborted: bool,
}

struct PendingTrial {
    cue: TrialCue,
    stimulus_interval: Interval,
}

struct FrequencyRun {
    frequency: f64,
    staircase: Staircase,
    stimulus: StimulusBuffer,
    pending: Option<PendingTrial>,
}

/// Drives the staircase, stimulus and calibration pipeline for one session
///
/// Presentation and persistence are delegated to the `Presenter` and
/// `TrialRecorder` collaborators.
pub struct TrialController<P: Presenter, R: TrialRecorder> {
    config: SessionConfig,
    calibrator: LevelCalibrator,
    presenter: P,
    recorder: R,
    rng: StdRng,
    events: EventChannel,
    queue: VecDeque<f64>,
    active: Option<FrequencyRun>,
    state: ControllerState,
    trials_completed: u32,
    results: Vec<FrequencyResult>,
}

impl<P: Presenter, R: TrialRecorder> TrialController<P, R> {
    /// Create a controller for a validated session
    ///
    /// # Errors
    /// Any error from [`SessionConfig::validate`]. No trial can start with
    /// an invalid configuration.
    pub fn new(config: SessionConfig, presenter: P, recorder: R) -> Result<Self, SessionError> {
        Self::with_rng(config, presenter, recorder, StdRng::from_entropy())
    }

    /// Create a controller with a seeded interval assignment
    pub fn with_seed(
        config: SessionConfig,
        presenter: P,
        recorder: R,
        seed: u64,
    ) -> Result<Self, SessionError> {
        Self::with_rng(config, presenter, recorder, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        config: SessionConfig,
        presenter: P,
        recorder: R,
        rng: StdRng,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let calibrator = LevelCalibrator::new(config.device_range)?;
        let queue = config.test_freqs.iter().copied().collect();

        log::info!(
            "[TrialController] Session for subject {} ({}) over {} frequencies",
            config.subject,
            config.condition,
            config.test_freqs.len()
        );

        Ok(Self {
            config,
            calibrator,
            presenter,
            recorder,
            rng,
            events: EventChannel::new(),
            queue,
            active: None,
            state: ControllerState::Idle,
            trials_completed: 0,
            results: Vec::new(),
        })
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn into_parts(self) -> (P, R) {
        (self.presenter, self.recorder)
    }

    /// Frequency currently under test
    pub fn current_frequency(&self) -> Option<f64> {
        self.active.as_ref().map(|run| run.frequency)
    }

    /// Staircase of the frequency under test
    pub fn staircase(&self) -> Option<&Staircase> {
        self.active.as_ref().map(|run| &run.staircase)
    }

    /// Next frequency `start_frequency` would begin, if any
    pub fn next_frequency(&self) -> Option<f64> {
        self.queue.front().copied()
    }

    pub fn trials_completed(&self) -> u32 {
        self.trials_completed
    }

    /// Completed (or aborted) frequencies so far
    pub fn results(&self) -> &[FrequencyResult] {
        &self.results
    }

    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            completed: self.results.len(),
            total: self.config.test_freqs.len(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == ControllerState::Finished
    }

    /// Start the next frequency with a fresh staircase
    ///
    /// # Returns
    /// * `Ok(Some(frequency))` - Frequency started
    /// * `Ok(None)` - No frequencies left; the session is finished
    ///
    /// # Errors
    /// * `SequencingError::FrequencyInProgress` if the current track is
    ///   still running
    /// * `ConfigError` if the staircase or stimulus cannot be built; the
    ///   frequency is recorded as aborted
    pub fn start_frequency(&mut self) -> Result<Option<f64>, SessionError> {
        if self.state == ControllerState::Finished {
            return Ok(None);
        }
        if let Some(run) = &self.active {
            return Err(SequencingError::FrequencyInProgress {
                frequency: run.frequency,
            }
            .into());
        }

        let Some(frequency) = self.queue.pop_front() else {
            self.state = ControllerState::Finished;
            log::info!(
                "[TrialController] Session complete after {} trials",
                self.trials_completed
            );
            self.events.publish(SessionEvent::SessionCompleted {
                trials: self.trials_completed,
            });
            return Ok(None);
        };

        let built = Staircase::new(&self.config.staircase_config()).and_then(|staircase| {
            synthesize(&self.config.stimulus_params(frequency))
                .map(|stimulus| (staircase, stimulus))
        });
        let (staircase, stimulus) = match built {
            Ok(parts) => parts,
            Err(err) => {
                self.record_aborted(frequency, Vec::new(), 0);
                return Err(err.into());
            }
        };

        self.active = Some(FrequencyRun {
            frequency,
            staircase,
            stimulus,
            pending: None,
        });
        self.state = ControllerState::Ready;

        log::info!("[TrialController] Testing {} Hz", frequency);
        self.events.publish(SessionEvent::FrequencyStarted {
            frequency,
            progress: self.progress(),
        });
        Ok(Some(frequency))
    }

    /// Prepare and play one trial
    pub fn present_trial(&mut self) -> Result<TrialCue, SessionError> {
        let cue = self.begin_trial()?;
        self.play_intervals()?;
        Ok(cue)
    }

    /// Assign the stimulus interval and calibrate the presentation level
    ///
    /// # Errors
    /// * `SequencingError` when called out of order
    /// * `CalibrationError::PresentationLevelOutOfRange` (and configuration
    ///   errors) abort the current frequency; data already recorded stays
    ///   valid
    pub fn begin_trial(&mut self) -> Result<TrialCue, SessionError> {
        match self.state {
            ControllerState::Ready => {}
            ControllerState::Idle => return Err(SequencingError::NoActiveFrequency.into()),
            ControllerState::Finished => return Err(SequencingError::SessionFinished.into()),
            ControllerState::Presenting | ControllerState::AwaitingResponse => {
                return Err(SequencingError::TrialAwaitingResponse.into())
            }
        }
        let Some(run) = self.active.as_mut() else {
            return Err(SequencingError::NoActiveFrequency.into());
        };

        let stimulus_interval = Interval::ALL[self.rng.gen_range(0..Interval::ALL.len())];
        let staircase_level = run.staircase.current_level();
        let calibrated = self.calibrator.calibrate(
            staircase_level,
            run.frequency,
            self.config.num_stim_chans,
            self.config.calibration.calibration_offset(),
        );
        let level = match calibrated {
            Ok(level) => level,
            Err(err) => {
                log::error!(
                    "[TrialController] Aborting {} Hz at track level {}: {}",
                    run.frequency,
                    staircase_level,
                    err
                );
                self.abort_frequency();
                return Err(err);
            }
        };

        let cue = TrialCue {
            trial: self.trials_completed + 1,
            frequency: run.frequency,
            staircase_level,
            level,
        };
        log::debug!(
            "[TrialController] Trial {}: {} Hz, stimulus in interval {}",
            cue.trial,
            cue.frequency,
            stimulus_interval.number()
        );

        run.pending = Some(PendingTrial {
            cue,
            stimulus_interval,
        });
        self.state = ControllerState::Presenting;
        Ok(cue)
    }

    /// Play both intervals of the prepared trial
    ///
    /// # Errors
    /// Presenter faults are recoverable: the prepared trial is discarded,
    /// the staircase is untouched and the trial can be presented again.
    pub fn play_intervals(&mut self) -> Result<(), SessionError> {
        match self.state {
            ControllerState::Presenting => {}
            ControllerState::Ready => return Err(SequencingError::NoTrialPending.into()),
            ControllerState::Idle => return Err(SequencingError::NoActiveFrequency.into()),
            ControllerState::Finished => return Err(SequencingError::SessionFinished.into()),
            ControllerState::AwaitingResponse => {
                return Err(SequencingError::TrialAwaitingResponse.into())
            }
        }
        let Some(run) = self.active.as_mut() else {
            return Err(SequencingError::NoActiveFrequency.into());
        };
        let Some(pending) = run.pending.as_ref() else {
            return Err(SequencingError::NoTrialPending.into());
        };

        let request = PresentationRequest {
            buffer: &run.stimulus,
            level_db: pending.cue.level.adjusted_level_db,
            device_id: self.config.audio_device,
            channel_routing: &self.config.channel_routing,
        };
        let played = play_sequence(
            &mut self.presenter,
            &self.events,
            &self.config.timing,
            &request,
            pending.stimulus_interval,
        );

        match played {
            Ok(()) => {
                let trial = pending.cue.trial;
                self.state = ControllerState::AwaitingResponse;
                self.events
                    .publish(SessionEvent::AwaitingResponse { trial });
                Ok(())
            }
            Err(err) => {
                run.pending = None;
                self.state = ControllerState::Ready;
                log_presentation_error(&err, "TrialController::play_intervals");
                self.events.publish(SessionEvent::PresentationFailed {
                    code: err.code(),
                    message: err.message(),
                });
                Err(err.into())
            }
        }
    }

    /// Score the listener's choice and advance the staircase
    ///
    /// # Errors
    /// * `SequencingError::ResponseDuringPresentation` before both intervals
    ///   were played
    /// * `SequencingError::NoTrialPending` on double submission
    /// * `RecordError` if the trial could not be persisted; the staircase is
    ///   not advanced and the response may be submitted again
    pub fn submit_response(&mut self, response: Interval) -> Result<TrialOutcome, SessionError> {
        match self.state {
            ControllerState::AwaitingResponse => {}
            ControllerState::Presenting => {
                return Err(SequencingError::ResponseDuringPresentation.into())
            }
            ControllerState::Finished => return Err(SequencingError::SessionFinished.into()),
            ControllerState::Idle | ControllerState::Ready => {
                return Err(SequencingError::NoTrialPending.into())
            }
        }
        let Some(run) = self.active.as_mut() else {
            return Err(SequencingError::NoActiveFrequency.into());
        };
        let Some(pending) = run.pending.as_ref() else {
            return Err(SequencingError::NoTrialPending.into());
        };

        let correct = response == pending.stimulus_interval;
        let mut staircase = run.staircase.clone();
        let point = staircase.add_response(correct)?;

        let config = &self.config;
        let record = TrialRecord {
            trial: pending.cue.trial,
            subject: config.subject.clone(),
            condition: config.condition.clone(),
            min_level: config.min_level,
            max_level: config.max_level,
            duration: config.duration,
            step_sizes: config.step_sizes_label(),
            num_reversals: config.num_reversals,
            rapid_descend: config.rapid_descend,
            slm_reading: config.calibration.slm_reading,
            cal_level_db: config.calibration.cal_level_db,
            slm_offset: config.calibration.slm_offset(),
            adjusted_level_db: pending.cue.level.adjusted_level_db,
            desired_level_db: pending.cue.level.desired_level_db,
            test_freq: run.frequency,
            response: point.response_code(),
            reversal: point.reversal,
            staircase_level: point.level,
            stimulus_interval: pending.stimulus_interval,
            response_interval: response,
        };

        if let Err(err) = self.recorder.record(&record) {
            log::error!(
                "[TrialController] Trial {} not recorded: {}",
                record.trial,
                err
            );
            return Err(err.into());
        }

        run.staircase = staircase;
        run.pending = None;
        self.trials_completed += 1;
        self.events
            .publish(SessionEvent::TrialCompleted(record.clone()));

        let frequency_complete = run.staircase.is_complete();
        if frequency_complete {
            let frequency = run.frequency;
            let reversals = run.staircase.reversals().to_vec();
            let trials = run.staircase.history().len();
            self.active = None;
            self.state = ControllerState::Idle;
            self.results.push(FrequencyResult {
                frequency,
                reversals: reversals.clone(),
                trials,
                aborted: false,
            });
            log::info!(
                "[TrialController] {} Hz complete after {} trials",
                frequency,
                trials
            );
            self.events.publish(SessionEvent::FrequencyCompleted {
                frequency,
                reversals,
            });
        } else {
            self.state = ControllerState::Ready;
        }

        Ok(TrialOutcome {
            record,
            point,
            frequency_complete,
        })
    }

    /// End the session between trials
    ///
    /// A prepared or played trial that has not been answered is discarded
    /// without being recorded, and the running staircase is dropped as is.
    pub fn abort_session(&mut self) {
        if self.state == ControllerState::Finished {
            return;
        }
        if let Some(run) = self.active.take() {
            log::warn!(
                "[TrialController] Session aborted during {} Hz after {} trials",
                run.frequency,
                run.staircase.history().len()
            );
        }
        self.queue.clear();
        self.state = ControllerState::Finished;
    }

    /// Run every remaining frequency with `listener` answering each trial
    ///
    /// Frequencies aborted by configuration or range errors are skipped;
    /// any other error stops the run.
    pub fn run_with<L: Listener>(
        &mut self,
        listener: &mut L,
    ) -> Result<Vec<FrequencyResult>, SessionError> {
        loop {
            match self.start_frequency() {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(err) if err.aborts_frequency() => continue,
                Err(err) => return Err(err),
            }

            loop {
                let cue = match self.present_trial() {
                    Ok(cue) => cue,
                    Err(err) if err.aborts_frequency() => break,
                    Err(err) => return Err(err),
                };
                let Some(stimulus_interval) = self.pending_stimulus_interval() else {
                    return Err(SequencingError::NoTrialPending.into());
                };
                let response = listener.respond(&cue, stimulus_interval);
                if self.submit_response(response)?.frequency_complete {
                    break;
                }
            }
        }
        Ok(self.results.clone())
    }

    fn pending_stimulus_interval(&self) -> Option<Interval> {
        self.active
            .as_ref()
            .and_then(|run| run.pending.as_ref())
            .map(|pending| pending.stimulus_interval)
    }

    fn abort_frequency(&mut self) {
        if let Some(run) = self.active.take() {
            let trials = run.staircase.history().len();
            self.record_aborted(run.frequency, run.staircase.reversals().to_vec(), trials);
        }
        self.state = ControllerState::Idle;
    }

    fn record_aborted(&mut self, frequency: f64, reversals: Vec<f64>, trials: usize) {
        log::warn!(
            "[TrialController] {} Hz aborted after {} trials",
            frequency,
            trials
        );
        self.results.push(FrequencyResult {
            frequency,
            reversals,
            trials,
            aborted: true,
        });
    }
}

/// Pause, interval 1, gap, interval 2
///
/// Only the stimulus interval is played; the other interval is silent for
/// the same duration.
fn play_sequence<P: Presenter>(
    presenter: &mut P,
    events: &EventChannel,
    timing: &TimingConfig,
    request: &PresentationRequest<'_>,
    stimulus_interval: Interval,
) -> Result<(), PresentationError> {
    let duration_s = request.buffer.duration_s();
    presenter.wait(timing.pre_trial_pause_s);

    for interval in Interval::ALL {
        if interval == Interval::Second {
            presenter.wait(timing.inter_stimulus_gap_s);
        }

        presenter.cue(Some(interval));
        events.publish(SessionEvent::IntervalCue {
            interval: Some(interval),
        });

        if interval == stimulus_interval {
            presenter.present(request)?;
            presenter.wait(timing.post_interval_pad_s);
        } else {
            presenter.wait(duration_s + timing.post_interval_pad_s);
        }

        presenter.cue(None);
        events.publish(SessionEvent::IntervalCue { interval: None });
    }
    Ok(())
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;

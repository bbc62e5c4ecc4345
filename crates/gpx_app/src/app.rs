//! The app loop: one thread owns the state, feeds it messages from the
//! engine, runs the resulting effects and renders whenever the state is dirty.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use gpx_core::{
    update, AppState, Effect, FailureReason, GateDecision, GateRequest, GpxFile, JobStatus, Msg,
    OpenGate, SessionGate, TokenGate,
};
use gpx_engine::{AtomicFileWriter, EngineHandle};
use gpx_logging::{gpx_debug, gpx_info, gpx_warn};
use url::Url;

use crate::config::AppConfig;
use crate::effects::EffectRunner;
use crate::ui::{render, TerminalUi};

const TICK: Duration = Duration::from_millis(75);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// The map page was written to `path`.
    Rendered { path: PathBuf },
    /// The last submission failed and no resubmissions were left.
    SubmissionFailed { cause: String },
    TimedOut { attempts: u32 },
    /// The session gate sent the user to sign in.
    Redirected { sign_in: Url },
    Interrupted,
}

impl FlowOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            FlowOutcome::Rendered { .. } => 0,
            FlowOutcome::SubmissionFailed { .. } | FlowOutcome::TimedOut { .. } => 1,
            FlowOutcome::Redirected { .. } => 2,
            FlowOutcome::Interrupted => 130,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: FlowOutcome,
    pub job_id: Option<String>,
    pub checks: u32,
    pub submissions: u32,
}

impl RunReport {
    fn without_job(outcome: FlowOutcome) -> Self {
        Self {
            outcome,
            job_id: None,
            checks: 0,
            submissions: 0,
        }
    }
}

/// Runs the whole flow for one file: session gate, submission, polling and
/// rendering.
pub fn run(config: &AppConfig) -> Result<RunReport> {
    if let GateDecision::Redirect(sign_in) = check_session(config) {
        gpx_warn!("No valid session, redirecting to {}", sign_in);
        println!("Sign in required: {sign_in}");
        return Ok(RunReport::without_job(FlowOutcome::Redirected { sign_in }));
    }

    let file = read_gpx(&config.file)?;
    let engine =
        EngineHandle::new(config.engine.clone()).context("failed to set up the job engine client")?;

    if config.preflight {
        match engine.healthcheck() {
            Ok(()) => gpx_info!("Job engine is healthy"),
            Err(err) => gpx_warn!("Job engine healthcheck failed: {}", err),
        }
    }
    engine.watch_interrupts();

    let ui = TerminalUi::new(AtomicFileWriter::new(&config.output), file.name());
    App::new(EffectRunner::new(engine), ui, config.resubmit).run_flow(file)
}

/// Evaluates the session gate for the configured app URL.
pub fn check_session(config: &AppConfig) -> GateDecision {
    let request = GateRequest {
        url: &config.app_url,
        session_token: config.session_token.as_deref(),
    };
    let gate: Box<dyn SessionGate> = if config.require_session {
        Box::new(TokenGate::new())
    } else {
        Box::new(OpenGate)
    };
    gate.evaluate(&request)
}

fn read_gpx(path: &Path) -> Result<GpxFile> {
    let contents =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("track.gpx");
    Ok(GpxFile::new(name, contents))
}

struct App<W: Write> {
    state: AppState,
    runner: EffectRunner,
    ui: TerminalUi<W>,
    resubmits_left: u32,
    submissions: u32,
    rendered: Option<PathBuf>,
}

impl<W: Write> App<W> {
    fn new(runner: EffectRunner, ui: TerminalUi<W>, resubmits: u32) -> Self {
        Self {
            state: AppState::new(),
            runner,
            ui,
            resubmits_left: resubmits,
            submissions: 0,
            rendered: None,
        }
    }

    fn run_flow(mut self, file: GpxFile) -> Result<RunReport> {
        self.dispatch(Msg::FileSelected(Some(file)))?;
        self.dispatch(Msg::SubmitClicked)?;
        loop {
            if let Some(outcome) = self.settle()? {
                return Ok(self.report(outcome));
            }
            let msg = self.runner.next_msg(TICK);
            self.dispatch(msg)?;
        }
    }

    fn dispatch(&mut self, msg: Msg) -> Result<()> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        self.submissions += effects
            .iter()
            .filter(|effect| matches!(effect, Effect::SubmitUpload { .. }))
            .count() as u32;
        self.runner.run(effects);

        let was_dirty = state.consume_dirty();
        self.state = state;
        if was_dirty {
            let view = self.state.view();
            let written = self
                .ui
                .apply(render(&view))
                .context("failed to write the map page")?;
            if written.is_some() {
                self.rendered = written;
            }
        }
        Ok(())
    }

    /// Checks for a terminal state. A failed submission with resubmissions
    /// left is clicked again instead.
    fn settle(&mut self) -> Result<Option<FlowOutcome>> {
        if self.state.is_torn_down() {
            return Ok(Some(FlowOutcome::Interrupted));
        }
        if let Some(path) = self.rendered.take() {
            return Ok(Some(FlowOutcome::Rendered { path }));
        }

        let upload = self.state.upload();
        match upload.status() {
            JobStatus::Failed => {
                let attempts = match upload.failure() {
                    Some(FailureReason::TimedOut { attempts }) => *attempts,
                    None => 0,
                };
                Ok(Some(FlowOutcome::TimedOut { attempts }))
            }
            JobStatus::Idle if self.state.current_ticket().is_some() => {
                let view = self.state.view();
                let cause = match (view.last_error, view.notice) {
                    (Some(cause), _) => cause,
                    (None, Some(_)) => "no file selected".to_string(),
                    (None, None) => return Ok(None),
                };
                if self.resubmits_left == 0 {
                    return Ok(Some(FlowOutcome::SubmissionFailed { cause }));
                }
                self.resubmits_left -= 1;
                gpx_info!(
                    "Resubmitting after failure ({} left): {}",
                    self.resubmits_left,
                    cause
                );
                self.dispatch(Msg::SubmitClicked)?;
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn report(self, outcome: FlowOutcome) -> RunReport {
        gpx_debug!("Flow finished: {:?}", outcome);
        let view = self.state.view();
        RunReport {
            outcome,
            job_id: view.job_id.map(|id| id.as_str().to_string()),
            checks: view.checks,
            submissions: self.submissions,
        }
    }
}

use crate::{AppState, Effect, FailureReason, JobStatus, Msg, Notice, PollResult, Ticket};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    if state.is_torn_down() {
        // Nothing may touch the job once the view is gone.
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::FileSelected(file) => {
            state.select_file(file);
            Vec::new()
        }
        Msg::SubmitClicked => {
            if state.upload().file().is_none() {
                if state.upload().status() == JobStatus::Idle {
                    state.show_notice(Notice::NoFileSelected);
                }
                return (state, Vec::new());
            }
            match state.begin_submission() {
                Some((ticket, file)) => vec![Effect::SubmitUpload { ticket, file }],
                // Already submitting, polling or finished: repeated clicks are ignored.
                None => Vec::new(),
            }
        }
        Msg::SubmissionFinished { ticket, result } => {
            if !state.is_current(ticket) {
                return (state, Vec::new());
            }
            match result {
                Ok(job_id) => {
                    if state.accept_job_id(job_id.clone()) {
                        vec![Effect::StartPolling { ticket, job_id }]
                    } else {
                        Vec::new()
                    }
                }
                Err(error) => {
                    state.reject_submission(error);
                    Vec::new()
                }
            }
        }
        // Transient errors reach the log through the engine; the user only
        // sees the check counter move.
        Msg::PollAttempted {
            ticket, attempt, ..
        } => {
            if state.is_current(ticket) {
                state.record_check(attempt);
            }
            Vec::new()
        }
        Msg::PollFinished { ticket, result } => {
            if state.is_current(ticket) {
                match result {
                    PollResult::Ready(fragment) => state.complete(fragment),
                    PollResult::TimedOut { attempts } => {
                        state.fail(FailureReason::TimedOut { attempts })
                    }
                }
            }
            Vec::new()
        }
        Msg::ResetClicked => cancel_polling(state.reset()),
        Msg::Teardown => cancel_polling(state.teardown()),
        Msg::NoticeDismissed => {
            state.dismiss_notice();
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn cancel_polling(ticket: Option<Ticket>) -> Vec<Effect> {
    ticket
        .map(|ticket| vec![Effect::CancelPolling { ticket }])
        .unwrap_or_default()
}

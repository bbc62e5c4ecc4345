//! Exhaustively explores short message sequences and checks the upload job
//! invariants after every transition.

use gpx_core::{
    update, AppState, AttemptOutcome, Effect, GpxFile, JobId, JobStatus, Msg, PollResult,
    SubmissionError, TrustedFragment,
};

const DEPTH: usize = 5;

fn alphabet() -> Vec<Msg> {
    let file = GpxFile::new("ride.gpx", b"<gpx></gpx>".to_vec());
    let ready = PollResult::Ready(TrustedFragment::from_job_engine("<div>map</div>"));
    vec![
        Msg::FileSelected(Some(file)),
        Msg::FileSelected(None),
        Msg::SubmitClicked,
        Msg::SubmissionFinished {
            ticket: 1,
            result: Ok(JobId::new("abc123")),
        },
        Msg::SubmissionFinished {
            ticket: 1,
            result: Err(SubmissionError::TransportFailure {
                cause: "boom".to_string(),
            }),
        },
        Msg::SubmissionFinished {
            ticket: 2,
            result: Ok(JobId::new("def456")),
        },
        Msg::PollAttempted {
            ticket: 1,
            attempt: 1,
            outcome: AttemptOutcome::Pending,
        },
        Msg::PollFinished {
            ticket: 1,
            result: ready.clone(),
        },
        Msg::PollFinished {
            ticket: 1,
            result: PollResult::TimedOut { attempts: 3 },
        },
        Msg::PollFinished {
            ticket: 2,
            result: ready,
        },
        Msg::ResetClicked,
        Msg::Teardown,
    ]
}

fn check_invariants(before: &AppState, msg: &Msg, after: &AppState, effects: &[Effect]) {
    let upload = after.upload();
    let status = upload.status();

    assert_eq!(
        upload.job_id().is_some(),
        matches!(
            status,
            JobStatus::Polling | JobStatus::Complete | JobStatus::Failed
        ),
        "job id presence disagrees with {status:?} after {msg:?}"
    );
    assert_eq!(
        upload.result().is_some(),
        status == JobStatus::Complete,
        "result presence disagrees with {status:?} after {msg:?}"
    );
    assert_eq!(
        upload.failure().is_some(),
        status == JobStatus::Failed,
        "failure presence disagrees with {status:?} after {msg:?}"
    );

    for effect in effects {
        match effect {
            Effect::SubmitUpload { .. } => {
                assert!(before.upload().can_submit(), "upload emitted from {before:?}");
                assert_eq!(status, JobStatus::Submitting);
            }
            Effect::StartPolling { job_id, .. } => {
                assert_eq!(before.upload().status(), JobStatus::Submitting);
                assert_eq!(upload.job_id(), Some(job_id));
            }
            Effect::CancelPolling { .. } => {
                assert_eq!(before.upload().status(), JobStatus::Polling);
            }
        }
    }

    if before.is_torn_down() {
        assert_eq!(before, after, "state changed after teardown via {msg:?}");
        assert!(effects.is_empty());
    }
}

fn explore(state: AppState, depth: usize, alphabet: &[Msg], visited: &mut usize) {
    if depth == 0 {
        return;
    }
    for msg in alphabet {
        let (next, effects) = update(state.clone(), msg.clone());
        check_invariants(&state, msg, &next, &effects);
        *visited += 1;
        explore(next, depth - 1, alphabet, visited);
    }
}

#[test]
fn invariants_hold_for_all_short_sequences() {
    let alphabet = alphabet();
    let mut visited = 0;
    explore(AppState::new(), DEPTH, &alphabet, &mut visited);
    assert!(visited > alphabet.len().pow(DEPTH as u32 - 1));
}

#[test]
fn at_most_one_upload_is_emitted_per_ticket() {
    let file = GpxFile::new("ride.gpx", b"<gpx></gpx>".to_vec());
    let (mut state, _) = update(AppState::new(), Msg::FileSelected(Some(file)));
    let mut uploads = 0;
    for _ in 0..10 {
        let (next, effects) = update(state, Msg::SubmitClicked);
        uploads += effects
            .iter()
            .filter(|effect| matches!(effect, Effect::SubmitUpload { .. }))
            .count();
        state = next;
    }
    assert_eq!(uploads, 1);
}

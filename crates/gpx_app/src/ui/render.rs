use gpx_core::{AppViewModel, FailureReason, JobStatus, Notice, RenderMode, TrustedFragment};

/// What the terminal should show for one view model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    Status(String),
    /// Blocking message the user has to acknowledge.
    Prompt(String),
    Diagnostic(String),
    ShowFragment(TrustedFragment),
}

pub fn render(view: &AppViewModel) -> Vec<UiCommand> {
    let mut cmds = vec![UiCommand::Status(status_line(view))];

    if let Some(notice) = view.notice {
        cmds.push(UiCommand::Prompt(notice_text(notice).to_string()));
    }
    if let Some(cause) = &view.last_error {
        cmds.push(UiCommand::Diagnostic(format!("Upload failed: {cause}")));
    }
    if let Some(FailureReason::TimedOut { attempts }) = &view.failure {
        cmds.push(UiCommand::Diagnostic(format!(
            "Map was not ready after {attempts} checks"
        )));
    }
    if let RenderMode::ResultReady(fragment) = &view.mode {
        cmds.push(UiCommand::ShowFragment(fragment.clone()));
    }

    cmds
}

fn status_line(view: &AppViewModel) -> String {
    let file = view.file_name.as_deref().unwrap_or("(none)");
    let job = view
        .job_id
        .as_ref()
        .map(|id| id.as_str())
        .unwrap_or("-");
    match (&view.mode, view.status) {
        (RenderMode::AwaitingSelection, JobStatus::Failed) => {
            format!("Job {job} failed | File: {file}")
        }
        (RenderMode::AwaitingSelection, _) if view.file_name.is_none() => {
            "Select a GPX file to upload".to_string()
        }
        (RenderMode::AwaitingSelection, _) => format!("Ready to upload {file}"),
        (RenderMode::AwaitingResult, JobStatus::Submitting) => format!("Uploading {file}..."),
        (RenderMode::AwaitingResult, _) => format!(
            "Waiting for map | Job: {job} | Checks: {}",
            view.checks
        ),
        (RenderMode::ResultReady(_), _) => format!("Map ready | Job: {job}"),
    }
}

fn notice_text(notice: Notice) -> &'static str {
    match notice {
        Notice::NoFileSelected => "Please select a file first.",
    }
}

/// Minimal HTML page around the job engine's fragment. The fragment is
/// inserted as-is.
pub fn page_shell(title: &str, fragment: &TrustedFragment) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_text(title),
        fragment.as_html()
    )
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

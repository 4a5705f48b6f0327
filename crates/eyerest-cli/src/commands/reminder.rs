use eyerest_core::{format_countdown, Config, Phase, Request, Response, Status};

use crate::app::App;

/// Print current status.
pub async fn status(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::start(&Config::load()?).await?;
    let response = app.dispatcher.dispatch(Request::GetStatus).await?;
    print_response(&app, &response, json)
}

/// Pause a running loop or resume a paused one.
pub async fn toggle(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::start(&Config::load()?).await?;
    let response = app.dispatcher.dispatch(Request::ToggleRunning).await?;
    print_response(&app, &response, json)
}

/// Fire a reminder right now.
pub async fn test() -> Result<(), Box<dyn std::error::Error>> {
    let app = App::start(&Config::load()?).await?;
    let response = app.dispatcher.dispatch(Request::TestReminder).await?;
    print_response(&app, &response, true)
}

pub(crate) fn print_response(
    app: &App,
    response: &Response,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match response {
        Response::Status(status) if !json => {
            println!("{}", describe(status, app.engine.now_ms()));
        }
        other => println!("{}", serde_json::to_string(other)?),
    }
    Ok(())
}

/// Human-readable status line(s).
pub(crate) fn describe(status: &Status, now_ms: u64) -> String {
    let settings = &status.settings;
    let cadence = format!(
        "every {} min, {} s break",
        settings.interval_minutes, settings.break_seconds
    );
    let phase = status.phase(now_ms);
    let headline = match phase {
        Phase::BreakActive { remaining_ms, .. } => format!(
            "Break: {} left ({:.0}%), look at something 20 feet away",
            format_countdown(remaining_ms),
            phase.remaining_pct()
        ),
        Phase::Waiting { remaining_ms, .. } => format!(
            "Running: next reminder in {} ({cadence})",
            format_countdown(remaining_ms)
        ),
        Phase::Pending => format!("Running: next reminder pending ({cadence})"),
        Phase::Paused => format!("Paused ({cadence})"),
    };

    match phase {
        Phase::BreakActive { .. } if !status.running => format!("{headline}\nLoop paused"),
        _ => headline,
    }
}

//! Inspection choreography.
//!
//! Runs the fixed transition sequence against a live session: initial
//! load, start-to-question transition, full refresh, rapid transitions,
//! then the diagnostic report and the operator hold. Progress lines go
//! to stdout so the operator can follow along while watching the page.

use anyhow::Result;
use colored::Colorize;
use std::io::Write as _;
use std::time::Duration;

use crate::config::{Config, SCREENSHOT_NAMES};
use crate::session::{InspectionSession, SessionError};

/// Launch a session, run the choreography, report, and hold for the
/// operator. The session is closed on every exit path, success or not,
/// before the outcome is propagated.
pub async fn run(config: &Config) -> Result<()> {
    let session = InspectionSession::launch(config).await?;

    let outcome = choreograph(&session, config).await;

    let outcome = match outcome {
        Ok(()) => {
            report(&session, config).await;
            wait_for_operator().await
        }
        Err(error) => Err(error.into()),
    };

    session.close().await;
    outcome
}

/// The fixed transition sequence. Any failure aborts the remaining
/// phases; nothing here is retried.
async fn choreograph(session: &InspectionSession, config: &Config) -> Result<(), SessionError> {
    let [start_shot, question_shot, refresh_shot] = config.screenshot_paths();
    let observe = Duration::from_millis(config.pacing.observe_ms);
    let transition = Duration::from_millis(config.pacing.transition_ms);

    println!("{}", "1. Loading initial page...".bold());
    session.navigate(&config.target_url).await?;
    session.capture(&start_shot).await?;
    println!("   {} start page loaded", "✓".green());
    tokio::time::sleep(observe).await;

    println!("{}", "2. Page transition (start -> question)...".bold());
    let start_button = session.find_labeled_button(&config.start_label).await?;
    start_button.click().await?;
    session.wait_for_quiescence().await?;
    session.capture(&question_shot).await?;
    println!("   {} question page loaded", "✓".green());
    tokio::time::sleep(observe).await;

    println!("{}", "3. Page refresh...".bold());
    session.reload().await?;
    session.capture(&refresh_shot).await?;
    println!("   {} page refreshed", "✓".green());
    tokio::time::sleep(observe).await;

    println!("{}", "4. Rapid transitions...".bold());
    session.navigate(&config.target_url).await?;
    for iteration in 1..=config.rapid_iterations {
        println!("   transition {iteration}/{}...", config.rapid_iterations);
        let start_button = session.find_labeled_button(&config.start_label).await?;
        start_button.click().await?;
        tokio::time::sleep(transition).await;

        let option_button = session.first_button().await?;
        option_button.click().await?;
        tokio::time::sleep(transition).await;
    }

    Ok(())
}

/// Print the diagnostic report: every console message the page emitted,
/// in arrival order, followed by where the milestone screenshots landed.
async fn report(session: &InspectionSession, config: &Config) {
    let records = session.diagnostics().await;

    println!();
    println!("{}", "5. Console messages:".bold());
    if records.is_empty() {
        println!("  (none)");
    } else {
        for record in &records {
            println!("  {record}");
        }
    }

    println!();
    println!("{}", "Screenshots:".bold());
    for name in SCREENSHOT_NAMES {
        println!("  {}", config.output_dir.join(name).display());
    }
}

/// Block until the operator presses Enter. The hold is indefinite; the
/// whole point is letting a human stare at the page for as long as they
/// need.
async fn wait_for_operator() -> Result<()> {
    print!("\n{}", "Press Enter to close the browser...".bold());
    std::io::stdout().flush()?;

    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| ())
    })
    .await??;

    Ok(())
}

use crate::App;
use crate::services::scheduler::TaskKind;

/// Runs one scheduled task right away, outside the daemon.
pub async fn cmd_run_task(app: &App, kind: TaskKind) -> anyhow::Result<()> {
    println!("Running {}...", kind.job_name());

    match app.scheduler.run_task(kind).await {
        Some(snatched) => println!("Snatched {snatched} result(s)"),
        None => println!("{} is already running", kind.job_name()),
    }

    Ok(())
}

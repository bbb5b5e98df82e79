use crate::App;

pub async fn cmd_history(app: &App, limit: usize) -> anyhow::Result<()> {
    let entries = app.history.entries().await;

    if entries.is_empty() {
        println!("No snatch history.");
        return Ok(());
    }

    let recent: Vec<_> = entries.iter().rev().take(limit).collect();
    println!("Recent Snatches (last {}):", recent.len());
    println!("{:-<70}", "");

    for entry in recent {
        let title = app
            .library
            .get(entry.show_id)
            .map_or_else(|| format!("Unknown (ID: {})", entry.show_id), |s| s.name.clone());
        println!("• {} - {} [{}]", title, entry.episode_ref().key, entry.action);
        println!(
            "  {} | {} | {} | {}",
            entry.resource,
            entry.quality,
            entry.provider,
            entry.date.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

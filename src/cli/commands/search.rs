use anyhow::Context;

use crate::App;
use crate::domain::{EpisodeKey, ShowId};

pub async fn cmd_search_episode(
    app: &App,
    show_id: u32,
    season: u32,
    episode: u32,
    manual: bool,
) -> anyhow::Result<()> {
    let show = app
        .library
        .get(ShowId::new(show_id))
        .with_context(|| format!("No show with ID {show_id} in the library"))?;
    let key = EpisodeKey::new(season, episode);
    let episode = show
        .episode(key)
        .await
        .with_context(|| format!("{} has no episode {key}", show.name))?;

    println!("Searching for {} {key}...", show.name);

    if app.tasks.search_episode(&show, &episode, manual, &app.cancel).await {
        println!("Snatched a release for {} {key}", show.name);
    } else {
        println!("Nothing snatched for {} {key}", show.name);
    }

    Ok(())
}

pub async fn cmd_search_season(app: &App, show_id: u32, season: u32) -> anyhow::Result<()> {
    let show = app
        .library
        .get(ShowId::new(show_id))
        .with_context(|| format!("No show with ID {show_id} in the library"))?;
    if !show.seasons().await.contains(&season) {
        anyhow::bail!("{} has no season {season}", show.name);
    }

    println!("Searching for {} season {season}...", show.name);

    let snatched = app.tasks.search_season(&show, season, &app.cancel).await;
    println!("Snatched {snatched} result(s)");

    Ok(())
}

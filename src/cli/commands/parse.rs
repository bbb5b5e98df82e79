use crate::parser::NameParser;
use crate::quality::{name_quality, quality_from_file_name};

pub fn cmd_parse(name: &str, file: bool) -> anyhow::Result<()> {
    let parsed = NameParser::new(file).parse(name)?;
    let quality = if file {
        quality_from_file_name(name)
    } else {
        name_quality(name)
    };

    println!("{name}");
    println!("{:-<60}", "");
    println!(
        "  Series:  {}",
        parsed.series_name.as_deref().unwrap_or("(none)")
    );
    match (parsed.season, parsed.air_date) {
        (_, Some(date)) if parsed.is_air_by_date() => println!("  Aired:   {date}"),
        (Some(season), _) => println!("  Season:  {season}"),
        _ => println!("  Season:  (none)"),
    }
    if parsed.is_season_pack() {
        println!("  Episodes: whole season");
    } else if !parsed.episodes.is_empty() {
        let episodes: Vec<String> = parsed.episodes.iter().map(u32::to_string).collect();
        println!("  Episodes: {}", episodes.join(", "));
    }
    if let Some(extra) = &parsed.extra_info {
        println!("  Extra:   {extra}");
    }
    println!(
        "  Group:   {}",
        parsed.release_group.as_deref().unwrap_or("(none)")
    );
    println!("  Quality: {quality}");

    Ok(())
}

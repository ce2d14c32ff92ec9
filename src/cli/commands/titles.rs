//! Titles command implementation.

use crate::cli::TitlesCommands;
use crate::config::FileConfig;
use crate::error::{Error, Result};
use crate::model::{Aka, Crew, Episode, Person, Rating, Title};
use crate::storage::{SqliteStorage, TitleFilter};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct TitleListOutput {
    count: usize,
    titles: Vec<Title>,
}

#[derive(Serialize)]
struct TitleShowOutput {
    title: Title,
    url: String,
    rating: Option<Rating>,
    akas: Vec<Aka>,
    crew: Vec<Crew>,
    people: Vec<Person>,
    episodes: Vec<Episode>,
}

/// Execute titles commands.
///
/// # Errors
///
/// Returns an error if the database is missing, the title does not exist,
/// or a query fails.
pub fn execute(command: &TitlesCommands, db: Option<&PathBuf>, json: bool) -> Result<()> {
    let file = FileConfig::load()?;
    let storage = super::open_existing(db, &file)?;

    match command {
        TitlesCommands::List {
            title_type,
            adult,
            genre,
            year,
            search,
            limit,
        } => {
            let filter = TitleFilter {
                title_type: title_type.clone(),
                is_adult: *adult,
                genre: genre.clone(),
                year: *year,
                search: search.clone(),
                limit: Some(*limit),
            };
            list(&storage, &filter, json)
        }
        TitlesCommands::Show { id } => show(&storage, id, json),
    }
}

fn list(storage: &SqliteStorage, filter: &TitleFilter, json: bool) -> Result<()> {
    if let Some(ref title_type) = filter.title_type {
        if !storage.title_types()?.contains(title_type) {
            return Err(Error::InvalidType(title_type.clone()));
        }
    }
    let titles = storage.list_titles(filter)?;

    if crate::is_csv() {
        println!("title_id,type,primary_title,premiered,ended,runtime_minutes,genres");
        for t in &titles {
            println!(
                "{},{},{},{},{},{},{}",
                t.title_id,
                t.title_type.as_deref().unwrap_or(""),
                crate::csv_escape(&t.primary_title),
                t.premiered.map(|y| y.to_string()).unwrap_or_default(),
                t.ended.map(|y| y.to_string()).unwrap_or_default(),
                t.runtime_minutes.map(|m| m.to_string()).unwrap_or_default(),
                crate::csv_escape(&t.genres)
            );
        }
    } else if json {
        let output = TitleListOutput {
            count: titles.len(),
            titles,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if titles.is_empty() {
        println!("No titles found.");
    } else {
        println!("Titles ({} found):", titles.len());
        println!();
        for t in &titles {
            println!("  {t}");
        }
    }
    Ok(())
}

fn show(storage: &SqliteStorage, id: &str, json: bool) -> Result<()> {
    let title = storage
        .get_title(id)?
        .filter(|t| !t.is_placeholder())
        .ok_or_else(|| Error::TitleNotFound { id: id.to_string() })?;
    let rating = storage.get_rating(id)?;
    let akas = storage.list_akas(id)?;
    let crew = storage.list_crew(id)?;
    let episodes = storage.list_episodes(id)?;
    let mut people = Vec::with_capacity(crew.len());
    for person_id in crew.iter().filter_map(|c| c.person_id.as_deref()) {
        if let Some(person) = storage.get_person(person_id)? {
            people.push(person);
        }
    }

    if json {
        let output = TitleShowOutput {
            url: title.imdb_url(),
            title,
            rating,
            akas,
            crew,
            people,
            episodes,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{}", title.primary_title.bold());
    if title.original_title != title.primary_title {
        println!("  Original: {}", title.original_title);
    }
    println!("  ID:       {}", title.title_id);
    println!("  Type:     {}", title.title_type.as_deref().unwrap_or("unknown"));
    let years = title.year_list();
    match (years.first(), years.last()) {
        (Some(first), Some(last)) if first != last => println!("  Years:    {first}-{last}"),
        (Some(first), _) => println!("  Year:     {first}"),
        _ => {}
    }
    if let Some(minutes) = title.runtime_minutes {
        println!("  Runtime:  {minutes} min");
    }
    let genres = title.genre_list();
    if !genres.is_empty() {
        println!("  Genres:   {}", genres.join(", "));
    }
    if let Some(ref r) = rating {
        println!("  {r}");
    }
    println!("  {}", title.imdb_url().dimmed());

    if !akas.is_empty() {
        println!();
        println!("{}", "Also known as".cyan().bold());
        for aka in &akas {
            println!("  {aka}");
        }
    }
    if !crew.is_empty() {
        println!();
        println!("{}", "Crew".cyan().bold());
        for c in &crew {
            println!("  {c}");
            let person = people
                .iter()
                .find(|p| c.person_id.as_deref() == Some(p.person_id.as_str()));
            if let Some(p) = person.filter(|p| p.name != crate::tsv::registry::PLACEHOLDER) {
                println!("      {}", p.to_string().dimmed());
            }
        }
    }
    if !episodes.is_empty() {
        println!();
        println!("{} ({})", "Episodes".cyan().bold(), episodes.len());
        let ids: Vec<String> = episodes.iter().map(|e| e.episode_title_id.clone()).collect();
        let titles = storage.get_titles(&ids)?;
        for (episode, t) in episodes.iter().zip(&titles) {
            let name = if t.is_placeholder() {
                &t.title_id
            } else {
                &t.primary_title
            };
            match (episode.season_number, episode.episode_number) {
                (Some(s), Some(e)) => println!("  S{s:02}E{e:02} {name}"),
                _ => println!("  {name}"),
            }
        }
    }
    Ok(())
}

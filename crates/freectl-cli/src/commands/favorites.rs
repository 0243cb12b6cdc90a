//! `freectl favorites` - manage pinned links.

use anyhow::Result;
use colored::Colorize;
use freectl_core::{Favorite, FavoritesStore};

use crate::cli::FavoritesCommands;

pub fn run(command: &FavoritesCommands) -> Result<()> {
    let store = FavoritesStore::new()?;
    match command {
        FavoritesCommands::List => {
            let favorites = store.list()?;
            if favorites.is_empty() {
                println!("No favorites yet.");
                return Ok(());
            }
            for favorite in &favorites {
                println!(
                    "{} {}{}",
                    favorite.name.bold(),
                    favorite.link.blue(),
                    favorite
                        .category
                        .as_deref()
                        .map(|c| format!(" [{c}]").dimmed().to_string())
                        .unwrap_or_default()
                );
            }
        },
        FavoritesCommands::Add {
            link,
            name,
            description,
            category,
            source,
        } => {
            store.add(Favorite {
                link: link.clone(),
                name: name.clone(),
                description: description.clone(),
                category: category.clone(),
                source: source.clone(),
            })?;
            println!("{} {link}", "Pinned".green().bold());
        },
        FavoritesCommands::Remove { link } => {
            store.remove(link)?;
            println!("{} {link}", "Unpinned".yellow().bold());
        },
    }
    Ok(())
}

// UI layer: the top-level program flow. Yes/No questions and all game
// choices go through the arrow-key `ChoiceMenu`; the player's name is read
// with `dialoguer` and catalog lookups show an `indicatif` spinner.

use crate::api::{Catalog, CatalogClient, Product};
use crate::config::Config;
use crate::error::MenuError;
use crate::game::{GameSettings, ShoppingGame};
use crate::highscore::{Highscore, HighscoreStore};
use crate::input::InputChannel;
use crate::menu::ChoiceMenu;
use anyhow::Result;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write as _;
use std::thread;
use std::time::Duration;
use tracing::warn;

const YES_NO: [&str; 2] = ["Yes", "No"];
const YES: usize = 0;

/// Run the whole program: intro, games until the player stops, then the
/// optional high-score table.
pub fn main_menu(config: &Config, catalog: CatalogClient) -> Result<()> {
    let menu = ChoiceMenu::new(InputChannel::terminal()).max_label_width(config.label_width);
    let store = HighscoreStore::new(&config.highscore_file);
    let game = ShoppingGame::new(SpinnerCatalog { inner: catalog }, GameSettings::default());
    let mut rng = rand::thread_rng();

    if !config.skip_intro {
        show_welcome_text(config.reading_time);
        println!("Would you like some instructions?");
        if menu.present(&YES_NO)?.index == YES {
            show_instructions(config.reading_time);
        }
    }

    println!("Would you like to start a new game?");
    while menu.present(&YES_NO)?.index == YES {
        match game.play(&menu, &mut rng) {
            Ok(outcome) => {
                println!("Your cart is worth €{:.2}", outcome.score);
                record_score(&store, outcome.score)?;
            }
            // Keyboard trouble ends the program; catalog trouble only the game.
            Err(e) if e.downcast_ref::<MenuError>().is_some() => return Err(e),
            Err(e) => {
                warn!(error = %e, "game aborted");
                println!("The game was aborted: {}", e);
            }
        }
        println!("Would you like to play again?");
    }

    println!("Do you want to look at the current highscores?");
    if menu.present(&YES_NO)?.index == YES {
        match store.load() {
            Ok(entries) => print!("{}", format_highscore_table(&entries)),
            Err(e) => println!("Could not read highscores: {}", e),
        }
    }

    println!("Thank you for playing!\nGoodbye!");
    Ok(())
}

/// Ask for the player's name and store the score.
fn record_score(store: &HighscoreStore, score: f64) -> Result<()> {
    let name: String = Input::new()
        .with_prompt("Your name for the highscore table")
        .interact_text()?;
    match store.add(Highscore { name, score }) {
        Ok(_) => println!("Score saved."),
        Err(e) => println!("Could not save your score: {}", e),
    }
    Ok(())
}

/// The high-score table as printed to the console, blank line included.
pub fn format_highscore_table(entries: &[Highscore]) -> String {
    let mut table = format!("{:<12} {:<8}\n", "NAME", "SCORE");
    for entry in entries {
        let _ = writeln!(table, "{:<12} {:<8.2}", entry.name, entry.score);
    }
    table.push('\n');
    table
}

fn show_welcome_text(reading_time: Duration) {
    print_multiple_lines(
        &[
            "Welcome to Totally Accurate Shopping Simulator (winkel-TASS)!",
            "You are going on a shopping spree with limited time.",
            "Your objective: get the highest value products in your cart.",
            "Good luck!",
        ],
        reading_time,
    );
}

fn show_instructions(reading_time: Duration) {
    print_multiple_lines(
        &[
            "This game is all about making the right choices.",
            "When you get a selection of choices, use the left and right arrow keys to navigate.",
            "Use enter to select an option.",
        ],
        reading_time,
    );
}

/// Print one line at a time with a pause in between, framed by blank lines.
fn print_multiple_lines(lines: &[&str], reading_time: Duration) {
    println!();
    for line in lines {
        println!("{}", line);
        thread::sleep(reading_time);
    }
    println!();
}

/// Wraps a catalog so every lookup shows a spinner while it runs.
struct SpinnerCatalog<C> {
    inner: C,
}

impl<C: Catalog> Catalog for SpinnerCatalog<C> {
    fn categories(&self) -> Result<Vec<String>> {
        with_spinner("Browsing the aisles...", || self.inner.categories())
    }

    fn products_in_category(&self, category: &str) -> Result<Vec<Product>> {
        with_spinner("Looking at the shelves...", || {
            self.inner.products_in_category(category)
        })
    }
}

fn with_spinner<T>(message: &'static str, lookup: impl FnOnce() -> Result<T>) -> Result<T> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    let result = lookup();
    spinner.finish_and_clear();
    result
}

// One round-based shopping game: pick a category, pick a product, repeat
// until the countdown runs out. Every catalog lookup costs time; the score
// is the total price of everything in the cart.

use crate::api::{Catalog, Product};
use crate::menu::ChoiceMenu;
use anyhow::{bail, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::io::Write;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct GameSettings {
    /// Seconds on the clock at the start of a game.
    pub countdown: u32,
    /// Seconds each catalog lookup costs.
    pub time_per_action: u32,
    /// How many categories/products are offered per menu.
    pub choices_per_menu: usize,
}

impl Default for GameSettings {
    fn default() -> Self {
        GameSettings {
            countdown: 60,
            time_per_action: 5,
            choices_per_menu: 3,
        }
    }
}

/// What a finished game left in the cart.
#[derive(Debug, Clone, PartialEq)]
pub struct GameOutcome {
    pub cart: Vec<Product>,
    pub score: f64,
}

impl GameOutcome {
    fn new(cart: Vec<Product>) -> Self {
        let score = cart.iter().map(|p| p.price).sum();
        GameOutcome { cart, score }
    }
}

pub struct ShoppingGame<C> {
    catalog: C,
    settings: GameSettings,
}

impl<C: Catalog> ShoppingGame<C> {
    pub fn new(catalog: C, settings: GameSettings) -> Self {
        ShoppingGame { catalog, settings }
    }

    /// Play rounds until the clock hits zero.
    pub fn play<W, R>(&self, menu: &ChoiceMenu<W>, rng: &mut R) -> Result<GameOutcome>
    where
        W: Write + Send + 'static,
        R: Rng + ?Sized,
    {
        let mut countdown = self.settings.countdown;
        let mut cart = Vec::new();
        while countdown > 0 {
            println!("You have {} seconds left.", countdown);
            let category = self.choose_category(menu, rng, &mut countdown)?;
            let product = self.choose_product(menu, rng, &category, &mut countdown)?;
            println!("You chose {}", product.title);
            println!("It costs €{:.2}", product.price);
            cart.push(product);
        }
        println!("Time's up!");

        let outcome = GameOutcome::new(cart);
        info!(items = outcome.cart.len(), score = outcome.score, "game finished");
        Ok(outcome)
    }

    fn choose_category<W, R>(
        &self,
        menu: &ChoiceMenu<W>,
        rng: &mut R,
        countdown: &mut u32,
    ) -> Result<String>
    where
        W: Write + Send + 'static,
        R: Rng + ?Sized,
    {
        self.spend(countdown);
        let categories = self.catalog.categories()?;
        if categories.is_empty() {
            bail!("The catalog has no categories");
        }
        let offered = sample(&categories, self.settings.choices_per_menu, rng);
        Ok(menu.present(&offered)?.label)
    }

    fn choose_product<W, R>(
        &self,
        menu: &ChoiceMenu<W>,
        rng: &mut R,
        category: &str,
        countdown: &mut u32,
    ) -> Result<Product>
    where
        W: Write + Send + 'static,
        R: Rng + ?Sized,
    {
        self.spend(countdown);
        let products = self.catalog.products_in_category(category)?;
        if products.is_empty() {
            bail!("No products in category {:?}", category);
        }
        let mut offered = sample(&products, self.settings.choices_per_menu, rng);
        let titles: Vec<&str> = offered.iter().map(|p| p.title.as_str()).collect();
        let index = menu.present(&titles)?.index;
        Ok(offered.swap_remove(index))
    }

    fn spend(&self, countdown: &mut u32) {
        *countdown = countdown.saturating_sub(self.settings.time_per_action);
        debug!(remaining = *countdown, "catalog lookup");
    }
}

/// Up to `amount` distinct items in random order.
fn sample<T: Clone, R: Rng + ?Sized>(items: &[T], amount: usize, rng: &mut R) -> Vec<T> {
    items.choose_multiple(rng, amount).cloned().collect()
}

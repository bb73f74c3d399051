// Library root
// -----------
// Totally Accurate Shopping Simulator: a console trivia game where the
// player shops against the clock, picking categories and products from a
// public catalog with the arrow keys.
//
// Module responsibilities:
// - `menu`: the arrow-key choice menu (`ChoiceMenu::present`), the only
//   way the game asks the player anything.
// - `input`: key sources and the exclusive, scoped key bindings the menu
//   holds while it is on screen.
// - `error`: errors the menu reports to its caller.
// - `api`: HTTP access to the product catalog.
// - `game`: rounds, countdown and score.
// - `highscore`: the JSON high-score file.
// - `config`: environment-driven settings.
// - `ui`: program flow tying it all together for the binary.
pub mod api;
pub mod config;
pub mod error;
pub mod game;
pub mod highscore;
pub mod input;
pub mod menu;
pub mod ui;

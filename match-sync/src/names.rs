/// Default player names for people who don't pick one
use markov_namegen::{CharacterChainGenerator, RandomTextGenerator};

/// Training set: names of arcade-era heroes and a few falling-block puns
const TRAINING_NAMES: &[&str] = &[
    "Alexey", "Vadim", "Dmitry", "Pajitnov", "Gerasimov", "Pavlovsky",
    "Blocky", "Stacker", "Tetra", "Quadro", "Lineo", "Brick",
    "Kaito", "Akira", "Hiro", "Yuki", "Sora", "Ren",
    "Nova", "Pixel", "Vector", "Sprite", "Arcade", "Joy",
    "Orion", "Luna", "Atlas", "Selene", "Aurora", "Phoenix",
];

fn create_name_generator() -> CharacterChainGenerator {
    CharacterChainGenerator::builder()
        .with_order(2)
        .with_prior(0.01)
        .train(TRAINING_NAMES.iter().copied())
        .build()
}

/// Generate a short pronounceable player name
///
/// Names are alphanumeric and at most 12 characters, so they fit the
/// player column of the score table.
pub fn generate_player_name() -> String {
    let mut generator = create_name_generator();
    loop {
        let name = generator.generate_one();
        if !name.is_empty() && name.len() <= 12 && name.chars().all(|c| c.is_alphanumeric()) {
            return name;
        }
    }
}

/// Player name followed by a number, e.g. "Tetra_42"
pub fn generate_guest_name() -> String {
    let suffix: u16 = rand::random::<u16>() % 1000;
    format!("{}_{}", generate_player_name(), suffix)
}

use crate::models::{GameMode, StudyTable};

const NO_TABLE_NOTE: &str = "Study mode not available for this selection.";

/// Reference table shown in study mode.
pub fn study_table(mode: GameMode) -> StudyTable {
    let entries: Vec<String> = match mode {
        GameMode::Multiplication => (1..=20)
            .flat_map(|i| (1..=20).map(move |j| format!("{} × {} = {}", i, j, i * j)))
            .collect(),
        GameMode::Squares => (1..=30).map(|n| format!("{}² = {}", n, n * n)).collect(),
        GameMode::Cubes => (1..=15)
            .map(|n| format!("{}³ = {}", n, n * n * n))
            .collect(),
        GameMode::Addition | GameMode::Subtraction => Vec::new(),
    };

    let note = entries.is_empty().then(|| NO_TABLE_NOTE.to_string());

    StudyTable {
        game_mode: mode,
        entries,
        note,
    }
}

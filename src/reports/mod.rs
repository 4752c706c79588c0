use cipherforge::cipher::Cipher;
use cipherforge::error::CfResult;
use cipherforge::model::{ArrayModel, LanguageModel};
use cipherforge::optimizer::EpochReport;
use cipherforge::solution::CipherSolution;
use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use std::path::Path;

// Plaintext wider than this is cut in the per-epoch line
const PREVIEW_WIDTH: usize = 60;

pub fn print_cipher_grid(cipher: &Cipher) {
    println!(
        "\nCipher: {} ({}x{}, {} distinct symbols)",
        cipher.name(),
        cipher.rows(),
        cipher.columns(),
        cipher.symbol_count()
    );
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);

    for row in cipher.ciphertext().chunks(cipher.columns().max(1)) {
        let cells: Vec<Cell> = row
            .iter()
            .map(|s| Cell::new(s).set_alignment(CellAlignment::Center))
            .collect();
        table.add_row(cells);
    }
    println!("{}", table);
}

pub fn print_epoch_line(report: &EpochReport) {
    let preview: String = report.plaintext.chars().take(PREVIEW_WIDTH).collect();
    let proximity = report
        .known_solution_proximity
        .map(|p| format!(" | {:.1}% correct", p * 100.0))
        .unwrap_or_default();
    println!(
        "   Epoch {:>3}/{:<3} | score {:>9.4} | {:>5}/{:<6} accepted | {:>6}ms{} | {}",
        report.epoch,
        report.epochs,
        report.score,
        report.accepted,
        report.proposals,
        report.elapsed_ms,
        proximity,
        preview
    );
}

pub fn print_solution_report(solution: &CipherSolution) -> CfResult<()> {
    let cipher = solution.cipher();

    println!("\n🏆 Best Solution");
    let mut summary = Table::new();
    summary
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    summary.add_row(vec![
        Cell::new("Score").add_attribute(Attribute::Bold),
        Cell::new("Log Prob"),
        Cell::new("Mean"),
        Cell::new("IoC"),
        Cell::new("Correct").fg(Color::Green),
    ]);
    for i in 1..=4 {
        if let Some(col) = summary.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    let correct = if cipher.has_known_solution() {
        format!("{:.1}%", solution.evaluate_known_solution()? * 100.0)
    } else {
        "-".to_string()
    };
    summary.add_row(vec![
        Cell::new(format!("{:.4}", solution.score())).fg(Color::Cyan),
        Cell::new(format!("{:.2}", solution.log_probability())),
        Cell::new(format!("{:.4}", solution.mean_log_probability())),
        Cell::new(format!("{:.5}", solution.index_of_coincidence())),
        Cell::new(correct).fg(Color::Green),
    ]);
    println!("{}", summary);

    let mut mapping = Table::new();
    mapping
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    mapping.set_header(vec![
        Cell::new("Symbol").add_attribute(Attribute::Bold),
        Cell::new("Letter").add_attribute(Attribute::Bold),
        Cell::new("Count"),
        Cell::new("Known"),
    ]);
    let known = cipher.known_solution();
    for (id, symbol) in cipher.symbols().iter().enumerate() {
        let letter = solution
            .letter(id)
            .map(|b| (b as char).to_string())
            .unwrap_or_else(|| "?".to_string());
        let expected = known.and_then(|k| k.get(symbol)).copied();
        let mut known_cell = Cell::new(expected.map(String::from).unwrap_or_default());
        if let Some(e) = expected {
            known_cell = if Some(e) == solution.letter(id).map(char::from) {
                known_cell.fg(Color::Green)
            } else {
                known_cell.fg(Color::Red)
            };
        }
        mapping.add_row(vec![
            Cell::new(symbol).set_alignment(CellAlignment::Center),
            Cell::new(letter).set_alignment(CellAlignment::Center),
            Cell::new(cipher.indices_of(id).len()).set_alignment(CellAlignment::Right),
            known_cell.set_alignment(CellAlignment::Center),
        ]);
    }
    println!("{}", mapping);

    println!("\nPlaintext:");
    let plaintext = solution.plaintext();
    for row in plaintext.chunks(cipher.columns().max(1)) {
        println!("   {}", String::from_utf8_lossy(row));
    }
    Ok(())
}

pub fn print_model_summary(model: &ArrayModel, cache_path: &Path) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Order").add_attribute(Attribute::Bold),
        Cell::new("Slots"),
        Cell::new("Populated").fg(Color::Green),
        Cell::new("Unigrams"),
        Cell::new("Unknown P"),
        Cell::new("Cache"),
    ]);

    let slots = model.log_probabilities().len();
    table.add_row(vec![
        Cell::new(model.order()),
        Cell::new(slots),
        Cell::new(format!(
            "{} ({:.2}%)",
            model.populated_count(),
            model.populated_count() as f64 / slots.max(1) as f64 * 100.0
        ))
        .fg(Color::Green),
        Cell::new(model.first_order_nodes().len()),
        Cell::new(format!("{:e}", model.unknown_probability())),
        Cell::new(cache_path.display()),
    ]);
    for i in 0..=4 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
    println!("\n{}", table);
}

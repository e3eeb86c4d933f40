use super::ui;
use crate::core::config::AppConfig;
use crate::store::{RateSample, RateStore, TIMESTAMP_FORMAT};
use anyhow::Result;
use comfy_table::{Cell, CellAlignment};

pub fn history_table(samples: &[RateSample], config: &AppConfig) -> String {
    let primary_name = &config.sources.official.name;
    let secondary_name = &config.sources.p2p.name;

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Date"),
        ui::header_cell(primary_name),
        ui::header_cell(&format!("Δ {primary_name}")),
        ui::header_cell(secondary_name),
        ui::header_cell(&format!("Δ {secondary_name}")),
    ]);

    for sample in samples {
        table.add_row(vec![
            Cell::new(sample.id).set_alignment(CellAlignment::Right),
            Cell::new(sample.timestamp.format(TIMESTAMP_FORMAT)),
            Cell::new(format!("{:.4}", sample.primary_rate)).set_alignment(CellAlignment::Right),
            ui::format_change_cell(sample.primary_diff),
            ui::format_optional_cell(sample.secondary_rate, |r| format!("{r:.4}")),
            ui::format_change_cell(sample.secondary_diff),
        ]);
    }

    table.to_string()
}

/// Prints the most recent samples, newest first.
pub fn show_history(store: &RateStore, config: &AppConfig, limit: usize) -> Result<()> {
    let samples = store.recent(limit)?;
    if samples.is_empty() {
        println!("{}", ui::style_text("No rates recorded yet", ui::StyleType::Subtle));
        return Ok(());
    }

    println!("{}\n", ui::style_text("Rate history", ui::StyleType::Title));
    println!("{}", history_table(&samples, config));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_table_lists_samples() -> Result<()> {
        let store = RateStore::open_in_memory()?;
        store.log_rates(36.5, Some(40.0));
        store.log_rates(36.75, None);

        let table = history_table(&store.recent(10)?, &AppConfig::default());
        assert!(table.contains("Δ BCV"));
        assert!(table.contains("36.7500"));
        assert!(table.contains("+0.2500"));
        assert!(table.contains("40.0000"));
        assert!(table.contains("N/A"));
        assert!(table.contains("-40.0000"));
        Ok(())
    }
}

use crate::scheduler::RateSnapshot;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    OfficialRate,
    MarketRate,
    Positive,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::OfficialRate => style(text).green().bold(),
        StyleType::MarketRate => style(text).yellow().bold(),
        StyleType::Positive => style(text).cyan().bold(),
        StyleType::Error => style(text).red().bold(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Renders one snapshot as a block of colored lines.
pub fn render_snapshot(snapshot: &RateSnapshot) -> String {
    let primary_style = if snapshot.primary_valid {
        StyleType::OfficialRate
    } else {
        StyleType::Error
    };
    let secondary_style = if snapshot.secondary_valid {
        StyleType::MarketRate
    } else {
        StyleType::Error
    };
    let spread_style = if snapshot.spread_positive {
        StyleType::Positive
    } else {
        StyleType::Error
    };
    let spread_label = format!("{} - {}", snapshot.secondary_name, snapshot.primary_name);

    format!(
        "{:<16}{}\n{:<16}{}\n{:<16}{}\n{}",
        snapshot.primary_name,
        style_text(&snapshot.primary_text, primary_style),
        snapshot.secondary_name,
        style_text(&snapshot.secondary_text, secondary_style),
        spread_label,
        style_text(&snapshot.spread_text, spread_style),
        style_text(&snapshot.status, StyleType::Subtle),
    )
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Formats an `Option<T>` into a `Cell`. `None` is displayed as "N/A".
pub fn format_optional_cell<T>(value: Option<T>, format_fn: impl Fn(T) -> String) -> Cell {
    value.map_or(
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
        |v| Cell::new(format_fn(v)).set_alignment(CellAlignment::Right),
    )
}

/// Formats a signed change, green when rising and red when falling.
pub fn format_change_cell(value: f64) -> Cell {
    let cell = Cell::new(format!("{value:+.4}")).set_alignment(CellAlignment::Right);
    if value > 0.0 {
        cell.fg(Color::Green)
    } else if value < 0.0 {
        cell.fg(Color::Red)
    } else {
        cell.fg(Color::DarkGrey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::RefreshKind;

    fn snapshot() -> RateSnapshot {
        RateSnapshot {
            refresh: RefreshKind::Full,
            primary_name: "BCV".to_string(),
            secondary_name: "USDT".to_string(),
            primary_text: "36.5000".to_string(),
            secondary_text: "00.0000".to_string(),
            spread_text: "-36.5000".to_string(),
            status: "BCV UPDATED: 13:02 (unchanged) | USDT FAILED: NETWORK_FAIL".to_string(),
            primary_valid: true,
            secondary_valid: false,
            spread_positive: false,
        }
    }

    #[test]
    fn test_render_snapshot_contains_all_values() {
        let rendered = render_snapshot(&snapshot());
        assert!(rendered.contains("36.5000"));
        assert!(rendered.contains("00.0000"));
        assert!(rendered.contains("USDT - BCV"));
        assert!(rendered.contains("-36.5000"));
        assert!(rendered.contains("USDT FAILED: NETWORK_FAIL"));
        assert_eq!(rendered.lines().count(), 4);
    }
}

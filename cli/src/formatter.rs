use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Row, Table};
use tally::objects::RefreshedObject;
use tally::{CycleOutcome, GameState, Issue, Scoreboard, ScoreEntry};

pub struct Formatter {}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self {}
    }

    pub fn format_value(&self, formula: &str, value: f64, raw: bool) -> String {
        if raw {
            return format!("{}\n", format_number(value));
        }
        format!("{} = {}\n", formula, format_number(value))
    }

    /// One row per category, one column per player, with totals at the bottom
    pub fn format_scoreboard(&self, state: &GameState, scoreboard: &Scoreboard) -> String {
        let mut output = String::new();

        let mut header = vec![Cell::new("Category").set_alignment(CellAlignment::Left)];
        for standing in &scoreboard.standings {
            header.push(Cell::new(&standing.player_id).set_alignment(CellAlignment::Right));
        }

        // Categories in definition order, then keys that are not categories
        let mut keys: Vec<(String, String)> = state
            .categories_for(&scoreboard.session_id)
            .map(|c| (c.id.clone(), c.name.clone()))
            .collect();
        for standing in &scoreboard.standings {
            for key in standing.categories.keys() {
                if !keys.iter().any(|(id, _)| id == key) {
                    keys.push((key.clone(), key.clone()));
                }
            }
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(header));

        for (id, name) in &keys {
            let mut row = vec![Cell::new(name)];
            for standing in &scoreboard.standings {
                let value = standing
                    .categories
                    .get(id)
                    .map(|v| format_number(*v))
                    .unwrap_or_else(|| "-".to_string());
                row.push(Cell::new(value).set_alignment(CellAlignment::Right));
            }
            table.add_row(Row::from(row));
        }

        let mut totals = vec![Cell::new("Total")];
        for standing in &scoreboard.standings {
            totals.push(Cell::new(format_number(standing.total)).set_alignment(CellAlignment::Right));
        }
        table.add_row(Row::from(totals));

        if let Some(round) = &scoreboard.round_id {
            output.push_str(&format!("Round {}\n", round));
        }
        output.push_str(&table.to_string());
        output.push('\n');

        match scoreboard.winners.as_slice() {
            [] => output.push_str("No players\n"),
            [winner] => output.push_str(&format!("Winner: {}\n", winner)),
            winners => output.push_str(&format!("Tied: {}\n", winners.join(", "))),
        }

        output
    }

    pub fn format_cycle(&self, outcome: &CycleOutcome) -> String {
        let Some(trigger) = &outcome.trigger_entry_id else {
            return "No manual entry to evaluate\n".to_string();
        };

        let mut output = format!(
            "Triggered by entry {} for {}\n",
            trigger,
            outcome.player_id.as_deref().unwrap_or("?")
        );
        if outcome.entries.is_empty() {
            output.push_str("No rules fired\n");
        } else {
            output.push_str(&self.format_entries(&outcome.entries));
            output.push('\n');
        }
        if !outcome.impact_entries.is_empty() {
            output.push_str("Object impacts\n");
            output.push_str(&self.format_entries(&outcome.impact_entries));
            output.push('\n');
        }
        if !outcome.objects.is_empty() {
            output.push_str(&self.format_objects(&outcome.objects));
            output.push('\n');
        }
        if outcome.suppressed > 0 {
            output.push_str(&format!("Suppressed {} duplicate entry(ies)\n", outcome.suppressed));
        }
        output
    }

    fn format_entries(&self, entries: &[ScoreEntry]) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(vec![
            Cell::new("Player").set_alignment(CellAlignment::Left),
            Cell::new("Category").set_alignment(CellAlignment::Left),
            Cell::new("Value").set_alignment(CellAlignment::Right),
            Cell::new("Note").set_alignment(CellAlignment::Left),
        ]));

        for entry in entries {
            table.add_row(Row::from(vec![
                Cell::new(&entry.player_id),
                Cell::new(entry.category_key()),
                Cell::new(format_signed(entry.value)).set_alignment(CellAlignment::Right),
                Cell::new(entry.note.as_deref().unwrap_or("")),
            ]));
        }

        table.to_string()
    }

    fn format_objects(&self, objects: &[RefreshedObject]) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(vec![
            Cell::new("Object").set_alignment(CellAlignment::Left),
            Cell::new("Owner").set_alignment(CellAlignment::Left),
            Cell::new("State").set_alignment(CellAlignment::Left),
            Cell::new("Value").set_alignment(CellAlignment::Right),
        ]));

        for object in objects {
            let value = object
                .value
                .numeric()
                .map(format_number)
                .unwrap_or_else(|| "-".to_string());
            table.add_row(Row::from(vec![
                Cell::new(&object.value.object_definition_id),
                Cell::new(object.value.player_id.as_deref().unwrap_or("session")),
                Cell::new(object.state.as_str()),
                Cell::new(value).set_alignment(CellAlignment::Right),
            ]));
        }

        table.to_string()
    }

    pub fn format_issues(&self, issues: &[Issue]) -> String {
        if issues.is_empty() {
            return "No issues found\n".to_string();
        }

        let mut output = String::new();
        for issue in issues {
            output.push_str(&format!(
                "[{}] {}: {}\n",
                issue.session_id, issue.location, issue.message
            ));
        }
        output
    }
}

/// Whole numbers without a fraction, everything else to three decimals
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let text = format!("{:.3}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn format_signed(value: f64) -> String {
    if value >= 0.0 {
        format!("+{}", format_number(value))
    } else {
        format_number(value)
    }
}

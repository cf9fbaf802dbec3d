pub mod auth;
pub mod channels;
pub mod config;
pub mod knowledge;
pub mod responses;
pub mod serve;
pub mod stats;

use std::str::FromStr;

use anyhow::{Context as _, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

/// Table with the shared look of every listing command
pub(crate) fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    table
}

pub(crate) fn parse_id<T>(raw: &str, kind: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("invalid {kind} id: {raw}"))
}

/// First `max` characters of `text` on one line, with an ellipsis when cut
pub(crate) fn excerpt(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut cut: String = flat.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_names_the_kind() {
        let err = parse_id::<deskbot_core::ResponseId>("nope", "response").unwrap_err();
        assert!(err.to_string().contains("invalid response id"));

        let id = deskbot_core::ResponseId::new();
        let parsed: deskbot_core::ResponseId = parse_id(&format!(" {id} "), "response").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn excerpt_keeps_short_text() {
        assert_eq!(excerpt("Prazo de\nreembolso", 40), "Prazo de reembolso");
    }

    #[test]
    fn excerpt_cuts_by_characters() {
        let cut = excerpt("ééééééééé", 5);
        assert_eq!(cut.chars().count(), 5);
        assert!(cut.ends_with('…'));
    }
}

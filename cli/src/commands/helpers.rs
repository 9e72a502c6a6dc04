use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use makan_core::milestones::MilestoneReport;
use makan_core::models::{Area, MenuItem, Stall};
use makan_core::quests::QuestCard;
use makan_core::rank::RankHeader;
use makan_core::service::MakanService;

/// Parse a rupiah amount: "8000", "8k", "8.5k", "Rp 12000".
pub(crate) fn parse_price(s: &str) -> Result<f64> {
    let lower = s.trim().to_lowercase();
    let body = lower.strip_prefix("rp").unwrap_or(&lower).trim();
    let (number, scale) = match body.strip_suffix('k') {
        Some(n) => (n.trim(), 1_000.0),
        None => (body, 1.0),
    };
    let value: f64 = number
        .replace('_', "")
        .parse()
        .with_context(|| format!("Invalid price: '{s}'. Use a number like '8000' or '8k'"))?;
    let value = value * scale;
    if !value.is_finite() || value < 0.0 {
        bail!("Price must not be negative");
    }
    Ok(value)
}

/// Format a rupiah amount with dot thousands separators ("Rp 12.500").
#[allow(clippy::cast_sign_loss)]
pub(crate) fn format_price(value: f64) -> String {
    let whole = value.round().abs() as u64;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("Rp {grouped}")
}

/// Parse "lat,lon" into a coordinate pair.
pub(crate) fn parse_coordinates(s: &str) -> Result<(f64, f64)> {
    let (lat, lon) = s
        .split_once(',')
        .with_context(|| format!("Invalid coordinates '{s}'. Use 'lat,lon'"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .with_context(|| format!("Invalid latitude in '{s}'"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .with_context(|| format!("Invalid longitude in '{s}'"))?;
    Ok((lat, lon))
}

/// Split a `;` or `,` separated tag list, dropping blanks.
pub(crate) fn parse_tags(s: &str) -> Vec<String> {
    s.split([';', ','])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Report a missing record and exit with status 2.
pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn resolve_stall(service: &MakanService, query: &str, json: bool) -> Result<Stall> {
    match service.find_stall(query)? {
        Some(stall) => Ok(stall),
        None => exit_not_found(&format!("Stall '{query}' not found"), json),
    }
}

pub(crate) fn resolve_area(service: &MakanService, query: &str, json: bool) -> Result<Area> {
    match service.find_area(query)? {
        Some(area) => Ok(area),
        None => exit_not_found(&format!("Area '{query}' not found"), json),
    }
}

pub(crate) fn resolve_menu_item(stall: &Stall, query: &str, json: bool) -> MenuItem {
    match stall.find_menu_item(query) {
        Some(item) => item.clone(),
        None => exit_not_found(
            &format!("Menu item '{query}' not found at {}", stall.name),
            json,
        ),
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

fn area_name(areas: &[Area], stall: &Stall) -> String {
    stall
        .area_id
        .and_then(|id| areas.iter().find(|a| a.id == id))
        .map(|a| a.name.clone())
        .unwrap_or_default()
}

pub(crate) fn print_stall_table(stalls: &[Stall], areas: &[Area]) {
    #[derive(Tabled)]
    struct StallRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Area")]
        area: String,
        #[tabled(rename = "Min")]
        min: String,
        #[tabled(rename = "Avg")]
        avg: String,
        #[tabled(rename = "Max")]
        max: String,
        #[tabled(rename = "Menu")]
        menu: usize,
        #[tabled(rename = "")]
        flags: String,
    }

    let rows: Vec<StallRow> = stalls
        .iter()
        .map(|s| {
            let mut flags = Vec::new();
            if s.is_favorite {
                flags.push("fav");
            }
            if s.is_budget() {
                flags.push("budget");
            }
            StallRow {
                name: truncate(&s.name, 30),
                area: area_name(areas, s),
                min: format_price(s.minimum_price),
                avg: format_price(s.average_price),
                max: format_price(s.maximum_price),
                menu: s.menu.len(),
                flags: flags.join(" "),
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_menu_table(items: &[MenuItem]) {
    #[derive(Tabled)]
    struct MenuRow {
        #[tabled(rename = "Dish")]
        name: String,
        #[tabled(rename = "Price")]
        price: String,
        #[tabled(rename = "Cuisine")]
        cuisine: String,
        #[tabled(rename = "Tags")]
        tags: String,
    }

    let rows: Vec<MenuRow> = items
        .iter()
        .map(|item| MenuRow {
            name: truncate(&item.name, 30),
            price: format_price(item.price),
            cuisine: item.cuisine.to_string(),
            tags: truncate(&item.tags.join(", "), 30),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(1)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_quest_board(cards: &[QuestCard]) {
    #[derive(Tabled)]
    struct QuestRow {
        #[tabled(rename = "Quest")]
        title: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Progress")]
        progress: String,
        #[tabled(rename = "Reward")]
        reward: u32,
        #[tabled(rename = "Status")]
        status: String,
    }

    let rows: Vec<QuestRow> = cards
        .iter()
        .map(|card| QuestRow {
            title: truncate(&card.quest.title, 30),
            category: card.quest.category.to_string(),
            progress: format!(
                "{}/{} ({:.0}%)",
                card.progress.min(card.quest.required_count),
                card.quest.required_count,
                card.percent
            ),
            reward: card.quest.reward,
            status: card.status.label().to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_rank_header(header: &RankHeader) {
    println!(
        "{} ({}): {} points. {}",
        header.title,
        header.rank.label(),
        header.total_points,
        header.describe_next()
    );
}

/// Announce milestone unlocks and rank changes from a progress action.
pub(crate) fn announce(report: &MilestoneReport) {
    for unlock in &report.unlocked {
        println!(
            "Milestone unlocked: {} ({}) +{} points",
            unlock.title, unlock.quest_title, unlock.reward
        );
    }
    if let Some(change) = report.rank_change {
        println!(
            "Rank up! {} -> {} ({})",
            change.from.label(),
            change.to.label(),
            change.to.title()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price() {
        assert!((parse_price("8000").unwrap() - 8_000.0).abs() < f64::EPSILON);
        assert!((parse_price("8k").unwrap() - 8_000.0).abs() < f64::EPSILON);
        assert!((parse_price("12.5K").unwrap() - 12_500.0).abs() < f64::EPSILON);
        assert!((parse_price("Rp 15000").unwrap() - 15_000.0).abs() < f64::EPSILON);
        assert!((parse_price("20_000").unwrap() - 20_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_price_invalid() {
        assert!(parse_price("cheap").is_err());
        assert!(parse_price("-5k").is_err());
        assert!(parse_price("").is_err());
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0.0), "Rp 0");
        assert_eq!(format_price(800.0), "Rp 800");
        assert_eq!(format_price(8_000.0), "Rp 8.000");
        assert_eq!(format_price(12_499.6), "Rp 12.500");
        assert_eq!(format_price(1_250_000.0), "Rp 1.250.000");
    }

    #[test]
    fn test_parse_coordinates() {
        let (lat, lon) = parse_coordinates("-6.2088, 106.8456").unwrap();
        assert!((lat + 6.2088).abs() < 1e-9);
        assert!((lon - 106.8456).abs() < 1e-9);
        assert!(parse_coordinates("-6.2088").is_err());
        assert!(parse_coordinates("north,east").is_err());
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("Main; Rice,Spicy"), vec!["Main", "Rice", "Spicy"]);
        assert!(parse_tags(" ; ").is_empty());
    }

    #[test]
    fn test_json_error() {
        let json: serde_json::Value = serde_json::from_str(&json_error("Stall not found")).unwrap();
        assert_eq!(json["error"], "Stall not found");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Warung", 10), "Warung");
        assert_eq!(truncate("Warung Pojok Bu Sri", 10), "Warung ...");
    }
}

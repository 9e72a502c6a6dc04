use std::collections::HashMap;
use std::io::Read;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    Cuisine, NewArea, NewMenuItem, NewStall, validate_price, validate_price_range,
};
use crate::service::MakanService;
use crate::store::EntityStore;

/// A single row of a stall CSV. Rows without a menu item describe the stall only.
#[derive(Debug, Clone)]
pub struct StallRow {
    pub stall: String,
    pub area: Option<String>,
    pub minimum_price: f64,
    pub maximum_price: f64,
    pub average_price: Option<f64>,
    pub menu_item: Option<String>,
    pub item_price: Option<f64>,
    pub cuisine: Option<Cuisine>,
    pub tags: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StallImportSummary {
    pub rows_parsed: usize,
    pub stalls_created: usize,
    pub stalls_reused: usize,
    pub areas_created: usize,
    pub menu_items_added: usize,
    pub menu_items_skipped: usize,
}

/// Parse a stall CSV from any reader.
///
/// Expected header:
/// `Stall,Area,Min Price,Max Price,Avg Price,Menu Item,Item Price,Cuisine,Tags,Description`
///
/// Only the first four columns are required. Tags are `;`-separated.
pub fn parse_stall_csv<R: Read>(reader: R) -> Result<Vec<StallRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();

    let required = ["Stall", "Area", "Min Price", "Max Price"];
    for name in &required {
        if !headers.iter().any(|h| h.eq_ignore_ascii_case(name)) {
            bail!("Missing required column: {name}");
        }
    }

    let col =
        |name: &str| -> Option<usize> { headers.iter().position(|h| h.eq_ignore_ascii_case(name)) };

    let idx_stall = col("Stall").context("Missing 'Stall' column")?;
    let idx_area = col("Area").context("Missing 'Area' column")?;
    let idx_min = col("Min Price").context("Missing 'Min Price' column")?;
    let idx_max = col("Max Price").context("Missing 'Max Price' column")?;
    let idx_avg = col("Avg Price");
    let idx_item = col("Menu Item");
    let idx_item_price = col("Item Price");
    let idx_cuisine = col("Cuisine");
    let idx_tags = col("Tags");
    let idx_desc = col("Description");

    let mut rows = Vec::new();

    for (line_num, result) in rdr.records().enumerate() {
        let line = line_num + 2;
        let record = result.with_context(|| format!("Failed to parse CSV row {line}"))?;

        let text = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let price = |idx: Option<usize>, what: &str| -> Result<Option<f64>> {
            text(idx)
                .map(|v| {
                    v.parse::<f64>()
                        .with_context(|| format!("Row {line}: invalid {what} '{v}'"))
                })
                .transpose()
        };

        let Some(stall) = text(Some(idx_stall)) else {
            continue;
        };

        let minimum_price = price(Some(idx_min), "min price")?
            .with_context(|| format!("Row {line}: missing min price"))?;
        let maximum_price = price(Some(idx_max), "max price")?
            .with_context(|| format!("Row {line}: missing max price"))?;
        let cuisine = text(idx_cuisine)
            .map(|c| Cuisine::parse(&c).with_context(|| format!("Row {line}")))
            .transpose()?;

        rows.push(StallRow {
            stall,
            area: text(Some(idx_area)),
            minimum_price,
            maximum_price,
            average_price: price(idx_avg, "avg price")?,
            menu_item: text(idx_item),
            item_price: price(idx_item_price, "item price")?,
            cuisine,
            tags: text(idx_tags)
                .map(|t| {
                    t.split(';')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            description: text(idx_desc).unwrap_or_default(),
        });
    }

    Ok(rows)
}

impl StallRow {
    /// The row's average price, or the midpoint of its range when absent.
    fn average_or_midpoint(&self) -> f64 {
        self.average_price
            .unwrap_or((self.minimum_price + self.maximum_price) / 2.0)
    }
}

/// Import parsed rows, grouping them by stall name (case-insensitive).
///
/// Existing stalls and areas are reused; a menu item whose name the stall
/// already has is skipped, and a row without a menu item gives its
/// description to the stall. Every row's prices are checked before anything
/// is written. When `dry_run` is true, nothing is written.
pub fn import_stalls<S: EntityStore>(
    service: &mut MakanService<S>,
    rows: &[StallRow],
    dry_run: bool,
) -> Result<StallImportSummary> {
    let mut summary = StallImportSummary {
        rows_parsed: rows.len(),
        ..StallImportSummary::default()
    };

    for row in rows {
        validate_price_range(
            row.minimum_price,
            row.average_or_midpoint(),
            row.maximum_price,
        )
        .with_context(|| format!("Invalid prices for stall '{}'", row.stall))?;
        if let Some(price) = row.item_price {
            validate_price(price)
                .with_context(|| format!("Invalid item price for stall '{}'", row.stall))?;
        }
    }

    // lowercased name -> (stall id if it exists, menu item names already present)
    let mut stalls: HashMap<String, (Option<Uuid>, Vec<String>)> = HashMap::new();
    let mut areas: HashMap<String, Option<Uuid>> = HashMap::new();

    for row in rows {
        let area_id = match &row.area {
            None => None,
            Some(name) => {
                let key = name.to_lowercase();
                if let Some(id) = areas.get(&key) {
                    *id
                } else {
                    let id = match service.find_area(name)? {
                        Some(area) => Some(area.id),
                        None => {
                            summary.areas_created += 1;
                            if dry_run {
                                None
                            } else {
                                let area = service.add_area(&NewArea {
                                    name: name.clone(),
                                    ..NewArea::default()
                                })?;
                                Some(area.id)
                            }
                        }
                    };
                    areas.insert(key, id);
                    id
                }
            }
        };

        let key = row.stall.to_lowercase();
        if !stalls.contains_key(&key) {
            let entry = if let Some(existing) = service.find_stall(&row.stall)? {
                summary.stalls_reused += 1;
                let names: Vec<String> =
                    existing.menu.iter().map(|m| m.name.to_lowercase()).collect();
                (Some(existing.id), names)
            } else {
                summary.stalls_created += 1;
                let id = if dry_run {
                    None
                } else {
                    let description = if row.menu_item.is_none() {
                        row.description.clone()
                    } else {
                        String::new()
                    };
                    let stall = service
                        .add_stall(&NewStall {
                            name: row.stall.clone(),
                            description,
                            minimum_price: row.minimum_price,
                            maximum_price: row.maximum_price,
                            average_price: row.average_or_midpoint(),
                            area_id,
                            ..NewStall::default()
                        })
                        .with_context(|| format!("Failed to import stall '{}'", row.stall))?;
                    Some(stall.id)
                };
                (id, Vec::new())
            };
            stalls.insert(key.clone(), entry);
        }

        let Some(item_name) = &row.menu_item else {
            continue;
        };
        let Some((stall_id, existing_items)) = stalls.get_mut(&key) else {
            continue;
        };
        let item_key = item_name.to_lowercase();
        if existing_items.contains(&item_key) {
            summary.menu_items_skipped += 1;
            continue;
        }
        existing_items.push(item_key);
        summary.menu_items_added += 1;

        if let Some(stall_id) = stall_id {
            service.add_menu_item(
                *stall_id,
                &NewMenuItem {
                    name: item_name.clone(),
                    price: row.item_price.unwrap_or(row.minimum_price),
                    description: row.description.clone(),
                    tags: row.tags.clone(),
                    diet_type: String::new(),
                    cuisine: row.cuisine.unwrap_or(Cuisine::Indonesian),
                    image: None,
                },
            )?;
        }
    }

    debug!(?summary, dry_run, "stall import finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StallFilter;

    const CSV: &str = "\
Stall,Area,Min Price,Max Price,Avg Price,Menu Item,Item Price,Cuisine,Tags,Description
Warung Pojok,GOP 1,8000,25000,15000,Nasi Goreng,12000,Indonesian,Main;Rice,Fried rice
warung pojok,GOP 1,8000,25000,15000,Sate Ayam,18000,indonesian,Main,Chicken skewers
Burger Joint,GOP 2,10000,20000,,Classic Burger,14000,Western,,
Kopi Kenangan,GOP 2,15000,30000,20000,,,,,Coffee and pastries
";

    #[test]
    fn test_parse_rows() {
        let rows = parse_stall_csv(CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].stall, "Warung Pojok");
        assert_eq!(rows[0].area.as_deref(), Some("GOP 1"));
        assert_eq!(rows[0].tags, vec!["Main", "Rice"]);
        assert_eq!(rows[1].cuisine, Some(Cuisine::Indonesian));
        assert!(rows[2].average_price.is_none());
        assert!(rows[2].tags.is_empty());
        assert!(rows[3].menu_item.is_none());
    }

    #[test]
    fn test_parse_missing_required_column() {
        let csv = "Stall,Area,Min Price\nWarung,GOP 1,8000\n";
        assert!(parse_stall_csv(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_bad_price_and_cuisine() {
        let bad_price = "Stall,Area,Min Price,Max Price\nWarung,GOP 1,cheap,9000\n";
        assert!(parse_stall_csv(bad_price.as_bytes()).is_err());
        let bad_cuisine = "Stall,Area,Min Price,Max Price,Cuisine\nWarung,,8000,9000,Martian\n";
        assert!(parse_stall_csv(bad_cuisine.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_skips_blank_stall() {
        let csv = "Stall,Area,Min Price,Max Price\n,GOP 1,8000,9000\nWarung,,8000,9000\n";
        let rows = parse_stall_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].area.is_none());
    }

    #[test]
    fn test_import_groups_by_stall() {
        let mut svc = MakanService::new_in_memory().unwrap();
        let rows = parse_stall_csv(CSV.as_bytes()).unwrap();
        let summary = import_stalls(&mut svc, &rows, false).unwrap();

        assert_eq!(summary.rows_parsed, 4);
        assert_eq!(summary.stalls_created, 3);
        assert_eq!(summary.areas_created, 2);
        assert_eq!(summary.menu_items_added, 3);

        let pojok = svc.find_stall("Warung Pojok").unwrap().unwrap();
        assert_eq!(pojok.menu.len(), 2);
        assert_eq!(pojok.menu[0].tags, vec!["Main", "Rice"]);

        let burger = svc.find_stall("Burger Joint").unwrap().unwrap();
        assert!((burger.average_price - 15_000.0).abs() < 1e-9);
        assert_eq!(burger.menu[0].cuisine, Cuisine::Western);
        assert!(burger.description.is_empty());

        let kopi = svc.find_stall("Kopi Kenangan").unwrap().unwrap();
        assert_eq!(kopi.description, "Coffee and pastries");
        assert!(kopi.menu.is_empty());
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let mut svc = MakanService::new_in_memory().unwrap();
        let rows = parse_stall_csv(CSV.as_bytes()).unwrap();
        import_stalls(&mut svc, &rows, false).unwrap();
        let again = import_stalls(&mut svc, &rows, false).unwrap();

        assert_eq!(again.stalls_created, 0);
        assert_eq!(again.stalls_reused, 3);
        assert_eq!(again.areas_created, 0);
        assert_eq!(again.menu_items_added, 0);
        assert_eq!(again.menu_items_skipped, 3);
        assert_eq!(svc.stall_count().unwrap(), 3);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let mut svc = MakanService::new_in_memory().unwrap();
        let rows = parse_stall_csv(CSV.as_bytes()).unwrap();
        let summary = import_stalls(&mut svc, &rows, true).unwrap();

        assert_eq!(summary.stalls_created, 3);
        assert_eq!(summary.menu_items_added, 3);
        assert!(svc.list_stalls(&StallFilter::default()).unwrap().is_empty());
        assert!(svc.list_areas().unwrap().is_empty());
    }

    #[test]
    fn test_import_rejects_invalid_prices() {
        let mut svc = MakanService::new_in_memory().unwrap();
        let csv = "Stall,Area,Min Price,Max Price\nWarung,,9000,8000\n";
        let rows = parse_stall_csv(csv.as_bytes()).unwrap();
        assert!(import_stalls(&mut svc, &rows, false).is_err());
    }

    #[test]
    fn test_rejected_import_creates_no_areas() {
        let mut svc = MakanService::new_in_memory().unwrap();
        let csv = "\
Stall,Area,Min Price,Max Price
Warung,GOP 1,8000,9000
Bakso Pak Min,GOP 4,20000,10000
";
        let rows = parse_stall_csv(csv.as_bytes()).unwrap();
        let err = import_stalls(&mut svc, &rows, false).unwrap_err();
        assert!(format!("{err:#}").contains("Bakso Pak Min"));
        assert!(svc.list_areas().unwrap().is_empty());
        assert_eq!(svc.stall_count().unwrap(), 0);
    }
}

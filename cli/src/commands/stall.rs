use std::path::Path;

use anyhow::{Context, Result, bail};

use makan_core::models::{Cuisine, NewStall, PriceRange, StallFilter, UpdateStall};
use makan_core::service::MakanService;
use makan_core::stall_import::{import_stalls, parse_stall_csv};

use super::helpers::{
    announce, exit_not_found, format_price, parse_price, print_menu_table, print_stall_table,
    resolve_area, resolve_stall,
};

pub(crate) struct StallInput<'a> {
    pub name: &'a str,
    pub min: &'a str,
    pub max: &'a str,
    pub avg: Option<&'a str>,
    pub area: Option<&'a str>,
    pub description: Option<&'a str>,
    pub favorite: bool,
}

pub(crate) fn cmd_stall_add(
    service: &mut MakanService,
    input: &StallInput<'_>,
    json: bool,
) -> Result<()> {
    let minimum_price = parse_price(input.min)?;
    let maximum_price = parse_price(input.max)?;
    let average_price = match input.avg {
        Some(avg) => parse_price(avg)?,
        None => (minimum_price + maximum_price) / 2.0,
    };
    let area_id = match input.area {
        Some(query) => Some(resolve_area(service, query, json)?.id),
        None => None,
    };

    let stall = service.add_stall(&NewStall {
        name: input.name.to_string(),
        description: input.description.unwrap_or_default().to_string(),
        minimum_price,
        maximum_price,
        average_price,
        area_id,
        is_favorite: input.favorite,
        image: None,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stall)?);
    } else {
        println!(
            "Added {} ({} - {}, avg {})",
            stall.name,
            format_price(stall.minimum_price),
            format_price(stall.maximum_price),
            format_price(stall.average_price)
        );
    }
    Ok(())
}

pub(crate) struct ListFilters<'a> {
    pub area: Option<&'a str>,
    pub price: Option<&'a str>,
    pub cuisine: Option<&'a str>,
    pub favorites: bool,
    pub budget: bool,
}

pub(crate) fn cmd_stall_list(
    service: &MakanService,
    filters: &ListFilters<'_>,
    json: bool,
) -> Result<()> {
    let filter = StallFilter {
        area_id: match filters.area {
            Some(query) => Some(resolve_area(service, query, json)?.id),
            None => None,
        },
        price_range: filters.price.map(PriceRange::parse).transpose()?,
        cuisine: filters.cuisine.map(Cuisine::parse).transpose()?,
        favorites_only: filters.favorites,
        budget_only: filters.budget,
    };
    let stalls = service.list_stalls(&filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stalls)?);
    } else if stalls.is_empty() {
        eprintln!("No stalls found. Add one with `makan stall add` or run `makan seed`.");
    } else {
        let areas = service.list_areas()?;
        print_stall_table(&stalls, &areas);
    }
    Ok(())
}

pub(crate) fn cmd_stall_show(service: &MakanService, query: &str, json: bool) -> Result<()> {
    let stall = resolve_stall(service, query, json)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stall)?);
        return Ok(());
    }

    println!("{}", stall.name);
    if !stall.description.is_empty() {
        println!("{}", stall.description);
    }
    if let Some(area_id) = stall.area_id {
        let area = service.get_area(area_id)?;
        println!("Area: {}", area.name);
    }
    println!(
        "Prices: {} - {} (avg {})",
        format_price(stall.minimum_price),
        format_price(stall.maximum_price),
        format_price(stall.average_price)
    );
    if stall.is_favorite {
        println!("Favorite");
    }
    if stall.is_budget() {
        println!("Budget find");
    }
    println!();
    if stall.menu.is_empty() {
        println!("No menu items yet.");
    } else {
        print_menu_table(&stall.menu);
    }
    Ok(())
}

pub(crate) struct StallEdit<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub min: Option<&'a str>,
    pub max: Option<&'a str>,
    pub avg: Option<&'a str>,
    pub area: Option<&'a str>,
    pub clear_area: bool,
}

pub(crate) fn cmd_stall_edit(
    service: &mut MakanService,
    query: &str,
    edit: &StallEdit<'_>,
    json: bool,
) -> Result<()> {
    let stall = resolve_stall(service, query, json)?;

    let area_id = match (edit.area, edit.clear_area) {
        (Some(_), true) => bail!("Use either --area or --clear-area, not both"),
        (Some(area), false) => Some(Some(resolve_area(service, area, json)?.id)),
        (None, true) => Some(None),
        (None, false) => None,
    };
    let update = UpdateStall {
        name: edit.name.map(str::to_string),
        description: edit.description.map(str::to_string),
        minimum_price: edit.min.map(parse_price).transpose()?,
        maximum_price: edit.max.map(parse_price).transpose()?,
        average_price: edit.avg.map(parse_price).transpose()?,
        area_id,
    };
    if update.is_empty() {
        bail!(
            "Nothing to update. Pass at least one of --name, --description, --min, --max, \
             --avg, --area, --clear-area"
        );
    }

    let updated = service.update_stall(stall.id, &update)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        println!("Updated {}", updated.name);
    }
    Ok(())
}

pub(crate) fn cmd_stall_delete(service: &mut MakanService, query: &str, json: bool) -> Result<()> {
    let stall = resolve_stall(service, query, json)?;
    if !service.delete_stall(stall.id)? {
        exit_not_found(&format!("Stall '{query}' not found"), json);
    }
    if json {
        println!(
            "{}",
            serde_json::json!({ "deleted": stall.id, "menu_items_removed": stall.menu.len() })
        );
    } else {
        println!(
            "Deleted {} and {} menu item(s)",
            stall.name,
            stall.menu.len()
        );
    }
    Ok(())
}

pub(crate) fn cmd_stall_favorite(
    service: &mut MakanService,
    query: &str,
    favorite: bool,
    json: bool,
) -> Result<()> {
    let stall = resolve_stall(service, query, json)?;
    let report = service.set_favorite(stall.id, favorite)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match (report.changed, favorite) {
            (false, true) => println!("{} is already a favorite", stall.name),
            (false, false) => println!("{} is not a favorite", stall.name),
            (true, true) => println!("Added {} to favorites", stall.name),
            (true, false) => println!("Removed {} from favorites", stall.name),
        }
        announce(&report.milestones);
    }
    Ok(())
}

pub(crate) fn cmd_stall_visit(service: &mut MakanService, query: &str, json: bool) -> Result<()> {
    let stall = resolve_stall(service, query, json)?;
    let report = service.visit_stall(stall.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let outcome = &report.outcome;
    if outcome.first_visit {
        println!("Visited {} for the first time", stall.name);
    } else {
        println!("Visited {} again", stall.name);
    }
    if outcome.new_dishes > 0 {
        println!("  {} new dish(es) tasted", outcome.new_dishes);
    }
    if outcome.budget_find {
        println!("  Budget find!");
    }
    if outcome.new_area {
        println!("  New area explored");
    }
    announce(&report.milestones);
    Ok(())
}

pub(crate) fn cmd_stall_import(
    service: &mut MakanService,
    path: &Path,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let rows = parse_stall_csv(file)?;

    if rows.is_empty() {
        if json {
            println!(
                "{}",
                serde_json::json!({ "error": "No rows found in CSV file" })
            );
        } else {
            eprintln!("No rows found in CSV file.");
        }
        return Ok(());
    }

    let summary = import_stalls(service, &rows, dry_run)?;

    if json {
        let mut value = serde_json::to_value(&summary)?;
        value["dry_run"] = serde_json::Value::Bool(dry_run);
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        if dry_run {
            println!("Dry run, no changes made.\n");
        } else {
            println!("Import complete.\n");
        }
        println!("  Rows parsed:        {}", summary.rows_parsed);
        println!("  Stalls created:     {}", summary.stalls_created);
        println!("  Stalls reused:      {}", summary.stalls_reused);
        println!("  Areas created:      {}", summary.areas_created);
        println!("  Menu items added:   {}", summary.menu_items_added);
        println!("  Menu items skipped: {}", summary.menu_items_skipped);
    }

    Ok(())
}

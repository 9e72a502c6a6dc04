use anyhow::Result;

use makan_core::models::{Cuisine, NewMenuItem};
use makan_core::service::MakanService;

use super::helpers::{
    announce, exit_not_found, format_price, parse_price, parse_tags, print_menu_table,
    resolve_menu_item, resolve_stall,
};

pub(crate) struct MenuInput<'a> {
    pub name: &'a str,
    pub price: &'a str,
    pub cuisine: &'a str,
    pub description: Option<&'a str>,
    pub tags: Option<&'a str>,
    pub diet: Option<&'a str>,
}

pub(crate) fn cmd_menu_add(
    service: &mut MakanService,
    stall_query: &str,
    input: &MenuInput<'_>,
    json: bool,
) -> Result<()> {
    let stall = resolve_stall(service, stall_query, json)?;
    let item = service.add_menu_item(
        stall.id,
        &NewMenuItem {
            name: input.name.to_string(),
            price: parse_price(input.price)?,
            description: input.description.unwrap_or_default().to_string(),
            tags: input.tags.map(parse_tags).unwrap_or_default(),
            diet_type: input.diet.unwrap_or_default().to_string(),
            cuisine: Cuisine::parse(input.cuisine)?,
            image: None,
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!(
            "Added {} ({}) to {}",
            item.name,
            format_price(item.price),
            stall.name
        );
    }
    Ok(())
}

pub(crate) fn cmd_menu_list(service: &MakanService, stall_query: &str, json: bool) -> Result<()> {
    let stall = resolve_stall(service, stall_query, json)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stall.menu)?);
    } else if stall.menu.is_empty() {
        eprintln!("{} has no menu items yet.", stall.name);
    } else {
        print_menu_table(&stall.menu);
    }
    Ok(())
}

pub(crate) fn cmd_menu_remove(
    service: &mut MakanService,
    stall_query: &str,
    item_query: &str,
    json: bool,
) -> Result<()> {
    let stall = resolve_stall(service, stall_query, json)?;
    let item = resolve_menu_item(&stall, item_query, json);
    if !service.remove_menu_item(stall.id, item.id)? {
        exit_not_found(&format!("Menu item '{item_query}' not found"), json);
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": item.id }));
    } else {
        println!("Removed {} from {}", item.name, stall.name);
    }
    Ok(())
}

pub(crate) fn cmd_menu_taste(
    service: &mut MakanService,
    stall_query: &str,
    item_query: &str,
    json: bool,
) -> Result<()> {
    let stall = resolve_stall(service, stall_query, json)?;
    let item = resolve_menu_item(&stall, item_query, json);
    let report = service.taste_dish(stall.id, item.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if report.newly_tasted {
            println!("Tasted {} for the first time", item.name);
        } else {
            println!("Already tasted {}", item.name);
        }
        announce(&report.milestones);
    }
    Ok(())
}

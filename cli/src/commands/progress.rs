use anyhow::{Result, bail};

use makan_core::seed::seed_demo_data;
use makan_core::service::MakanService;

use super::helpers::{announce, print_rank_header, resolve_menu_item, resolve_stall};

pub(crate) fn cmd_progress(service: &mut MakanService, json: bool) -> Result<()> {
    let summary = service.progress_summary()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print_rank_header(&summary.header);
    println!();
    for entry in &summary.counts {
        println!("  {:<20} {}", entry.category.label(), entry.count);
    }
    println!("  {:<20} {}", "Reviews", summary.reviews_submitted);
    println!("  {:<20} {}", "Quests completed", summary.completed_quests);
    Ok(())
}

pub(crate) fn cmd_review(
    service: &mut MakanService,
    stall_query: &str,
    dish_query: Option<&str>,
    json: bool,
) -> Result<()> {
    let stall = resolve_stall(service, stall_query, json)?;
    let dish = dish_query.map(|q| resolve_menu_item(&stall, q, json));
    let report = service.submit_review(dish.as_ref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &dish {
            Some(item) => println!("Review submitted for {} at {}", item.name, stall.name),
            None => println!("Review submitted for {}", stall.name),
        }
        announce(&report.milestones);
    }
    Ok(())
}

pub(crate) fn cmd_reset(service: &mut MakanService, yes: bool, json: bool) -> Result<()> {
    if !yes {
        bail!("This clears all progress, points and milestones. Re-run with --yes to confirm");
    }
    service.reset_progress()?;

    if json {
        println!("{}", serde_json::json!({ "reset": true }));
    } else {
        println!("Progress reset.");
    }
    Ok(())
}

pub(crate) fn cmd_seed(service: &mut MakanService, json: bool) -> Result<()> {
    let summary = seed_demo_data(service)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if summary.is_empty() {
        println!("Already seeded, nothing to do.");
    } else {
        println!("Seeded demo data.\n");
        println!("  Areas:      {}", summary.areas_created);
        println!("  Stalls:     {}", summary.stalls_created);
        println!("  Menu items: {}", summary.menu_items_created);
        println!("  Quests:     {}", summary.quests_created);
    }
    Ok(())
}

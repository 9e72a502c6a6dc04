use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use makan_core::models::Quest;
use makan_core::quests::CompletionOutcome;
use makan_core::service::MakanService;

use super::helpers::{exit_not_found, print_quest_board, print_rank_header};

fn resolve_quest(service: &MakanService, query: &str, json: bool) -> Result<Quest> {
    match service.find_quest(query)? {
        Some(quest) => Ok(quest),
        None => exit_not_found(&format!("Quest '{query}' not found"), json),
    }
}

pub(crate) fn cmd_quest_list(service: &mut MakanService, json: bool) -> Result<()> {
    let header = service.rank_header()?;
    let cards = service.quest_board()?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "rank": header,
                "quests": cards,
            }))?
        );
        return Ok(());
    }

    print_rank_header(&header);
    if cards.is_empty() {
        eprintln!("No quests yet. Run `makan seed` to add the starter quests.");
    } else {
        print_quest_board(&cards);
    }
    Ok(())
}

pub(crate) fn cmd_quest_show(service: &mut MakanService, query: &str, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct MilestoneRow {
        #[tabled(rename = "Milestone")]
        title: String,
        #[tabled(rename = "At")]
        threshold: u32,
        #[tabled(rename = "Reward")]
        reward: u32,
        #[tabled(rename = "Done")]
        done: &'static str,
    }

    let quest = resolve_quest(service, query, json)?;
    let card = service.quest_card(quest.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&card)?);
        return Ok(());
    }

    println!("{} [{}]", card.quest.title, card.quest.category);
    if !card.quest.description.is_empty() {
        println!("{}", card.quest.description);
    }
    println!(
        "Progress: {}/{} ({:.0}%), {}",
        card.progress.min(card.quest.required_count),
        card.quest.required_count,
        card.percent,
        card.status.label()
    );
    println!("Reward: {} points", card.quest.reward);
    if let Some(next) = card.next_milestone() {
        println!("Next milestone: {} at {}", next.title, next.threshold);
    }

    if !card.quest.milestones.is_empty() {
        let rows: Vec<MilestoneRow> = card
            .quest
            .milestones
            .iter()
            .map(|m| MilestoneRow {
                title: m.title.clone(),
                threshold: m.threshold,
                reward: m.reward,
                done: if m.completed { "yes" } else { "" },
            })
            .collect();
        let table = Table::new(&rows).with(Style::rounded()).to_string();
        println!();
        println!("{table}");
    }
    Ok(())
}

pub(crate) fn cmd_quest_complete(
    service: &mut MakanService,
    query: &str,
    json: bool,
) -> Result<()> {
    let quest = resolve_quest(service, query, json)?;
    let outcome = service.complete_quest(quest.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match outcome {
        CompletionOutcome::Completed {
            reward,
            rank_change,
        } => {
            println!("Quest complete: {} +{reward} points", quest.title);
            if let Some(change) = rank_change {
                println!(
                    "Rank up! {} -> {} ({})",
                    change.from.label(),
                    change.to.label(),
                    change.to.title()
                );
            }
        }
        CompletionOutcome::AlreadyCompleted => {
            println!("{} is already completed", quest.title);
        }
        CompletionOutcome::NotEligible { progress, required } => {
            println!("{} is not ready yet ({progress}/{required})", quest.title);
        }
    }
    Ok(())
}

use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use makan_core::models::{NewArea, StallFilter};
use makan_core::service::MakanService;

use super::helpers::parse_coordinates;

pub(crate) fn cmd_area_add(
    service: &mut MakanService,
    name: &str,
    coords: Option<&str>,
    json: bool,
) -> Result<()> {
    let (latitude, longitude) = match coords {
        Some(c) => {
            let (lat, lon) = parse_coordinates(c)?;
            (Some(lat), Some(lon))
        }
        None => (None, None),
    };
    let area = service.add_area(&NewArea {
        name: name.to_string(),
        latitude,
        longitude,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&area)?);
    } else {
        println!("Added area {}", area.name);
    }
    Ok(())
}

pub(crate) fn cmd_area_list(service: &MakanService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct AreaRow {
        #[tabled(rename = "Area")]
        name: String,
        #[tabled(rename = "Location")]
        location: String,
        #[tabled(rename = "Stalls")]
        stalls: usize,
    }

    let areas = service.list_areas()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&areas)?);
        return Ok(());
    }
    if areas.is_empty() {
        eprintln!("No areas yet. Add one with `makan area add <name>`.");
        return Ok(());
    }

    let stalls = service.list_stalls(&StallFilter::default())?;
    let rows: Vec<AreaRow> = areas
        .iter()
        .map(|area| AreaRow {
            name: area.name.clone(),
            location: match (area.latitude, area.longitude) {
                (Some(lat), Some(lon)) => format!("{lat:.4}, {lon:.4}"),
                _ => "-".to_string(),
            },
            stalls: stalls
                .iter()
                .filter(|s| s.area_id == Some(area.id))
                .count(),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

mod area;
mod helpers;
mod menu;
mod progress;
mod quest;
mod stall;

pub(crate) use area::{cmd_area_add, cmd_area_list};
pub(crate) use menu::{MenuInput, cmd_menu_add, cmd_menu_list, cmd_menu_remove, cmd_menu_taste};
pub(crate) use progress::{cmd_progress, cmd_reset, cmd_review, cmd_seed};
pub(crate) use quest::{cmd_quest_complete, cmd_quest_list, cmd_quest_show};
pub(crate) use stall::{
    ListFilters, StallEdit, StallInput, cmd_stall_add, cmd_stall_delete, cmd_stall_edit,
    cmd_stall_favorite, cmd_stall_import, cmd_stall_list, cmd_stall_show, cmd_stall_visit,
};

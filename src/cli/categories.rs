//! Categories command implementation

use crate::changes::EntityCategory;
use crate::cli::output::{format_categories_json, format_categories_table, CategoryView};
use crate::cli::CategoriesArgs;

/// Handle `agentwatch categories` command
pub fn handle_categories(args: &CategoriesArgs) -> anyhow::Result<String> {
    let views: Vec<CategoryView> = EntityCategory::ALL.into_iter().map(Into::into).collect();

    if args.json {
        Ok(format_categories_json(&views)?)
    } else {
        Ok(format_categories_table(&views))
    }
}

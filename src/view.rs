/// View models handed to the chat front-end
use crate::{config::LimitsConfig, db::models::ItemSummary, money};
use serde::Serialize;

const EMPTY_SHOP: &str = "*This shop has no items available.*";

/// One numbered listing line
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingLine {
    /// 1-based position buyers can type instead of the name
    pub position: i64,
    pub item_id: String,
    pub name: String,
    pub price: String,
    pub amount: i64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingButtons {
    pub prev_disabled: bool,
    pub buy_disabled: bool,
    pub next_disabled: bool,
}

/// One page of a shop
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingView {
    pub owner_id: String,
    pub page: u32,
    pub footer: String,
    pub description: String,
    pub lines: Vec<ListingLine>,
    pub reputation: i64,
    pub buttons: ListingButtons,
}

/// Render a page of `items` already fetched with `page * page_size` as offset
pub fn render_listing(
    owner_id: &str,
    items: &[ItemSummary],
    page: u32,
    page_size: u32,
    reputation: i64,
) -> ListingView {
    let offset = i64::from(page) * i64::from(page_size);

    let lines: Vec<ListingLine> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let position = offset + i as i64 + 1;
            let price = money::format_sats(item.price_sats);
            ListingLine {
                position,
                item_id: item.id.clone(),
                name: item.name.clone(),
                text: format!(
                    "**{}.** {} — **{}** coins *(x{})*",
                    position, item.name, price, item.amount
                ),
                price,
                amount: item.amount,
            }
        })
        .collect();

    let description = if lines.is_empty() {
        EMPTY_SHOP.to_string()
    } else {
        lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    };

    ListingView {
        owner_id: owner_id.to_string(),
        page,
        footer: format!("Page {}", page + 1),
        description,
        buttons: ListingButtons {
            prev_disabled: page == 0,
            buy_disabled: lines.is_empty(),
            next_disabled: lines.len() < page_size as usize,
        },
        lines,
        reputation,
    }
}

/// Public shop panel with its "Open Shop" action
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelView {
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub action_label: String,
    pub action_id: String,
    pub footer: String,
}

pub fn render_panel(owner_id: &str, display_name: &str) -> PanelView {
    PanelView {
        owner_id: owner_id.to_string(),
        title: "🛍️ Shop Panel".to_string(),
        description: format!(
            "Welcome to **{}**'s shop!\n\nClick the button below to browse items.",
            display_name
        ),
        action_label: "Open Shop".to_string(),
        action_id: format!("open_shop_{}", owner_id),
        footer: "Powered by Coin".to_string(),
    }
}

/// Usage text with the configured limits
pub fn help_text(bot_name: &str, limits: &LimitsConfig) -> String {
    format!(
        "**{bot_name} — Help**\n\n\
         **Selling**\n\
         • /additem → add a file (max {max_mb}MB)\n\
         • Upload file within {upload_min} minutes\n\
         • /removeitem → remove by number\n\
         • /card → link your Coin card\n\n\
         **Buying**\n\
         • /shop @user\n\
         • Browse pages\n\
         • Buy by name or number\n\n\
         **Voting**\n\
         • 👍 / 👎 after purchase\n\
         • One vote per purchase\n\n\
         **Panel**\n\
         • /panel → public shop panel (once every {panel_min} minutes)\n\n\
         Powered by Coin",
        bot_name = bot_name,
        max_mb = limits.max_upload_mb(),
        upload_min = limits.upload_window_secs / 60,
        panel_min = limits.panel_cooldown_secs / 60,
    )
}

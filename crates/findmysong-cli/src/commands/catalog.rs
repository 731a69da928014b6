//! Web API commands. Each one restores the stored session first.

use music_web_api::{SearchKind, TopItemKind, MIN_SEARCH_QUERY_LEN};

use super::{ensure_session, print_json};
use crate::app::AppContext;

pub async fn me(ctx: &AppContext) -> anyhow::Result<()> {
    ensure_session(ctx).await?;
    print_json(&ctx.web.current_user().await?)
}

pub async fn top(ctx: &AppContext, kind: TopItemKind) -> anyhow::Result<()> {
    ensure_session(ctx).await?;
    print_json(&ctx.web.top_items(kind).await?)
}

pub async fn search(ctx: &AppContext, query: &str, kind: SearchKind) -> anyhow::Result<()> {
    if query.trim().chars().count() < MIN_SEARCH_QUERY_LEN {
        eprintln!(
            "Search queries need at least {} characters.",
            MIN_SEARCH_QUERY_LEN
        );
        return Ok(());
    }
    ensure_session(ctx).await?;
    print_json(&ctx.web.search(query, kind).await?)
}

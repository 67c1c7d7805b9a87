use crate::app::App;
use crate::output::Output;
use chrono::Utc;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use marquee_core::{RowMode, RowRequest, Watchlist};
use marquee_models::TitleKind;
use serde_json::json;

#[derive(Debug, Clone, Copy)]
pub enum WatchlistAction {
    Add,
    Remove,
    Toggle,
}

pub async fn run_list(app: &App, kind: Option<TitleKind>, output: &Output) -> Result<()> {
    let uid = app.uid()?;
    if uid.is_none() {
        output.warn("Sign in to keep a watchlist");
    }
    let request = RowRequest { uid, kind, mode: RowMode::Watchlist };
    let data = app.aggregator().load(&request).await;
    output.row("My List", &data);
    Ok(())
}

pub async fn run_change(app: &App, action: WatchlistAction, kind: TitleKind, id: &str, output: &Output) -> Result<()> {
    let uid = app
        .uid()?
        .ok_or_else(|| eyre!("Sign in first: marquee login --email <email> --password <password>"))?;
    let watchlist = Watchlist::new(app.store.clone());

    let in_list = match action {
        WatchlistAction::Remove => {
            watchlist.remove(&uid, id).await?;
            false
        }
        WatchlistAction::Add => {
            let title = app.catalog.get_title(kind, id).await?;
            watchlist.add(&uid, &title, Utc::now()).await?;
            true
        }
        WatchlistAction::Toggle => {
            let title = app.catalog.get_title(kind, id).await?;
            watchlist.toggle(&uid, &title, Utc::now()).await?
        }
    };

    if in_list {
        output.success(format!("{} {} is in your list", kind, id));
    } else {
        output.success(format!("{} {} is not in your list", kind, id));
    }
    output.data(&json!({ "id": id, "type": kind, "inList": in_list }));
    Ok(())
}

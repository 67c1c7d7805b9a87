use crate::app::App;
use crate::output::Output;
use color_eyre::Result;
use marquee_core::{RowMode, RowRequest};
use marquee_models::{RowData, RowItem, TitleKind};

fn kind_label(kind: Option<TitleKind>) -> &'static str {
    match kind {
        Some(TitleKind::Movie) => "Movies",
        Some(TitleKind::Series) => "Series",
        None => "Titles",
    }
}

pub async fn run_browse(app: &App, kind: Option<TitleKind>, genre: Option<String>, output: &Output) -> Result<()> {
    let heading = match genre.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
        Some(g) => format!("{} · {}", kind_label(kind), g),
        None => kind_label(kind).to_string(),
    };
    let request = RowRequest {
        uid: app.uid()?,
        kind,
        mode: RowMode::BrowseByGenre { genre },
    };
    let data = app.aggregator().load(&request).await;
    output.row(&heading, &data);
    Ok(())
}

pub async fn run_continue(app: &App, kind: Option<TitleKind>, output: &Output) -> Result<()> {
    let uid = app.uid()?;
    if uid.is_none() {
        output.warn("Sign in to see what you were watching");
    }
    let request = RowRequest { uid, kind, mode: RowMode::ContinueWatching };
    let data = app.aggregator().load(&request).await;
    output.row("Continue Watching", &data);
    Ok(())
}

pub async fn run_search(app: &App, term: &str, output: &Output) -> Result<()> {
    let data = match app.catalog.search(term).await {
        Ok(titles) => RowData::loaded(titles.into_iter().map(RowItem::from_title).collect()),
        Err(e) => RowData::failed(e.to_string()),
    };
    output.row(&format!("Results for \"{}\"", term.trim()), &data);
    Ok(())
}

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use marquee_config::{Config, PathManager, SessionFile};
use marquee_core::{Aggregator, Catalog, Identity, ProgressSettings};
use marquee_store::{create_store, DocumentStore};
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs: configuration, the opened store and the catalog
pub struct App {
    pub paths: PathManager,
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub catalog: Catalog,
}

impl App {
    pub async fn open(paths: PathManager, config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| eyre!("Invalid configuration in {}: {}", paths.config_file().display(), e))?;

        let store = create_store(&config, &paths)
            .await
            .map_err(|e| eyre!("Failed to open {:?} store: {}", config.store.backend, e))?;
        debug!("Opened {} store", store.backend_name());

        let catalog = Catalog::from_config(store.clone(), &config);
        Ok(Self { paths, config, store, catalog })
    }

    pub fn settings(&self) -> ProgressSettings {
        ProgressSettings::from(&self.config.playback)
    }

    pub fn aggregator(&self) -> Aggregator {
        Aggregator::new(self.catalog.clone(), &self.settings())
    }

    pub fn session_file(&self) -> Result<SessionFile> {
        load_session_file(&self.paths)
    }

    /// Identity remembered from the last `marquee login`
    pub fn identity(&self) -> Result<Option<Identity>> {
        let session = self.session_file()?;
        Ok(match (session.uid(), session.email()) {
            (Some(uid), Some(email)) => Some(Identity::new(uid.clone(), email.clone())),
            _ => None,
        })
    }

    pub fn uid(&self) -> Result<Option<String>> {
        Ok(self.identity()?.map(|identity| identity.uid))
    }
}

pub fn load_session_file(paths: &PathManager) -> Result<SessionFile> {
    let path = paths.session_file();
    let mut session = SessionFile::new(path.clone());
    session
        .load()
        .map_err(|e| eyre!("{}", e))
        .wrap_err_with(|| format!("Failed to read session from {}", path.display()))?;
    Ok(session)
}

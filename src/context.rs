use crate::config::AppConfig;
use crate::db::Executor;
use crate::files::FileStore;
use crate::sandbox::Sandbox;
use crate::session::SessionService;

/// Everything a handler needs, constructed once at startup and passed by
/// handle. There is no ambient global state in this crate.
pub struct AppContext {
    pub config: AppConfig,
    pub db: Executor,
    pub sessions: SessionService,
    pub files: FileStore,
}

impl AppContext {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let db = Executor::connect(&config.database).await?;
        let sessions = SessionService::new(
            &config.client_session.jwt_signature,
            config.session_lifetime()?,
        )?;
        let files = FileStore::new(Sandbox::new(&config.server.upload_dir));

        Ok(Self {
            config,
            db,
            sessions,
            files,
        })
    }
}

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use folio_api::app_state::AppState;
use folio_api::config::{read_config, StorageBackend};
use folio_api::repositories::{
    MemoryStore, NewProfile, PgProfileRepository, PgProjectRepository, ProfileRepository,
    ProjectRepository,
};
use folio_api::router;

#[tokio::main]
async fn main() {
    dotenvy::from_filename(".env.local").ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_api=debug,tower_http=debug".into()),
        )
        .init();

    let settings = read_config().expect("Failed to read configuration");

    let (project_repo, profile_repo): (Arc<dyn ProjectRepository>, Arc<dyn ProfileRepository>) =
        match settings.storage.backend {
            StorageBackend::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(8)
                    .connect_with(settings.storage.database.with_db())
                    .await
                    .expect("Failed to connect to Postgres");

                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .expect("Failed to run database migrations");

                let project_repo: Arc<dyn ProjectRepository> =
                    Arc::new(PgProjectRepository::new(pool.clone()));
                let profile_repo: Arc<dyn ProfileRepository> =
                    Arc::new(PgProfileRepository::new(pool));
                (project_repo, profile_repo)
            }
            StorageBackend::Memory => {
                tracing::warn!("using in-memory storage, data will not survive a restart");
                let store = Arc::new(MemoryStore::new());

                if let Some(local) = &settings.storage.local_profile {
                    store
                        .upsert_profile(NewProfile::new(&local.username, &local.token))
                        .await
                        .expect("Failed to seed local profile");
                    tracing::info!("seeded local profile '{}'", local.username);
                }

                let project_repo: Arc<dyn ProjectRepository> = store.clone();
                let profile_repo: Arc<dyn ProfileRepository> = store;
                (project_repo, profile_repo)
            }
        };

    let app_state = AppState::new(project_repo, profile_repo, Arc::new(github::Client::new()));
    let app = router::create(app_state, &settings);

    let address = format!(
        "{}:{}",
        settings.application.host, settings.application.port
    );
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .expect("Failed to bind listener");
    tracing::info!("listening on {address}");

    axum::serve(listener, app).await.expect("Server error");
}

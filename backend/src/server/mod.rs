//! HTTP server assembly.
//!
//! Owns session key loading and the actix `HttpServer` wiring. Route
//! registration itself lives in [`crate::inbound::http::routes`] so tests can
//! mount the same routes behind test middleware.

mod config;

pub use config::AppSettings;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Key, SameSite};
use actix_web::{App, HttpServer, web};
use tracing::{info, warn};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use crate::inbound::http::{HttpState, routes};

/// Load the session signing key from the configured file.
///
/// Release builds refuse to start without key material; debug builds fall
/// back to an ephemeral key so local runs work out of the box.
pub fn load_session_key(settings: &AppSettings) -> std::io::Result<Key> {
    let key_path = settings.session_key_file();
    match std::fs::read(&key_path) {
        Ok(bytes) => Ok(Key::derive_from(&bytes)),
        Err(error) if cfg!(debug_assertions) => {
            warn!(path = %key_path.display(), %error, "using temporary session key (dev only)");
            Ok(Key::generate())
        }
        Err(error) => Err(std::io::Error::other(format!(
            "failed to read session key at {}: {error}",
            key_path.display()
        ))),
    }
}

/// Bind and run the HTTP server until shutdown.
pub async fn run(settings: &AppSettings, state: HttpState) -> std::io::Result<()> {
    let key = load_session_key(settings)?;
    let cookie_secure = settings.cookie_secure();
    let bind_addr = settings
        .bind_addr()
        .map_err(|error| std::io::Error::other(format!("invalid bind address: {error}")))?;

    info!(%bind_addr, "starting http server");
    HttpServer::new(move || {
        let session = SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
            .cookie_name("session".to_owned())
            .cookie_path("/".to_owned())
            .cookie_secure(cookie_secure)
            .cookie_http_only(true)
            .cookie_same_site(SameSite::Lax)
            .build();

        let api = web::scope("/api/v1")
            .wrap(session)
            .configure(routes::configure_api);

        let mut app = App::new()
            .app_data(web::Data::new(state.clone()))
            .service(api);

        #[cfg(debug_assertions)]
        {
            app = app.service(
                SwaggerUi::new("/docs/{_:.*}")
                    .url("/api-docs/openapi.json", crate::doc::ApiDoc::openapi()),
            );
        }

        app
    })
    .bind(bind_addr)?
    .run()
    .await
}

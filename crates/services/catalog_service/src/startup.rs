use actix_web::{dev::Server, web, App, HttpServer};
use actix_web_lab::middleware::from_fn;
use lib_config::{config::configuration::Settings, db::db::PgPool};
use middleware::jwt::{admin_auth_middleware, jwt_auth_middleware};
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

use crate::routes::admin::comments::{get_pending_comments, moderate_comment};
use crate::routes::admin::games::{create_game, delete_game, list_all_games, update_game};
use crate::routes::comments::comments::{
    create_comment, delete_comment, get_comment, list_game_comments, update_comment,
};
use crate::routes::favorites::favorites::{
    add_to_favorites, check_favorite, get_favorites, remove_from_favorites,
};
use crate::routes::games::games::{get_categories, get_game, get_tags, list_games};
use crate::routes::health_check::health_check;
use crate::routes::stats::stats::{
    get_category_stats, get_game_stats, get_overall_stats, get_popular_games, record_game_play,
};

/**************************************************************/
// Application state to reuse the same code in main and tests
/***************************************************************/
pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(pool: PgPool, config: &Settings) -> Result<Self, std::io::Error> {
        let listener = if config.service.catalog_service_port == 0 {
            TcpListener::bind("127.0.0.1:0")?
        } else {
            let address = format!("127.0.0.1:{}", config.service.catalog_service_port);
            TcpListener::bind(&address)?
        };

        let actual_port = listener.local_addr()?.port();
        let server = run_server(listener, pool, config.clone()).await?;

        Ok(Self {
            port: actual_port,
            server,
        })
    }
    pub fn port(&self) -> u16 {
        self.port
    }
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

/******************************************/
// Running Server
/******************************************/
pub async fn run_server(
    listener: TcpListener,
    pool: PgPool,
    config: Settings,
) -> Result<Server, std::io::Error> {
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config.clone()))
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/games")
                            .route("", web::get().to(list_games))
                            // Literal segments must be registered before {id}.
                            .route("/categories", web::get().to(get_categories))
                            .route("/tags", web::get().to(get_tags))
                            .route("/{id}", web::get().to(get_game))
                            .route("/{id}/comments", web::get().to(list_game_comments))
                            .route("/{id}/stats", web::get().to(get_game_stats)),
                    )
                    .service(
                        web::scope("/comments").route("/{id}", web::get().to(get_comment)),
                    )
                    .service(
                        web::scope("/stats")
                            .route("/popular", web::get().to(get_popular_games))
                            .route("/overall", web::get().to(get_overall_stats))
                            .route("/categories", web::get().to(get_category_stats)),
                    )
                    .service(
                        web::scope("/protected")
                            .wrap(from_fn(jwt_auth_middleware))
                            .route("/games/{id}/play", web::post().to(record_game_play))
                            .route("/games/{id}/comments", web::post().to(create_comment))
                            .route("/comments/{id}", web::patch().to(update_comment))
                            .route("/comments/{id}", web::delete().to(delete_comment))
                            .route("/favorites", web::get().to(get_favorites))
                            .route("/favorites/{game_id}", web::post().to(add_to_favorites))
                            .route(
                                "/favorites/{game_id}",
                                web::delete().to(remove_from_favorites),
                            )
                            .route("/favorites/{game_id}/check", web::get().to(check_favorite)),
                    )
                    .service(
                        web::scope("/admin")
                            .wrap(from_fn(admin_auth_middleware))
                            .route("/games", web::post().to(create_game))
                            .route("/games", web::get().to(list_all_games))
                            .route("/games/{id}", web::patch().to(update_game))
                            .route("/games/{id}", web::delete().to(delete_game))
                            .route("/comments/pending", web::get().to(get_pending_comments))
                            .route("/comments/{id}/moderate", web::patch().to(moderate_comment)),
                    ),
            )
    })
    .listen(listener)?
    .run();
    Ok(server)
}

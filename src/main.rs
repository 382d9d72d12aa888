use actix_cors::Cors;
use actix_files::Files;
use actix_web::{middleware::Logger, web, App, HttpRequest, HttpServer};

mod cards;
mod compositor;
mod config;
mod error;
mod form;
mod generator;
mod handlers;
mod logos;
mod qr;

use cards::CardKind;
use config::Config;
use generator::GeneratorService;
use logos::LogoStore;

/// Index, health check and one POST resource per card type.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .route("/health", web::get().to(handlers::health));

    for card in CardKind::ALL {
        cfg.service(
            web::resource(card.route())
                .route(web::post().to(
                    move |req: HttpRequest,
                          payload: web::Payload,
                          generator: web::Data<GeneratorService>,
                          config: web::Data<Config>| {
                        handlers::generate(card, req, payload, generator, config)
                    },
                ))
                .default_service(web::to(handlers::method_not_allowed)),
        );
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    let logos = LogoStore::load(&config.qr.logo_dir);
    let generator = GeneratorService::new(&config, logos);

    let bind = config.bind_address();
    let static_dir = config.server.static_dir.clone();

    log::info!("Server starting on http://{}", bind);
    log::info!(
        "Error correction {:?}, logo fraction {}, upload limit {} bytes",
        config.qr.ec_level,
        config.qr.logo_fraction,
        config.server.max_upload_bytes
    );

    let generator = web::Data::new(generator);
    let config = web::Data::new(config);

    HttpServer::new(move || {
        let cors = Cors::default().allow_any_origin().allow_any_method().allow_any_header().max_age(3600);
        App::new()
            .app_data(generator.clone())
            .app_data(config.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .service(Files::new("/static", static_dir.clone()))
            .configure(configure_routes)
    })
    .bind(bind)?
    .run()
    .await
}

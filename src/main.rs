use dotenvy::dotenv;
use log::info;
use rocket::{Build, Rocket};

#[rocket::launch]
fn rocket() -> Rocket<Build> {
    dotenv().ok();
    env_logger::init();

    info!("🚀 Booky API running");
    info!("📚 Swagger UI → http://localhost:8000/api/docs");

    booky_server::rocket()
}
